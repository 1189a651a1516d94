use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use super::PoiSource;
use crate::config::OverpassConfig;
use crate::domain::VenueCategory;

const USER_AGENT: &str = concat!("barhop/", env!("CARGO_PKG_VERSION"));

/// Failure talking to the Overpass API
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("no Overpass endpoints configured")]
    NoEndpoints,
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("failed to send request to Overpass API: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("Overpass API returned error status: {0}")]
    Status(StatusCode),
    #[error("failed to parse Overpass JSON response: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Raw Overpass API response
#[derive(Debug, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<Element>,
}

/// Centroid Overpass attaches to ways when asked for `out center`
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Center {
    pub lat: f64,
    pub lon: f64,
}

/// A single element from Overpass (node or way)
#[derive(Debug, Clone, Deserialize)]
pub struct Element {
    #[serde(rename = "type")]
    pub type_: String,
    pub id: i64,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub center: Option<Center>,
    #[serde(default)]
    pub tags: Option<HashMap<String, String>>,
}

/// Build the Overpass QL query for every venue category around a point.
///
/// Nodes and ways are both requested; `out center` gives ways a centroid.
pub fn build_venue_query(center: (f64, f64), radius_m: f64, timeout_secs: u64) -> String {
    let (lat, lon) = center;
    let mut clauses = String::new();

    for kind in ["node", "way"] {
        for category in VenueCategory::ALL {
            clauses.push_str(&format!(
                "  {kind}[\"amenity\"=\"{amenity}\"](around:{radius_m},{lat},{lon});\n",
                amenity = category.amenity_tag(),
            ));
        }
    }

    format!("[out:json][timeout:{timeout_secs}];\n(\n{clauses});\nout center;")
}

/// Async Overpass client with bounded linear-backoff retries
#[derive(Debug, Clone)]
pub struct OverpassClient {
    client: reqwest::Client,
    urls: Vec<String>,
    query_timeout_secs: u64,
    max_retries: u32,
    retry_backoff: Duration,
}

impl OverpassClient {
    pub fn new(config: &OverpassConfig) -> Result<Self, UpstreamError> {
        if config.urls.is_empty() {
            return Err(UpstreamError::NoEndpoints);
        }

        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(UpstreamError::Client)?;

        Ok(Self {
            client,
            urls: config.urls.clone(),
            query_timeout_secs: config.query_timeout_secs,
            max_retries: config.max_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        })
    }

    /// Delay before the given retry (1-based): 1x, 2x, ... the backoff unit
    pub fn backoff_for(&self, retry: u32) -> Duration {
        self.retry_backoff * retry
    }

    /// Endpoint for a given attempt, cycling through the configured mirrors
    fn url_for(&self, attempt: u32) -> &str {
        &self.urls[attempt as usize % self.urls.len()]
    }

    /// Execute an Overpass query, retrying on transport errors and non-2xx statuses.
    ///
    /// At most `max_retries + 1` requests are made; the last failure is returned as-is.
    pub async fn execute(&self, query: &str) -> Result<OverpassResponse, UpstreamError> {
        let mut attempt: u32 = 0;

        let response = loop {
            match self.send_once(self.url_for(attempt), query).await {
                Ok(response) => break response,
                Err(err) if attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.backoff_for(attempt);
                    warn!(
                        error = %err,
                        attempt,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Overpass request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        };

        response
            .json::<OverpassResponse>()
            .await
            .map_err(UpstreamError::Decode)
    }

    async fn send_once(&self, url: &str, query: &str) -> Result<reqwest::Response, UpstreamError> {
        // Overpass expects form-encoded POST data: data=<query>
        let response = self
            .client
            .post(url)
            .form(&[("data", query)])
            .send()
            .await
            .map_err(UpstreamError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status));
        }
        Ok(response)
    }
}

#[async_trait]
impl PoiSource for OverpassClient {
    async fn query_pois(
        &self,
        center: (f64, f64),
        radius_m: f64,
    ) -> Result<Vec<Element>, UpstreamError> {
        let query = build_venue_query(center, radius_m, self.query_timeout_secs);
        let response = self.execute(&query).await?;
        debug!(count = response.elements.len(), "Overpass returned elements");
        Ok(response.elements)
    }
}
