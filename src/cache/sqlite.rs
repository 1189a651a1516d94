use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use tracing::debug;

use super::{CacheError, VenueStore};
use crate::domain::{Venue, VenueCategory};
use crate::geometry::BoundingBox;

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS bars (
    osm_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    type TEXT NOT NULL,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    address TEXT,
    opening_hours TEXT,
    website TEXT,
    phone TEXT,
    updated_at INTEGER NOT NULL
)";

const CREATE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_bars_lat_lon ON bars (latitude, longitude)";

const UPSERT: &str = "INSERT INTO bars (
        osm_id, name, type, latitude, longitude,
        address, opening_hours, website, phone, updated_at
    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, strftime('%s', 'now'))
    ON CONFLICT(osm_id) DO UPDATE SET
        name = excluded.name,
        type = excluded.type,
        latitude = excluded.latitude,
        longitude = excluded.longitude,
        address = excluded.address,
        opening_hours = excluded.opening_hours,
        website = excluded.website,
        phone = excluded.phone,
        updated_at = excluded.updated_at";

const SELECT_IN_BOX: &str = "SELECT osm_id, name, type, latitude, longitude,
        address, opening_hours, website, phone
    FROM bars
    WHERE latitude BETWEEN ? AND ?
      AND longitude BETWEEN ? AND ?";

/// Venue cache backed by a SQLite `bars` table
#[derive(Debug, Clone)]
pub struct SqliteVenueStore {
    pool: SqlitePool,
}

impl SqliteVenueStore {
    /// Open (creating if needed) the database file and prepare the schema
    pub async fn connect(path: &Path) -> Result<Self, CacheError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(CacheError::Connect)?;

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, creating the table if missing
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, CacheError> {
        sqlx::query(CREATE_TABLE)
            .execute(&pool)
            .await
            .map_err(CacheError::Migrate)?;
        sqlx::query(CREATE_INDEX)
            .execute(&pool)
            .await
            .map_err(CacheError::Migrate)?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn venue_from_row(row: &SqliteRow) -> Result<Venue, sqlx::Error> {
    let category: String = row.try_get("type")?;

    Ok(Venue {
        osm_id: row.try_get("osm_id")?,
        name: row.try_get("name")?,
        category: VenueCategory::from_label(&category),
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        address: row.try_get("address")?,
        opening_hours: row.try_get("opening_hours")?,
        website: row.try_get("website")?,
        phone: row.try_get("phone")?,
    })
}

#[async_trait]
impl VenueStore for SqliteVenueStore {
    async fn upsert(&self, venues: &[Venue]) -> Result<(), CacheError> {
        let mut tx = self.pool.begin().await.map_err(CacheError::Upsert)?;

        for venue in venues {
            sqlx::query(UPSERT)
                .bind(venue.osm_id)
                .bind(&venue.name)
                .bind(venue.category.label())
                .bind(venue.latitude)
                .bind(venue.longitude)
                .bind(&venue.address)
                .bind(&venue.opening_hours)
                .bind(&venue.website)
                .bind(&venue.phone)
                .execute(&mut *tx)
                .await
                .map_err(CacheError::Upsert)?;
        }

        tx.commit().await.map_err(CacheError::Upsert)?;
        debug!(count = venues.len(), "Upserted venues into cache");
        Ok(())
    }

    async fn query_bounding_box(
        &self,
        center: (f64, f64),
        radius_m: f64,
    ) -> Result<Vec<Venue>, CacheError> {
        let bbox = BoundingBox::around(center, radius_m);

        let rows = sqlx::query(SELECT_IN_BOX)
            .bind(bbox.south)
            .bind(bbox.north)
            .bind(bbox.west)
            .bind(bbox.east)
            .fetch_all(&self.pool)
            .await
            .map_err(CacheError::Query)?;

        rows.iter()
            .map(venue_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(CacheError::Query)
    }
}
