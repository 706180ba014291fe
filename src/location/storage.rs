//! Location store interface and its `SQLite` implementation.
//!
//! One row per identity holds the last reported coordinates and their
//! geohash. The geohash column is indexed so radius searches become a few
//! range scans.

// SQLite operations need to hold the lock for the duration of the operation.
#![allow(clippy::significant_drop_tightening)]

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection};

use super::types::{GeohashRange, LocationRecord};
use crate::ids::IdentityId;
use crate::store::{lock, StoreResult};

/// Keyed location persistence with a range-queryable index.
pub trait LocationStore: Send + Sync {
    /// Stores the latest location for `id`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn write_location(
        &self,
        id: &IdentityId,
        latitude: f64,
        longitude: f64,
        index_key: &str,
    ) -> StoreResult<()>;

    /// Returns every record whose index key falls inside `range`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn query_by_index_range(&self, range: &GeohashRange) -> StoreResult<Vec<LocationRecord>>;
}

/// `SQLite`-based location storage.
pub struct LocationStorage {
    conn: Mutex<Connection>,
}

impl LocationStorage {
    /// Opens (or creates) the location database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created or initialized.
    pub fn new(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.initialize_schema()?;
        Ok(storage)
    }

    /// Creates an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.initialize_schema()?;
        Ok(storage)
    }

    fn initialize_schema(&self) -> StoreResult<()> {
        let conn = lock(&self.conn)?;

        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS locations (
                identity_id TEXT PRIMARY KEY,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                geohash TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_locations_geohash
                ON locations (geohash);
            ",
        )?;

        Ok(())
    }

    /// Stores a location with an explicit timestamp (Unix seconds).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn write_location_at(
        &self,
        id: &IdentityId,
        latitude: f64,
        longitude: f64,
        index_key: &str,
        updated_at: i64,
    ) -> StoreResult<()> {
        let conn = lock(&self.conn)?;

        conn.execute(
            r"
            INSERT INTO locations (identity_id, latitude, longitude, geohash, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(identity_id) DO UPDATE SET
                latitude = excluded.latitude,
                longitude = excluded.longitude,
                geohash = excluded.geohash,
                updated_at = excluded.updated_at
            ",
            params![id.as_str(), latitude, longitude, index_key, updated_at],
        )?;

        Ok(())
    }
}

impl LocationStore for LocationStorage {
    fn write_location(
        &self,
        id: &IdentityId,
        latitude: f64,
        longitude: f64,
        index_key: &str,
    ) -> StoreResult<()> {
        let now = chrono::Utc::now().timestamp();
        self.write_location_at(id, latitude, longitude, index_key, now)
    }

    fn query_by_index_range(&self, range: &GeohashRange) -> StoreResult<Vec<LocationRecord>> {
        let conn = lock(&self.conn)?;

        let mut stmt = conn.prepare(
            r"
            SELECT identity_id, latitude, longitude, geohash, updated_at
            FROM locations
            WHERE geohash >= ?1 AND geohash <= ?2
            ORDER BY geohash
            ",
        )?;

        let records = stmt
            .query_map(params![&range.start, &range.end], |row| {
                let id: String = row.get(0)?;
                Ok(LocationRecord {
                    identity_id: IdentityId::new(id),
                    latitude: row.get(1)?,
                    longitude: row.get(2)?,
                    geohash: row.get(3)?,
                    updated_at: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }
}
