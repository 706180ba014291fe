//! Identity store interface and its `SQLite` implementation.

// SQLite operations need to hold the lock for the duration of the operation.
#![allow(clippy::significant_drop_tightening)]

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};

use super::types::Identity;
use crate::ids::{DeviceKey, IdentityId};
use crate::store::{lock, StoreResult};

/// Read access to registered identities plus the verification write.
pub trait IdentityStore: Send + Sync {
    /// Returns every known identity, in a stable order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn list_known_identities(&self) -> StoreResult<Vec<Identity>>;

    /// Returns one identity by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn get_identity(&self, id: &IdentityId) -> StoreResult<Option<Identity>>;

    /// Records that `evidence` was observed advertising this identity's handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn mark_proximity_verified(&self, id: &IdentityId, evidence: &DeviceKey) -> StoreResult<()>;
}

/// `SQLite`-based identity storage.
pub struct IdentityStorage {
    conn: Mutex<Connection>,
}

impl IdentityStorage {
    /// Opens (or creates) the identity database at `path`.
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
            CREATE TABLE IF NOT EXISTS identities (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                handle TEXT NOT NULL,
                proximity_verified INTEGER NOT NULL DEFAULT 0,
                verified_device TEXT,
                verified_at INTEGER,
                created_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_identities_handle
                ON identities (handle COLLATE NOCASE);
            ",
        )?;

        Ok(())
    }

    /// Inserts or updates an identity.
    ///
    /// Registration order is preserved on update, which keeps
    /// [`list_known_identities`](IdentityStore::list_known_identities) stable.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn save_identity(&self, identity: &Identity) -> StoreResult<()> {
        let conn = lock(&self.conn)?;
        let now = chrono::Utc::now().timestamp();

        conn.execute(
            r"
            INSERT INTO identities (id, handle, proximity_verified, verified_device, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                handle = excluded.handle,
                proximity_verified = excluded.proximity_verified,
                verified_device = excluded.verified_device
            ",
            params![
                identity.id.as_str(),
                &identity.handle,
                i32::from(identity.proximity_verified),
                identity.verified_device.as_ref().map(DeviceKey::as_str),
                now,
            ],
        )?;

        Ok(())
    }
}

fn identity_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Identity> {
    let id: String = row.get(0)?;
    let handle: String = row.get(1)?;
    let verified: i32 = row.get(2)?;
    let device: Option<String> = row.get(3)?;

    Ok(Identity {
        id: IdentityId::new(id),
        handle,
        proximity_verified: verified != 0,
        verified_device: device.map(DeviceKey::new),
    })
}

impl IdentityStore for IdentityStorage {
    fn list_known_identities(&self) -> StoreResult<Vec<Identity>> {
        let conn = lock(&self.conn)?;

        let mut stmt = conn.prepare(
            r"
            SELECT id, handle, proximity_verified, verified_device
            FROM identities
            ORDER BY seq
            ",
        )?;

        let identities = stmt
            .query_map([], identity_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(identities)
    }

    fn get_identity(&self, id: &IdentityId) -> StoreResult<Option<Identity>> {
        let conn = lock(&self.conn)?;

        let identity = conn
            .query_row(
                r"
                SELECT id, handle, proximity_verified, verified_device
                FROM identities
                WHERE id = ?1
                ",
                params![id.as_str()],
                identity_from_row,
            )
            .optional()?;

        Ok(identity)
    }

    fn mark_proximity_verified(&self, id: &IdentityId, evidence: &DeviceKey) -> StoreResult<()> {
        let conn = lock(&self.conn)?;
        let now = chrono::Utc::now().timestamp();

        // First evidence wins; re-verification leaves the original record.
        conn.execute(
            r"
            UPDATE identities
            SET proximity_verified = 1, verified_device = ?1, verified_at = ?2
            WHERE id = ?3 AND proximity_verified = 0
            ",
            params![evidence.as_str(), now, id.as_str()],
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_and_get_identity() {
        let storage = IdentityStorage::in_memory().unwrap();
        storage.save_identity(&Identity::new("id-1", "alice")).unwrap();

        let identity = storage
            .get_identity(&IdentityId::new("id-1"))
            .unwrap()
            .unwrap();
        assert_eq!(identity.handle, "alice");
        assert!(!identity.proximity_verified);
    }

    #[test]
    fn get_nonexistent_identity_returns_none() {
        let storage = IdentityStorage::in_memory().unwrap();
        assert!(storage
            .get_identity(&IdentityId::new("missing"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn list_preserves_registration_order() {
        let storage = IdentityStorage::in_memory().unwrap();
        storage.save_identity(&Identity::new("id-2", "zed")).unwrap();
        storage.save_identity(&Identity::new("id-1", "amy")).unwrap();
        storage.save_identity(&Identity::new("id-2", "zed2")).unwrap();

        let identities = storage.list_known_identities().unwrap();
        let ids: Vec<&str> = identities.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["id-2", "id-1"]);
        assert_eq!(identities[0].handle, "zed2");
    }

    #[test]
    fn mark_proximity_verified_records_evidence() {
        let storage = IdentityStorage::in_memory().unwrap();
        storage.save_identity(&Identity::new("id-1", "alice")).unwrap();

        storage
            .mark_proximity_verified(&IdentityId::new("id-1"), &DeviceKey::new("dev-a"))
            .unwrap();

        let identity = storage
            .get_identity(&IdentityId::new("id-1"))
            .unwrap()
            .unwrap();
        assert!(identity.proximity_verified);
        assert_eq!(identity.verified_device, Some(DeviceKey::new("dev-a")));
    }

    #[test]
    fn mark_proximity_verified_keeps_first_evidence() {
        let storage = IdentityStorage::in_memory().unwrap();
        storage.save_identity(&Identity::new("id-1", "alice")).unwrap();
        let id = IdentityId::new("id-1");

        storage
            .mark_proximity_verified(&id, &DeviceKey::new("dev-a"))
            .unwrap();
        storage
            .mark_proximity_verified(&id, &DeviceKey::new("dev-b"))
            .unwrap();

        let identity = storage.get_identity(&id).unwrap().unwrap();
        assert_eq!(identity.verified_device, Some(DeviceKey::new("dev-a")));
    }

    #[test]
    fn storage_persists_across_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("identities.db");

        {
            let storage = IdentityStorage::new(&path).unwrap();
            storage.save_identity(&Identity::new("id-1", "alice")).unwrap();
        }

        let storage = IdentityStorage::new(&path).unwrap();
        assert_eq!(storage.list_known_identities().unwrap().len(), 1);
    }
}
