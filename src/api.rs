//! Single entry point for host applications.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::config::{ConfigError, ProximityConfig};
use crate::conversation::{ConversationManager, ConversationStorage};
use crate::identity::{IdentityStorage, IdentityStore};
use crate::location::{GeoRadar, LocationStorage};
use crate::radio::{ProximityScanner, RadioLayer};
use crate::store::StoreError;

/// Errors from opening the core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A database could not be opened.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The data directory could not be created.
    #[error("Failed to create data directory: {0}")]
    DataDir(#[from] std::io::Error),
}

/// Scanner, radar and conversations wired to one set of databases.
///
/// Databases under `data_dir`:
///
/// | File | Contents |
/// |------|----------|
/// | `identities.db` | known identities and proximity verification |
/// | `locations.db` | last reported location per identity |
/// | `conversations.db` | requests and messages |
///
/// # Example
///
/// ```ignore
/// use nearby_core::{NearbyCore, ProximityConfig};
///
/// let core = NearbyCore::open(data_dir, radio, ProximityConfig::default())?;
/// core.scanner().start(&session).await?;
/// ```
pub struct NearbyCore {
    config: ProximityConfig,
    identities: Arc<IdentityStorage>,
    scanner: ProximityScanner,
    radar: GeoRadar,
    conversations: ConversationManager,
}

impl NearbyCore {
    /// Opens (or creates) the databases under `data_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the directory
    /// cannot be created, or a database cannot be opened.
    pub fn open(
        data_dir: &Path,
        radio: Arc<dyn RadioLayer>,
        config: ProximityConfig,
    ) -> Result<Self, CoreError> {
        config.validate()?;
        std::fs::create_dir_all(data_dir)?;

        let identities = Arc::new(IdentityStorage::new(&data_dir.join("identities.db"))?);
        let locations = Arc::new(LocationStorage::new(&data_dir.join("locations.db"))?);
        let conversations = Arc::new(ConversationStorage::new(
            &data_dir.join("conversations.db"),
        )?);

        info!(path = %data_dir.display(), "Opened nearby core");
        Ok(Self::wire(radio, config, identities, locations, conversations))
    }

    /// Creates a core backed by in-memory databases.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or a database cannot
    /// be initialized.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn in_memory(
        radio: Arc<dyn RadioLayer>,
        config: ProximityConfig,
    ) -> Result<Self, CoreError> {
        config.validate()?;
        Ok(Self::wire(
            radio,
            config,
            Arc::new(IdentityStorage::in_memory()?),
            Arc::new(LocationStorage::in_memory()?),
            Arc::new(ConversationStorage::in_memory()?),
        ))
    }

    fn wire(
        radio: Arc<dyn RadioLayer>,
        config: ProximityConfig,
        identities: Arc<IdentityStorage>,
        locations: Arc<LocationStorage>,
        conversations: Arc<ConversationStorage>,
    ) -> Self {
        let identity_store: Arc<dyn IdentityStore> = identities.clone();
        Self {
            scanner: ProximityScanner::new(radio, identity_store, config.clone()),
            radar: GeoRadar::new(locations, config.clone()),
            conversations: ConversationManager::new(conversations, &config),
            identities,
            config,
        }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &ProximityConfig {
        &self.config
    }

    /// Identity storage, for registering identities.
    #[must_use]
    pub fn identities(&self) -> &IdentityStorage {
        &self.identities
    }

    /// Radio proximity scanner.
    #[must_use]
    pub const fn scanner(&self) -> &ProximityScanner {
        &self.scanner
    }

    /// Geospatial radar.
    #[must_use]
    pub const fn radar(&self) -> &GeoRadar {
        &self.radar
    }

    /// Conversation admission.
    #[must_use]
    pub const fn conversations(&self) -> &ConversationManager {
        &self.conversations
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::identity::{Identity, Session};
    use crate::location::GeoPoint;
    use crate::radio::AdvertisementCallback;
    use tempfile::TempDir;

    struct NoRadio;

    impl RadioLayer for NoRadio {
        fn is_available(&self) -> bool {
            false
        }
        fn is_authorized(&self) -> bool {
            false
        }
        fn start_scan(&self, _on_device: AdvertisementCallback) -> bool {
            false
        }
        fn stop_scan(&self) {}
        fn start_advertise(&self, _name: &str) -> bool {
            false
        }
        fn stop_advertise(&self) {}
    }

    #[test]
    fn open_creates_databases() {
        let dir = TempDir::new().unwrap();
        let data_dir = dir.path().join("nested");

        let core = NearbyCore::open(&data_dir, Arc::new(NoRadio), ProximityConfig::default())
            .unwrap();
        core.identities()
            .save_identity(&Identity::new("alice", "alice"))
            .unwrap();

        assert!(data_dir.join("identities.db").exists());
        assert!(data_dir.join("locations.db").exists());
        assert!(data_dir.join("conversations.db").exists());
    }

    #[test]
    fn open_rejects_invalid_config() {
        let dir = TempDir::new().unwrap();
        let config = ProximityConfig::default().with_sweep_interval(Duration::from_secs(10));

        let result = NearbyCore::open(dir.path(), Arc::new(NoRadio), config);
        assert!(matches!(result, Err(CoreError::Config(_))));
    }

    #[test]
    fn in_memory_wires_components() {
        let core = NearbyCore::in_memory(Arc::new(NoRadio), ProximityConfig::default()).unwrap();
        let alice = Session::authenticated("alice", "alice");

        core.radar()
            .update_location(&alice, GeoPoint::new(1.0, 1.0).unwrap())
            .unwrap();
        core.conversations()
            .initiate(&alice, &"bob".into(), "hi")
            .unwrap();

        assert_eq!(core.config().pending_message_cap, 2);
        assert_eq!(
            core.scanner().state(),
            crate::radio::ScannerState::Idle
        );
    }
}
