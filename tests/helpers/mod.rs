//! Reusable test helpers for integration tests.
//!
//! - [`MockRadio`]: a scriptable radio layer; tests inject advertisements
//!   with [`MockRadio::emit`]
//! - [`RecordingIdentityStore`]: an identity store that records
//!   verification writes and can be told to fail

#![allow(dead_code)]

use std::env;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use nearby_core::identity::{Identity, IdentityStore};
use nearby_core::ids::{DeviceKey, IdentityId};
use nearby_core::radio::{Advertisement, AdvertisementCallback, RadioLayer};
use nearby_core::store::{StoreError, StoreResult};

/// Atomic counter for unique test directory names.
static HELPER_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Creates a unique temporary directory for test isolation.
///
/// Each call produces a distinct path by combining the prefix, process ID,
/// and an atomic counter.
pub fn unique_temp_dir(prefix: &str) -> PathBuf {
    let id = HELPER_COUNTER.fetch_add(1, Ordering::SeqCst);
    env::temp_dir().join(format!(
        "nearby_test_{}_{}_{}",
        prefix,
        std::process::id(),
        id
    ))
}

/// Removes a temporary test directory. Ignores errors silently.
pub fn cleanup_dir(dir: &PathBuf) {
    let _ = std::fs::remove_dir_all(dir);
}

/// Scriptable radio layer.
///
/// Available and authorized by default. Advertisements are delivered only
/// while a scan is running, like a real radio.
pub struct MockRadio {
    available: AtomicBool,
    authorized: AtomicBool,
    scan_accepted: AtomicBool,
    advertise_supported: AtomicBool,
    callback: Mutex<Option<AdvertisementCallback>>,
    advertised: Mutex<Option<String>>,
    start_scan_calls: AtomicUsize,
}

impl MockRadio {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            available: AtomicBool::new(true),
            authorized: AtomicBool::new(true),
            scan_accepted: AtomicBool::new(true),
            advertise_supported: AtomicBool::new(true),
            callback: Mutex::new(None),
            advertised: Mutex::new(None),
            start_scan_calls: AtomicUsize::new(0),
        })
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn set_authorized(&self, authorized: bool) {
        self.authorized.store(authorized, Ordering::SeqCst);
    }

    pub fn set_scan_accepted(&self, accepted: bool) {
        self.scan_accepted.store(accepted, Ordering::SeqCst);
    }

    pub fn set_advertise_supported(&self, supported: bool) {
        self.advertise_supported.store(supported, Ordering::SeqCst);
    }

    /// Delivers an advertisement. Returns `false` if no scan is running.
    pub fn emit(&self, device_key: &str, name: Option<&str>, rssi: i32) -> bool {
        let callback = self.callback.lock().unwrap().clone();
        match callback {
            Some(callback) => {
                callback(Advertisement::new(device_key, name, rssi));
                true
            }
            None => false,
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.callback.lock().unwrap().is_some()
    }

    pub fn advertised_name(&self) -> Option<String> {
        self.advertised.lock().unwrap().clone()
    }

    pub fn start_scan_calls(&self) -> usize {
        self.start_scan_calls.load(Ordering::SeqCst)
    }
}

impl RadioLayer for MockRadio {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn is_authorized(&self) -> bool {
        self.authorized.load(Ordering::SeqCst)
    }

    fn start_scan(&self, on_device: AdvertisementCallback) -> bool {
        self.start_scan_calls.fetch_add(1, Ordering::SeqCst);
        if !self.scan_accepted.load(Ordering::SeqCst) {
            return false;
        }
        *self.callback.lock().unwrap() = Some(on_device);
        true
    }

    fn stop_scan(&self) {
        *self.callback.lock().unwrap() = None;
    }

    fn start_advertise(&self, name: &str) -> bool {
        if !self.advertise_supported.load(Ordering::SeqCst) {
            return false;
        }
        *self.advertised.lock().unwrap() = Some(name.to_string());
        true
    }

    fn stop_advertise(&self) {
        *self.advertised.lock().unwrap() = None;
    }
}

/// Identity store that records verification writes.
#[derive(Default)]
pub struct RecordingIdentityStore {
    identities: Mutex<Vec<Identity>>,
    fail_verify: AtomicBool,
    list_delay_ms: AtomicU64,
    verified: Mutex<Vec<(IdentityId, DeviceKey)>>,
}

impl RecordingIdentityStore {
    pub fn with_identities(identities: Vec<Identity>) -> Arc<Self> {
        Arc::new(Self {
            identities: Mutex::new(identities),
            ..Self::default()
        })
    }

    pub fn set_fail_verify(&self, fail: bool) {
        self.fail_verify.store(fail, Ordering::SeqCst);
    }

    /// Makes every identity listing block the calling thread for `delay`.
    pub fn set_list_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.list_delay_ms.store(millis, Ordering::SeqCst);
    }

    pub fn verified(&self) -> Vec<(IdentityId, DeviceKey)> {
        self.verified.lock().unwrap().clone()
    }
}

impl IdentityStore for RecordingIdentityStore {
    fn list_known_identities(&self) -> StoreResult<Vec<Identity>> {
        let delay = self.list_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            std::thread::sleep(Duration::from_millis(delay));
        }
        Ok(self.identities.lock().unwrap().clone())
    }

    fn get_identity(&self, id: &IdentityId) -> StoreResult<Option<Identity>> {
        Ok(self
            .identities
            .lock()
            .unwrap()
            .iter()
            .find(|i| &i.id == id)
            .cloned())
    }

    fn mark_proximity_verified(&self, id: &IdentityId, evidence: &DeviceKey) -> StoreResult<()> {
        self.verified
            .lock()
            .unwrap()
            .push((id.clone(), evidence.clone()));
        if self.fail_verify.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("verification write failed".to_string()));
        }
        if let Some(identity) = self
            .identities
            .lock()
            .unwrap()
            .iter_mut()
            .find(|i| &i.id == id)
        {
            identity.proximity_verified = true;
            identity.verified_device = Some(evidence.clone());
        }
        Ok(())
    }
}
