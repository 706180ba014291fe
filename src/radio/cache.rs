//! Timestamped registry of discovered devices.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use super::types::{Advertisement, DiscoveredSignal};
use crate::ids::DeviceKey;

/// Map of device key to its most recent sighting.
///
/// Owned by a single scan-session task; it is never shared across sessions.
#[derive(Debug, Default)]
pub struct SignalCache {
    signals: HashMap<DeviceKey, DiscoveredSignal>,
}

impl SignalCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an advertisement and returns the updated signal.
    ///
    /// An unseen device is inserted with `first_seen_at` set to the
    /// observation time. Strength and `last_seen_at` are always refreshed;
    /// the name is only replaced when the advertisement carries one.
    pub fn upsert(&mut self, advertisement: &Advertisement) -> &DiscoveredSignal {
        let now = advertisement.observed_at;
        let signal = self
            .signals
            .entry(advertisement.device_key.clone())
            .or_insert_with(|| DiscoveredSignal {
                device_key: advertisement.device_key.clone(),
                advertised_name: None,
                signal_strength: advertisement.rssi,
                first_seen_at: now,
                last_seen_at: now,
            });

        signal.signal_strength = advertisement.rssi;
        signal.last_seen_at = signal.last_seen_at.max(now);
        if let Some(name) = advertisement.name() {
            signal.advertised_name = Some(name.to_string());
        }
        signal
    }

    /// Removes every signal not seen for longer than `staleness_window`.
    ///
    /// Returns the evicted device keys.
    pub fn sweep(&mut self, now: Instant, staleness_window: Duration) -> Vec<DeviceKey> {
        let mut evicted = Vec::new();
        self.signals.retain(|key, signal| {
            let fresh = now.saturating_duration_since(signal.last_seen_at) <= staleness_window;
            if !fresh {
                evicted.push(key.clone());
            }
            fresh
        });
        evicted
    }

    /// Returns whether a device is cached.
    #[must_use]
    pub fn contains(&self, device_key: &DeviceKey) -> bool {
        self.signals.contains_key(device_key)
    }

    /// Number of cached signals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    /// Returns whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Drops every signal.
    pub fn clear(&mut self) {
        self.signals.clear();
    }
}
