//! Radio discovery types.

use tokio::time::Instant;

use crate::ids::{DeviceKey, IdentityId};

/// One raw advertisement event from the radio layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    /// Advertising peer.
    pub device_key: DeviceKey,
    /// Name carried in the advertisement payload, if any.
    pub advertised_name: Option<String>,
    /// Received signal strength (dBm).
    pub rssi: i32,
    /// When the event was delivered.
    pub observed_at: Instant,
}

impl Advertisement {
    /// Creates an advertisement observed now.
    #[must_use]
    pub fn new(device_key: impl Into<DeviceKey>, advertised_name: Option<&str>, rssi: i32) -> Self {
        Self {
            device_key: device_key.into(),
            advertised_name: advertised_name.map(ToString::to_string),
            rssi,
            observed_at: Instant::now(),
        }
    }

    /// Returns the advertised name if it is present and non-blank.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.advertised_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// A device seen by the scanner. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredSignal {
    /// Advertising peer.
    pub device_key: DeviceKey,
    /// Most recent advertised name.
    pub advertised_name: Option<String>,
    /// Most recent signal strength (dBm).
    pub signal_strength: i32,
    /// First sighting in the current scan session.
    pub first_seen_at: Instant,
    /// Most recent sighting.
    pub last_seen_at: Instant,
}

/// An identity believed to be near, resolved from a radio sighting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCandidate {
    /// The matched identity.
    pub identity_id: IdentityId,
    /// The identity's public handle.
    pub handle: String,
    /// Originating signal. Weak reference; the cache owns the signal.
    pub device_key: DeviceKey,
    /// Rounded distance estimate from signal strength.
    pub estimated_distance_meters: u32,
    /// Copied from the owning signal's last sighting.
    pub last_active_at: Instant,
}

/// Lifecycle of a proximity scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScannerState {
    /// No scan session; waiting for an authenticated session.
    #[default]
    Idle,
    /// Checking radio availability and authorization.
    Initializing,
    /// Scanning continuously and advertising.
    Scanning,
    /// Halted by background, revocation or explicit stop.
    Stopped,
}

impl ScannerState {
    /// Converts to string representation for logging.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Initializing => "initializing",
            Self::Scanning => "scanning",
            Self::Stopped => "stopped",
        }
    }

    /// Returns whether a scan session may be started from this state.
    #[must_use]
    pub const fn can_start(&self) -> bool {
        matches!(self, Self::Idle | Self::Stopped)
    }
}

/// Why the radio cannot be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioUnavailable {
    /// Radio hardware is missing, powered off or failed to start.
    HardwareUnavailable,
    /// The user has not granted (or revoked) radio permission.
    NotAuthorized,
}

impl std::fmt::Display for RadioUnavailable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HardwareUnavailable => f.write_str("radio hardware unavailable"),
            Self::NotAuthorized => f.write_str("radio not authorized"),
        }
    }
}
