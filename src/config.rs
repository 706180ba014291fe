//! Tunable settings for proximity discovery and conversation admission.
//!
//! Every constant the scanner, radar and conversation manager depend on
//! lives in [`ProximityConfig`]. The defaults reproduce the calibrated
//! values exactly; changing them changes observable behavior (distances,
//! eviction latency, message cap).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration loading and validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration JSON could not be parsed.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of its allowed range.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Settings for proximity discovery.
///
/// # Defaults
///
/// | Setting | Value |
/// |---------|-------|
/// | Reference RSSI (1 m) | -40 dBm |
/// | Path loss exponent | 2.0 |
/// | RSSI cutoff | -70 dBm (~32 m) |
/// | Staleness window | 5000 ms |
/// | Sweep interval | 1000 ms |
/// | Authorization poll | 2000 ms |
/// | Pending message cap | 2 |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProximityConfig {
    /// Calibrated signal strength at one meter.
    pub reference_rssi: i32,

    /// Environmental path loss exponent (2.0 is free space).
    pub path_loss_exponent: f64,

    /// Sightings weaker than this are out of range.
    pub rssi_cutoff: i32,

    /// A signal not seen for longer than this is evicted.
    #[serde(with = "duration_ms")]
    pub staleness_window: Duration,

    /// Cadence of the signal cache sweep. Must be shorter than the staleness window.
    #[serde(with = "duration_ms")]
    pub sweep_interval: Duration,

    /// Cadence of the radio authorization poll.
    #[serde(with = "duration_ms")]
    pub authorization_poll_interval: Duration,

    /// Pause between teardown and restart during a forced refresh.
    #[serde(with = "duration_ms")]
    pub refresh_settle_delay: Duration,

    /// Radius used by the radar when re-querying after a location update.
    pub default_search_radius_meters: f64,

    /// Location reports older than this are ignored by radar queries.
    #[serde(with = "duration_ms")]
    pub location_max_age: Duration,

    /// Messages the initiator may send before the receiver accepts.
    pub pending_message_cap: usize,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            reference_rssi: -40,
            path_loss_exponent: 2.0,
            rssi_cutoff: -70,
            staleness_window: Duration::from_millis(5_000),
            sweep_interval: Duration::from_millis(1_000),
            authorization_poll_interval: Duration::from_millis(2_000),
            refresh_settle_delay: Duration::from_millis(500),
            default_search_radius_meters: 1_000.0,
            location_max_age: Duration::from_secs(24 * 60 * 60),
            pending_message_cap: 2,
        }
    }
}

impl ProximityConfig {
    /// Parses a configuration from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the result fails
    /// [`validate`](Self::validate).
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes this configuration to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Checks the invariants the scanner relies on.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first violated rule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sweep_interval.is_zero()
            || self.staleness_window.is_zero()
            || self.authorization_poll_interval.is_zero()
        {
            return Err(ConfigError::Invalid(
                "intervals must be non-zero".to_string(),
            ));
        }
        // Bounded removal latency: worst case is window + one sweep.
        if self.sweep_interval >= self.staleness_window {
            return Err(ConfigError::Invalid(format!(
                "sweep interval ({} ms) must be shorter than staleness window ({} ms)",
                self.sweep_interval.as_millis(),
                self.staleness_window.as_millis()
            )));
        }
        if !(self.path_loss_exponent.is_finite() && self.path_loss_exponent > 0.0) {
            return Err(ConfigError::Invalid(
                "path loss exponent must be positive".to_string(),
            ));
        }
        if !(self.default_search_radius_meters.is_finite()
            && self.default_search_radius_meters > 0.0)
        {
            return Err(ConfigError::Invalid(
                "default search radius must be positive".to_string(),
            ));
        }
        if self.pending_message_cap == 0 {
            return Err(ConfigError::Invalid(
                "pending message cap must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Sets the staleness window.
    #[must_use]
    pub const fn with_staleness_window(mut self, window: Duration) -> Self {
        self.staleness_window = window;
        self
    }

    /// Sets the sweep interval.
    #[must_use]
    pub const fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Sets the authorization poll interval.
    #[must_use]
    pub const fn with_authorization_poll_interval(mut self, interval: Duration) -> Self {
        self.authorization_poll_interval = interval;
        self
    }

    /// Sets the forced-refresh settle delay.
    #[must_use]
    pub const fn with_refresh_settle_delay(mut self, delay: Duration) -> Self {
        self.refresh_settle_delay = delay;
        self
    }

    /// Sets the default radar search radius.
    #[must_use]
    pub const fn with_default_search_radius(mut self, meters: f64) -> Self {
        self.default_search_radius_meters = meters;
        self
    }

    /// Sets the maximum age of location reports considered by the radar.
    #[must_use]
    pub const fn with_location_max_age(mut self, max_age: Duration) -> Self {
        self.location_max_age = max_age;
        self
    }

    /// Sets the pending message cap.
    #[must_use]
    pub const fn with_pending_message_cap(mut self, cap: usize) -> Self {
        self.pending_message_cap = cap;
        self
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::cast_possible_truncation)]
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cutoff_is_about_32_meters() {
        let config = ProximityConfig::default();
        let model = crate::radio::distance::DistanceModel::from_config(&config);
        assert_eq!(model.distance(config.rssi_cutoff), 32);
    }

    #[test]
    fn default_values() {
        let config = ProximityConfig::default();

        assert_eq!(config.reference_rssi, -40);
        assert!((config.path_loss_exponent - 2.0).abs() < f64::EPSILON);
        assert_eq!(config.rssi_cutoff, -70);
        assert_eq!(config.staleness_window, Duration::from_millis(5_000));
        assert_eq!(config.sweep_interval, Duration::from_millis(1_000));
        assert_eq!(
            config.authorization_poll_interval,
            Duration::from_millis(2_000)
        );
        assert_eq!(config.pending_message_cap, 2);
    }

    #[test]
    fn default_is_valid() {
        assert!(ProximityConfig::default().validate().is_ok());
    }

    #[test]
    fn sweep_must_be_shorter_than_window() {
        let config = ProximityConfig::default()
            .with_sweep_interval(Duration::from_millis(5_000))
            .with_staleness_window(Duration::from_millis(5_000));

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sweep interval"));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let config = ProximityConfig::default().with_authorization_poll_interval(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_cap_is_rejected() {
        let config = ProximityConfig::default().with_pending_message_cap(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn from_json_fills_missing_fields_with_defaults() {
        let config = ProximityConfig::from_json(r#"{"staleness_window": 8000}"#).unwrap();

        assert_eq!(config.staleness_window, Duration::from_millis(8_000));
        assert_eq!(config.sweep_interval, Duration::from_millis(1_000));
        assert_eq!(config.rssi_cutoff, -70);
    }

    #[test]
    fn from_json_validates() {
        let result = ProximityConfig::from_json(r#"{"sweep_interval": 9000}"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn from_json_rejects_malformed_input() {
        let result = ProximityConfig::from_json("{not json");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn durations_serialize_as_milliseconds() {
        let json = ProximityConfig::default().to_json().unwrap();
        assert!(json.contains("\"staleness_window\":5000"));
        assert!(json.contains("\"sweep_interval\":1000"));
    }
}
