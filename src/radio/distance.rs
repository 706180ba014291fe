//! Signal strength to distance conversion.
//!
//! Log-distance path loss model:
//!
//! ```text
//! distance = round(10 ^ ((reference_rssi - rssi) / (10 * path_loss_exponent)))
//! ```
//!
//! This is an approximation. RSSI is noisy and depends on antennas, body
//! shadowing and the environment, so the result is a coarse ranking aid,
//! not a measurement. The constants and rounding are fixed so results are
//! reproducible across platforms.
//!
//! | RSSI (dBm) | Distance (m) |
//! |------------|--------------|
//! | -40        | 1            |
//! | -50        | 3            |
//! | -60        | 10           |
//! | -70        | 32           |

use crate::config::ProximityConfig;

/// Calibrated signal strength at one meter.
pub const REFERENCE_RSSI: i32 = -40;

/// Free-space path loss exponent.
pub const PATH_LOSS_EXPONENT: f64 = 2.0;

/// Sightings weaker than this are out of range.
pub const RSSI_CUTOFF: i32 = -70;

/// Estimates distance in meters using the default calibration.
///
/// # Examples
///
/// ```
/// use nearby_core::radio::distance::estimate_distance;
///
/// assert_eq!(estimate_distance(-40), 1);
/// assert_eq!(estimate_distance(-50), 3);
/// ```
#[must_use]
pub fn estimate_distance(rssi: i32) -> u32 {
    DistanceModel::default().distance(rssi)
}

/// Returns whether a sighting passes the default cutoff.
#[must_use]
pub const fn is_in_range(rssi: i32) -> bool {
    rssi >= RSSI_CUTOFF
}

/// Path loss calibration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceModel {
    /// Signal strength at one meter.
    pub reference_rssi: i32,
    /// Environmental exponent.
    pub path_loss_exponent: f64,
    /// Weakest accepted signal strength.
    pub cutoff: i32,
}

impl Default for DistanceModel {
    fn default() -> Self {
        Self {
            reference_rssi: REFERENCE_RSSI,
            path_loss_exponent: PATH_LOSS_EXPONENT,
            cutoff: RSSI_CUTOFF,
        }
    }
}

impl DistanceModel {
    /// Builds the model from configuration.
    #[must_use]
    pub const fn from_config(config: &ProximityConfig) -> Self {
        Self {
            reference_rssi: config.reference_rssi,
            path_loss_exponent: config.path_loss_exponent,
            cutoff: config.rssi_cutoff,
        }
    }

    /// Estimated distance in whole meters.
    ///
    /// Monotonically non-decreasing as `rssi` decreases. Saturates at
    /// `u32::MAX` for absurdly weak signals.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn distance(&self, rssi: i32) -> u32 {
        let exponent = (f64::from(self.reference_rssi) - f64::from(rssi))
            / (10.0 * self.path_loss_exponent);
        // Float-to-int `as` saturates and maps NaN to 0.
        10_f64.powf(exponent).round() as u32
    }

    /// Returns whether `rssi` is strong enough to be a candidate.
    #[must_use]
    pub const fn in_range(&self, rssi: i32) -> bool {
        rssi >= self.cutoff
    }
}
