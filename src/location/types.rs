//! Location data types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::Unauthenticated;
use crate::ids::IdentityId;

/// Errors from location reporting and radar queries.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LocationError {
    /// No logged-in identity.
    #[error("Not authenticated")]
    Unauthenticated,

    /// Latitude or longitude out of range or not finite.
    #[error("Invalid coordinates: ({latitude}, {longitude})")]
    InvalidCoordinates {
        /// Rejected latitude.
        latitude: f64,
        /// Rejected longitude.
        longitude: f64,
    },

    /// The location could not be written.
    #[error("Location storage error: {0}")]
    Storage(String),
}

/// Result type alias for location operations.
pub type LocationResult<T> = std::result::Result<T, LocationError>;

impl From<Unauthenticated> for LocationError {
    fn from(_: Unauthenticated) -> Self {
        Self::Unauthenticated
    }
}

/// A validated latitude/longitude pair.
///
/// # Example
///
/// ```
/// use nearby_core::location::GeoPoint;
///
/// let point = GeoPoint::new(37.7749, -122.4194).unwrap();
/// assert_eq!(point.latitude(), 37.7749);
///
/// assert!(GeoPoint::new(91.0, 0.0).is_err());
/// assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPoint", into = "RawPoint")]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
}

#[derive(Serialize, Deserialize)]
struct RawPoint {
    latitude: f64,
    longitude: f64,
}

impl GeoPoint {
    /// Creates a point after range checks.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError::InvalidCoordinates`] if latitude is outside
    /// [-90, 90], longitude is outside [-180, 180], or either is not finite.
    pub fn new(latitude: f64, longitude: f64) -> LocationResult<Self> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);

        if !valid {
            return Err(LocationError::InvalidCoordinates {
                latitude,
                longitude,
            });
        }

        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl TryFrom<RawPoint> for GeoPoint {
    type Error = LocationError;

    fn try_from(raw: RawPoint) -> Result<Self, Self::Error> {
        Self::new(raw.latitude, raw.longitude)
    }
}

impl From<GeoPoint> for RawPoint {
    fn from(point: GeoPoint) -> Self {
        Self {
            latitude: point.latitude,
            longitude: point.longitude,
        }
    }
}

/// Last reported location of one identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    /// Identity the location belongs to.
    pub identity_id: IdentityId,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Geohash of the coordinates, used as the index key.
    pub geohash: String,
    /// When the location was written (Unix seconds).
    pub updated_at: i64,
}

impl LocationRecord {
    /// The stored coordinates as a point, or `None` if the row holds
    /// coordinates that no longer validate.
    #[must_use]
    pub fn point(&self) -> Option<GeoPoint> {
        GeoPoint::new(self.latitude, self.longitude).ok()
    }
}

/// An identity within the searched radius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoCandidate {
    /// The nearby identity.
    pub identity_id: IdentityId,
    /// Where the identity last reported itself.
    pub last_known_location: GeoPoint,
    /// Great-circle distance from the search center, rounded to meters.
    pub distance_meters: u32,
    /// The geohash prefix whose range produced this record.
    pub geohash_prefix: String,
}

/// An inclusive lexicographic range over geohash index keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GeohashRange {
    /// Lower bound (inclusive).
    pub start: String,
    /// Upper bound (inclusive).
    pub end: String,
}

impl GeohashRange {
    /// Every key that begins with `prefix`.
    ///
    /// `~` sorts after every geohash base32 character.
    #[must_use]
    pub fn for_prefix(prefix: &str) -> Self {
        Self {
            start: prefix.to_string(),
            end: format!("{prefix}~"),
        }
    }

    /// A range matching every key.
    #[must_use]
    pub fn full() -> Self {
        Self::for_prefix("")
    }

    /// The prefix this range covers.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.start
    }

    /// Whether `key` falls inside the range.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        key >= self.start.as_str() && key <= self.end.as_str()
    }
}
