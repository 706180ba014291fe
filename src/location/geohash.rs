//! Geohash encoding and radius query planning.
//!
//! Locations are indexed by their geohash at [`INDEX_PRECISION`]. A radius
//! search is turned into a handful of prefix ranges over that index. The
//! ranges over-approximate the circle, so every hit must be re-checked
//! with [`haversine_distance`].
//!
//! # Precision Table
//!
//! | Precision | Cell size (approx.) |
//! |-----------|---------------------|
//! | 4         | 39 km × 19.5 km     |
//! | 5         | 4.9 km × 4.9 km     |
//! | 6         | 1.2 km × 0.61 km    |
//! | 7         | 153 m × 153 m       |
//! | 8         | 38 m × 19 m         |
//! | 10        | 1.2 m × 0.6 m       |

use std::collections::BTreeSet;
use std::f64::consts::PI;

use super::types::{GeoPoint, GeohashRange, LocationError, LocationResult};

/// Geohash length used for stored index keys.
pub const INDEX_PRECISION: usize = 10;

/// Mean earth radius used for distance calculations.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

const METERS_PER_DEGREE: f64 = 2.0 * PI * EARTH_RADIUS_METERS / 360.0;

/// Encodes a point as a geohash of the given length.
///
/// # Errors
///
/// Returns [`LocationError::InvalidCoordinates`] if the encoder rejects the
/// point (only possible for a zero or oversized precision).
///
/// # Examples
///
/// ```
/// use nearby_core::location::{encode, GeoPoint};
///
/// let point = GeoPoint::new(37.7749, -122.4194).unwrap();
/// let hash = encode(&point, 10).unwrap();
/// assert_eq!(hash.len(), 10);
/// assert!(hash.starts_with("9q8yy"));
/// ```
pub fn encode(point: &GeoPoint, precision: usize) -> LocationResult<String> {
    geohash::encode(
        geohash::Coord {
            x: point.longitude(),
            y: point.latitude(),
        },
        precision,
    )
    .map_err(|_| LocationError::InvalidCoordinates {
        latitude: point.latitude(),
        longitude: point.longitude(),
    })
}

/// Decodes a geohash to the center of its cell.
///
/// Returns `None` for empty or malformed input.
#[must_use]
pub fn decode(hash: &str) -> Option<GeoPoint> {
    let (coord, _, _) = geohash::decode(hash).ok()?;
    GeoPoint::new(coord.y, coord.x).ok()
}

/// Great-circle distance between two points, in meters.
///
/// # Examples
///
/// ```
/// use nearby_core::location::{haversine_distance, GeoPoint};
///
/// let a = GeoPoint::new(0.0, 0.0).unwrap();
/// let b = GeoPoint::new(0.0, 1.0).unwrap();
/// let d = haversine_distance(&a, &b);
/// assert!((d - 111_195.0).abs() < 1.0);
/// ```
#[must_use]
pub fn haversine_distance(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.latitude().to_radians();
    let lat2 = b.latitude().to_radians();
    let d_lat = (b.latitude() - a.latitude()).to_radians();
    let d_lon = (b.longitude() - a.longitude()).to_radians();

    let h = (lat1.cos() * lat2.cos())
        .mul_add((d_lon / 2.0).sin().powi(2), (d_lat / 2.0).sin().powi(2))
        .clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Plans the index ranges that cover a circle.
///
/// Takes the bounding box of the spherical cap around `center`, picks the
/// finest precision whose cell spans at least the box's half-width and
/// half-height, geohashes the center plus the eight corner and edge points
/// of the box at that precision, and returns one range per distinct prefix.
/// Falls back to a single full range when no precision is coarse enough or
/// the cap reaches a pole.
#[must_use]
pub fn query_bounds(center: &GeoPoint, radius_meters: f64) -> Vec<GeohashRange> {
    let radius = radius_meters.max(0.0);
    let lat_delta = radius / METERS_PER_DEGREE;
    let Some(lon_delta) = longitude_reach_degrees(radius, center.latitude()) else {
        return vec![GeohashRange::full()];
    };

    let Some(precision) = (1..=INDEX_PRECISION)
        .rev()
        .find(|&p| cell_width_degrees(p) >= lon_delta && cell_height_degrees(p) >= lat_delta)
    else {
        return vec![GeohashRange::full()];
    };

    let mut prefixes = BTreeSet::new();
    for lat_step in [-1.0_f64, 0.0, 1.0] {
        for lon_step in [-1.0_f64, 0.0, 1.0] {
            let latitude = lat_step.mul_add(lat_delta, center.latitude()).clamp(-90.0, 90.0);
            let longitude = wrap_longitude(lon_step.mul_add(lon_delta, center.longitude()));

            let Ok(hash) = GeoPoint::new(latitude, longitude).and_then(|p| encode(&p, precision))
            else {
                return vec![GeohashRange::full()];
            };
            prefixes.insert(hash);
        }
    }

    prefixes
        .iter()
        .map(|prefix| GeohashRange::for_prefix(prefix))
        .collect()
}

/// Widest longitude offset reached by a cap of `meters` around `latitude`.
///
/// The reach is `asin(sin d / cos lat)`, wider than the offset at the
/// center's own latitude. Returns `None` when the cap contains a pole and
/// so spans every longitude.
fn longitude_reach_degrees(meters: f64, latitude: f64) -> Option<f64> {
    let angular = meters / EARTH_RADIUS_METERS;
    if !angular.is_finite() || latitude.abs() + angular.to_degrees() >= 90.0 {
        return None;
    }
    let ratio = angular.sin() / latitude.to_radians().cos();
    if ratio >= 1.0 {
        return None;
    }
    Some(ratio.asin().to_degrees())
}

fn wrap_longitude(longitude: f64) -> f64 {
    if (-180.0..=180.0).contains(&longitude) {
        return longitude;
    }
    let wrapped = (longitude + 180.0).rem_euclid(360.0) - 180.0;
    wrapped.clamp(-180.0, 180.0)
}

// Geohash interleaves bits starting with longitude, so odd lengths give
// longitude one extra bit.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn cell_width_degrees(precision: usize) -> f64 {
    let bits = (precision * 5).div_ceil(2);
    360.0 / 2_f64.powi(bits as i32)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn cell_height_degrees(precision: usize) -> f64 {
    let bits = precision * 5 / 2;
    180.0 / 2_f64.powi(bits as i32)
}
