//! Geospatial radar.
//!
//! Identities report their absolute location; the radar answers "who is
//! within R meters of me" with a geohash-indexed range scan followed by an
//! exact haversine filter.
//!
//! # Example Usage
//!
//! ```
//! use nearby_core::location::{haversine_distance, query_bounds, GeoPoint};
//!
//! let here = GeoPoint::new(37.7749, -122.4194).unwrap();
//! let there = GeoPoint::new(37.7759, -122.4194).unwrap();
//!
//! // A 500 m search scans a few geohash prefixes...
//! let bounds = query_bounds(&here, 500.0);
//! assert!(!bounds.is_empty());
//!
//! // ...and every hit is re-checked against the true distance.
//! assert!(haversine_distance(&here, &there) < 500.0);
//! ```

pub mod geohash;
mod radar;
mod storage;
pub mod types;

pub use geohash::{decode, encode, haversine_distance, query_bounds};
pub use radar::GeoRadar;
pub use storage::{LocationStorage, LocationStore};
pub use types::{
    GeoCandidate, GeoPoint, GeohashRange, LocationError, LocationRecord, LocationResult,
};
