//! Nearby Core Library
//!
//! Proximity discovery and conversation admission for Nearby.
//!
//! - [`radio`]: turns short-range radio advertisements into nearby identities
//! - [`location`]: geohash-indexed radius search over reported locations
//! - [`conversation`]: request/accept/decline with a pending message cap
//! - [`proximity`]: one interface over both discovery mechanisms

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![deny(unsafe_code)]

mod api;
pub mod config;
pub mod conversation;
pub mod identity;
pub mod ids;
pub mod location;
pub mod proximity;
pub mod radio;
pub mod store;

pub use api::{CoreError, NearbyCore};
pub use config::{ConfigError, ProximityConfig};
pub use identity::Session;
pub use proximity::{Candidate, CandidateOrigin, ProximitySource};
