//! Short-range radio proximity.
//!
//! Turns raw radio advertisements into a live list of nearby identities:
//!
//! 1. [`RadioLayer`] delivers advertisements (platform supplied).
//! 2. [`SignalCache`](cache::SignalCache) keeps the latest sighting per device
//!    and evicts devices not seen within the staleness window.
//! 3. [`distance`] converts signal strength to an approximate range and
//!    drops signals beyond the cutoff.
//! 4. [`IdentityMatcher`](crate::identity::IdentityMatcher) resolves
//!    advertised names to known identities.
//! 5. [`ProximityScanner`] runs the session and publishes
//!    [`ResolvedCandidate`]s, nearest first.

pub mod cache;
pub mod distance;
mod error;
mod layer;
mod scanner;
pub mod types;

pub use error::{ScannerError, ScannerResult};
pub use layer::{AdvertisementCallback, RadioLayer};
pub use scanner::ProximityScanner;
pub use types::{
    Advertisement, DiscoveredSignal, RadioUnavailable, ResolvedCandidate, ScannerState,
};
