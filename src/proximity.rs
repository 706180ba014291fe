//! Common view over the two proximity mechanisms.
//!
//! Radio scanning and the geospatial radar both answer "who is near me".
//! [`ProximitySource`] lets a consumer treat them the same way.

use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::ids::{DeviceKey, IdentityId};
use crate::location::{GeoCandidate, GeoRadar};
use crate::radio::{ProximityScanner, ResolvedCandidate};

/// How a candidate was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CandidateOrigin {
    /// Heard over the short-range radio.
    Radio {
        /// The advertising device.
        device_key: DeviceKey,
    },
    /// Found through the location index.
    Geo {
        /// The index prefix that matched.
        geohash_prefix: String,
    },
}

/// An identity believed to be near the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// The nearby identity.
    pub identity_id: IdentityId,
    /// Approximate distance in meters.
    pub distance_meters: u32,
    /// Which mechanism produced the candidate.
    pub origin: CandidateOrigin,
}

impl From<&ResolvedCandidate> for Candidate {
    fn from(candidate: &ResolvedCandidate) -> Self {
        Self {
            identity_id: candidate.identity_id.clone(),
            distance_meters: candidate.estimated_distance_meters,
            origin: CandidateOrigin::Radio {
                device_key: candidate.device_key.clone(),
            },
        }
    }
}

impl From<&GeoCandidate> for Candidate {
    fn from(candidate: &GeoCandidate) -> Self {
        Self {
            identity_id: candidate.identity_id.clone(),
            distance_meters: candidate.distance_meters,
            origin: CandidateOrigin::Geo {
                geohash_prefix: candidate.geohash_prefix.clone(),
            },
        }
    }
}

/// A producer of nearby candidates, nearest first.
pub trait ProximitySource: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// The current candidate list.
    fn snapshot(&self) -> Vec<Candidate>;

    /// The current list, then every subsequent change.
    ///
    /// The stream ends when the source is dropped.
    fn candidate_stream(&self) -> BoxStream<'static, Vec<Candidate>>;
}

impl ProximitySource for ProximityScanner {
    fn name(&self) -> &'static str {
        "radio"
    }

    fn snapshot(&self) -> Vec<Candidate> {
        self.candidates().iter().map(Candidate::from).collect()
    }

    fn candidate_stream(&self) -> BoxStream<'static, Vec<Candidate>> {
        watch_stream(self.subscribe_candidates())
    }
}

impl ProximitySource for GeoRadar {
    fn name(&self) -> &'static str {
        "geo"
    }

    fn snapshot(&self) -> Vec<Candidate> {
        self.results().iter().map(Candidate::from).collect()
    }

    fn candidate_stream(&self) -> BoxStream<'static, Vec<Candidate>> {
        watch_stream(self.subscribe())
    }
}

fn watch_stream<T>(receiver: watch::Receiver<Vec<T>>) -> BoxStream<'static, Vec<Candidate>>
where
    T: Send + Sync + 'static,
    for<'a> Candidate: From<&'a T>,
{
    stream::unfold((receiver, true), |(mut receiver, first)| async move {
        if !first && receiver.changed().await.is_err() {
            return None;
        }
        let candidates = receiver
            .borrow_and_update()
            .iter()
            .map(Candidate::from)
            .collect::<Vec<_>>();
        Some((candidates, (receiver, false)))
    })
    .boxed()
}
