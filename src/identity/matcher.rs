//! Resolution of advertised radio names to known identities.
//!
//! The matcher keeps the derived candidate list for one scan session. It
//! loads a snapshot of all known identities on first use and matches
//! advertised names against their handles (exact, case-insensitive).
//!
//! # Resolution Rules
//!
//! - A device that is already resolved is only refreshed, never re-matched.
//!   A coincidental name collision cannot overwrite a resolution.
//! - When two identities share a handle, the first in snapshot order wins.
//! - An identity already resolved through another device keeps its
//!   existing candidate.
//! - The first sighting of an unverified identity records the device key as
//!   verification evidence. The write is best-effort.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::storage::IdentityStore;
use super::types::Identity;
use crate::ids::{DeviceKey, IdentityId};
use crate::radio::cache::SignalCache;
use crate::radio::distance::DistanceModel;
use crate::radio::types::{DiscoveredSignal, ResolvedCandidate};

/// Outcome of the verification side effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// The device key was written as evidence.
    Recorded,
    /// The identity was already verified; nothing was written.
    AlreadyVerified,
    /// The write failed. The candidate is exposed regardless.
    Failed(String),
}

/// Result of observing one signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// The device was already resolved; its candidate was refreshed in place.
    Updated(ResolvedCandidate),
    /// A new candidate was created.
    Resolved {
        /// The new candidate.
        candidate: ResolvedCandidate,
        /// What happened to the verification write.
        verification: Verification,
    },
    /// The name matched an identity that is already resolved through another device.
    AlreadyResolved(IdentityId),
    /// No known identity carries the advertised name, or no name was advertised.
    Unmatched,
}

/// Per-session identity matcher and owner of the radio candidate list.
pub struct IdentityMatcher {
    store: Arc<dyn IdentityStore>,
    model: DistanceModel,
    snapshot: Option<Vec<Identity>>,
    candidates: Vec<ResolvedCandidate>,
}

impl IdentityMatcher {
    /// Creates a matcher with an empty candidate list and no snapshot.
    #[must_use]
    pub fn new(store: Arc<dyn IdentityStore>, model: DistanceModel) -> Self {
        Self {
            store,
            model,
            snapshot: None,
            candidates: Vec::new(),
        }
    }

    /// Observes an in-range signal.
    ///
    /// The caller applies the cutoff; this method assumes the signal is a
    /// valid candidate source.
    pub fn observe(&mut self, signal: &DiscoveredSignal) -> MatchOutcome {
        let distance = self.model.distance(signal.signal_strength);

        if let Some(existing) = self
            .candidates
            .iter_mut()
            .find(|c| c.device_key == signal.device_key)
        {
            existing.estimated_distance_meters = distance;
            existing.last_active_at = signal.last_seen_at;
            return MatchOutcome::Updated(existing.clone());
        }

        let Some(name) = signal.advertised_name.as_deref() else {
            return MatchOutcome::Unmatched;
        };

        let Some(identity) = self.lookup(name) else {
            debug!(device = %signal.device_key, name, "No identity for advertised name");
            return MatchOutcome::Unmatched;
        };

        if self.candidates.iter().any(|c| c.identity_id == identity.id) {
            debug!(
                device = %signal.device_key,
                identity = %identity.id,
                "Identity already resolved through another device"
            );
            return MatchOutcome::AlreadyResolved(identity.id);
        }

        let candidate = ResolvedCandidate {
            identity_id: identity.id.clone(),
            handle: identity.handle.clone(),
            device_key: signal.device_key.clone(),
            estimated_distance_meters: distance,
            last_active_at: signal.last_seen_at,
        };
        self.candidates.push(candidate.clone());
        info!(
            device = %signal.device_key,
            identity = %identity.id,
            distance_m = distance,
            "Resolved nearby identity"
        );

        let verification = self.verify(&identity, &signal.device_key);

        MatchOutcome::Resolved {
            candidate,
            verification,
        }
    }

    /// Drops the candidate resolved through `device_key`, if any.
    pub fn remove_device(&mut self, device_key: &DeviceKey) -> Option<ResolvedCandidate> {
        let index = self
            .candidates
            .iter()
            .position(|c| &c.device_key == device_key)?;
        Some(self.candidates.remove(index))
    }

    /// Drops every candidate whose device is no longer cached.
    ///
    /// Returns the number of candidates removed.
    pub fn retain_cached(&mut self, cache: &SignalCache) -> usize {
        let before = self.candidates.len();
        self.candidates.retain(|c| cache.contains(&c.device_key));
        before - self.candidates.len()
    }

    /// Current candidates, nearest first.
    #[must_use]
    pub fn candidates(&self) -> Vec<ResolvedCandidate> {
        let mut candidates = self.candidates.clone();
        candidates.sort_by(|a, b| {
            a.estimated_distance_meters
                .cmp(&b.estimated_distance_meters)
                .then_with(|| a.identity_id.cmp(&b.identity_id))
        });
        candidates
    }

    /// Drops every candidate and the identity snapshot.
    pub fn clear(&mut self) {
        self.candidates.clear();
        self.snapshot = None;
    }

    /// Finds the first identity whose handle equals `name`, loading the snapshot if needed.
    fn lookup(&mut self, name: &str) -> Option<Identity> {
        if self.snapshot.is_none() {
            match self.store.list_known_identities() {
                Ok(identities) => {
                    debug!(count = identities.len(), "Loaded identity snapshot");
                    self.snapshot = Some(identities);
                }
                Err(e) => {
                    // Retried on the next advertisement.
                    warn!(error = %e, "Failed to load identity snapshot");
                    return None;
                }
            }
        }

        self.snapshot
            .as_ref()?
            .iter()
            .find(|identity| identity.handle_matches(name))
            .cloned()
    }

    fn verify(&mut self, identity: &Identity, device_key: &DeviceKey) -> Verification {
        if identity.proximity_verified {
            return Verification::AlreadyVerified;
        }

        match self.store.mark_proximity_verified(&identity.id, device_key) {
            Ok(()) => {
                if let Some(cached) = self
                    .snapshot
                    .as_mut()
                    .and_then(|s| s.iter_mut().find(|i| i.id == identity.id))
                {
                    cached.proximity_verified = true;
                    cached.verified_device = Some(device_key.clone());
                }
                debug!(identity = %identity.id, device = %device_key, "Recorded proximity verification");
                Verification::Recorded
            }
            Err(e) => {
                warn!(identity = %identity.id, error = %e, "Failed to record proximity verification");
                Verification::Failed(e.to_string())
            }
        }
    }
}
