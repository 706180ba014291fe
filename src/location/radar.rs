//! Geohash-indexed radius search over reported locations.
//!
//! Queries are stateless: each call plans its index ranges, reads the
//! matching records and recomputes the exact distance for every hit. Writes
//! and queries may interleave freely; the last write for an identity wins.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::geohash::{encode, haversine_distance, query_bounds, INDEX_PRECISION};
use super::storage::LocationStore;
use super::types::{GeoCandidate, GeoPoint, LocationError, LocationResult};
use crate::config::ProximityConfig;
use crate::identity::Session;
use crate::ids::IdentityId;

/// Radius search over the location store.
///
/// # Example
///
/// ```rust,ignore
/// let radar = GeoRadar::new(store, ProximityConfig::default());
/// let here = GeoPoint::new(37.7749, -122.4194)?;
///
/// radar.update_location(&session, here)?;
/// for candidate in radar.nearby(&session, &here, 500.0)? {
///     println!("{} is {} m away", candidate.identity_id, candidate.distance_meters);
/// }
/// ```
pub struct GeoRadar {
    store: Arc<dyn LocationStore>,
    config: ProximityConfig,
    results: watch::Sender<Vec<GeoCandidate>>,
}

impl GeoRadar {
    /// Creates a radar over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn LocationStore>, config: ProximityConfig) -> Self {
        let (results, _) = watch::channel(Vec::new());
        Self {
            store,
            config,
            results,
        }
    }

    /// Finds identities within `radius_meters` of `center`, nearest first.
    ///
    /// The caller's own record and records older than the configured
    /// maximum age are skipped. A store failure yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError::Unauthenticated`] for an anonymous session.
    pub fn nearby(
        &self,
        session: &Session,
        center: &GeoPoint,
        radius_meters: f64,
    ) -> LocationResult<Vec<GeoCandidate>> {
        let local = session.require()?;
        Ok(self.search(&local.id, center, radius_meters))
    }

    /// Like [`nearby`](Self::nearby) with the configured default radius.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError::Unauthenticated`] for an anonymous session.
    pub fn nearby_default(
        &self,
        session: &Session,
        center: &GeoPoint,
    ) -> LocationResult<Vec<GeoCandidate>> {
        self.nearby(session, center, self.config.default_search_radius_meters)
    }

    /// Records the caller's location, then refreshes and publishes the
    /// results around it at the default radius.
    ///
    /// # Errors
    ///
    /// - [`LocationError::Unauthenticated`] for an anonymous session
    /// - [`LocationError::Storage`] if the write fails
    pub fn update_location(
        &self,
        session: &Session,
        point: GeoPoint,
    ) -> LocationResult<Vec<GeoCandidate>> {
        let local = session.require()?;
        let index_key = encode(&point, INDEX_PRECISION)?;

        self.store
            .write_location(&local.id, point.latitude(), point.longitude(), &index_key)
            .map_err(|e| LocationError::Storage(e.to_string()))?;
        debug!(identity = %local.id, geohash = %index_key, "Location updated");

        let results = self.search(&local.id, &point, self.config.default_search_radius_meters);
        self.results.send_replace(results.clone());

        Ok(results)
    }

    /// Results of the most recent location update.
    #[must_use]
    pub fn results(&self) -> Vec<GeoCandidate> {
        self.results.borrow().clone()
    }

    /// Subscribes to results published by [`update_location`](Self::update_location).
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<GeoCandidate>> {
        self.results.subscribe()
    }

    fn search(&self, self_id: &IdentityId, center: &GeoPoint, radius: f64) -> Vec<GeoCandidate> {
        if radius.is_nan() || radius < 0.0 {
            debug!(radius_m = radius, "Ignoring search with invalid radius");
            return Vec::new();
        }

        let bounds = query_bounds(center, radius);
        let max_age = i64::try_from(self.config.location_max_age.as_secs()).unwrap_or(i64::MAX);
        let oldest = Utc::now().timestamp().saturating_sub(max_age);

        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for range in &bounds {
            let records = match self.store.query_by_index_range(range) {
                Ok(records) => records,
                Err(e) => {
                    warn!(prefix = range.prefix(), error = %e, "Location query failed");
                    return Vec::new();
                }
            };

            for record in records {
                if &record.identity_id == self_id || record.updated_at < oldest {
                    continue;
                }
                if !seen.insert(record.identity_id.clone()) {
                    continue;
                }
                let Some(location) = record.point() else {
                    debug!(identity = %record.identity_id, "Skipping record with invalid coordinates");
                    continue;
                };

                let distance = haversine_distance(center, &location);
                if distance > radius {
                    continue;
                }

                candidates.push(GeoCandidate {
                    identity_id: record.identity_id,
                    last_known_location: location,
                    distance_meters: round_meters(distance),
                    geohash_prefix: range.prefix().to_string(),
                });
            }
        }

        candidates.sort_by(|a, b| {
            a.distance_meters
                .cmp(&b.distance_meters)
                .then_with(|| a.identity_id.cmp(&b.identity_id))
        });

        debug!(
            bounds = bounds.len(),
            found = candidates.len(),
            radius_m = radius,
            "Radar search complete"
        );
        candidates
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_meters(distance: f64) -> u32 {
    distance.round().clamp(0.0, f64::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::location::storage::LocationStorage;
    use crate::location::types::{GeohashRange, LocationRecord};
    use crate::store::{StoreError, StoreResult};

    fn point(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    fn session() -> Session {
        Session::authenticated("me", "me")
    }

    fn seed(storage: &LocationStorage, id: &str, p: GeoPoint) {
        let key = encode(&p, INDEX_PRECISION).unwrap();
        storage
            .write_location(&IdentityId::new(id), p.latitude(), p.longitude(), &key)
            .unwrap();
    }

    fn radar_with(storage: LocationStorage) -> (GeoRadar, Arc<LocationStorage>) {
        let storage = Arc::new(storage);
        let radar = GeoRadar::new(storage.clone(), ProximityConfig::default());
        (radar, storage)
    }

    #[test]
    fn finds_nearby_and_filters_distant() {
        let (radar, storage) = radar_with(LocationStorage::in_memory().unwrap());
        let center = point(37.7749, -122.4194);
        seed(&storage, "near", point(37.7759, -122.4194));
        seed(&storage, "far", point(37.8049, -122.4194));

        let results = radar.nearby(&session(), &center, 500.0).unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].identity_id, IdentityId::new("near"));
        assert_eq!(results[0].distance_meters, 111);
    }

    #[test]
    fn excludes_self() {
        let (radar, storage) = radar_with(LocationStorage::in_memory().unwrap());
        let center = point(10.0, 10.0);
        seed(&storage, "me", center);

        assert!(radar.nearby(&session(), &center, 100.0).unwrap().is_empty());
    }

    #[test]
    fn skips_stale_records() {
        let (radar, storage) = radar_with(LocationStorage::in_memory().unwrap());
        let center = point(10.0, 10.0);
        let key = encode(&center, INDEX_PRECISION).unwrap();
        let two_days_ago = Utc::now().timestamp() - 2 * 24 * 3600;
        storage
            .write_location_at(&IdentityId::new("old"), 10.0, 10.0, &key, two_days_ago)
            .unwrap();

        assert!(radar.nearby(&session(), &center, 100.0).unwrap().is_empty());
    }

    #[test]
    fn anonymous_session_is_rejected() {
        let (radar, _storage) = radar_with(LocationStorage::in_memory().unwrap());
        let result = radar.nearby(&Session::anonymous(), &point(0.0, 0.0), 100.0);
        assert_eq!(result, Err(LocationError::Unauthenticated));
    }

    #[test]
    fn update_location_writes_and_publishes() {
        let (radar, storage) = radar_with(LocationStorage::in_memory().unwrap());
        seed(&storage, "friend", point(0.0005, 0.0));
        let mut rx = radar.subscribe();

        let results = radar.update_location(&session(), point(0.0, 0.0)).unwrap();

        assert_eq!(results.len(), 1);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), results);
        assert_eq!(radar.results(), results);

        let stored = storage.query_by_index_range(&GeohashRange::full()).unwrap();
        let mine = stored
            .iter()
            .find(|r| r.identity_id == IdentityId::new("me"))
            .unwrap();
        assert_eq!(mine.geohash.len(), INDEX_PRECISION);
    }

    struct BrokenStore {
        writes: Mutex<usize>,
    }

    impl LocationStore for BrokenStore {
        fn write_location(&self, _: &IdentityId, _: f64, _: f64, _: &str) -> StoreResult<()> {
            *self.writes.lock().unwrap() += 1;
            Ok(())
        }

        fn query_by_index_range(&self, _: &GeohashRange) -> StoreResult<Vec<LocationRecord>> {
            Err(StoreError::Unavailable("offline".to_string()))
        }
    }

    #[test]
    fn store_failure_yields_empty_result() {
        let store = Arc::new(BrokenStore {
            writes: Mutex::new(0),
        });
        let radar = GeoRadar::new(
            store.clone(),
            ProximityConfig::default().with_location_max_age(Duration::from_secs(60)),
        );

        let results = radar.update_location(&session(), point(1.0, 1.0)).unwrap();

        assert!(results.is_empty());
        assert_eq!(*store.writes.lock().unwrap(), 1);
    }

    #[test]
    fn round_meters_saturates() {
        assert_eq!(round_meters(1.4), 1);
        assert_eq!(round_meters(1.5), 2);
        assert_eq!(round_meters(1e12), u32::MAX);
    }
}
