//! Proximity scanner session.
//!
//! The scanner owns one scan session at a time. A session consists of:
//!
//! ```text
//! ProximityScanner
//!     ├── session actor   (Signal Cache + IdentityMatcher, sweep timer)
//!     └── authorization poller
//! ```
//!
//! Both tasks hang off a single [`CancellationToken`]. Radio callbacks only
//! enqueue advertisements onto the actor's channel, so cache mutation,
//! sweeping and teardown are serialized in one task. [`ProximityScanner::stop`]
//! returns only after both tasks have exited.
//!
//! Identity lookups and verification writes are synchronous store calls. On
//! a multi-threaded runtime the actor makes them inside
//! [`tokio::task::block_in_place`] so a slow store does not stall other
//! tasks on the same worker.
//!
//! # States
//!
//! | From | To | Trigger |
//! |------|----|---------|
//! | Idle / Stopped | Initializing | [`start`](ProximityScanner::start) |
//! | Initializing | Scanning | radio available and authorized |
//! | Initializing | Idle | radio unavailable or not authorized |
//! | Scanning | Stopped | [`stop`](ProximityScanner::stop), background, revocation |

use std::sync::Arc;

use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::cache::SignalCache;
use super::distance::DistanceModel;
use super::error::{ScannerError, ScannerResult};
use super::layer::{AdvertisementCallback, RadioLayer};
use super::types::{Advertisement, RadioUnavailable, ResolvedCandidate, ScannerState};
use crate::config::ProximityConfig;
use crate::identity::{IdentityMatcher, IdentityStore, MatchOutcome, Session};

/// Radio-based proximity scanner.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use nearby_core::radio::ProximityScanner;
///
/// let scanner = ProximityScanner::new(radio, identities, config);
/// scanner.start(&session).await?;
///
/// let mut candidates = scanner.subscribe_candidates();
/// while candidates.changed().await.is_ok() {
///     println!("{:?}", *candidates.borrow());
/// }
///
/// scanner.stop().await;
/// ```
pub struct ProximityScanner {
    shared: Arc<Shared>,
    session: Mutex<Option<ScanSession>>,
}

struct Shared {
    radio: Arc<dyn RadioLayer>,
    identities: Arc<dyn IdentityStore>,
    config: ProximityConfig,
    state: watch::Sender<ScannerState>,
    candidates: watch::Sender<Vec<ResolvedCandidate>>,
    authorization: watch::Sender<Option<bool>>,
}

struct ScanSession {
    token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl Shared {
    fn set_state(&self, state: ScannerState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!(from = previous.as_str(), to = state.as_str(), "Scanner state changed");
        }
    }

    /// Records the observed authorization. Returns `true` only on a change.
    fn report_authorization(&self, authorized: bool) -> bool {
        self.authorization.send_if_modified(|current| {
            if *current == Some(authorized) {
                false
            } else {
                *current = Some(authorized);
                true
            }
        })
    }

    fn publish(&self, candidates: Vec<ResolvedCandidate>) {
        self.candidates.send_if_modified(|current| {
            if *current == candidates {
                false
            } else {
                *current = candidates;
                true
            }
        });
    }

    fn halt_radio(&self) {
        self.radio.stop_scan();
        self.radio.stop_advertise();
    }
}

impl ProximityScanner {
    /// Creates an idle scanner.
    #[must_use]
    pub fn new(
        radio: Arc<dyn RadioLayer>,
        identities: Arc<dyn IdentityStore>,
        config: ProximityConfig,
    ) -> Self {
        let (state, _) = watch::channel(ScannerState::Idle);
        let (candidates, _) = watch::channel(Vec::new());
        let (authorization, _) = watch::channel(None);

        Self {
            shared: Arc::new(Shared {
                radio,
                identities,
                config,
                state,
                candidates,
                authorization,
            }),
            session: Mutex::new(None),
        }
    }

    /// Starts scanning and advertising for the session's identity.
    ///
    /// Starting an already running scanner is a no-op.
    ///
    /// # Errors
    ///
    /// - [`ScannerError::Unauthenticated`] for an anonymous session
    /// - [`ScannerError::Unavailable`] if the radio is missing, powered off,
    ///   not authorized, or refuses to scan. The scanner returns to `Idle`
    ///   and does not retry.
    pub async fn start(&self, session: &Session) -> ScannerResult<()> {
        let local = session.require()?;
        let mut guard = self.session.lock().await;

        if !self.state().can_start() {
            return Ok(());
        }
        // A session ended by revocation still has tasks to reap.
        if let Some(ended) = guard.take() {
            join_tasks(ended.tasks).await;
        }

        let shared = &self.shared;
        shared.set_state(ScannerState::Initializing);

        if !shared.radio.is_available() {
            shared.set_state(ScannerState::Idle);
            warn!("Radio hardware unavailable");
            return Err(ScannerError::Unavailable(
                RadioUnavailable::HardwareUnavailable,
            ));
        }

        let authorized = shared.radio.is_authorized();
        shared.report_authorization(authorized);
        if !authorized {
            shared.set_state(ScannerState::Idle);
            warn!("Radio not authorized");
            return Err(ScannerError::Unavailable(RadioUnavailable::NotAuthorized));
        }

        let token = CancellationToken::new();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let actor = tokio::spawn(run_session_actor(
            Arc::clone(shared),
            events_rx,
            token.clone(),
        ));

        let on_device: AdvertisementCallback = Arc::new(move |advertisement| {
            // Closed only after the session ended; late callbacks are dropped.
            let _ = events_tx.send(advertisement);
        });

        if !shared.radio.start_scan(on_device) {
            token.cancel();
            join_tasks(vec![actor]).await;
            shared.set_state(ScannerState::Idle);
            warn!("Radio refused to start scanning");
            return Err(ScannerError::Unavailable(
                RadioUnavailable::HardwareUnavailable,
            ));
        }

        if !shared.radio.start_advertise(&local.handle) {
            warn!(handle = %local.handle, "Advertising unsupported; peers cannot resolve this device");
        }

        shared.set_state(ScannerState::Scanning);
        let poller = tokio::spawn(run_authorization_poll(Arc::clone(shared), token.clone()));

        *guard = Some(ScanSession {
            token,
            tasks: vec![actor, poller],
        });
        info!(identity = %local.id, "Proximity scanning started");

        Ok(())
    }

    /// Stops scanning and advertising and tears down the session.
    ///
    /// Returns after the session tasks have exited and the candidate list is
    /// cleared. Calling it again, or on a scanner that never started, is a
    /// no-op.
    pub async fn stop(&self) {
        let mut guard = self.session.lock().await;
        let Some(session) = guard.take() else {
            return;
        };

        self.shared.halt_radio();
        session.token.cancel();
        join_tasks(session.tasks).await;

        self.shared.publish(Vec::new());
        self.shared.set_state(ScannerState::Stopped);
        info!("Proximity scanning stopped");
    }

    /// Stops the scanner because the host application went to background.
    pub async fn on_background(&self) {
        self.stop().await;
    }

    /// Stops, clears every cached signal and candidate, waits for the radio
    /// to settle, then starts again.
    ///
    /// # Errors
    ///
    /// Same as [`start`](Self::start).
    pub async fn force_refresh(&self, session: &Session) -> ScannerResult<()> {
        session.require()?;
        info!("Forcing proximity scanner refresh");

        self.stop().await;
        tokio::time::sleep(self.shared.config.refresh_settle_delay).await;
        self.start(session).await
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ScannerState {
        *self.shared.state.borrow()
    }

    /// Subscribes to lifecycle changes.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<ScannerState> {
        self.shared.state.subscribe()
    }

    /// Current candidates, nearest first.
    #[must_use]
    pub fn candidates(&self) -> Vec<ResolvedCandidate> {
        self.shared.candidates.borrow().clone()
    }

    /// Subscribes to the live candidate list.
    #[must_use]
    pub fn subscribe_candidates(&self) -> watch::Receiver<Vec<ResolvedCandidate>> {
        self.shared.candidates.subscribe()
    }

    /// Last observed authorization, `None` before the first check.
    #[must_use]
    pub fn authorization(&self) -> Option<bool> {
        *self.shared.authorization.borrow()
    }

    /// Subscribes to authorization changes. Only actual changes are delivered.
    #[must_use]
    pub fn subscribe_authorization(&self) -> watch::Receiver<Option<bool>> {
        self.shared.authorization.subscribe()
    }

    /// Scanner configuration.
    #[must_use]
    pub fn config(&self) -> &ProximityConfig {
        &self.shared.config
    }
}

impl Drop for ProximityScanner {
    fn drop(&mut self) {
        // Cannot await here; cancelling is enough for the tasks to exit.
        if let Some(session) = self.session.get_mut().as_ref() {
            if !session.token.is_cancelled() {
                self.shared.halt_radio();
                session.token.cancel();
            }
        }
    }
}

async fn join_tasks(tasks: Vec<JoinHandle<()>>) {
    for task in tasks {
        if let Err(e) = task.await {
            warn!(error = %e, "Scanner task ended abnormally");
        }
    }
}

/// Applies one advertisement to the session state.
///
/// Returns `true` when the candidate list may have changed.
fn apply_advertisement(
    cache: &mut SignalCache,
    matcher: &mut IdentityMatcher,
    model: &DistanceModel,
    advertisement: &Advertisement,
) -> bool {
    let signal = cache.upsert(advertisement).clone();

    if !model.in_range(advertisement.rssi) {
        if let Some(dropped) = matcher.remove_device(&advertisement.device_key) {
            debug!(
                device = %dropped.device_key,
                rssi = advertisement.rssi,
                "Candidate moved out of range"
            );
            return true;
        }
        return false;
    }

    !matches!(
        matcher.observe(&signal),
        MatchOutcome::Unmatched | MatchOutcome::AlreadyResolved(_)
    )
}

/// Runs work that may block on the identity store.
fn run_store_work<R>(work: impl FnOnce() -> R) -> R {
    match Handle::try_current().map(|handle| handle.runtime_flavor()) {
        Ok(RuntimeFlavor::MultiThread) => tokio::task::block_in_place(work),
        _ => work(),
    }
}

async fn run_session_actor(
    shared: Arc<Shared>,
    mut events: mpsc::UnboundedReceiver<Advertisement>,
    token: CancellationToken,
) {
    let model = DistanceModel::from_config(&shared.config);
    let staleness_window = shared.config.staleness_window;
    let mut cache = SignalCache::new();
    let mut matcher = IdentityMatcher::new(Arc::clone(&shared.identities), model);

    let mut sweep = interval(shared.config.sweep_interval);
    sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            () = token.cancelled() => break,

            Some(advertisement) = events.recv() => {
                let changed = run_store_work(|| {
                    apply_advertisement(&mut cache, &mut matcher, &model, &advertisement)
                });
                if changed {
                    shared.publish(matcher.candidates());
                }
            }

            _ = sweep.tick() => {
                let evicted = cache.sweep(Instant::now(), staleness_window);
                if !evicted.is_empty() {
                    let removed = matcher.retain_cached(&cache);
                    debug!(signals = evicted.len(), candidates = removed, "Evicted stale signals");
                    if removed > 0 {
                        shared.publish(matcher.candidates());
                    }
                }
            }
        }
    }

    cache.clear();
    matcher.clear();
    shared.publish(Vec::new());
    debug!("Scan session actor exited");
}

async fn run_authorization_poll(shared: Arc<Shared>, token: CancellationToken) {
    let mut ticker = interval(shared.config.authorization_poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; authorization was just checked.
    ticker.tick().await;

    loop {
        tokio::select! {
            () = token.cancelled() => break,

            _ = ticker.tick() => {
                let authorized = shared.radio.is_authorized();
                if !shared.report_authorization(authorized) {
                    continue;
                }
                info!(authorized, "Radio authorization changed");
                if !authorized {
                    warn!("Radio authorization revoked; stopping scan");
                    shared.halt_radio();
                    shared.set_state(ScannerState::Stopped);
                    token.cancel();
                    shared.publish(Vec::new());
                    break;
                }
            }
        }
    }
}
