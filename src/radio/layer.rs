//! Interface to the platform radio.

use std::sync::Arc;

use super::types::Advertisement;

/// Callback invoked by the radio layer for every advertisement it receives.
///
/// May be called from any thread. Implementations of the scanner only
/// enqueue the event; they never mutate shared state from the callback.
pub type AdvertisementCallback = Arc<dyn Fn(Advertisement) + Send + Sync>;

/// Platform short-range radio (scan + advertise).
///
/// Implemented by the host application around the platform BLE API.
/// Every method must be cheap and non-blocking.
pub trait RadioLayer: Send + Sync {
    /// Whether radio hardware is present and powered on.
    fn is_available(&self) -> bool;

    /// Whether the user currently grants radio permission.
    fn is_authorized(&self) -> bool;

    /// Starts continuous scanning. Returns `false` if the scan could not start.
    fn start_scan(&self, on_device: AdvertisementCallback) -> bool;

    /// Stops scanning. Must be idempotent.
    fn stop_scan(&self);

    /// Starts advertising `name`. Returns `false` where advertising is unsupported.
    fn start_advertise(&self, name: &str) -> bool;

    /// Stops advertising. Must be idempotent.
    fn stop_advertise(&self);
}
