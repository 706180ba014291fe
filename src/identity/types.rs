//! Identity and session types.

use thiserror::Error;

use crate::ids::{DeviceKey, IdentityId};

/// A registered identity as known to the identity store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Store key.
    pub id: IdentityId,
    /// Public handle, advertised as the radio name.
    pub handle: String,
    /// Whether a nearby radio sighting has confirmed this identity.
    pub proximity_verified: bool,
    /// Device key recorded as verification evidence, if any.
    pub verified_device: Option<DeviceKey>,
}

impl Identity {
    /// Creates an unverified identity.
    #[must_use]
    pub fn new(id: impl Into<IdentityId>, handle: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            handle: handle.into(),
            proximity_verified: false,
            verified_device: None,
        }
    }

    /// Case-insensitive exact comparison against an advertised radio name.
    #[must_use]
    pub fn handle_matches(&self, advertised_name: &str) -> bool {
        self.handle.to_lowercase() == advertised_name.to_lowercase()
    }
}

/// Returned when an operation requires a logged-in identity.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Not authenticated")]
pub struct Unauthenticated;

/// The logged-in identity behind a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    /// The local identity.
    pub id: IdentityId,
    /// The local identity's public handle.
    pub handle: String,
}

/// The caller's authentication state.
///
/// None of the scanner, radar or conversation operations run anonymously;
/// each calls [`Session::require`] on entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    current: Option<SessionIdentity>,
}

impl Session {
    /// A session with no logged-in identity.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self { current: None }
    }

    /// A session for the given identity.
    #[must_use]
    pub fn authenticated(id: impl Into<IdentityId>, handle: impl Into<String>) -> Self {
        Self {
            current: Some(SessionIdentity {
                id: id.into(),
                handle: handle.into(),
            }),
        }
    }

    /// Returns whether an identity is logged in.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.current.is_some()
    }

    /// Returns the logged-in identity or fails fast.
    ///
    /// # Errors
    ///
    /// Returns [`Unauthenticated`] for an anonymous session.
    pub const fn require(&self) -> Result<&SessionIdentity, Unauthenticated> {
        match &self.current {
            Some(identity) => Ok(identity),
            None => Err(Unauthenticated),
        }
    }
}
