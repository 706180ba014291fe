//! Identities, sessions and radio-name resolution.
//!
//! # Types
//!
//! - [`Identity`]: a registered identity with its public handle
//! - [`Session`]: the caller's authentication state
//! - [`IdentityStore`]: narrow interface to the external identity store
//! - [`IdentityMatcher`]: resolves advertised radio names to identities

mod matcher;
mod storage;
pub mod types;

pub use matcher::{IdentityMatcher, MatchOutcome, Verification};
pub use storage::{IdentityStorage, IdentityStore};
pub use types::{Identity, Session, SessionIdentity, Unauthenticated};
