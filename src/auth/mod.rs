//! Session and token management: the PSK bootstrap handshake, the in-process
//! token registry, and the permission gate endpoint handlers consult before
//! any mutation. Keep the public surface thin and split implementation
//! across sub-modules.
//!
//! Sessions live only in memory for the lifetime of one server process;
//! clients re-establish them by presenting the PSK again after a restart.

mod authenticator;
mod gate;
mod store;
mod token;

pub use authenticator::Authenticator;
pub use gate::{Access, Gate};
pub use store::TokenStore;
pub use token::{SessionToken, SESSION_TTL};

use thiserror::Error;

/// Failures produced by the session subsystem. All three are terminal for
/// the current request and short-circuit before any document-store access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Credential missing, malformed, mismatched, or unresolvable. Callers
    /// deliberately cannot tell "wrong key" from "expired" from "never
    /// existed".
    #[error("invalid credentials")]
    Failure,
    /// Resolved identity lacks the permission level the operation requires.
    #[error("insufficient permissions")]
    Unauthorized,
    /// Authenticated caller does not own or control the targeted resource.
    #[error("access denied")]
    Forbidden,
}
