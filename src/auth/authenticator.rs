use std::sync::Arc;

use subtle::ConstantTimeEq;
use tracing::info;
use uuid::Uuid;

use super::store::TokenStore;
use super::token::SessionToken;
use super::AuthError;

/// The one external trust boundary of the session subsystem.
///
/// Holds the server-wide preshared key, handed in at construction from the
/// startup configuration. Validates the bootstrap handshake and resolves
/// session keys presented on ordinary requests. Failed bootstrap attempts
/// are not rate-limited or locked out.
pub struct Authenticator {
    psk: String,
    store: TokenStore,
}

impl Authenticator {
    pub fn new<S: Into<String>>(psk: S, store: TokenStore) -> Self {
        Self { psk: psk.into(), store }
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Validate the bootstrap PSK and mint a session on success.
    ///
    /// Equal-length comparison is constant-time; a length mismatch is decided
    /// without inspecting content. The caller learns only pass/fail: "wrong
    /// key" and "malformed key" are indistinguishable, and nothing is minted
    /// on failure.
    pub fn bootstrap(
        &self,
        presented: &str,
        client_addr: &str,
        user: Option<Uuid>,
    ) -> Result<Arc<SessionToken>, AuthError> {
        if !psk_matches(self.psk.as_bytes(), presented.as_bytes()) {
            info!(client_addr, "bootstrap rejected");
            return Err(AuthError::Failure);
        }
        Ok(self.store.mint(client_addr, user))
    }

    /// Resolve a presented session key to a live token, extending its
    /// liveness window. Unknown and expired keys fail identically.
    pub fn authenticate(&self, session_key: &str) -> Result<Arc<SessionToken>, AuthError> {
        self.store.resolve(session_key).ok_or(AuthError::Failure)
    }
}

fn psk_matches(expected: &[u8], presented: &[u8]) -> bool {
    if expected.len() != presented.len() {
        return false;
    }
    expected.ct_eq(presented).unwrap_u8() == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authenticator() -> Authenticator {
        Authenticator::new("the-configured-psk", TokenStore::default())
    }

    #[test]
    fn matching_psk_mints_a_session() {
        let auth = authenticator();
        let token = auth.bootstrap("the-configured-psk", "1.2.3.4", None).unwrap();
        assert_eq!(auth.store().len(), 1);
        assert_eq!(token.client_addr(), "1.2.3.4");
        assert!(!token.has_client_perms());
    }

    #[test]
    fn mismatched_psk_mints_nothing() {
        let auth = authenticator();
        for bad in ["", "wrong", "the-configured-psk-", "THE-CONFIGURED-PSK"] {
            assert_eq!(auth.bootstrap(bad, "1.2.3.4", None).unwrap_err(), AuthError::Failure);
        }
        assert!(auth.store().is_empty(), "no token may be minted on a failed handshake");
    }

    #[test]
    fn bootstrap_can_attach_an_account() {
        let auth = authenticator();
        let user = Uuid::new_v4();
        let token = auth.bootstrap("the-configured-psk", "1.2.3.4", Some(user)).unwrap();
        assert_eq!(token.user(), Some(user));
        assert!(token.has_client_perms());
    }

    #[test]
    fn authenticate_resolves_minted_keys() {
        let auth = authenticator();
        let minted = auth.bootstrap("the-configured-psk", "1.2.3.4", None).unwrap();
        let resolved = auth.authenticate(minted.session_key()).unwrap();
        assert_eq!(resolved.session_key(), minted.session_key());
    }

    #[test]
    fn authenticate_rejects_unknown_keys() {
        let auth = authenticator();
        assert_eq!(auth.authenticate("no-such-key").unwrap_err(), AuthError::Failure);
    }
}
