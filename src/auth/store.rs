use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use dashmap::{DashMap, Entry};
use tracing::debug;
use uuid::Uuid;

use super::token::{now_millis, SessionToken, SESSION_TTL};

/// Registry of live sessions keyed by session key.
///
/// The map supports concurrent insert/lookup/remove from arbitrarily many
/// request tasks without external locking; per-token mutable state is
/// synchronized inside [`SessionToken`]. Expired entries are dropped lazily
/// when next looked up; there is no background sweep.
pub struct TokenStore {
    tokens: DashMap<String, Arc<SessionToken>>,
    ttl: Duration,
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new(SESSION_TTL)
    }
}

impl TokenStore {
    pub fn new(ttl: Duration) -> Self {
        Self { tokens: DashMap::new(), ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Mint a new session for `client_addr`, optionally owned by `user`.
    ///
    /// A key collision is regenerated. With 256-bit keys that branch is
    /// unreachable in practice, but the entry API makes the check free.
    pub fn mint(&self, client_addr: &str, user: Option<Uuid>) -> Arc<SessionToken> {
        loop {
            let key = gen_session_key();
            match self.tokens.entry(key.clone()) {
                Entry::Occupied(_) => continue,
                Entry::Vacant(slot) => {
                    let token = Arc::new(SessionToken::new(key, client_addr.to_string(), user));
                    slot.insert(Arc::clone(&token));
                    debug!(client_addr, authenticated = user.is_some(), "session minted");
                    return token;
                }
            }
        }
    }

    /// Look up a session key, refreshing its liveness window on success.
    ///
    /// An expired entry is evicted and reported as absent; callers cannot
    /// tell "expired" from "never existed". Eviction re-checks expiry under
    /// the shard write lock, so a token that another task bumped between our
    /// read and the removal stays registered; the absent verdict for *this*
    /// call stands either way.
    pub fn resolve(&self, session_key: &str) -> Option<Arc<SessionToken>> {
        let now = now_millis();
        match self.tokens.get(session_key) {
            None => return None,
            Some(entry) => {
                if !entry.has_expired(now, self.ttl) {
                    entry.bump();
                    return Some(Arc::clone(entry.value()));
                }
            }
        }
        self.tokens.remove_if(session_key, |_, token| token.has_expired(now_millis(), self.ttl));
        debug!("expired session evicted");
        None
    }

    /// Unconditional removal, used for explicit logout.
    pub fn evict(&self, session_key: &str) -> bool {
        self.tokens.remove(session_key).is_some()
    }

    /// Number of registered sessions, including expired-but-unevicted ones.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// 256 bits of OS randomness, base64url without padding.
fn gen_session_key() -> String {
    let mut buf = [0u8; 32];
    let _ = getrandom::getrandom(&mut buf);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mint_registers_a_fresh_token() {
        let store = TokenStore::default();
        let token = store.mint("1.2.3.4", None);
        assert_eq!(store.len(), 1);
        assert_eq!(token.client_addr(), "1.2.3.4");
        assert!(token.check_freshness());
        assert!(!token.session_key().is_empty());
    }

    #[test]
    fn minted_keys_are_unique() {
        let store = TokenStore::default();
        let a = store.mint("1.2.3.4", None);
        let b = store.mint("1.2.3.4", None);
        assert_ne!(a.session_key(), b.session_key());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn resolve_returns_the_same_token_and_bumps() {
        let store = TokenStore::default();
        let minted = store.mint("1.2.3.4", None);
        let before = minted.last_access_millis();
        let resolved = store.resolve(minted.session_key()).expect("token should be live");
        assert!(Arc::ptr_eq(&minted, &resolved));
        assert!(resolved.last_access_millis() >= before);
        // repeated resolution keeps returning the same logical token
        let again = store.resolve(minted.session_key()).expect("still live");
        assert_eq!(again.session_key(), minted.session_key());
    }

    #[test]
    fn resolve_unknown_key_is_absent() {
        let store = TokenStore::default();
        assert!(store.resolve("no-such-key").is_none());
    }

    #[test]
    fn expired_token_is_lazily_evicted_and_stays_gone() {
        let store = TokenStore::new(Duration::from_millis(20));
        let token = store.mint("1.2.3.4", None);
        let key = token.session_key().to_string();
        std::thread::sleep(Duration::from_millis(60));
        assert!(store.resolve(&key).is_none(), "expired token must not resolve");
        assert_eq!(store.len(), 0, "expired token must be evicted on lookup");
        // expiry is sticky
        assert!(store.resolve(&key).is_none());
    }

    #[test]
    fn activity_inside_the_window_keeps_a_session_alive() {
        let store = TokenStore::new(Duration::from_millis(80));
        let key = store.mint("1.2.3.4", None).session_key().to_string();
        for _ in 0..4 {
            std::thread::sleep(Duration::from_millis(40));
            assert!(store.resolve(&key).is_some(), "bumped session should outlive its original window");
        }
        std::thread::sleep(Duration::from_millis(160));
        assert!(store.resolve(&key).is_none());
    }

    #[test]
    fn evict_removes_unconditionally() {
        let store = TokenStore::default();
        let key = store.mint("1.2.3.4", None).session_key().to_string();
        assert!(store.evict(&key));
        assert!(!store.evict(&key));
        assert!(store.resolve(&key).is_none());
        assert!(store.is_empty());
    }
}
