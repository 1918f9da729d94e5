use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use uuid::Uuid;

/// Inactivity window after which a session is treated as expired.
pub const SESSION_TTL: Duration = Duration::from_secs(60 * 15);

/// One live session: immutable identity plus mutable liveness state.
///
/// Tokens are shared across request tasks behind an `Arc`, so every mutable
/// field is synchronized on its own. `session_key` and `client_addr` never
/// change after mint; the client address is recorded for the audit log and
/// does not restrict where the key may be used from.
#[derive(Debug)]
pub struct SessionToken {
    session_key: String,
    client_addr: String,
    user: RwLock<Option<Uuid>>,
    /// Epoch milliseconds of the most recent successful use. Only increases.
    last_access: AtomicI64,
    /// True from mint until the first freshness check.
    fresh: AtomicBool,
}

impl SessionToken {
    pub(crate) fn new(session_key: String, client_addr: String, user: Option<Uuid>) -> Self {
        Self {
            session_key,
            client_addr,
            user: RwLock::new(user),
            last_access: AtomicI64::new(now_millis()),
            fresh: AtomicBool::new(true),
        }
    }

    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    pub fn client_addr(&self) -> &str {
        &self.client_addr
    }

    pub fn user(&self) -> Option<Uuid> {
        *self.user.read()
    }

    pub fn set_user(&self, user: Option<Uuid>) {
        *self.user.write() = user;
    }

    /// True on the first call after mint, false on every call thereafter.
    /// The atomic swap makes this exactly-once even when two requests race
    /// on the same token.
    pub fn check_freshness(&self) -> bool {
        self.fresh.swap(false, Ordering::AcqRel)
    }

    /// Record a successful use. `fetch_max` keeps the timestamp monotonic
    /// when a slow task arrives with a stale clock reading.
    pub fn bump(&self) {
        self.last_access.fetch_max(now_millis(), Ordering::AcqRel);
    }

    /// Pure check: more than `ttl` elapsed between `now_ms` and the last use.
    pub fn has_expired(&self, now_ms: i64, ttl: Duration) -> bool {
        now_ms - self.last_access.load(Ordering::Acquire) > ttl.as_millis() as i64
    }

    pub fn last_access_millis(&self) -> i64 {
        self.last_access.load(Ordering::Acquire)
    }

    /// A session carries client permissions iff an account is attached.
    pub fn has_client_perms(&self) -> bool {
        self.user.read().is_some()
    }

    /// Every authenticated account is currently an administrator. The policy
    /// seam lives in [`crate::auth::Gate`]; this mirrors it at the token
    /// level for callers that only hold a token.
    pub fn has_admin_perms(&self) -> bool {
        self.has_client_perms()
    }
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
