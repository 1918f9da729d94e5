//! Session subsystem integration tests: the PSK handshake, the liveness
//! window, and the permission gate, exercised the way request handlers
//! drive them.

use std::sync::{Arc, Barrier};
use std::time::Duration;

use rostrum::auth::{Access, AuthError, Authenticator, Gate, TokenStore};
use uuid::Uuid;

const PSK: &str = "484dd6d1-9262-4975-a707-4238e08ed266";

fn authenticator_with_ttl(ttl: Duration) -> Authenticator {
    Authenticator::new(PSK, TokenStore::new(ttl))
}

#[test]
fn bootstrap_and_gate_for_an_anonymous_session() {
    let auth = authenticator_with_ttl(Duration::from_secs(900));
    let gate = Gate;

    let token = auth.bootstrap(PSK, "10.0.0.7", None).expect("handshake should succeed");
    assert_eq!(auth.store().len(), 1);
    assert_eq!(token.client_addr(), "10.0.0.7");

    // a bootstrap-only session holds no permissions at all
    assert_eq!(gate.require(&token, Access::Client).unwrap_err(), AuthError::Unauthorized);
    assert_eq!(gate.require(&token, Access::Admin).unwrap_err(), AuthError::Unauthorized);
}

#[test]
fn failed_handshake_leaves_the_store_untouched() {
    let auth = authenticator_with_ttl(Duration::from_secs(900));
    assert_eq!(auth.bootstrap("not-the-psk", "10.0.0.7", None).unwrap_err(), AuthError::Failure);
    assert_eq!(auth.bootstrap("", "10.0.0.7", None).unwrap_err(), AuthError::Failure);
    assert!(auth.store().is_empty(), "a failed handshake must not mint");
}

#[test]
fn authenticated_session_passes_the_gate_and_resolves_idempotently() {
    let auth = authenticator_with_ttl(Duration::from_secs(900));
    let gate = Gate;
    let account = Uuid::new_v4();

    let minted = auth.bootstrap(PSK, "10.0.0.7", Some(account)).unwrap();
    assert!(gate.require(&minted, Access::Client).is_ok());
    assert!(gate.require(&minted, Access::Admin).is_ok());

    // repeated resolution keeps returning the same logical session
    for _ in 0..5 {
        let resolved = auth.authenticate(minted.session_key()).expect("session should stay live");
        assert_eq!(resolved.session_key(), minted.session_key());
        assert_eq!(resolved.user(), Some(account));
    }
}

#[test]
fn expiry_is_lazy_and_sticky() {
    let auth = authenticator_with_ttl(Duration::from_millis(30));
    let key = auth.bootstrap(PSK, "10.0.0.7", None).unwrap().session_key().to_string();

    std::thread::sleep(Duration::from_millis(80));
    assert_eq!(auth.authenticate(&key).unwrap_err(), AuthError::Failure);
    assert_eq!(auth.store().len(), 0, "expired session must be evicted on lookup");
    // once gone, it stays gone
    assert_eq!(auth.authenticate(&key).unwrap_err(), AuthError::Failure);
}

#[test]
fn activity_keeps_extending_the_window() {
    let auth = authenticator_with_ttl(Duration::from_millis(80));
    let key = auth.bootstrap(PSK, "10.0.0.7", None).unwrap().session_key().to_string();

    for _ in 0..4 {
        std::thread::sleep(Duration::from_millis(40));
        assert!(auth.authenticate(&key).is_ok(), "an active session must not expire");
    }
}

#[test]
fn logout_eviction_is_immediate() {
    let auth = authenticator_with_ttl(Duration::from_secs(900));
    let key = auth.bootstrap(PSK, "10.0.0.7", None).unwrap().session_key().to_string();

    assert!(auth.store().evict(&key));
    assert_eq!(auth.authenticate(&key).unwrap_err(), AuthError::Failure);
    assert!(!auth.store().evict(&key), "double logout is a no-op");
}

#[test]
fn freshness_has_one_winner_across_resolving_threads() {
    const THREADS: usize = 8;
    const TRIALS: usize = 50;

    for _ in 0..TRIALS {
        let auth = Arc::new(authenticator_with_ttl(Duration::from_secs(900)));
        let key = auth.bootstrap(PSK, "10.0.0.7", None).unwrap().session_key().to_string();
        let gate = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let auth = Arc::clone(&auth);
                let gate = Arc::clone(&gate);
                let key = key.clone();
                std::thread::spawn(move || {
                    gate.wait();
                    auth.authenticate(&key).unwrap().check_freshness()
                })
            })
            .collect();

        let winners = handles.into_iter().map(|h| h.join().unwrap()).filter(|&won| won).count();
        assert_eq!(winners, 1, "exactly one request may observe a fresh session");
    }
}
