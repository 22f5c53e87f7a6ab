//! Secret Verifier Tests
//!
//! The verifier must never say yes for a missing principal and must spend
//! the same bcrypt work whether or not the principal exists. The store only
//! admits hashes at the dummy hash's cost so that this holds.

use apigate::auth::secret::{verify_principal, verify_secret, DUMMY_HASH, HASH_COST};
use apigate::model::ServiceAccount;
use apigate::store::{MemoryStore, StoreError};
use std::time::{Duration, Instant};

/// bcrypt("s3cr3t"), cost 10, same cost as the dummy hash
const PRODUCTION_COST_HASH: &str = "$2b$10$CYQfOFIpaec8OXJWKFxQEeGTBjFF0MgvYPnrV3zsJUZ2HFElCRd9e";

fn account(hash: &str) -> ServiceAccount {
    ServiceAccount {
        id: 1,
        org_id: 7,
        identifier: "billing-sync".to_string(),
        client_id: "c1".to_string(),
        client_secret_hash: hash.to_string(),
        inactivated_at: None,
    }
}

#[test]
fn test_correct_secret_accepted() {
    assert!(verify_secret(Some(PRODUCTION_COST_HASH), "s3cr3t"));
}

#[test]
fn test_wrong_secret_rejected() {
    assert!(!verify_secret(Some(PRODUCTION_COST_HASH), "s3cr3t "));
    assert!(!verify_secret(Some(PRODUCTION_COST_HASH), ""));
}

#[test]
fn test_missing_principal_never_verifies() {
    for supplied in ["", "s3cr3t", "password", DUMMY_HASH] {
        assert!(!verify_secret(None, supplied), "accepted {:?}", supplied);
    }
}

#[test]
fn test_corrupt_stored_hash_rejected() {
    assert!(!verify_secret(Some("not-a-bcrypt-hash"), "s3cr3t"));
    assert!(!verify_secret(Some(""), ""));
}

#[test]
fn test_dummy_hash_matches_production_cost() {
    let cost: u32 = DUMMY_HASH
        .split('$')
        .nth(2)
        .and_then(|c| c.parse().ok())
        .unwrap();
    assert_eq!(cost, 10);
}

#[test]
fn test_verify_principal() {
    let found = verify_principal(Some(account(PRODUCTION_COST_HASH)), "s3cr3t");
    assert_eq!(found.map(|a| a.id), Some(1));

    let wrong = verify_principal(Some(account(PRODUCTION_COST_HASH)), "nope");
    assert!(wrong.is_none());

    let missing = verify_principal::<ServiceAccount>(None, "s3cr3t");
    assert!(missing.is_none());
}

fn average(runs: u32, f: impl Fn() -> bool) -> Duration {
    let started = Instant::now();
    for _ in 0..runs {
        std::hint::black_box(f());
    }
    started.elapsed() / runs
}

#[test]
fn test_unknown_principal_costs_a_full_comparison() {
    const RUNS: u32 = 5;

    // warm up
    verify_secret(Some(PRODUCTION_COST_HASH), "warmup");

    let known = average(RUNS, || verify_secret(Some(PRODUCTION_COST_HASH), "wrong"));
    let unknown = average(RUNS, || verify_secret(None, "wrong"));

    let ratio = unknown.as_secs_f64() / known.as_secs_f64();
    assert!(
        (0.33..3.0).contains(&ratio),
        "known = {:?}, unknown = {:?}",
        known,
        unknown
    );
}

#[test]
fn test_corrupt_stored_hash_costs_a_full_comparison() {
    const RUNS: u32 = 5;

    verify_secret(None, "warmup");

    let corrupt = average(RUNS, || verify_secret(Some("not-a-bcrypt-hash"), "wrong"));
    let unknown = average(RUNS, || verify_secret(None, "wrong"));

    let ratio = corrupt.as_secs_f64() / unknown.as_secs_f64();
    assert!(
        (0.33..3.0).contains(&ratio),
        "corrupt = {:?}, unknown = {:?}",
        corrupt,
        unknown
    );
}

#[test]
fn test_store_refuses_hashes_at_another_cost() {
    // bcrypt("s3cr3t") at cost 12, what `bcrypt::hash` produces by default
    let seed = r#"
service_accounts:
  - id: 1
    org_id: 7
    identifier: "billing-sync"
    client_id: "c1"
    client_secret_hash: "$2b$12$wlqjhCoBzBZSstXUcPcQ6uf/BVowX9zXxGmmAVpnfPJ9zfUfRmXA2"
"#;

    let result = MemoryStore::from_yaml_str(seed);

    assert!(matches!(result, Err(StoreError::InvalidHash { .. })));
}

#[test]
fn test_store_accepts_hashes_at_dummy_cost() {
    assert_eq!(HASH_COST, 10);

    let seed = format!(
        r#"
service_accounts:
  - id: 1
    org_id: 7
    identifier: "billing-sync"
    client_id: "c1"
    client_secret_hash: "{}"
"#,
        PRODUCTION_COST_HASH
    );

    assert!(MemoryStore::from_yaml_str(&seed).is_ok());
}
