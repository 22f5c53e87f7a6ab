//! Secret verification
//!
//! Compares a caller-supplied secret with a stored bcrypt hash. When the
//! principal does not exist the comparison still runs, against a dummy hash of
//! the same cost, so an unknown identifier costs as much as a wrong secret.

use crate::model::Principal;
use std::str::FromStr;
use tracing::warn;

/// bcrypt cost every stored hash must use
pub const HASH_COST: u32 = 10;

/// bcrypt (cost [`HASH_COST`]) of a throwaway value; only ever compared, never
/// matched against a real principal.
pub const DUMMY_HASH: &str = "$2b$10$i4cgq0C/xklpT03is3FX/eCUdbn1sQPQCjtufa0FOOUdXNRra3lhe";

/// Check that a stored hash is bcrypt at [`HASH_COST`]
///
/// A cheaper or dearer hash would make known identifiers distinguishable
/// from unknown ones by response time.
pub fn check_stored_hash(hash: &str) -> Result<(), String> {
    let parts = bcrypt::HashParts::from_str(hash).map_err(|e| e.to_string())?;
    match parts.get_cost() {
        HASH_COST => Ok(()),
        cost => Err(format!("bcrypt cost {} (expected {})", cost, HASH_COST)),
    }
}

/// Verify `supplied` against a stored hash, or against [`DUMMY_HASH`] when
/// no principal was found.
///
/// Returns `true` only when a hash was present and it matches.
pub fn verify_secret(stored: Option<&str>, supplied: &str) -> bool {
    let found = stored.is_some();
    let hash = stored.unwrap_or(DUMMY_HASH);

    let matched = match bcrypt::verify(supplied, hash) {
        Ok(matched) => matched,
        Err(e) => {
            if found {
                warn!(error = %e, "Stored credential hash could not be parsed");
                // Spend the same time as a real comparison
                let _ = bcrypt::verify(supplied, DUMMY_HASH);
            }
            false
        }
    };

    found && matched
}

/// Verify a looked-up principal (or its absence) and hand it back on success
///
/// Both credential flows go through here so that they share one timing-safe
/// path.
pub fn verify_principal<P: Principal>(found: Option<P>, supplied: &str) -> Option<P> {
    let matched = verify_secret(found.as_ref().map(|p| p.secret_hash()), supplied);
    if matched {
        found
    } else {
        None
    }
}
