use std::time::Instant;

use sha2::{Digest, Sha256};

use super::DIFFICULTY_PREFIX;

/// How many candidates are tried between two deadline checks.
const DEADLINE_CHECK_INTERVAL: u64 = 4096;

/// Check whether `sha256("{last_proof}{proof}")` starts with the difficulty prefix.
pub fn valid_proof(last_proof: u64, proof: u64) -> bool {
    let mut hasher = Sha256::new();
    hasher.update(format!("{last_proof}{proof}").as_bytes());
    hex::encode(hasher.finalize()).starts_with(DIFFICULTY_PREFIX)
}

/// Linear search for the smallest proof `>= start` satisfying [`valid_proof`].
///
/// Returns `None` once `deadline` has passed. Without a deadline the search only
/// ends on a hit. Restartable: a caller that gave up can resume from the last
/// candidate it knows was rejected.
pub fn search(last_proof: u64, start: u64, deadline: Option<Instant>) -> Option<u64> {
    let mut proof = start;
    loop {
        if valid_proof(last_proof, proof) {
            return Some(proof);
        }
        proof = proof.wrapping_add(1);
        if let Some(deadline) = deadline {
            if proof % DEADLINE_CHECK_INTERVAL == 0 && Instant::now() >= deadline {
                return None;
            }
        }
    }
}

/// Smallest non-negative proof for `last_proof`. Blocks until found.
pub fn solve(last_proof: u64) -> u64 {
    search(last_proof, 0, None).expect("search without a deadline only returns on a hit")
}
