use super::Block;
use super::pow::valid_proof;

/// Check linkage and proof-of-work of an arbitrary candidate chain.
///
/// Empty chains are invalid. The genesis block itself is not checked; every
/// following block must point at the hash of its predecessor and carry a proof
/// valid against the predecessor's proof.
pub fn is_valid_chain(chain: &[Block]) -> bool {
    if chain.is_empty() {
        return false;
    }

    chain.windows(2).all(|pair| {
        let (prev, cur) = (&pair[0], &pair[1]);
        cur.previous_hash == prev.hash() && valid_proof(prev.proof, cur.proof)
    })
}
