use primitives::Hash;
use sha3::{Digest, Keccak256};

/// Keccak-256 of `data` (spec §3 — the sole hash function used for
/// addresses, trie node references, and block/transaction hashing).
#[must_use]
pub fn keccak256(data: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    Hash(hasher.finalize().into())
}

/// Keccak-256 over the concatenation of several slices, without an
/// intermediate allocation — used by the RLPx frame MAC chain (spec
/// §4.8) and discovery packet hash (spec §4.9).
#[must_use]
pub fn keccak256_concat(parts: &[&[u8]]) -> Hash {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    Hash(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_matches_known_constant() {
        assert_eq!(keccak256(b""), primitives::EMPTY_CODE_HASH);
    }
}
