use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use primitives::{Address, Hash};
use primitive_types::U256;
use thiserror::Error;

/// secp256k1 / recovery errors (spec §3, §4.5: sender recovery feeds the
/// transaction pipeline's `invalid_sender` rejection).
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid secp256k1 secret key")]
    InvalidSecretKey,
    #[error("invalid secp256k1 signature (r, s out of range)")]
    InvalidSignature,
    #[error("invalid recovery id: must be 0 or 1")]
    InvalidRecoveryId,
    #[error("signature does not recover to a valid public key")]
    RecoveryFailed,
}

/// An ECDSA signature split into the `(recovery_id, r, s)` triplet
/// spec §3 requires transactions to carry, independent of how `v` folds
/// in the EIP-155 chain id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecoverableSignature {
    pub recovery_id: u8,
    pub r: U256,
    pub s: U256,
}

/// Sign a 32-byte digest with a secp256k1 secret key, producing a
/// deterministic (RFC 6979) low-S signature plus its recovery id.
pub fn sign(secret_key: &[u8; 32], digest: &Hash) -> Result<RecoverableSignature, CryptoError> {
    let signing_key = SigningKey::from_slice(secret_key).map_err(|_| CryptoError::InvalidSecretKey)?;
    let (sig, recid): (Signature, RecoveryId) = signing_key
        .sign_prehash_recoverable(&digest.0)
        .map_err(|_| CryptoError::InvalidSignature)?;
    let (r_bytes, s_bytes) = split_signature(&sig);
    Ok(RecoverableSignature {
        recovery_id: recid.to_byte(),
        r: U256::from_big_endian(&r_bytes),
        s: U256::from_big_endian(&s_bytes),
    })
}

/// Recover the 64-byte uncompressed public key (`x || y`, no `0x04`
/// prefix) that produced `signature` over `digest` (spec §4.5 step 1).
pub fn recover_public_key(
    digest: &Hash,
    signature: &RecoverableSignature,
) -> Result<[u8; 64], CryptoError> {
    let mut r_bytes = [0u8; 32];
    signature.r.to_big_endian(&mut r_bytes);
    let mut s_bytes = [0u8; 32];
    signature.s.to_big_endian(&mut s_bytes);

    let sig = Signature::from_scalars(r_bytes, s_bytes).map_err(|_| CryptoError::InvalidSignature)?;
    let recid = RecoveryId::from_byte(signature.recovery_id).ok_or(CryptoError::InvalidRecoveryId)?;

    let verifying_key = VerifyingKey::recover_from_prehash(&digest.0, &sig, recid)
        .map_err(|_| CryptoError::RecoveryFailed)?;

    let encoded = verifying_key.to_encoded_point(false);
    let full = encoded.as_bytes(); // 0x04 || x (32) || y (32)
    let mut out = [0u8; 64];
    out.copy_from_slice(&full[1..65]);
    Ok(out)
}

/// Derive an Ethereum address from a 64-byte uncompressed public key:
/// the low 160 bits of its Keccak-256 hash (spec §3).
#[must_use]
pub fn address_from_public_key(public_key: &[u8; 64]) -> Address {
    let hash = crate::keccak::keccak256(public_key);
    Address::from_slice(&hash.0[12..]).expect("slice is exactly 20 bytes")
}

/// Verify a non-recoverable signature against a known public key
/// (used by RLPx/discovery peer-identity checks, spec §4.8–4.9).
pub fn verify(
    public_key: &[u8; 64],
    digest: &Hash,
    signature: &RecoverableSignature,
) -> Result<(), CryptoError> {
    let recovered = recover_public_key(digest, signature)?;
    if &recovered == public_key {
        Ok(())
    } else {
        Err(CryptoError::InvalidSignature)
    }
}

/// Public key corresponding to `secret_key`, in the same 64-byte
/// uncompressed form as [`recover_public_key`].
pub fn public_key_from_secret(secret_key: &[u8; 32]) -> Result<[u8; 64], CryptoError> {
    let signing_key = SigningKey::from_slice(secret_key).map_err(|_| CryptoError::InvalidSecretKey)?;
    let verifying_key = signing_key.verifying_key();
    let encoded = verifying_key.to_encoded_point(false);
    let full = encoded.as_bytes();
    let mut out = [0u8; 64];
    out.copy_from_slice(&full[1..65]);
    Ok(out)
}

fn split_signature(sig: &Signature) -> ([u8; 32], [u8; 32]) {
    let bytes = sig.to_bytes();
    let mut r = [0u8; 32];
    let mut s = [0u8; 32];
    r.copy_from_slice(&bytes[..32]);
    s.copy_from_slice(&bytes[32..]);
    (r, s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_recover_yields_same_public_key() {
        let secret = [0x11u8; 32];
        let digest = Hash(crate::keccak::keccak256(b"hello world").0);
        let signature = sign(&secret, &digest).unwrap();
        let recovered = recover_public_key(&digest, &signature).unwrap();
        let expected = public_key_from_secret(&secret).unwrap();
        assert_eq!(recovered, expected);
    }

    #[test]
    fn address_is_low_160_bits_of_keccak_of_pubkey() {
        let secret = [0x22u8; 32];
        let pubkey = public_key_from_secret(&secret).unwrap();
        let address = address_from_public_key(&pubkey);
        let full_hash = crate::keccak::keccak256(&pubkey);
        assert_eq!(address.0, full_hash.0[12..]);
    }

    #[test]
    fn wrong_digest_fails_verify() {
        let secret = [0x33u8; 32];
        let digest = Hash(crate::keccak::keccak256(b"message one").0);
        let other = Hash(crate::keccak::keccak256(b"message two").0);
        let signature = sign(&secret, &digest).unwrap();
        let pubkey = public_key_from_secret(&secret).unwrap();
        assert!(verify(&pubkey, &other, &signature).is_err());
    }
}
