use crate::ecdsa::CryptoError;
use k256::ecdh::diffie_hellman;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{PublicKey, SecretKey};

/// The x-coordinate of `secret_key * public_key` on secp256k1 — the
/// shared secret RLPx's ECIES layer and handshake key derivation both
/// build on (spec §4.8).
pub fn ecdh_x(secret_key: &[u8; 32], public_key: &[u8; 64]) -> Result<[u8; 32], CryptoError> {
    let secret = SecretKey::from_slice(secret_key).map_err(|_| CryptoError::InvalidSecretKey)?;

    let mut sec1 = [0u8; 65];
    sec1[0] = 0x04;
    sec1[1..].copy_from_slice(public_key);
    let public = PublicKey::from_sec1_bytes(&sec1).map_err(|_| CryptoError::RecoveryFailed)?;

    let shared = diffie_hellman(secret.to_nonzero_scalar(), public.as_affine());
    let mut out = [0u8; 32];
    out.copy_from_slice(&shared.raw_secret_bytes()[..32]);
    Ok(out)
}

/// Uncompressed 64-byte public key corresponding to a 65-byte SEC1
/// point (`0x04 || x || y`), as received on the wire.
pub fn public_key_from_sec1(sec1: &[u8]) -> Result<[u8; 64], CryptoError> {
    if sec1.len() != 65 || sec1[0] != 0x04 {
        return Err(CryptoError::RecoveryFailed);
    }
    let mut out = [0u8; 64];
    out.copy_from_slice(&sec1[1..]);
    Ok(out)
}

/// Encode a 64-byte uncompressed public key back to its 65-byte SEC1
/// form (`0x04 || x || y`) for wire transmission.
#[must_use]
pub fn public_key_to_sec1(public_key: &[u8; 64]) -> [u8; 65] {
    let mut out = [0u8; 65];
    out[0] = 0x04;
    out[1..].copy_from_slice(public_key);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecdsa::public_key_from_secret;

    #[test]
    fn ecdh_is_symmetric_between_two_keypairs() {
        let alice_secret = [0x11u8; 32];
        let bob_secret = [0x22u8; 32];
        let alice_public = public_key_from_secret(&alice_secret).unwrap();
        let bob_public = public_key_from_secret(&bob_secret).unwrap();

        let alice_shared = ecdh_x(&alice_secret, &bob_public).unwrap();
        let bob_shared = ecdh_x(&bob_secret, &alice_public).unwrap();
        assert_eq!(alice_shared, bob_shared);
    }

    #[test]
    fn sec1_roundtrip() {
        let secret = [0x33u8; 32];
        let public = public_key_from_secret(&secret).unwrap();
        let sec1 = public_key_to_sec1(&public);
        assert_eq!(public_key_from_sec1(&sec1).unwrap(), public);
    }
}
