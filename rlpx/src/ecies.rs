//! ECIES (Elliptic Curve Integrated Encryption Scheme) over secp256k1,
//! used to encrypt the auth/ack handshake messages to the peer's static
//! public key (spec §4.8). Each message carries its own ephemeral key,
//! so the scheme needs no prior shared state beyond knowing the
//! recipient's static public key.

use crate::error::RlpxError;
use aes::cipher::{KeyIvInit, StreamCipher};
use crypto::{ecdh_x, public_key_from_sec1, public_key_to_sec1};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type Aes128Ctr = ctr::Ctr64BE<aes::Aes128>;
type HmacSha256 = Hmac<Sha256>;

const IV_LEN: usize = 16;
const MAC_LEN: usize = 32;
const PUBKEY_SEC1_LEN: usize = 65;

/// Derive the AES and MAC keys shared between sender and recipient from
/// the raw ECDH secret, following the NIST concatenation KDF shape: a
/// single round of `Keccak256(counter || secret)` is enough here since
/// we only ever need one 32-byte block.
fn derive_keys(shared_secret: &[u8; 32]) -> ([u8; 16], [u8; 32]) {
    let material = crypto::keccak256_concat(&[&1u32.to_be_bytes(), shared_secret]);
    let mut enc_key = [0u8; 16];
    enc_key.copy_from_slice(&material.0[..16]);
    let mac_key = crypto::keccak256(&material.0[16..]).0;
    (enc_key, mac_key)
}

/// Encrypt `message` to `recipient_public_key`, authenticating
/// `shared_mac_data` (the auth/ack's own encoded bytes up to this
/// point) alongside it. Output layout: ephemeral pubkey (65) ‖ IV (16)
/// ‖ ciphertext ‖ MAC tag (32).
pub fn encrypt(message: &[u8], recipient_public_key: &[u8; 64], shared_mac_data: &[u8]) -> Vec<u8> {
    let ephemeral_secret: [u8; 32] = rand::random();
    let ephemeral_secret = normalize_scalar(ephemeral_secret);
    let ephemeral_public = crypto::public_key_from_secret(&ephemeral_secret)
        .expect("freshly generated scalar is a valid secret key");

    let shared = ecdh_x(&ephemeral_secret, recipient_public_key)
        .expect("ephemeral secret and recipient public key are both well-formed");
    let (enc_key, mac_key) = derive_keys(&shared);

    let iv: [u8; IV_LEN] = rand::random();
    let mut ciphertext = message.to_vec();
    let mut cipher = Aes128Ctr::new(&enc_key.into(), &iv.into());
    cipher.apply_keystream(&mut ciphertext);

    let mut mac = HmacSha256::new_from_slice(&mac_key).expect("HMAC accepts any key length");
    mac.update(&iv);
    mac.update(&ciphertext);
    mac.update(shared_mac_data);
    let tag = mac.finalize().into_bytes();

    let mut out = Vec::with_capacity(PUBKEY_SEC1_LEN + IV_LEN + ciphertext.len() + MAC_LEN);
    out.extend_from_slice(&public_key_to_sec1(&ephemeral_public));
    out.extend_from_slice(&iv);
    out.extend_from_slice(&ciphertext);
    out.extend_from_slice(&tag);
    out
}

/// Reverse of [`encrypt`], using our own static secret key to recover
/// the ephemeral shared secret.
pub fn decrypt(payload: &[u8], own_secret_key: &[u8; 32], shared_mac_data: &[u8]) -> Result<Vec<u8>, RlpxError> {
    if payload.len() < PUBKEY_SEC1_LEN + IV_LEN + MAC_LEN {
        return Err(RlpxError::EciesTooShort);
    }

    let (ephemeral_sec1, rest) = payload.split_at(PUBKEY_SEC1_LEN);
    let (iv_and_ciphertext, tag) = rest.split_at(rest.len() - MAC_LEN);
    let (iv, ciphertext) = iv_and_ciphertext.split_at(IV_LEN);

    let ephemeral_public = public_key_from_sec1(ephemeral_sec1)?;
    let shared = ecdh_x(own_secret_key, &ephemeral_public)?;
    let (enc_key, mac_key) = derive_keys(&shared);

    let mut mac = HmacSha256::new_from_slice(&mac_key).expect("HMAC accepts any key length");
    mac.update(iv);
    mac.update(ciphertext);
    mac.update(shared_mac_data);
    mac.verify_slice(tag).map_err(|_| RlpxError::EciesBadMac)?;

    let mut plaintext = ciphertext.to_vec();
    let iv: [u8; IV_LEN] = iv.try_into().expect("iv slice is exactly IV_LEN bytes");
    let mut cipher = Aes128Ctr::new(&enc_key.into(), &iv.into());
    cipher.apply_keystream(&mut plaintext);
    Ok(plaintext)
}

/// Reduce a random 32-byte draw into the secp256k1 scalar field by
/// retrying on the (astronomically unlikely) out-of-range draw.
fn normalize_scalar(mut bytes: [u8; 32]) -> [u8; 32] {
    while crypto::public_key_from_secret(&bytes).is_err() {
        bytes = rand::random();
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_then_decrypt_recovers_the_message() {
        let recipient_secret = [0x44u8; 32];
        let recipient_public = crypto::public_key_from_secret(&recipient_secret).unwrap();

        let message = b"auth message payload";
        let shared_mac_data = b"ecies-test";
        let ciphertext = encrypt(message, &recipient_public, shared_mac_data);
        let plaintext = decrypt(&ciphertext, &recipient_secret, shared_mac_data).unwrap();
        assert_eq!(plaintext, message);
    }

    #[test]
    fn tampered_ciphertext_fails_mac_check() {
        let recipient_secret = [0x55u8; 32];
        let recipient_public = crypto::public_key_from_secret(&recipient_secret).unwrap();
        let mut ciphertext = encrypt(b"hello", &recipient_public, b"");
        let last = ciphertext.len() - 1;
        ciphertext[last] ^= 0xff;
        assert!(matches!(decrypt(&ciphertext, &recipient_secret, b""), Err(RlpxError::EciesBadMac)));
    }
}
