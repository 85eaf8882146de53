//! AuthMsgV4 / AckRespV4 exchange (spec §4.8 phase 1) and derivation of
//! the frame secrets both sides need to start phase 2.

use crate::ecies;
use crate::error::RlpxError;
use crypto::{ecdh_x, sign, CryptoError, RecoverableSignature};
use primitives::Hash;
use rlp::{decode_exact, encode, Item};

const PROTOCOL_VERSION: u64 = 4;

/// What a node needs to run either side of the handshake: its own
/// static identity and a fresh ephemeral keypair generated per
/// connection (spec §4.8: "generate ephemeral secp256k1 keypair").
pub struct LocalIdentity {
    pub static_secret_key: [u8; 32],
    pub static_public_key: [u8; 64],
    pub ephemeral_secret_key: [u8; 32],
    pub ephemeral_public_key: [u8; 64],
    pub nonce: [u8; 32],
}

impl LocalIdentity {
    pub fn generate(static_secret_key: [u8; 32]) -> Result<Self, CryptoError> {
        let static_public_key = crypto::public_key_from_secret(&static_secret_key)?;
        let ephemeral_secret_key = random_scalar();
        let ephemeral_public_key = crypto::public_key_from_secret(&ephemeral_secret_key)?;
        Ok(Self {
            static_secret_key,
            static_public_key,
            ephemeral_secret_key,
            ephemeral_public_key,
            nonce: rand::random(),
        })
    }
}

fn random_scalar() -> [u8; 32] {
    loop {
        let candidate: [u8; 32] = rand::random();
        if crypto::public_key_from_secret(&candidate).is_ok() {
            return candidate;
        }
    }
}

/// The plaintext body of AuthMsgV4 (spec §4.8): a signature over
/// `static-shared-secret XOR nonce`, the sender's static public key,
/// the sender's nonce, and the protocol version.
struct AuthBody {
    signature: RecoverableSignature,
    static_public_key: [u8; 64],
    nonce: [u8; 32],
    version: u64,
}

impl AuthBody {
    fn encode(&self) -> Vec<u8> {
        let mut sig_bytes = [0u8; 65];
        self.signature.r.to_big_endian(&mut sig_bytes[0..32]);
        self.signature.s.to_big_endian(&mut sig_bytes[32..64]);
        sig_bytes[64] = self.signature.recovery_id;

        encode(&Item::List(vec![
            Item::Bytes(sig_bytes.to_vec()),
            Item::Bytes(crypto::public_key_to_sec1(&self.static_public_key)[1..].to_vec()),
            Item::Bytes(self.nonce.to_vec()),
            Item::Bytes(encode_uint(self.version)),
        ]))
    }

    fn decode(bytes: &[u8]) -> Result<Self, RlpxError> {
        let items = decode_exact(bytes)?.into_list()?;
        let [sig, pubkey, nonce, version] = take4(items)?;

        let sig_bytes = sig.as_bytes()?;
        if sig_bytes.len() != 65 {
            return Err(RlpxError::MissingField("auth.signature"));
        }
        let signature = RecoverableSignature {
            r: primitive_types::U256::from_big_endian(&sig_bytes[0..32]),
            s: primitive_types::U256::from_big_endian(&sig_bytes[32..64]),
            recovery_id: sig_bytes[64],
        };

        let pubkey_bytes = pubkey.as_bytes()?;
        if pubkey_bytes.len() != 64 {
            return Err(RlpxError::MissingField("auth.static_public_key"));
        }
        let mut static_public_key = [0u8; 64];
        static_public_key.copy_from_slice(pubkey_bytes);

        let nonce_bytes = nonce.as_bytes()?;
        if nonce_bytes.len() != 32 {
            return Err(RlpxError::MissingField("auth.nonce"));
        }
        let mut nonce_out = [0u8; 32];
        nonce_out.copy_from_slice(nonce_bytes);

        let version_value = decode_uint(version.as_bytes()?);

        Ok(Self { signature, static_public_key, nonce: nonce_out, version: version_value })
    }
}

/// The plaintext body of AckRespV4 (spec §4.8): the responder's
/// ephemeral public key, its own nonce, and the protocol version.
pub struct AckBody {
    pub ephemeral_public_key: [u8; 64],
    pub nonce: [u8; 32],
    pub version: u64,
}

impl AckBody {
    fn encode(&self) -> Vec<u8> {
        encode(&Item::List(vec![
            Item::Bytes(crypto::public_key_to_sec1(&self.ephemeral_public_key)[1..].to_vec()),
            Item::Bytes(self.nonce.to_vec()),
            Item::Bytes(encode_uint(self.version)),
        ]))
    }

    fn decode(bytes: &[u8]) -> Result<Self, RlpxError> {
        let items = decode_exact(bytes)?.into_list()?;
        let [pubkey, nonce, version] = take3(items)?;

        let pubkey_bytes = pubkey.as_bytes()?;
        if pubkey_bytes.len() != 64 {
            return Err(RlpxError::MissingField("ack.ephemeral_public_key"));
        }
        let mut ephemeral_public_key = [0u8; 64];
        ephemeral_public_key.copy_from_slice(pubkey_bytes);

        let nonce_bytes = nonce.as_bytes()?;
        if nonce_bytes.len() != 32 {
            return Err(RlpxError::MissingField("ack.nonce"));
        }
        let mut nonce_out = [0u8; 32];
        nonce_out.copy_from_slice(nonce_bytes);

        let version_value = decode_uint(version.as_bytes()?);
        Ok(Self { ephemeral_public_key, nonce: nonce_out, version: version_value })
    }
}

/// Wrap an already-ECIES-encrypted payload in EIP-8's length-prefixed
/// framing: a 2-byte big-endian size followed by the ciphertext,
/// authenticated as `shared_mac_data` within the ECIES MAC itself.
/// Always written on outbound messages (spec §4.8).
fn eip8_wrap(plaintext_body: &[u8], recipient_public_key: &[u8; 64]) -> Vec<u8> {
    // ECIES adds a fixed 65 (ephemeral pubkey) + 16 (IV) + 32 (MAC) bytes
    // of overhead, so the final size is known before encrypting, which
    // is what the MAC needs to authenticate as `shared_mac_data`.
    let ciphertext_len = plaintext_body.len() + 65 + 16 + 32;
    let size = (ciphertext_len as u16).to_be_bytes();
    let ciphertext = ecies::encrypt(plaintext_body, recipient_public_key, &size);

    let mut out = Vec::with_capacity(2 + ciphertext.len());
    out.extend_from_slice(&size);
    out.extend_from_slice(&ciphertext);
    out
}

/// Accept both pre-EIP-8 plain ECIES and EIP-8-wrapped forms on read
/// (spec §4.8). Pre-EIP-8 framing has no explicit size prefix; EIP-8
/// always starts with a 2-byte big-endian length that, combined with
/// itself as `shared_mac_data`, must make the rest of the buffer decrypt
/// cleanly. We try EIP-8 first since every peer we originate from
/// writes it; a non-EIP-8 peer's raw ciphertext is tried as a fallback.
fn eip8_unwrap(buffer: &[u8], own_secret_key: &[u8; 32]) -> Result<Vec<u8>, RlpxError> {
    if buffer.len() > 2 {
        let declared_len = u16::from_be_bytes([buffer[0], buffer[1]]) as usize;
        if buffer.len() >= 2 + declared_len {
            let mac_data = &buffer[0..2];
            if let Ok(plaintext) = ecies::decrypt(&buffer[2..2 + declared_len], own_secret_key, mac_data) {
                return Ok(plaintext);
            }
        }
    }
    ecies::decrypt(buffer, own_secret_key, b"")
}

/// Build and ECIES-encrypt (EIP-8-wrapped) the AuthMsgV4 the initiator
/// sends first.
pub fn build_auth(local: &LocalIdentity, remote_static_public_key: &[u8; 64]) -> Result<Vec<u8>, RlpxError> {
    let static_shared = ecdh_x(&local.static_secret_key, remote_static_public_key)?;
    let to_sign = xor(&static_shared, &local.nonce);
    let signature = sign(&local.ephemeral_secret_key, &Hash(to_sign))?;

    let body = AuthBody {
        signature,
        static_public_key: local.static_public_key,
        nonce: local.nonce,
        version: PROTOCOL_VERSION,
    };
    Ok(eip8_wrap(&body.encode(), remote_static_public_key))
}

/// Result of successfully processing an inbound AuthMsgV4: the
/// initiator's declared static key, ephemeral key (recovered from the
/// signature, not carried on the wire), and nonce.
pub struct RecoveredAuth {
    pub initiator_static_public_key: [u8; 64],
    pub initiator_ephemeral_public_key: [u8; 64],
    pub initiator_nonce: [u8; 32],
}

/// Responder side: decrypt an inbound auth buffer and recover the
/// initiator's ephemeral public key from its signature (spec §4.8:
/// the ephemeral key is never sent in the clear, only signed over).
pub fn process_auth(local: &LocalIdentity, buffer: &[u8]) -> Result<RecoveredAuth, RlpxError> {
    let plaintext = eip8_unwrap(buffer, &local.static_secret_key)?;
    let body = AuthBody::decode(&plaintext)?;

    let static_shared = ecdh_x(&local.static_secret_key, &body.static_public_key)?;
    let signed_digest = xor(&static_shared, &body.nonce);
    let initiator_ephemeral_public_key =
        crypto::recover_public_key(&Hash(signed_digest), &body.signature)?;

    Ok(RecoveredAuth {
        initiator_static_public_key: body.static_public_key,
        initiator_ephemeral_public_key,
        initiator_nonce: body.nonce,
    })
}

/// Build and ECIES-encrypt (EIP-8-wrapped) the AckRespV4 the responder
/// sends back.
pub fn build_ack(local: &LocalIdentity, initiator_static_public_key: &[u8; 64]) -> Result<Vec<u8>, RlpxError> {
    let body = AckBody {
        ephemeral_public_key: local.ephemeral_public_key,
        nonce: local.nonce,
        version: PROTOCOL_VERSION,
    };
    Ok(eip8_wrap(&body.encode(), initiator_static_public_key))
}

/// Initiator side: decrypt an inbound ack buffer.
pub fn process_ack(local: &LocalIdentity, buffer: &[u8]) -> Result<AckBody, RlpxError> {
    let plaintext = eip8_unwrap(buffer, &local.static_secret_key)?;
    AckBody::decode(&plaintext)
}

/// Frame secrets derived once both sides hold both ephemeral public
/// keys and both nonces (spec §4.8): the ECDH of the ephemeral keys
/// combined with both nonces and the literal auth/ack byte sequences.
pub struct FrameSecrets {
    pub aes_secret: [u8; 32],
    pub mac_secret: [u8; 32],
    pub ingress_mac_seed: Hash,
    pub egress_mac_seed: Hash,
}

/// Derive [`FrameSecrets`] from the completed handshake. `initiator`
/// distinguishes which side's auth/ack bytes seed which MAC direction,
/// since the two sides must agree on ingress vs. egress.
#[allow(clippy::too_many_arguments)]
pub fn derive_frame_secrets(
    ephemeral_secret_key: &[u8; 32],
    remote_ephemeral_public_key: &[u8; 64],
    initiator_nonce: &[u8; 32],
    responder_nonce: &[u8; 32],
    auth_ciphertext: &[u8],
    ack_ciphertext: &[u8],
    is_initiator: bool,
) -> Result<FrameSecrets, RlpxError> {
    let ephemeral_shared = ecdh_x(ephemeral_secret_key, remote_ephemeral_public_key)?;
    let nonce_hash = crypto::keccak256_concat(&[responder_nonce, initiator_nonce]);
    let shared_secret = crypto::keccak256_concat(&[&ephemeral_shared, &nonce_hash.0]);
    let aes_secret = crypto::keccak256_concat(&[&ephemeral_shared, &shared_secret.0]).0;
    let mac_secret = crypto::keccak256_concat(&[&ephemeral_shared, &aes_secret]).0;

    let (egress_seed_material, ingress_seed_material): (&[u8], &[u8]) = if is_initiator {
        (auth_ciphertext, ack_ciphertext)
    } else {
        (ack_ciphertext, auth_ciphertext)
    };
    let egress_mac_seed = crypto::keccak256_concat(&[&xor(&mac_secret, responder_nonce), egress_seed_material]);
    let ingress_mac_seed = crypto::keccak256_concat(&[&xor(&mac_secret, initiator_nonce), ingress_seed_material]);

    Ok(FrameSecrets { aes_secret, mac_secret, ingress_mac_seed, egress_mac_seed })
}

fn xor(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    let mut out = [0u8; 32];
    for i in 0..32 {
        out[i] = a[i] ^ b[i];
    }
    out
}

fn encode_uint(value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let first_nonzero = bytes.iter().position(|&b| b != 0).unwrap_or(7);
    bytes[first_nonzero..].to_vec()
}

fn decode_uint(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
}

fn take3(items: Vec<Item>) -> Result<[Item; 3], RlpxError> {
    items.try_into().map_err(|_| RlpxError::MissingField("expected 3 fields"))
}

fn take4(items: Vec<Item>) -> Result<[Item; 4], RlpxError> {
    items.try_into().map_err(|_| RlpxError::MissingField("expected 4 fields"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_handshake_derives_matching_frame_secrets() {
        let initiator = LocalIdentity::generate([0x10u8; 32]).unwrap();
        let responder = LocalIdentity::generate([0x20u8; 32]).unwrap();

        let auth_ciphertext = build_auth(&initiator, &responder.static_public_key).unwrap();
        let recovered_auth = process_auth(&responder, &auth_ciphertext).unwrap();
        assert_eq!(recovered_auth.initiator_static_public_key, initiator.static_public_key);
        assert_eq!(recovered_auth.initiator_ephemeral_public_key, initiator.ephemeral_public_key);

        let ack_ciphertext = build_ack(&responder, &initiator.static_public_key).unwrap();
        let ack = process_ack(&initiator, &ack_ciphertext).unwrap();
        assert_eq!(ack.ephemeral_public_key, responder.ephemeral_public_key);

        let initiator_secrets = derive_frame_secrets(
            &initiator.ephemeral_secret_key,
            &responder.ephemeral_public_key,
            &initiator.nonce,
            &responder.nonce,
            &auth_ciphertext,
            &ack_ciphertext,
            true,
        )
        .unwrap();
        let responder_secrets = derive_frame_secrets(
            &responder.ephemeral_secret_key,
            &initiator.ephemeral_public_key,
            &initiator.nonce,
            &responder.nonce,
            &auth_ciphertext,
            &ack_ciphertext,
            false,
        )
        .unwrap();

        assert_eq!(initiator_secrets.aes_secret, responder_secrets.aes_secret);
        assert_eq!(initiator_secrets.mac_secret, responder_secrets.mac_secret);
        assert_eq!(initiator_secrets.egress_mac_seed.0, responder_secrets.ingress_mac_seed.0);
        assert_eq!(initiator_secrets.ingress_mac_seed.0, responder_secrets.egress_mac_seed.0);
    }
}
