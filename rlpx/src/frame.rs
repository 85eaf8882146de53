//! The framed session (spec §4.8 phase 2): each frame is a 16-byte MAC'd
//! header carrying the payload length, followed by an AES-CTR-encrypted,
//! 16-byte-padded payload and its own MAC. Both the encryption stream and
//! the two MAC states persist across frames for the lifetime of the
//! connection — they are not reset per message, which is what makes a
//! reordered or replayed frame fail the MAC check.

use crate::error::RlpxError;
use crate::handshake::FrameSecrets;
use aes::cipher::{KeyIvInit, StreamCipher};
use sha3::{Digest, Keccak256};

type Aes256Ctr = ctr::Ctr64BE<aes::Aes256>;

const HEADER_LEN: usize = 16;
const MAC_LEN: usize = 16;

/// One direction's running MAC state: a Keccak-256 hasher seeded from
/// the handshake and continuously updated with every frame it has
/// produced or verified.
struct MacState {
    hasher: Keccak256,
}

impl MacState {
    fn new(seed: &[u8; 32]) -> Self {
        let mut hasher = Keccak256::new();
        hasher.update(seed);
        Self { hasher }
    }

    /// Fold `data` into the running state and return the first 16 bytes
    /// of the resulting digest as this frame's MAC tag.
    fn tag(&mut self, data: &[u8]) -> [u8; MAC_LEN] {
        self.hasher.update(data);
        let digest = self.hasher.clone().finalize();
        let mut tag = [0u8; MAC_LEN];
        tag.copy_from_slice(&digest[..MAC_LEN]);
        tag
    }
}

/// A connection's send/receive state once the handshake has produced
/// [`FrameSecrets`]. Owns the continuous AES-CTR streams and MAC chains
/// for both directions.
pub struct FrameCodec {
    egress_cipher: Aes256Ctr,
    ingress_cipher: Aes256Ctr,
    egress_mac: MacState,
    ingress_mac: MacState,
}

impl FrameCodec {
    #[must_use]
    pub fn new(secrets: &FrameSecrets) -> Self {
        let iv = [0u8; 16];
        Self {
            egress_cipher: Aes256Ctr::new(&secrets.aes_secret.into(), &iv.into()),
            ingress_cipher: Aes256Ctr::new(&secrets.aes_secret.into(), &iv.into()),
            egress_mac: MacState::new(&xor_seed(&secrets.mac_secret, &secrets.egress_mac_seed.0)),
            ingress_mac: MacState::new(&xor_seed(&secrets.mac_secret, &secrets.ingress_mac_seed.0)),
        }
    }

    /// Encode `payload` (an already-RLP-encoded packet-type + body, per
    /// spec §4.8) as one outbound frame.
    pub fn write_frame(&mut self, payload: &[u8]) -> Vec<u8> {
        let mut header = [0u8; HEADER_LEN];
        let len = payload.len() as u32;
        header[0] = (len >> 16) as u8;
        header[1] = (len >> 8) as u8;
        header[2] = len as u8;

        self.egress_cipher.apply_keystream(&mut header);
        let header_mac = self.egress_mac.tag(&header);

        let mut body = payload.to_vec();
        let pad = (16 - body.len() % 16) % 16;
        body.extend(std::iter::repeat(0u8).take(pad));
        self.egress_cipher.apply_keystream(&mut body);
        let body_mac = self.egress_mac.tag(&body);

        let mut out = Vec::with_capacity(HEADER_LEN + MAC_LEN + body.len() + MAC_LEN);
        out.extend_from_slice(&header);
        out.extend_from_slice(&header_mac);
        out.extend_from_slice(&body);
        out.extend_from_slice(&body_mac);
        out
    }

    /// Decode the 32-byte frame header (ciphertext + MAC) enough to
    /// learn the expected body length. Call [`Self::read_body`] next
    /// with that many bytes (rounded up to 16) plus its trailing MAC.
    pub fn read_header(&mut self, header_and_mac: &[u8; HEADER_LEN + MAC_LEN]) -> Result<usize, RlpxError> {
        let (mut header, mac) = (header_and_mac[..HEADER_LEN].to_vec(), &header_and_mac[HEADER_LEN..]);
        let expected_mac = self.ingress_mac.tag(&header);
        if expected_mac != mac {
            return Err(RlpxError::BadFrameHeaderMac);
        }

        self.ingress_cipher.apply_keystream(&mut header);
        let len = (u32::from(header[0]) << 16) | (u32::from(header[1]) << 8) | u32::from(header[2]);
        Ok(len as usize)
    }

    /// Decrypt and verify the body that follows a header read via
    /// [`Self::read_header`]; `padded_body_and_mac` is the padded
    /// ciphertext followed by its 16-byte MAC.
    pub fn read_body(&mut self, payload_len: usize, padded_body_and_mac: &[u8]) -> Result<Vec<u8>, RlpxError> {
        if padded_body_and_mac.len() < MAC_LEN {
            return Err(RlpxError::FrameTooLarge);
        }
        let (body, mac) = padded_body_and_mac.split_at(padded_body_and_mac.len() - MAC_LEN);
        let expected_mac = self.ingress_mac.tag(body);
        if expected_mac != mac {
            return Err(RlpxError::BadFrameBodyMac);
        }
        if payload_len > body.len() {
            return Err(RlpxError::FrameTooLarge);
        }

        let mut plaintext = body.to_vec();
        self.ingress_cipher.apply_keystream(&mut plaintext);
        plaintext.truncate(payload_len);
        Ok(plaintext)
    }

    /// How many bytes the padded body + MAC will occupy for a given
    /// declared payload length, so a reader knows how much more to pull
    /// off the wire after [`Self::read_header`].
    #[must_use]
    pub fn padded_body_len(payload_len: usize) -> usize {
        let pad = (16 - payload_len % 16) % 16;
        payload_len + pad + MAC_LEN
    }
}

fn xor_seed(secret: &[u8; 32], seed: &[u8; 32]) -> [u8; 32] {
    let mut out = [0u8; 32];
    for i in 0..32 {
        out[i] = secret[i] ^ seed[i];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handshake::{derive_frame_secrets, LocalIdentity};

    fn paired_codecs() -> (FrameCodec, FrameCodec) {
        let initiator = LocalIdentity::generate([0x61u8; 32]).unwrap();
        let responder = LocalIdentity::generate([0x62u8; 32]).unwrap();
        let auth = vec![1, 2, 3];
        let ack = vec![4, 5, 6];

        let initiator_secrets = derive_frame_secrets(
            &initiator.ephemeral_secret_key,
            &responder.ephemeral_public_key,
            &initiator.nonce,
            &responder.nonce,
            &auth,
            &ack,
            true,
        )
        .unwrap();
        let responder_secrets = derive_frame_secrets(
            &responder.ephemeral_secret_key,
            &initiator.ephemeral_public_key,
            &initiator.nonce,
            &responder.nonce,
            &auth,
            &ack,
            false,
        )
        .unwrap();

        (FrameCodec::new(&initiator_secrets), FrameCodec::new(&responder_secrets))
    }

    #[test]
    fn a_frame_written_by_one_side_reads_back_on_the_other() {
        let (mut sender, mut receiver) = paired_codecs();
        let payload = b"hello devp2p".to_vec();
        let wire = sender.write_frame(&payload);

        let mut header_and_mac = [0u8; HEADER_LEN + MAC_LEN];
        header_and_mac.copy_from_slice(&wire[..HEADER_LEN + MAC_LEN]);
        let len = receiver.read_header(&header_and_mac).unwrap();
        assert_eq!(len, payload.len());

        let body_and_mac = &wire[HEADER_LEN + MAC_LEN..];
        let decoded = receiver.read_body(len, body_and_mac).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn frames_must_be_read_in_order() {
        let (mut sender, mut receiver) = paired_codecs();
        let first = sender.write_frame(b"first");
        let second = sender.write_frame(b"second");

        // Feeding the second frame's header to a MAC state that never
        // saw the first frame must fail: the MAC chain enforces order.
        let mut header_and_mac = [0u8; HEADER_LEN + MAC_LEN];
        header_and_mac.copy_from_slice(&second[..HEADER_LEN + MAC_LEN]);
        assert!(receiver.read_header(&header_and_mac).is_err());
        let _ = first;
    }
}
