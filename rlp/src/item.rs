use crate::error::RlpError;

/// An untyped RLP item: either a byte string or a list of items.
///
/// This is the structure spec §4.2 describes directly: "any nested
/// structure of byte-strings and lists". Typed encode/decode (for
/// `u64`, `Hash`, `Address`, structs, ...) is built on top of this in
/// `codec.rs`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Item {
    Bytes(Vec<u8>),
    List(Vec<Item>),
}

impl Item {
    #[must_use]
    pub fn as_bytes(&self) -> Result<&[u8], RlpError> {
        match self {
            Item::Bytes(b) => Ok(b),
            Item::List(_) => Err(RlpError::ExpectedBytes),
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Result<&[Item], RlpError> {
        match self {
            Item::List(l) => Ok(l),
            Item::Bytes(_) => Err(RlpError::ExpectedList),
        }
    }

    pub fn into_list(self) -> Result<Vec<Item>, RlpError> {
        match self {
            Item::List(l) => Ok(l),
            Item::Bytes(_) => Err(RlpError::ExpectedList),
        }
    }
}

/// Encode a single byte string per spec §4.2:
/// - a lone byte `< 0x80` encodes to itself,
/// - up to 55 bytes get a `0x80 + len` prefix,
/// - longer strings get a `0xB7 + len-of-len` prefix followed by the
///   big-endian length.
pub fn encode_bytes(data: &[u8]) -> Vec<u8> {
    if data.len() == 1 && data[0] < 0x80 {
        vec![data[0]]
    } else if data.len() < 56 {
        let mut out = Vec::with_capacity(1 + data.len());
        out.push(0x80 + data.len() as u8);
        out.extend_from_slice(data);
        out
    } else {
        let len_bytes = minimal_be_bytes(data.len() as u64);
        let mut out = Vec::with_capacity(1 + len_bytes.len() + data.len());
        out.push(0xb7 + len_bytes.len() as u8);
        out.extend_from_slice(&len_bytes);
        out.extend_from_slice(data);
        out
    }
}

/// Encode a list of already-encoded items per spec §4.2 (bases
/// `0xC0`/`0xF7`).
pub fn encode_list_payload(encoded_items: &[Vec<u8>]) -> Vec<u8> {
    let total_len: usize = encoded_items.iter().map(Vec::len).sum();
    let mut out = Vec::with_capacity(total_len + 9);
    if total_len < 56 {
        out.push(0xc0 + total_len as u8);
    } else {
        let len_bytes = minimal_be_bytes(total_len as u64);
        out.push(0xf7 + len_bytes.len() as u8);
        out.extend_from_slice(&len_bytes);
    }
    for item in encoded_items {
        out.extend_from_slice(item);
    }
    out
}

/// Recursively encode an [`Item`].
pub fn encode(item: &Item) -> Vec<u8> {
    match item {
        Item::Bytes(b) => encode_bytes(b),
        Item::List(items) => {
            let encoded: Vec<Vec<u8>> = items.iter().map(encode).collect();
            encode_list_payload(&encoded)
        }
    }
}

fn minimal_be_bytes(len: u64) -> Vec<u8> {
    let bytes = len.to_be_bytes();
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len() - 1);
    bytes[start..].to_vec()
}

/// Decode exactly one [`Item`] from the front of `input`, returning the
/// item and the number of bytes consumed.
///
/// Rejects non-canonical length prefixes (spec §4.2: "Decoding MUST
/// reject inputs with non-minimal length prefixes") — a short string
/// encoded with the long form, or a length-of-length with a leading
/// zero byte, is a decode error rather than silently accepted.
pub fn decode_one(input: &[u8]) -> Result<(Item, usize), RlpError> {
    let first = *input.first().ok_or(RlpError::UnexpectedEof)?;

    match first {
        0x00..=0x7f => Ok((Item::Bytes(vec![first]), 1)),

        0x80..=0xb7 => {
            let len = (first - 0x80) as usize;
            let payload = read_slice(input, 1, len)?;
            if len == 1 && payload[0] < 0x80 {
                return Err(RlpError::NonCanonicalLength);
            }
            Ok((Item::Bytes(payload.to_vec()), 1 + len))
        }

        0xb8..=0xbf => {
            let len_of_len = (first - 0xb7) as usize;
            let len = read_length(input, 1, len_of_len)?;
            if len < 56 {
                return Err(RlpError::NonCanonicalLength);
            }
            let payload = read_slice(input, 1 + len_of_len, len)?;
            Ok((Item::Bytes(payload.to_vec()), 1 + len_of_len + len))
        }

        0xc0..=0xf7 => {
            let len = (first - 0xc0) as usize;
            let payload = read_slice(input, 1, len)?;
            let items = decode_items_exact(payload)?;
            Ok((Item::List(items), 1 + len))
        }

        0xf8..=0xff => {
            let len_of_len = (first - 0xf7) as usize;
            let len = read_length(input, 1, len_of_len)?;
            if len < 56 {
                return Err(RlpError::NonCanonicalLength);
            }
            let payload = read_slice(input, 1 + len_of_len, len)?;
            let items = decode_items_exact(payload)?;
            Ok((Item::List(items), 1 + len_of_len + len))
        }
    }
}

/// Decode exactly one item and require that no trailing bytes remain
/// (spec §8: `decode(encode(x)) = x`, which only holds for a full
/// buffer with no slack).
pub fn decode_exact(input: &[u8]) -> Result<Item, RlpError> {
    let (item, consumed) = decode_one(input)?;
    if consumed != input.len() {
        return Err(RlpError::TrailingBytes(input.len() - consumed));
    }
    Ok(item)
}

fn decode_items_exact(mut buf: &[u8]) -> Result<Vec<Item>, RlpError> {
    let mut items = Vec::new();
    while !buf.is_empty() {
        let (item, consumed) = decode_one(buf)?;
        items.push(item);
        buf = &buf[consumed..];
    }
    Ok(items)
}

fn read_slice(input: &[u8], start: usize, len: usize) -> Result<&[u8], RlpError> {
    input
        .get(start..start + len)
        .ok_or(RlpError::UnexpectedEof)
}

fn read_length(input: &[u8], start: usize, len_of_len: usize) -> Result<usize, RlpError> {
    let bytes = read_slice(input, start, len_of_len)?;
    if bytes[0] == 0 {
        return Err(RlpError::NonCanonicalLength);
    }
    let mut len: u64 = 0;
    for &b in bytes {
        len = (len << 8) | u64::from(b);
    }
    Ok(len as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string() {
        assert_eq!(encode_bytes(&[]), vec![0x80]);
    }

    #[test]
    fn single_small_byte() {
        assert_eq!(encode_bytes(&[0x00]), vec![0x00]);
        assert_eq!(encode_bytes(&[0x7f]), vec![0x7f]);
    }

    #[test]
    fn single_large_byte_gets_prefix() {
        assert_eq!(encode_bytes(&[0x80]), vec![0x81, 0x80]);
    }

    #[test]
    fn short_string() {
        let encoded = encode_bytes(b"dog");
        assert_eq!(encoded, vec![0x83, b'd', b'o', b'g']);
        let (decoded, consumed) = decode_one(&encoded).unwrap();
        assert_eq!(consumed, encoded.len());
        assert_eq!(decoded.as_bytes().unwrap(), b"dog");
    }

    #[test]
    fn long_string_roundtrip() {
        let data = vec![0x42u8; 1024];
        let encoded = encode_bytes(&data);
        assert_eq!(encoded[0], 0xb8 + 2); // len-of-len = 2 bytes for 1024
        let decoded = decode_exact(&encoded).unwrap();
        assert_eq!(decoded.as_bytes().unwrap(), data.as_slice());
    }

    #[test]
    fn empty_list() {
        let encoded = encode(&Item::List(vec![]));
        assert_eq!(encoded, vec![0xc0]);
    }

    #[test]
    fn nested_list_roundtrip() {
        let item = Item::List(vec![
            Item::Bytes(b"cat".to_vec()),
            Item::List(vec![Item::Bytes(vec![1, 2, 3])]),
        ]);
        let encoded = encode(&item);
        let decoded = decode_exact(&encoded).unwrap();
        assert_eq!(decoded, item);
    }

    #[test]
    fn rejects_non_canonical_single_byte_long_form() {
        // 0x00 re-encoded with the long form (0x81 0x00) must be rejected.
        let bogus = vec![0x81, 0x00];
        assert_eq!(decode_one(&bogus), Err(RlpError::NonCanonicalLength));
    }

    #[test]
    fn rejects_non_canonical_length_of_length() {
        // len-of-length byte with a leading zero is non-minimal.
        let bogus = vec![0xb8, 0x00, 0x41];
        assert!(decode_one(&bogus).is_err());
    }

    #[test]
    fn rejects_trailing_bytes() {
        let mut encoded = encode_bytes(b"dog");
        encoded.push(0xff);
        assert!(matches!(
            decode_exact(&encoded),
            Err(RlpError::TrailingBytes(1))
        ));
    }

    proptest::proptest! {
        #[test]
        fn prop_bytes_roundtrip(data: Vec<u8>) {
            let encoded = encode_bytes(&data);
            let decoded = decode_exact(&encoded).unwrap();
            proptest::prop_assert_eq!(decoded.as_bytes().unwrap(), data.as_slice());
        }
    }
}
