use crate::error::RlpError;
use crate::item::{encode as encode_item, encode_list_payload, Item};
use primitive_types::U256;

/// Types that know how to turn themselves into an RLP [`Item`].
pub trait Encodable {
    fn rlp_item(&self) -> Item;

    fn rlp_bytes(&self) -> Vec<u8> {
        encode_item(&self.rlp_item())
    }
}

/// Types that know how to read themselves back out of an RLP [`Item`].
pub trait Decodable: Sized {
    fn from_item(item: &Item) -> Result<Self, RlpError>;
}

impl Encodable for Vec<u8> {
    fn rlp_item(&self) -> Item {
        Item::Bytes(self.clone())
    }
}

impl Decodable for Vec<u8> {
    fn from_item(item: &Item) -> Result<Self, RlpError> {
        Ok(item.as_bytes()?.to_vec())
    }
}

impl Encodable for u64 {
    fn rlp_item(&self) -> Item {
        Item::Bytes(minimal_be(*self))
    }
}

impl Decodable for u64 {
    fn from_item(item: &Item) -> Result<Self, RlpError> {
        let bytes = item.as_bytes()?;
        if bytes.len() > 8 {
            return Err(RlpError::IntegerOverflow(bytes.len()));
        }
        if !bytes.is_empty() && bytes[0] == 0 {
            return Err(RlpError::NonCanonicalLength);
        }
        let mut buf = [0u8; 8];
        buf[8 - bytes.len()..].copy_from_slice(bytes);
        Ok(u64::from_be_bytes(buf))
    }
}

impl Encodable for U256 {
    fn rlp_item(&self) -> Item {
        let mut buf = [0u8; 32];
        self.to_big_endian(&mut buf);
        let start = buf.iter().position(|&b| b != 0).unwrap_or(32);
        Item::Bytes(buf[start..].to_vec())
    }
}

impl Decodable for U256 {
    fn from_item(item: &Item) -> Result<Self, RlpError> {
        let bytes = item.as_bytes()?;
        if bytes.len() > 32 {
            return Err(RlpError::IntegerOverflow(bytes.len()));
        }
        if !bytes.is_empty() && bytes[0] == 0 {
            return Err(RlpError::NonCanonicalLength);
        }
        Ok(U256::from_big_endian(bytes))
    }
}

impl<T: Encodable> Encodable for Vec<T> {
    fn rlp_item(&self) -> Item {
        Item::List(self.iter().map(Encodable::rlp_item).collect())
    }
}

impl<T: Decodable> Decodable for Vec<T> {
    fn from_item(item: &Item) -> Result<Self, RlpError> {
        item.as_list()?.iter().map(T::from_item).collect()
    }
}

fn minimal_be(value: u64) -> Vec<u8> {
    if value == 0 {
        return Vec::new();
    }
    let bytes = value.to_be_bytes();
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len() - 1);
    bytes[start..].to_vec()
}

/// Encode a heterogeneous, ordered list of fields as an RLP list — the
/// common case of encoding a struct (`[a, b, c, ...]`).
pub fn encode_struct(fields: Vec<Item>) -> Vec<u8> {
    let encoded: Vec<Vec<u8>> = fields.iter().map(encode_item).collect();
    encode_list_payload(&encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::decode_exact;

    #[test]
    fn u64_roundtrip_zero_is_empty_string() {
        assert_eq!(0u64.rlp_item(), Item::Bytes(vec![]));
        let decoded = u64::from_item(&Item::Bytes(vec![])).unwrap();
        assert_eq!(decoded, 0);
    }

    #[test]
    fn u64_roundtrip_nonzero() {
        for v in [1u64, 127, 128, 255, 256, 1_000_000, u64::MAX] {
            let encoded = v.rlp_bytes();
            let decoded = u64::from_item(&decode_exact(&encoded).unwrap()).unwrap();
            assert_eq!(decoded, v);
        }
    }

    #[test]
    fn u256_roundtrip() {
        let v = U256::from(123456789u64) * U256::from(1_000_000_000u64);
        let encoded = v.rlp_bytes();
        let decoded = U256::from_item(&decode_exact(&encoded).unwrap()).unwrap();
        assert_eq!(decoded, v);
    }

    #[test]
    fn vec_of_bytes_roundtrip() {
        let v: Vec<Vec<u8>> = vec![b"cat".to_vec(), b"dog".to_vec()];
        let encoded = v.rlp_bytes();
        let decoded = Vec::<Vec<u8>>::from_item(&decode_exact(&encoded).unwrap()).unwrap();
        assert_eq!(decoded, v);
    }
}
