use crate::error::StateError;
use primitives::{Account, Address, Hash};
use rlp::{decode_exact, encode_struct, Decodable, Encodable, Item};

/// RLP-encode an account as `[nonce, balance, storage_root, code_hash]`
/// (Yellow Paper §4.1). `Account` itself cannot implement `rlp::Encodable`
/// directly since `primitives` does not depend on `rlp`.
#[must_use]
pub fn encode_account(account: &Account) -> Vec<u8> {
    encode_struct(vec![
        account.nonce.rlp_item(),
        account.balance.rlp_item(),
        Item::Bytes(account.storage_root.as_bytes().to_vec()),
        Item::Bytes(account.code_hash.as_bytes().to_vec()),
    ])
}

/// Decode an account previously produced by [`encode_account`].
pub fn decode_account(address: Address, bytes: &[u8]) -> Result<Account, StateError> {
    let wrap = |source| StateError::CorruptAccount { address, source };

    let item = decode_exact(bytes).map_err(wrap)?;
    let fields = item.as_list().map_err(wrap)?;
    if fields.len() != 4 {
        return Err(wrap(rlp::RlpError::ExpectedList));
    }

    let nonce = u64::from_item(&fields[0]).map_err(wrap)?;
    let balance = primitive_types::U256::from_item(&fields[1]).map_err(wrap)?;
    let storage_root = Hash::from_slice(fields[2].as_bytes().map_err(wrap)?)
        .ok_or_else(|| wrap(rlp::RlpError::ExpectedBytes))?;
    let code_hash = Hash::from_slice(fields[3].as_bytes().map_err(wrap)?)
        .ok_or_else(|| wrap(rlp::RlpError::ExpectedBytes))?;

    Ok(Account {
        nonce,
        balance,
        storage_root,
        code_hash,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use primitive_types::U256;

    #[test]
    fn roundtrips_a_populated_account() {
        let account = Account {
            nonce: 7,
            balance: U256::from(1_000_000u64),
            storage_root: Hash([0x11; 32]),
            code_hash: Hash([0x22; 32]),
        };
        let encoded = encode_account(&account);
        let decoded = decode_account(Address::ZERO, &encoded).unwrap();
        assert_eq!(decoded, account);
    }

    #[test]
    fn roundtrips_the_empty_account() {
        let account = Account::new_empty();
        let encoded = encode_account(&account);
        let decoded = decode_account(Address::ZERO, &encoded).unwrap();
        assert_eq!(decoded, account);
    }
}
