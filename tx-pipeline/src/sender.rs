use crypto::RecoverableSignature;
use fork_config::ForkConfig;
use primitive_types::U256;
use primitives::{Address, Hash, Transaction, ValidationError};
use rlp::{Encodable, Item};

/// The secp256k1 group order `n` (spec §3: `0 < r, s < n`).
const SECP256K1_ORDER: U256 = U256([
    0xbfd25e8cd0364141,
    0xbaaedce6af48a03b,
    0xfffffffffffffffe,
    0xffffffffffffffff,
]);

/// The signing preimage's RLP item (spec §4.5 step 1): the first six
/// fields alone pre-EIP-155, or those six plus `[chain_id, 0, 0]` once
/// EIP-155 replay protection is active for this transaction.
fn signing_item(tx: &Transaction, chain_id: Option<u64>) -> Item {
    let to_item = match tx.to {
        Some(address) => Item::Bytes(address.as_bytes().to_vec()),
        None => Item::Bytes(Vec::new()),
    };
    let mut fields = vec![
        tx.nonce.rlp_item(),
        tx.gas_price.rlp_item(),
        tx.gas_limit.rlp_item(),
        to_item,
        tx.value.rlp_item(),
        tx.payload.rlp_item(),
    ];
    if let Some(id) = chain_id {
        fields.push(id.rlp_item());
        fields.push(0u64.rlp_item());
        fields.push(0u64.rlp_item());
    }
    Item::List(fields)
}

/// The digest a transaction's `(v, r, s)` signs (spec §4.5 step 1).
#[must_use]
pub fn signing_hash(tx: &Transaction) -> Hash {
    let item = signing_item(tx, tx.chain_id());
    crypto::keccak256(&rlp::encode(&item))
}

/// Recover the sending address from a transaction's signature (spec
/// §4.5 step 1, §8 signature property). Rejects `r`/`s` outside
/// `(0, n)` and, from Homestead on, a malleable high-`s` signature.
pub fn recover_sender(tx: &Transaction, fork: &ForkConfig) -> Result<Address, ValidationError> {
    if tx.r.is_zero() || tx.r >= SECP256K1_ORDER || tx.s.is_zero() || tx.s >= SECP256K1_ORDER {
        return Err(ValidationError::InvalidSender);
    }
    if fork.homestead_rules && tx.s > SECP256K1_ORDER / 2 {
        return Err(ValidationError::InvalidSender);
    }

    let digest = signing_hash(tx);
    let signature = RecoverableSignature { recovery_id: tx.recovery_id(), r: tx.r, s: tx.s };
    let public_key = crypto::recover_public_key(&digest, &signature).map_err(|_| ValidationError::InvalidSender)?;
    Ok(crypto::address_from_public_key(&public_key))
}
