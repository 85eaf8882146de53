use crate::Address;
use primitive_types::U256;

/// The payload of a transaction: a message call's `data`, or a contract
/// creation's `init` code (spec §3 — the two are mutually exclusive and
/// distinguished only by whether `to` is present).
pub type Payload = Vec<u8>;

/// A signed Ethereum transaction (spec §3).
///
/// `to == None` denotes contract creation, in which case `payload` is
/// the `init` code executed to produce the deployed contract's runtime
/// code. `to == Some(addr)` denotes a message call, in which case
/// `payload` is the call's `data`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Transaction {
    pub nonce: u64,
    pub gas_price: U256,
    pub gas_limit: u64,
    pub to: Option<Address>,
    pub value: U256,
    pub payload: Payload,
    pub v: u64,
    pub r: U256,
    pub s: U256,
}

impl Transaction {
    #[must_use]
    pub fn is_contract_creation(&self) -> bool {
        self.to.is_none()
    }

    /// EIP-155: chain id folded into `v` when `v >= 35`. Pre-EIP-155
    /// transactions use `v ∈ {27, 28}` and carry no replay protection.
    #[must_use]
    pub fn chain_id(&self) -> Option<u64> {
        if self.v >= 35 {
            Some((self.v - 35) / 2)
        } else {
            None
        }
    }

    /// The raw recovery id (0 or 1) implied by `v`, independent of
    /// whether EIP-155 encoding is in effect.
    #[must_use]
    pub fn recovery_id(&self) -> u8 {
        if self.v >= 35 {
            ((self.v - 35) % 2) as u8
        } else {
            (self.v - 27) as u8
        }
    }
}
