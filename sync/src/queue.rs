//! The download queue (spec §4.10): one slot per block number, filled
//! in two steps — a header arrives, then (unless the block is
//! trivially empty) its body.

use primitives::{Hash, Header, Transaction};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub enum Slot {
    AwaitingBody { header: Header },
    Complete { header: Header, transactions: Vec<Transaction>, ommers: Vec<Header> },
}

impl Slot {
    #[must_use]
    pub fn header(&self) -> &Header {
        match self {
            Slot::AwaitingBody { header } | Slot::Complete { header, .. } => header,
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self, Slot::Complete { .. })
    }
}

/// A block whose header declares an empty body — empty ommers list and
/// empty transactions trie — never needs a `GetBlockBodies` round trip
/// (spec §4.10).
#[must_use]
pub fn header_implies_empty_body(header: &Header) -> bool {
    header.ommers_hash == chain_rules::ommers_hash(&[]) && header.transactions_root == primitives::EMPTY_TRIE_ROOT
}

/// Numbered slots awaiting headers or bodies, keyed by block number so
/// gaps are easy to find (spec §4.10).
#[derive(Default)]
pub struct BlockQueue {
    slots: BTreeMap<u64, Slot>,
    hash_to_number: std::collections::HashMap<Hash, u64>,
}

impl BlockQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, number: u64) -> bool {
        self.slots.contains_key(&number)
    }

    /// Insert a freshly received header. If its body is implied empty,
    /// the slot is immediately `Complete`; otherwise the returned hash
    /// must be folded into the next `GetBlockBodies` request.
    pub fn insert_header(&mut self, header: Header) -> Option<Hash> {
        let number = header.number;
        let hash = chain_rules::header_hash(&header);
        if header_implies_empty_body(&header) {
            self.slots.insert(number, Slot::Complete { header, transactions: Vec::new(), ommers: Vec::new() });
            None
        } else {
            self.hash_to_number.insert(hash, number);
            self.slots.insert(number, Slot::AwaitingBody { header });
            Some(hash)
        }
    }

    /// Fill in a body for the header hash it was requested against
    /// (spec §4.10: "associate by position" — the caller pairs the
    /// `GetBlockBodies` request hashes with the reply by index before
    /// calling this).
    pub fn insert_body(&mut self, hash: Hash, transactions: Vec<Transaction>, ommers: Vec<Header>) -> Result<(), crate::error::SyncError> {
        let number = self.hash_to_number.remove(&hash).ok_or(crate::error::SyncError::UnrequestedBody)?;
        let Some(Slot::AwaitingBody { header }) = self.slots.remove(&number) else {
            return Err(crate::error::SyncError::UnrequestedBody);
        };
        self.slots.insert(number, Slot::Complete { header, transactions, ommers });
        Ok(())
    }

    #[must_use]
    pub fn take_complete(&mut self, number: u64) -> Option<Slot> {
        match self.slots.get(&number) {
            Some(slot) if slot.is_complete() => self.slots.remove(&number),
            _ => None,
        }
    }

    /// Every header hash currently `AwaitingBody`, for building the
    /// next `GetBlockBodies` request.
    #[must_use]
    pub fn pending_body_hashes(&self) -> Vec<Hash> {
        self.slots
            .values()
            .filter_map(|slot| match slot {
                Slot::AwaitingBody { header } => Some(chain_rules::header_hash(header)),
                Slot::Complete { .. } => None,
            })
            .collect()
    }

    /// The lowest block number greater than `canonical_head_number`
    /// that is not already queued (spec §4.10's gap-filling rule).
    #[must_use]
    pub fn next_missing(&self, canonical_head_number: u64) -> u64 {
        let mut candidate = canonical_head_number + 1;
        while self.slots.contains_key(&candidate) {
            candidate += 1;
        }
        candidate
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use primitive_types::U256;
    use primitives::{Address, Bloom};

    fn header(number: u64) -> Header {
        Header {
            parent_hash: Hash([1u8; 32]),
            ommers_hash: chain_rules::ommers_hash(&[]),
            beneficiary: Address::ZERO,
            state_root: Hash([2u8; 32]),
            transactions_root: primitives::EMPTY_TRIE_ROOT,
            receipts_root: primitives::EMPTY_TRIE_ROOT,
            logs_bloom: Bloom::ZERO,
            difficulty: U256::from(131_072u64),
            number,
            gas_limit: 8_000_000,
            gas_used: 0,
            timestamp: number * 15,
            extra_data: vec![],
            mix_hash: Hash::ZERO,
            nonce: [0u8; 8],
        }
    }

    #[test]
    fn empty_body_header_completes_immediately() {
        let mut queue = BlockQueue::new();
        let request = queue.insert_header(header(5));
        assert!(request.is_none());
        assert!(queue.take_complete(5).is_some());
    }

    #[test]
    fn nonempty_body_header_awaits_its_body() {
        let mut queue = BlockQueue::new();
        let mut h = header(5);
        h.transactions_root = Hash([9u8; 32]);
        let hash = queue.insert_header(h.clone()).expect("non-empty body needs a request");
        assert!(queue.take_complete(5).is_none());

        queue.insert_body(hash, vec![], vec![]).unwrap();
        let slot = queue.take_complete(5).unwrap();
        assert!(slot.is_complete());
    }

    #[test]
    fn next_missing_skips_queued_numbers() {
        let mut queue = BlockQueue::new();
        queue.insert_header(header(5));
        queue.insert_header(header(6));
        assert_eq!(queue.next_missing(4), 7);
    }
}
