//! Wire messages for the header/body download protocol (spec §4.10).
//! These ride inside the `eth` DEVp2p capability once a session is
//! active; this crate only defines their RLP shape and construction —
//! dispatching them over an actual `rlpx::Session` is the node
//! binary's job.

use crate::error::SyncError;
use primitive_types::U256;
use primitives::{Address, Block, Hash, Header, Transaction};
use rlp::{decode_exact, encode, Decodable, Encodable, Item};

/// `GetBlockHeaders` (spec §4.10): request up to `count` headers
/// starting at `start`, each `skip` numbers apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetBlockHeaders {
    pub start: u64,
    pub count: u64,
    pub skip: u64,
    pub reverse: bool,
}

impl GetBlockHeaders {
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        encode(&Item::List(vec![
            self.start.rlp_item(),
            self.count.rlp_item(),
            self.skip.rlp_item(),
            Item::Bytes(if self.reverse { vec![1] } else { vec![] }),
        ]))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, SyncError> {
        let item = decode_exact(bytes)?;
        let fields = item.as_list()?;
        let [start, count, skip, reverse] = fields else {
            return Err(SyncError::Rlp(rlp::RlpError::UnexpectedEof));
        };
        Ok(Self {
            start: u64::from_item(start)?,
            count: u64::from_item(count)?,
            skip: u64::from_item(skip)?,
            reverse: !reverse.as_bytes()?.is_empty(),
        })
    }
}

/// `GetBlockBodies` (spec §4.10): request bodies by the header hashes
/// accumulated while walking the headers reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetBlockBodies {
    pub hashes: Vec<Hash>,
}

impl GetBlockBodies {
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        encode(&Item::List(self.hashes.iter().map(|h| Item::Bytes(h.as_bytes().to_vec())).collect()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, SyncError> {
        let item = decode_exact(bytes)?;
        let hashes = item
            .as_list()?
            .iter()
            .map(|field| {
                let raw = field.as_bytes()?;
                if raw.len() != 32 {
                    return Err(rlp::RlpError::UnexpectedEof);
                }
                let mut buf = [0u8; 32];
                buf.copy_from_slice(raw);
                Ok(Hash(buf))
            })
            .collect::<Result<Vec<Hash>, rlp::RlpError>>()?;
        Ok(Self { hashes })
    }
}

/// `BlockHeaders`: the headers reply to a `GetBlockHeaders` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeaders {
    pub headers: Vec<Header>,
}

impl BlockHeaders {
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        encode(&Item::List(self.headers.iter().map(header_item).collect()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, SyncError> {
        let item = decode_exact(bytes)?;
        let headers = item.as_list()?.iter().map(decode_header).collect::<Result<Vec<_>, SyncError>>()?;
        Ok(Self { headers })
    }
}

/// `BlockBodies`: transactions + ommers for each requested hash, in
/// the same order as the `GetBlockBodies` request (spec §4.10:
/// "associate by position").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockBodies {
    pub bodies: Vec<(Vec<Transaction>, Vec<Header>)>,
}

impl BlockBodies {
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let items = self
            .bodies
            .iter()
            .map(|(transactions, ommers)| {
                Item::List(vec![
                    Item::List(transactions.iter().map(transaction_item).collect()),
                    Item::List(ommers.iter().map(header_item).collect()),
                ])
            })
            .collect();
        encode(&Item::List(items))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, SyncError> {
        let item = decode_exact(bytes)?;
        let bodies = item
            .as_list()?
            .iter()
            .map(|entry| {
                let fields = entry.as_list()?;
                let [transactions, ommers] = fields else {
                    return Err(SyncError::Rlp(rlp::RlpError::UnexpectedEof));
                };
                let transactions =
                    transactions.as_list()?.iter().map(decode_transaction).collect::<Result<Vec<_>, SyncError>>()?;
                let ommers = ommers.as_list()?.iter().map(decode_header).collect::<Result<Vec<_>, SyncError>>()?;
                Ok((transactions, ommers))
            })
            .collect::<Result<Vec<_>, SyncError>>()?;
        Ok(Self { bodies })
    }
}

fn header_item(header: &Header) -> Item {
    rlp::decode_exact(&chain_rules::encode_header(header)).expect("a freshly encoded header decodes to one Item")
}

fn decode_header(item: &Item) -> Result<Header, SyncError> {
    let fields = item.as_list()?;
    if fields.len() != 15 {
        return Err(SyncError::Rlp(rlp::RlpError::UnexpectedEof));
    }
    let hash32 = |field: &Item| -> Result<Hash, SyncError> {
        let raw = field.as_bytes()?;
        if raw.len() != 32 {
            return Err(SyncError::Rlp(rlp::RlpError::UnexpectedEof));
        }
        let mut buf = [0u8; 32];
        buf.copy_from_slice(raw);
        Ok(Hash(buf))
    };
    Ok(Header {
        parent_hash: hash32(&fields[0])?,
        ommers_hash: hash32(&fields[1])?,
        beneficiary: decode_address(&fields[2])?,
        state_root: hash32(&fields[3])?,
        transactions_root: hash32(&fields[4])?,
        receipts_root: hash32(&fields[5])?,
        logs_bloom: decode_bloom(&fields[6])?,
        difficulty: U256::from_item(&fields[7])?,
        number: u64::from_item(&fields[8])?,
        gas_limit: u64::from_item(&fields[9])?,
        gas_used: u64::from_item(&fields[10])?,
        timestamp: u64::from_item(&fields[11])?,
        extra_data: fields[12].as_bytes()?.to_vec(),
        mix_hash: hash32(&fields[13])?,
        nonce: {
            let raw = fields[14].as_bytes()?;
            if raw.len() != 8 {
                return Err(SyncError::Rlp(rlp::RlpError::UnexpectedEof));
            }
            let mut buf = [0u8; 8];
            buf.copy_from_slice(raw);
            buf
        },
    })
}

fn decode_address(item: &Item) -> Result<Address, SyncError> {
    let raw = item.as_bytes()?;
    Address::from_slice(raw).ok_or(SyncError::Rlp(rlp::RlpError::UnexpectedEof))
}

fn decode_bloom(item: &Item) -> Result<primitives::Bloom, SyncError> {
    let raw = item.as_bytes()?;
    if raw.len() != 256 {
        return Err(SyncError::Rlp(rlp::RlpError::UnexpectedEof));
    }
    let mut buf = [0u8; 256];
    buf.copy_from_slice(raw);
    Ok(primitives::Bloom(buf))
}

fn transaction_item(tx: &Transaction) -> Item {
    rlp::decode_exact(&chain_rules::encode_transaction(tx)).expect("a freshly encoded transaction decodes to one Item")
}

fn decode_transaction(item: &Item) -> Result<Transaction, SyncError> {
    let fields = item.as_list()?;
    if fields.len() != 9 {
        return Err(SyncError::Rlp(rlp::RlpError::UnexpectedEof));
    }
    let to_bytes = fields[3].as_bytes()?;
    let to = if to_bytes.is_empty() { None } else { Some(decode_address(&fields[3])?) };
    Ok(Transaction {
        nonce: u64::from_item(&fields[0])?,
        gas_price: U256::from_item(&fields[1])?,
        gas_limit: u64::from_item(&fields[2])?,
        to,
        value: U256::from_item(&fields[4])?,
        payload: fields[5].as_bytes()?.to_vec(),
        v: u64::from_item(&fields[6])?,
        r: U256::from_item(&fields[7])?,
        s: U256::from_item(&fields[8])?,
    })
}

/// Assemble a full [`Block`] once a queue slot's header and body have
/// both arrived.
#[must_use]
pub fn assemble_block(header: Header, transactions: Vec<Transaction>, ommers: Vec<Header>) -> Block {
    Block::new(header, transactions, ommers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header(number: u64) -> Header {
        Header {
            parent_hash: Hash([1u8; 32]),
            ommers_hash: chain_rules::ommers_hash(&[]),
            beneficiary: Address::ZERO,
            state_root: Hash([2u8; 32]),
            transactions_root: primitives::EMPTY_TRIE_ROOT,
            receipts_root: primitives::EMPTY_TRIE_ROOT,
            logs_bloom: primitives::Bloom::ZERO,
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
    fn get_block_headers_roundtrips() {
        let request = GetBlockHeaders { start: 100, count: 192, skip: 0, reverse: false };
        let decoded = GetBlockHeaders::decode(&request.encode()).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn block_headers_roundtrips() {
        let headers = BlockHeaders { headers: vec![sample_header(1), sample_header(2)] };
        let decoded = BlockHeaders::decode(&headers.encode()).unwrap();
        assert_eq!(decoded, headers);
    }

    #[test]
    fn get_block_bodies_roundtrips() {
        let request = GetBlockBodies { hashes: vec![Hash([3u8; 32]), Hash([4u8; 32])] };
        let decoded = GetBlockBodies::decode(&request.encode()).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn block_bodies_with_empty_body_roundtrips() {
        let bodies = BlockBodies { bodies: vec![(vec![], vec![])] };
        let decoded = BlockBodies::decode(&bodies.encode()).unwrap();
        assert_eq!(decoded, bodies);
    }
}
