//! Header validation, uncle rules, transaction/receipt roots, block
//! rewards, and whole-block execution (spec §4.6): the layer above
//! `tx-pipeline` that turns "run these transactions" into "accept or
//! reject this block".

mod apply;
mod error;
mod header;
mod rewards;
mod roots;
mod uncles;

pub use apply::{execute_block, BlockExecution};
pub use error::BlockError;
pub use header::{compute_difficulty, encode_header, header_hash, ommers_hash, validate_header};
pub use rewards::{apply_block_reward, base_block_reward};
pub use roots::{encode_receipt, encode_transaction, receipts_root, transaction_hash, transactions_root};
pub use uncles::{validate_uncles, MAX_UNCLES};
