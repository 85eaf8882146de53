//! Block synchronization (spec §4.10): a number-keyed download queue
//! fed by `GetBlockHeaders`/`GetBlockBodies` round trips, drained into
//! a [`block_tree::BlockTree`] in strict order once each slot
//! completes. Like `rlpx` and `discovery`, this crate is pure protocol
//! logic — the actual peer connections and request scheduling loop
//! live in the node binary.

mod engine;
mod error;
mod messages;
mod queue;

pub use engine::{PeerId, SyncEngine, HEADERS_PER_REQUEST, SNAPSHOT_INTERVAL};
pub use error::SyncError;
pub use messages::{assemble_block, BlockBodies, BlockHeaders, GetBlockBodies, GetBlockHeaders};
pub use queue::{header_implies_empty_body, BlockQueue, Slot};
