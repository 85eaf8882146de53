use primitive_types::U256;
use primitives::Block;

/// A block's position relative to the canonical chain (spec §4.7).
/// `Queued` (received, not yet validated) never reaches the tree itself
/// — the sync engine holds those; only blocks that passed validation
/// are stored here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BlockStatus {
    Valid,
    Canonical,
}

/// An entry in the tree: a validated block plus the running total
/// difficulty of the chain ending at it (spec §3's "Block tree").
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BlockNode {
    pub block: Block,
    pub total_difficulty: U256,
    pub status: BlockStatus,
}
