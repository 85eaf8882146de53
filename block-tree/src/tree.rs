use crate::error::BlockTreeError;
use crate::node::{BlockNode, BlockStatus};
use chain_rules::{execute_block, header_hash, validate_header, validate_uncles};
use fork_config::ForkConfig;
use primitive_types::U256;
use primitives::{Block, Hash, Header, Receipt};
use state::State;
use std::collections::{HashMap, HashSet, VecDeque};
use trie::KvStore;

/// Ommer eligibility only looks as far back as `MAX_UNCLES`-many
/// generations beyond this; mirrors `chain_rules::uncles`'s own window.
const MAX_UNCLE_GENERATION: u64 = 7;

/// The result of [`BlockTree::add_block`] (spec §4.7's three-way
/// contract). `AlreadyKnown` is not itself part of that contract — a
/// peer re-announcing a block the tree already holds is not an error,
/// just a no-op, so it is folded into the `Ok` side rather than
/// treated as `{:invalid, reason}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddBlockOutcome {
    Valid {
        hash: Hash,
        total_difficulty: U256,
        head_changed: bool,
        receipts: Vec<Receipt>,
    },
    Orphan,
    AlreadyKnown,
}

/// Multi-branch tree of validated blocks rooted at genesis (spec §4.7).
/// Each call to [`BlockTree::add_block`] validates header, uncles, and
/// the execution roots of a candidate block against its already-Valid
/// parent, then re-derives the canonical head by total difficulty.
///
/// `S` is the content-addressed store backing every branch's world
/// state; because trie nodes are addressed by their own hash, the same
/// store serves every fork simultaneously — reopening a branch's state
/// is just `State::from_root` against that branch's declared root,
/// never a copy.
pub struct BlockTree<S: KvStore + Clone> {
    store: S,
    nodes: HashMap<Hash, BlockNode>,
    canonical_by_number: HashMap<u64, Hash>,
    orphans: HashMap<Hash, Vec<Block>>,
    canonical_head: Hash,
    genesis_hash: Hash,
}

impl<S: KvStore + Clone> BlockTree<S> {
    /// Seed the tree with an already-validated genesis block.
    pub fn new(genesis: Block, store: S) -> Self {
        let hash = header_hash(&genesis.header);
        let total_difficulty = genesis.header.difficulty;
        let node = BlockNode { block: genesis, total_difficulty, status: BlockStatus::Canonical };

        let mut nodes = HashMap::new();
        nodes.insert(hash, node);
        let mut canonical_by_number = HashMap::new();
        canonical_by_number.insert(0, hash);

        Self { store, nodes, canonical_by_number, orphans: HashMap::new(), canonical_head: hash, genesis_hash: hash }
    }

    /// Rebuild a tree from a persisted [`crate::persistence::TreeSnapshot`]
    /// (spec §6, §4.10): used on node startup to resume without
    /// replaying every block since genesis.
    pub fn from_snapshot(snapshot: crate::persistence::TreeSnapshot, genesis_hash: Hash, store: S) -> Self {
        let nodes: HashMap<Hash, BlockNode> = snapshot.nodes.into_iter().collect();
        let canonical_by_number = nodes
            .iter()
            .filter(|(_, node)| node.status == BlockStatus::Canonical)
            .map(|(hash, node)| (node.block.header.number, *hash))
            .collect();

        Self { store, nodes, canonical_by_number, orphans: HashMap::new(), canonical_head: snapshot.canonical_head, genesis_hash }
    }

    /// A serializable snapshot of every known node and the current
    /// canonical head (spec §6's `"current_block_tree"` key).
    #[must_use]
    pub fn snapshot(&self) -> crate::persistence::TreeSnapshot {
        crate::persistence::TreeSnapshot {
            nodes: self.nodes.iter().map(|(hash, node)| (*hash, node.clone())).collect(),
            canonical_head: self.canonical_head,
        }
    }

    #[must_use]
    pub fn canonical_head(&self) -> Hash {
        self.canonical_head
    }

    #[must_use]
    pub fn get_by_hash(&self, hash: Hash) -> Option<&Block> {
        self.nodes.get(&hash).map(|node| &node.block)
    }

    #[must_use]
    pub fn get_by_number(&self, number: u64) -> Option<&Block> {
        self.canonical_by_number.get(&number).and_then(|hash| self.get_by_hash(*hash))
    }

    #[must_use]
    pub fn total_difficulty(&self, hash: Hash) -> Option<U256> {
        self.nodes.get(&hash).map(|node| node.total_difficulty)
    }

    /// Ordered ancestor hashes from `hash` back to genesis (spec §4.7).
    #[must_use]
    pub fn path_to_root(&self, hash: Hash) -> Vec<Hash> {
        let mut path = Vec::new();
        let mut cursor = hash;
        loop {
            path.push(cursor);
            if cursor == self.genesis_hash {
                break;
            }
            let Some(node) = self.nodes.get(&cursor) else { break };
            cursor = node.block.header.parent_hash;
        }
        path
    }

    /// Validate and insert `block`; if its parent is unknown, buffer it
    /// as an orphan to be retried once that parent arrives (spec
    /// §4.7). A freshly-Valid block unblocks any orphans waiting on it,
    /// processed breadth-first in the same call.
    pub fn add_block(&mut self, block: Block, chain_id: u64, fork: &ForkConfig) -> Result<AddBlockOutcome, BlockTreeError> {
        let hash = header_hash(&block.header);
        if self.nodes.contains_key(&hash) {
            return Ok(AddBlockOutcome::AlreadyKnown);
        }

        let Some(parent) = self.nodes.get(&block.header.parent_hash).cloned() else {
            self.orphans.entry(block.header.parent_hash).or_default().push(block);
            return Ok(AddBlockOutcome::Orphan);
        };

        let outcome = self.validate_and_insert(hash, block, &parent, chain_id, fork)?;

        let mut ready = VecDeque::new();
        ready.push_back(hash);
        while let Some(parent_hash) = ready.pop_front() {
            let Some(waiting) = self.orphans.remove(&parent_hash) else { continue };
            let parent_node = self.nodes.get(&parent_hash).cloned().expect("parent was just inserted");
            for waiting_block in waiting {
                let waiting_hash = header_hash(&waiting_block.header);
                if self.nodes.contains_key(&waiting_hash) {
                    continue;
                }
                match self.validate_and_insert(waiting_hash, waiting_block, &parent_node, chain_id, fork) {
                    Ok(_) => ready.push_back(waiting_hash),
                    Err(err) => tracing::warn!(hash = ?waiting_hash, %err, "buffered orphan rejected once its parent arrived"),
                }
            }
        }

        Ok(outcome)
    }

    fn validate_and_insert(
        &mut self,
        hash: Hash,
        block: Block,
        parent: &BlockNode,
        chain_id: u64,
        fork: &ForkConfig,
    ) -> Result<AddBlockOutcome, BlockTreeError> {
        let has_uncles = !block.ommers.is_empty();
        validate_header(&block.header, &parent.block.header, has_uncles, fork).map_err(chain_rules::BlockError::from)?;

        let ancestor_blocks = self.recent_ancestor_blocks(block.header.parent_hash, MAX_UNCLE_GENERATION + 1);
        let ancestor_headers: Vec<Header> = ancestor_blocks.iter().map(|b| b.header.clone()).collect();
        let already_included: HashSet<Hash> =
            ancestor_blocks.iter().flat_map(|b| b.ommers.iter().map(header_hash)).collect();
        validate_uncles(&block.header, &block.ommers, &ancestor_headers, &already_included, fork)
            .map_err(chain_rules::BlockError::from)?;

        let mut state = State::from_root(self.store.clone(), parent.block.header.state_root);
        let execution = execute_block(&mut state, &block.header, &block.transactions, &block.ommers, chain_id, fork)?;

        let total_difficulty = parent.total_difficulty + block.header.difficulty;
        let number = block.header.number;
        tracing::info!(?hash, number, %total_difficulty, "block validated");

        self.nodes.insert(hash, BlockNode { block, total_difficulty, status: BlockStatus::Valid });
        let head_changed = self.maybe_update_canonical_head(hash, total_difficulty, number);

        Ok(AddBlockOutcome::Valid { hash, total_difficulty, head_changed, receipts: execution.receipts })
    }

    fn recent_ancestor_blocks(&self, from: Hash, generations: u64) -> Vec<Block> {
        let mut result = Vec::new();
        let mut cursor = from;
        for _ in 0..generations {
            let Some(node) = self.nodes.get(&cursor) else { break };
            result.push(node.block.clone());
            if cursor == self.genesis_hash {
                break;
            }
            cursor = node.block.header.parent_hash;
        }
        result
    }

    /// Re-derive the canonical head: greatest total difficulty, ties
    /// broken by lower block number then lower hash (spec §3).
    fn maybe_update_canonical_head(&mut self, candidate_hash: Hash, candidate_td: U256, candidate_number: u64) -> bool {
        let current = self.nodes.get(&self.canonical_head).expect("canonical head always present");
        let current_key = (current.total_difficulty, current.block.header.number, self.canonical_head);
        let candidate_key = (candidate_td, candidate_number, candidate_hash);

        let candidate_wins = candidate_key.0 > current_key.0
            || (candidate_key.0 == current_key.0 && candidate_key.1 < current_key.1)
            || (candidate_key.0 == current_key.0 && candidate_key.1 == current_key.1 && candidate_key.2 < current_key.2);
        if !candidate_wins {
            return false;
        }

        self.reorganize_to(candidate_hash);
        true
    }

    fn reorganize_to(&mut self, new_head: Hash) {
        let old_head = self.canonical_head;
        let new_path = self.path_to_root(new_head);
        let old_path = self.path_to_root(old_head);
        let new_set: HashSet<Hash> = new_path.iter().copied().collect();

        for hash in &old_path {
            if new_set.contains(hash) {
                continue;
            }
            if let Some(node) = self.nodes.get_mut(hash) {
                node.status = BlockStatus::Valid;
                if self.canonical_by_number.get(&node.block.header.number) == Some(hash) {
                    self.canonical_by_number.remove(&node.block.header.number);
                }
            }
        }

        for hash in &new_path {
            if let Some(node) = self.nodes.get_mut(hash) {
                node.status = BlockStatus::Canonical;
                self.canonical_by_number.insert(node.block.header.number, *hash);
            }
        }

        self.canonical_head = new_head;
        tracing::info!(?old_head, ?new_head, "canonical head changed");
    }
}
