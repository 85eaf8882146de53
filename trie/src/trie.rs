use crate::error::TrieError;
use crate::nibbles::Nibbles;
use crate::node::{child_item, decode_node, empty_child_item, NodeRef, TrieNode};
use crate::store::KvStore;
use primitives::{Hash, EMPTY_TRIE_ROOT};
use rlp::Item;

/// A Modified Merkle Patricia Trie over a content-addressed [`KvStore`].
///
/// Writes (`put`/`delete`) build new nodes in an in-memory arena,
/// indexed rather than hashed, so a batch of edits costs one allocation
/// per touched node instead of rehashing the whole trie on every write.
/// [`Trie::commit`] walks the arena once, hashes it bottom-up, and
/// flushes it into the store — that is the only point at which node
/// hashes (and therefore the root) are computed.
#[derive(Clone)]
pub struct Trie<S: KvStore> {
    store: S,
    arena: Vec<TrieNode>,
    root: NodeRef,
}

impl<S: KvStore> Trie<S> {
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            arena: Vec::new(),
            root: NodeRef::Empty,
        }
    }

    #[must_use]
    pub fn from_root(store: S, root: Hash) -> Self {
        let root = if root == EMPTY_TRIE_ROOT {
            NodeRef::Empty
        } else {
            NodeRef::Hash(root)
        };
        Self {
            store,
            arena: Vec::new(),
            root,
        }
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, TrieError> {
        let nibbles = Nibbles::from_bytes(key);
        self.get_at(self.root, &nibbles)
    }

    pub fn put(&mut self, key: &[u8], value: Vec<u8>) -> Result<(), TrieError> {
        let nibbles = Nibbles::from_bytes(key);
        self.root = self.put_at(self.root, &nibbles, value)?;
        Ok(())
    }

    pub fn delete(&mut self, key: &[u8]) -> Result<(), TrieError> {
        let nibbles = Nibbles::from_bytes(key);
        self.root = self.delete_at(self.root, &nibbles)?;
        Ok(())
    }

    /// Hash every arena-resident node bottom-up, write the RLP encoding
    /// of each into the backing store, and return the new root hash.
    /// Clears the arena: after this call every node reference in the
    /// trie is a [`NodeRef::Hash`].
    pub fn commit(&mut self) -> Result<Hash, TrieError> {
        let hash = self.commit_ref(self.root)?;
        self.arena.clear();
        self.root = if hash == EMPTY_TRIE_ROOT {
            NodeRef::Empty
        } else {
            NodeRef::Hash(hash)
        };
        Ok(hash)
    }

    /// Collect the RLP encoding of every node on the path from the root
    /// to `key`, suitable for a light client to verify with
    /// [`verify_proof`] against a known root. Requires the trie to
    /// already be committed (every reference on the path resolvable
    /// through the store).
    pub fn generate_proof(&self, key: &[u8]) -> Result<Vec<Vec<u8>>, TrieError> {
        let nibbles = Nibbles::from_bytes(key);
        let mut proof = Vec::new();
        let mut current = self.root;
        let mut depth = 0;

        loop {
            let Some(node) = self.resolve(current)? else {
                break;
            };
            proof.push(self.encode_shallow(&node));

            match node {
                TrieNode::Leaf { .. } => break,
                TrieNode::Extension { path, child } => {
                    let remaining = nibbles.suffix(depth);
                    if remaining.len() < path.len() || remaining.prefix(path.len()) != path {
                        break;
                    }
                    depth += path.len();
                    current = child;
                }
                TrieNode::Branch { children, .. } => {
                    if depth == nibbles.len() {
                        break;
                    }
                    let nibble = nibbles.at(depth) as usize;
                    depth += 1;
                    current = children[nibble];
                }
            }
        }
        Ok(proof)
    }

    fn resolve(&self, r: NodeRef) -> Result<Option<TrieNode>, TrieError> {
        match r {
            NodeRef::Empty => Ok(None),
            NodeRef::Arena(idx) => Ok(Some(self.arena[idx].clone())),
            NodeRef::Hash(hash) => {
                let bytes = self.store.get(&hash).ok_or(TrieError::MissingNode(hash))?;
                let item = rlp::decode_exact(&bytes).map_err(TrieError::CorruptNode)?;
                Ok(Some(decode_node(&item)?))
            }
        }
    }

    fn alloc(&mut self, node: TrieNode) -> NodeRef {
        self.arena.push(node);
        NodeRef::Arena(self.arena.len() - 1)
    }

    fn get_at(&self, node_ref: NodeRef, remaining: &Nibbles) -> Result<Option<Vec<u8>>, TrieError> {
        let Some(node) = self.resolve(node_ref)? else {
            return Ok(None);
        };
        match node {
            TrieNode::Leaf { path, value } => {
                if *remaining == path {
                    Ok(Some(value))
                } else {
                    Ok(None)
                }
            }
            TrieNode::Extension { path, child } => {
                if remaining.len() >= path.len() && remaining.prefix(path.len()) == path {
                    self.get_at(child, &remaining.suffix(path.len()))
                } else {
                    Ok(None)
                }
            }
            TrieNode::Branch { children, value } => {
                if remaining.is_empty() {
                    Ok(value)
                } else {
                    let nibble = remaining.at(0) as usize;
                    self.get_at(children[nibble], &remaining.suffix(1))
                }
            }
        }
    }

    fn put_at(
        &mut self,
        node_ref: NodeRef,
        remaining: &Nibbles,
        value: Vec<u8>,
    ) -> Result<NodeRef, TrieError> {
        match self.resolve(node_ref)? {
            None => Ok(self.alloc(TrieNode::Leaf {
                path: remaining.clone(),
                value,
            })),

            Some(TrieNode::Leaf { path, value: old_value }) => {
                if *remaining == path {
                    return Ok(self.alloc(TrieNode::Leaf { path, value }));
                }
                let common = remaining.common_prefix_len(&path);
                let mut children = [NodeRef::Empty; 16];
                let mut branch_value = None;

                if common == path.len() {
                    branch_value = Some(old_value);
                } else {
                    let idx = path.at(common);
                    let leaf = self.alloc(TrieNode::Leaf {
                        path: path.suffix(common + 1),
                        value: old_value,
                    });
                    children[idx as usize] = leaf;
                }

                if common == remaining.len() {
                    branch_value = Some(value);
                } else {
                    let idx = remaining.at(common);
                    let leaf = self.alloc(TrieNode::Leaf {
                        path: remaining.suffix(common + 1),
                        value,
                    });
                    children[idx as usize] = leaf;
                }

                let branch = self.alloc(TrieNode::Branch {
                    children: Box::new(children),
                    value: branch_value,
                });
                self.merge_prefix(remaining.prefix(common), branch)
            }

            Some(TrieNode::Extension { path, child }) => {
                if remaining.len() >= path.len() && remaining.prefix(path.len()) == path {
                    let new_child = self.put_at(child, &remaining.suffix(path.len()), value)?;
                    return Ok(self.alloc(TrieNode::Extension { path, child: new_child }));
                }

                let common = remaining.common_prefix_len(&path);
                let mut children = [NodeRef::Empty; 16];

                let old_idx = path.at(common);
                children[old_idx as usize] = self.merge_prefix(path.suffix(common + 1), child)?;

                let branch_value = if common == remaining.len() {
                    Some(value)
                } else {
                    let new_idx = remaining.at(common);
                    let leaf = self.alloc(TrieNode::Leaf {
                        path: remaining.suffix(common + 1),
                        value,
                    });
                    children[new_idx as usize] = leaf;
                    None
                };

                let branch = self.alloc(TrieNode::Branch {
                    children: Box::new(children),
                    value: branch_value,
                });
                self.merge_prefix(remaining.prefix(common), branch)
            }

            Some(TrieNode::Branch { mut children, value: branch_value }) => {
                if remaining.is_empty() {
                    Ok(self.alloc(TrieNode::Branch { children, value: Some(value) }))
                } else {
                    let idx = remaining.at(0) as usize;
                    let new_child = self.put_at(children[idx], &remaining.suffix(1), value)?;
                    children[idx] = new_child;
                    Ok(self.alloc(TrieNode::Branch { children, value: branch_value }))
                }
            }
        }
    }

    fn delete_at(&mut self, node_ref: NodeRef, remaining: &Nibbles) -> Result<NodeRef, TrieError> {
        let Some(node) = self.resolve(node_ref)? else {
            return Ok(NodeRef::Empty);
        };
        match node {
            TrieNode::Leaf { path, value } => {
                if *remaining == path {
                    Ok(NodeRef::Empty)
                } else {
                    Ok(self.alloc(TrieNode::Leaf { path, value }))
                }
            }

            TrieNode::Extension { path, child } => {
                if remaining.len() < path.len() || remaining.prefix(path.len()) != path {
                    return Ok(self.alloc(TrieNode::Extension { path, child }));
                }
                let new_child = self.delete_at(child, &remaining.suffix(path.len()))?;
                if new_child.is_empty() {
                    Ok(NodeRef::Empty)
                } else {
                    self.merge_prefix(path, new_child)
                }
            }

            TrieNode::Branch { mut children, value } => {
                if remaining.is_empty() {
                    self.collapse_branch(children, None)
                } else {
                    let idx = remaining.at(0) as usize;
                    let new_child = self.delete_at(children[idx], &remaining.suffix(1))?;
                    children[idx] = new_child;
                    self.collapse_branch(children, value)
                }
            }
        }
    }

    /// After removing a value from a branch, restore canonical form:
    /// a branch with no children and a value becomes a leaf, one with a
    /// single child and no value becomes that child prefixed by its
    /// nibble, and one with nothing left collapses to empty.
    fn collapse_branch(
        &mut self,
        children: Box<[NodeRef; 16]>,
        value: Option<Vec<u8>>,
    ) -> Result<NodeRef, TrieError> {
        let occupied: Vec<usize> = children
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_empty())
            .map(|(i, _)| i)
            .collect();

        match (occupied.len(), &value) {
            (0, None) => Ok(NodeRef::Empty),
            (0, Some(v)) => Ok(self.alloc(TrieNode::Leaf {
                path: Nibbles::from_nibbles(Vec::new()),
                value: v.clone(),
            })),
            (1, None) => {
                let idx = occupied[0];
                let prefix = Nibbles::from_nibbles(vec![idx as u8]);
                self.merge_prefix(prefix, children[idx])
            }
            _ => Ok(self.alloc(TrieNode::Branch { children, value })),
        }
    }

    /// Prefix `child` with `prefix` nibbles, merging into a single
    /// leaf/extension where possible instead of creating a
    /// zero-length-saving but redundant extension-of-extension.
    fn merge_prefix(&mut self, prefix: Nibbles, child: NodeRef) -> Result<NodeRef, TrieError> {
        if prefix.is_empty() {
            return Ok(child);
        }
        match self.resolve(child)? {
            None => Ok(NodeRef::Empty),
            Some(TrieNode::Leaf { path, value }) => Ok(self.alloc(TrieNode::Leaf {
                path: prefix.concat(&path),
                value,
            })),
            Some(TrieNode::Extension { path, child: grandchild }) => {
                Ok(self.alloc(TrieNode::Extension {
                    path: prefix.concat(&path),
                    child: grandchild,
                }))
            }
            Some(TrieNode::Branch { .. }) => Ok(self.alloc(TrieNode::Extension { path: prefix, child })),
        }
    }

    fn commit_ref(&mut self, r: NodeRef) -> Result<Hash, TrieError> {
        match r {
            NodeRef::Empty => Ok(EMPTY_TRIE_ROOT),
            NodeRef::Hash(hash) => Ok(hash),
            NodeRef::Arena(idx) => {
                let node = self.arena[idx].clone();
                let item = match &node {
                    TrieNode::Leaf { path, value } => Item::List(vec![
                        Item::Bytes(path.encode_hex_prefix(true)),
                        Item::Bytes(value.clone()),
                    ]),
                    TrieNode::Extension { path, child } => {
                        let child_hash = self.commit_ref(*child)?;
                        let child_item = if child.is_empty() {
                            empty_child_item()
                        } else {
                            child_item(child_hash)
                        };
                        Item::List(vec![Item::Bytes(path.encode_hex_prefix(false)), child_item])
                    }
                    TrieNode::Branch { children, value } => {
                        let mut items = Vec::with_capacity(17);
                        for c in children.iter() {
                            let hash = self.commit_ref(*c)?;
                            items.push(if c.is_empty() { empty_child_item() } else { child_item(hash) });
                        }
                        items.push(match value {
                            Some(v) => Item::Bytes(v.clone()),
                            None => Item::Bytes(Vec::new()),
                        });
                        Item::List(items)
                    }
                };
                let encoded = rlp::encode(&item);
                let hash = crypto::keccak256(&encoded);
                self.store.put(hash, encoded);
                Ok(hash)
            }
        }
    }

    fn encode_shallow(&self, node: &TrieNode) -> Vec<u8> {
        let item = match node {
            TrieNode::Leaf { path, value } => Item::List(vec![
                Item::Bytes(path.encode_hex_prefix(true)),
                Item::Bytes(value.clone()),
            ]),
            TrieNode::Extension { path, child } => {
                let child_item = match child {
                    NodeRef::Empty => empty_child_item(),
                    NodeRef::Hash(hash) => child_item(*hash),
                    NodeRef::Arena(_) => empty_child_item(),
                };
                Item::List(vec![Item::Bytes(path.encode_hex_prefix(false)), child_item])
            }
            TrieNode::Branch { children, value } => {
                let mut items: Vec<Item> = children
                    .iter()
                    .map(|c| match c {
                        NodeRef::Empty => empty_child_item(),
                        NodeRef::Hash(hash) => child_item(*hash),
                        NodeRef::Arena(_) => empty_child_item(),
                    })
                    .collect();
                items.push(match value {
                    Some(v) => Item::Bytes(v.clone()),
                    None => Item::Bytes(Vec::new()),
                });
                Item::List(items)
            }
        };
        rlp::encode(&item)
    }
}

/// Verify a proof produced by [`Trie::generate_proof`] against a known
/// root, without needing a live [`Trie`] or [`KvStore`] — the shape a
/// light client consumes it in.
pub fn verify_proof(root: Hash, key: &[u8], proof: &[Vec<u8>]) -> Result<Option<Vec<u8>>, TrieError> {
    let nibbles = Nibbles::from_bytes(key);
    let mut expected_hash = root;
    let mut depth = 0;

    for node_bytes in proof {
        let hash = crypto::keccak256(node_bytes);
        if hash != expected_hash {
            return Err(TrieError::MissingNode(expected_hash));
        }
        let item = rlp::decode_exact(node_bytes).map_err(TrieError::CorruptNode)?;
        let node = decode_node(&item)?;

        match node {
            TrieNode::Leaf { path, value } => {
                return if nibbles.suffix(depth) == path {
                    Ok(Some(value))
                } else {
                    Ok(None)
                };
            }
            TrieNode::Extension { path, child } => {
                let remaining = nibbles.suffix(depth);
                if remaining.len() < path.len() || remaining.prefix(path.len()) != path {
                    return Ok(None);
                }
                depth += path.len();
                expected_hash = match child {
                    NodeRef::Hash(hash) => hash,
                    NodeRef::Empty => return Ok(None),
                    NodeRef::Arena(_) => return Err(TrieError::MalformedNode),
                };
            }
            TrieNode::Branch { children, value } => {
                if depth == nibbles.len() {
                    return Ok(value);
                }
                let nibble = nibbles.at(depth) as usize;
                match children[nibble] {
                    NodeRef::Empty => return Ok(None),
                    NodeRef::Hash(hash) => {
                        expected_hash = hash;
                        depth += 1;
                    }
                    NodeRef::Arena(_) => return Err(TrieError::MalformedNode),
                }
            }
        }
    }
    Ok(None)
}
