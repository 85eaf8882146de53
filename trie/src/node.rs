use crate::nibbles::Nibbles;
use primitives::Hash;
use rlp::Item;

/// A reference to a child node. Before [`crate::Trie::commit`], a
/// freshly written subtree lives only in the in-memory arena and is
/// addressed by index; after commit every reference is a content
/// hash resolvable through the backing [`crate::KvStore`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeRef {
    Empty,
    Hash(Hash),
    Arena(usize),
}

impl NodeRef {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, NodeRef::Empty)
    }
}

/// One of the four node shapes of a Modified Merkle Patricia Trie
/// (Yellow Paper Appendix D).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TrieNode {
    Leaf {
        path: Nibbles,
        value: Vec<u8>,
    },
    Extension {
        path: Nibbles,
        child: NodeRef,
    },
    Branch {
        children: Box<[NodeRef; 16]>,
        value: Option<Vec<u8>>,
    },
}

/// Encode a child reference for embedding in a parent's RLP item:
/// hashes that are 32 bytes always appear as an RLP byte string
/// (never inlined short-form, this trie never needs that optimization).
pub fn child_item(hash: Hash) -> Item {
    Item::Bytes(hash.as_bytes().to_vec())
}

pub fn empty_child_item() -> Item {
    Item::Bytes(Vec::new())
}

/// Decode a node from its RLP encoding. Child references must already
/// be resolved hashes (or empty) — this is the shape every node takes
/// once read back from the backing store or from a proof.
pub fn decode_node(item: &Item) -> Result<TrieNode, crate::error::TrieError> {
    use crate::error::TrieError;

    let items = item.as_list().map_err(TrieError::CorruptNode)?;
    match items.len() {
        2 => {
            let (path, is_leaf) = Nibbles::decode_hex_prefix(items[0].as_bytes().map_err(TrieError::CorruptNode)?);
            if is_leaf {
                let value = items[1].as_bytes().map_err(TrieError::CorruptNode)?.to_vec();
                Ok(TrieNode::Leaf { path, value })
            } else {
                let child = decode_child_ref(&items[1])?;
                Ok(TrieNode::Extension { path, child })
            }
        }
        17 => {
            let mut children = [NodeRef::Empty; 16];
            for (i, slot) in children.iter_mut().enumerate() {
                *slot = decode_child_ref(&items[i])?;
            }
            let value_bytes = items[16].as_bytes().map_err(TrieError::CorruptNode)?;
            let value = if value_bytes.is_empty() {
                None
            } else {
                Some(value_bytes.to_vec())
            };
            Ok(TrieNode::Branch {
                children: Box::new(children),
                value,
            })
        }
        _ => Err(TrieError::MalformedNode),
    }
}

fn decode_child_ref(item: &Item) -> Result<NodeRef, crate::error::TrieError> {
    use crate::error::TrieError;

    let bytes = item.as_bytes().map_err(TrieError::CorruptNode)?;
    if bytes.is_empty() {
        Ok(NodeRef::Empty)
    } else if bytes.len() == 32 {
        Ok(NodeRef::Hash(
            Hash::from_slice(bytes).ok_or(TrieError::MalformedNode)?,
        ))
    } else {
        Err(TrieError::MalformedNode)
    }
}
