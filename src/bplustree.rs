//! This module implements an ordered key/value map backed by an in-memory
//! B+Tree.
//!
//! The tree keeps every key/value pair on the leaf level, chained in
//! ascending order across node boundaries, and grows by splitting nodes
//! that overflow their fixed fanout. Internal nodes hold separator records
//! that route descent; the driver below owns the recursion and the
//! root-growth protocol, while the chain surgery itself lives on the node
//! types in the `node` submodule.

pub(crate) mod arena;
mod iter;
mod node;

use crate::types::{EntryId, NodeId, RecordId};
use arena::Arena;
pub use iter::{Iter, Keys, Values};
use node::{
    Entry, EntryLink, InsertOutcome, InternalNode, LeafNode, Node, Record, RecordInsert,
    RecordLink, RemoveOutcome,
};

#[cfg(test)]
mod proptests;

/// The maximum number of entries (leaf) or records (internal) a node may
/// hold before it must split.
pub const DEFAULT_FANOUT: usize = 50;

// Splitting consumes the midpoint, so anything smaller cannot leave both
// halves non-empty.
const MIN_FANOUT: usize = 4;

/// Construction-time tree parameters.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Config {
    fanout: usize,
}

impl Config {
    pub fn new(fanout: usize) -> Self {
        assert!(fanout >= MIN_FANOUT, "fanout must be at least {MIN_FANOUT}");
        Self { fanout }
    }

    pub fn fanout(&self) -> usize {
        self.fanout
    }

    /// The smallest number of entries a leaf may hold after a removal.
    pub fn min_occupancy(&self) -> usize {
        self.fanout / 2
    }
}

/// An in-memory ordered map backed by a B+Tree with a linked leaf level.
///
/// Every key/value pair lives in a leaf; leaves are chained in ascending
/// key order, so [`iter`](Self::iter) walks the whole map without touching
/// internal nodes. Nodes hold at most [`fanout`](Self::fanout) entries
/// (default [`DEFAULT_FANOUT`]) and split when they overflow, growing the
/// tree by one level whenever the root itself splits.
///
/// Two behaviors differ from [`std::collections::BTreeMap`] and are part
/// of the contract:
///
/// - [`insert`](Self::insert) never overwrites: inserting an existing key
///   returns `false` and keeps the first value. Callers needing update
///   semantics compose it from `remove` + `insert`.
/// - [`remove`](Self::remove) is occupancy-guarded: a removal that would
///   leave a leaf with fewer than `fanout / 2` entries is refused and
///   returns `false`, leaving the map unchanged. No merge or borrow
///   between siblings is performed. The guard also applies to a root leaf,
///   so maps that never grew past one node refuse removals at or below the
///   minimum.
///
/// # Examples
///
/// ```rust
/// use bplustree_map::BPlusTreeMap;
///
/// let mut map = BPlusTreeMap::new();
/// assert!(map.insert(1, "one"));
/// assert!(map.insert(2, "two"));
///
/// // Duplicate keys keep their first value.
/// assert!(!map.insert(1, "uno"));
/// assert_eq!(map.get(&1), Some(&"one"));
///
/// assert_eq!(map.iter().count(), 2);
/// ```
///
/// A smaller fanout is occasionally useful, mainly to exercise deep trees
/// in tests:
///
/// ```rust
/// use bplustree_map::BPlusTreeMap;
///
/// let mut map = BPlusTreeMap::with_fanout(4);
/// for i in 0..100u32 {
///     map.insert(i, i * 10);
/// }
/// assert!(map.height() > 2);
/// assert_eq!(map.get(&42), Some(&420));
/// ```
///
/// The map is single-threaded: all operations run to completion on the
/// caller's thread, and callers needing concurrent access must serialize
/// externally.
pub struct BPlusTreeMap<K, V> {
    // The root node, absent while the map is empty. It is replaced (not
    // mutated) exactly when the old root overflows.
    root: Option<NodeId>,

    nodes: Arena<NodeId, Node>,
    entries: Arena<EntryId, Entry<K, V>>,
    records: Arena<RecordId, Record<K>>,

    config: Config,

    // The number of entries in the map.
    length: u64,
}

impl<K, V> Default for BPlusTreeMap<K, V>
where
    K: Ord + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> BPlusTreeMap<K, V>
where
    K: Ord + Clone,
{
    /// Creates an empty map with the default fanout of [`DEFAULT_FANOUT`].
    pub fn new() -> Self {
        Self::with_fanout(DEFAULT_FANOUT)
    }

    /// Creates an empty map whose nodes hold at most `fanout` entries.
    ///
    /// Panics if `fanout` is less than 4.
    pub fn with_fanout(fanout: usize) -> Self {
        Self {
            root: None,
            nodes: Arena::new(),
            entries: Arena::new(),
            records: Arena::new(),
            config: Config::new(fanout),
            length: 0,
        }
    }

    /// The maximum number of entries a node of this map may hold.
    pub fn fanout(&self) -> usize {
        self.config.fanout()
    }

    /// Inserts a key-value pair into the map.
    ///
    /// Returns `true` iff the key was not present. If the key already
    /// exists the stored value is kept and `value` is dropped.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        let Some(mut root_id) = self.root else {
            // Empty tree: the first entry becomes a single-entry leaf root.
            let entry = self.entries.alloc(Entry {
                key,
                value,
                next: EntryLink::End,
            });
            let root = self.nodes.alloc(Node::Leaf(LeafNode {
                head: EntryLink::Next(entry),
                len: 1,
            }));
            self.root = Some(root);
            self.length = 1;
            return true;
        };

        let mut key = key;
        let mut value = value;
        loop {
            match self.insert_into(root_id, key, value) {
                InsertOutcome::Inserted => {
                    self.length += 1;
                    return true;
                }
                InsertOutcome::Duplicate => return false,
                InsertOutcome::Full { key: k, value: v } => {
                    // Root overflow: wrap the old root and its split
                    // sibling in a fresh one-record internal node, growing
                    // the tree by exactly one level, then retry.
                    root_id = self.grow_root(root_id);
                    key = k;
                    value = v;
                }
            }
        }
    }

    /// Returns a reference to the value for `key`, if present.
    pub fn get(&self, key: &K) -> Option<&V> {
        let leaf_id = self.find_leaf(key)?;
        self.nodes.get(leaf_id).as_leaf().get(&self.entries, key)
    }

    /// Returns `true` if the key exists.
    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Removes `key` from the map.
    ///
    /// Returns `true` iff the key was present *and* the leaf holding it
    /// could give it up without falling below minimum occupancy. A refused
    /// removal leaves the map unchanged and returns `false`; see the type
    /// docs for the guard's rationale.
    pub fn remove(&mut self, key: &K) -> bool {
        let Some(leaf_id) = self.find_leaf(key) else {
            return false;
        };
        let config = self.config;
        let leaf = self.nodes.get_mut(leaf_id).as_leaf_mut();
        match leaf.remove(&mut self.entries, key, config) {
            RemoveOutcome::Removed => {
                self.length -= 1;
                true
            }
            RemoveOutcome::NotFound | RemoveOutcome::WouldUnderflow => false,
        }
    }

    /// Returns the first key-value pair in the map. The key in this pair
    /// is the minimum key in the map.
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        let leaf_id = self.leftmost_leaf()?;
        let leaf = self.nodes.get(leaf_id).as_leaf();
        leaf.entries(&self.entries).next()
    }

    /// Returns the last key-value pair in the map. The key in this pair
    /// is the maximum key in the map.
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        let leaf_id = self.rightmost_leaf()?;
        let leaf = self.nodes.get(leaf_id).as_leaf();
        let tail = leaf.entry_at(&self.entries, leaf.len - 1);
        let entry = self.entries.get(tail);
        Some((&entry.key, &entry.value))
    }

    /// Returns an iterator over the entries in ascending key order.
    ///
    /// The iterator follows the leaf chain end to end; every call starts a
    /// fresh walk from the leftmost leaf.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self)
    }

    /// Returns an iterator over the keys in ascending order.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys::new(self)
    }

    /// Returns an iterator over the values, ordered by key.
    pub fn values(&self) -> Values<'_, K, V> {
        Values::new(self)
    }

    /// Returns `true` if the map contains no elements.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns the number of elements in the map.
    pub fn len(&self) -> u64 {
        self.length
    }

    /// The number of levels in the tree; 0 for an empty map.
    pub fn height(&self) -> usize {
        let Some(mut id) = self.root else {
            return 0;
        };
        let mut height = 1;
        loop {
            match self.nodes.get(id) {
                Node::Leaf(_) => return height,
                Node::Internal(internal) => {
                    id = internal.first_child(&self.records);
                    height += 1;
                }
            }
        }
    }

    /// Removes all elements from the map, releasing the arena storage.
    pub fn clear(&mut self) {
        self.root = None;
        self.nodes.clear();
        self.entries.clear();
        self.records.clear();
        self.length = 0;
    }

    /// Recursively inserts into the subtree rooted at `node_id`.
    ///
    /// A `Full` outcome means `node_id` itself could not absorb the insert
    /// (leaf at capacity, or an internal node at capacity that would have
    /// to absorb a split child); the caller splits it and retries.
    fn insert_into(&mut self, node_id: NodeId, key: K, value: V) -> InsertOutcome<K, V> {
        if self.nodes.get(node_id).is_leaf() {
            let config = self.config;
            let leaf = self.nodes.get_mut(node_id).as_leaf_mut();
            return leaf.insert(&mut self.entries, key, value, config);
        }

        let child_id = self.child_for_key(node_id, &key);
        match self.insert_into(child_id, key, value) {
            InsertOutcome::Full { key, value } => {
                if self.nodes.get(node_id).as_internal().len == self.config.fanout() {
                    // No room to absorb a split child; the caller must
                    // split this node first.
                    return InsertOutcome::Full { key, value };
                }

                let (sibling_id, separator) = self.split_node(child_id);
                let config = self.config;
                let internal = self.nodes.get_mut(node_id).as_internal_mut();
                match internal.insert_record(&mut self.records, sibling_id, separator, config) {
                    RecordInsert::Inserted => {}
                    RecordInsert::Full => {
                        unreachable!("node capacity was checked before the child split")
                    }
                }

                // Re-descend: the key now lands in one of the two halves.
                let child_id = self.child_for_key(node_id, &key);
                match self.insert_into(child_id, key, value) {
                    InsertOutcome::Full { .. } => {
                        panic!("child reported itself full immediately after a split")
                    }
                    outcome => outcome,
                }
            }
            outcome => outcome,
        }
    }

    /// Splits the full root and installs a new one-record internal node
    /// above it, returning the new root's id.
    fn grow_root(&mut self, root_id: NodeId) -> NodeId {
        let (sibling_id, separator) = self.split_node(root_id);
        let record = self.records.alloc(Record {
            child: root_id,
            separator,
            next: RecordLink::LastChild(sibling_id),
        });
        let new_root = self.nodes.alloc(Node::Internal(InternalNode {
            head: record,
            len: 1,
        }));
        self.root = Some(new_root);
        new_root
    }

    /// Splits the full node `node_id`, returning the new right sibling and
    /// the separator the parent must adopt.
    fn split_node(&mut self, node_id: NodeId) -> (NodeId, K) {
        if self.nodes.get(node_id).is_leaf() {
            self.split_leaf(node_id)
        } else {
            self.split_internal(node_id)
        }
    }

    fn split_leaf(&mut self, leaf_id: NodeId) -> (NodeId, K) {
        // The sibling's id must exist before the split so the old tail can
        // be relinked to it; a placeholder holds the slot.
        let sibling_id = self.nodes.alloc(Node::Leaf(LeafNode::new()));
        let config = self.config;
        let leaf = self.nodes.get_mut(leaf_id).as_leaf_mut();
        let (sibling, separator) = leaf.split(&mut self.entries, sibling_id, config);
        *self.nodes.get_mut(sibling_id) = Node::Leaf(sibling);
        (sibling_id, separator)
    }

    fn split_internal(&mut self, node_id: NodeId) -> (NodeId, K) {
        let config = self.config;
        let internal = self.nodes.get_mut(node_id).as_internal_mut();
        let (sibling, separator) = internal.split(&mut self.records, config);
        let sibling_id = self.nodes.alloc(Node::Internal(sibling));
        (sibling_id, separator)
    }

    /// The child of internal node `node_id` whose subtree covers `key`.
    fn child_for_key(&self, node_id: NodeId, key: &K) -> NodeId {
        self.nodes
            .get(node_id)
            .as_internal()
            .child_for_key(&self.records, key)
    }

    /// Descends to the leaf whose key range covers `key`.
    fn find_leaf(&self, key: &K) -> Option<NodeId> {
        let mut id = self.root?;
        loop {
            match self.nodes.get(id) {
                Node::Leaf(_) => return Some(id),
                Node::Internal(internal) => id = internal.child_for_key(&self.records, key),
            }
        }
    }

    fn leftmost_leaf(&self) -> Option<NodeId> {
        let mut id = self.root?;
        loop {
            match self.nodes.get(id) {
                Node::Leaf(_) => return Some(id),
                Node::Internal(internal) => id = internal.first_child(&self.records),
            }
        }
    }

    fn rightmost_leaf(&self) -> Option<NodeId> {
        let mut id = self.root?;
        loop {
            match self.nodes.get(id) {
                Node::Leaf(_) => return Some(id),
                Node::Internal(internal) => id = internal.last_child(&self.records),
            }
        }
    }
}

#[cfg(test)]
impl<K, V> BPlusTreeMap<K, V>
where
    K: Ord + Clone + std::fmt::Debug,
{
    /// Validates every structural invariant of the tree. Test-only.
    pub(crate) fn check_invariants(&self) {
        let Some(root_id) = self.root else {
            assert_eq!(self.length, 0);
            assert_eq!(self.nodes.len(), 0);
            assert_eq!(self.entries.len(), 0);
            assert_eq!(self.records.len(), 0);
            return;
        };

        // Collect the leaves left to right through the parent structure,
        // checking per-node invariants and equal leaf depth on the way.
        let mut leaves = Vec::new();
        let mut leaf_depth = None;
        self.check_subtree(root_id, 1, &mut leaf_depth, &mut leaves);

        // The leaf chain must visit the same leaves in the same order, and
        // yield every key in strictly ascending order.
        let mut total = 0;
        let mut last_key: Option<&K> = None;
        for (i, &leaf_id) in leaves.iter().enumerate() {
            let leaf = self.nodes.get(leaf_id).as_leaf();
            let walked = leaf.entries(&self.entries).count();
            assert_eq!(walked, leaf.len, "stored leaf len disagrees with its chain");
            total += walked;

            for (key, _) in leaf.entries(&self.entries) {
                if let Some(prev) = last_key {
                    assert!(prev < key, "leaf chain is not strictly ascending");
                }
                last_key = Some(key);
            }

            let tail = leaf.entry_at(&self.entries, leaf.len - 1);
            match self.entries.get(tail).next {
                EntryLink::Sibling(next_leaf) => {
                    assert_eq!(
                        Some(&next_leaf),
                        leaves.get(i + 1),
                        "sibling link skips or reorders leaves"
                    );
                }
                EntryLink::End => {
                    assert_eq!(i, leaves.len() - 1, "end-of-tree link before the last leaf");
                }
                EntryLink::Next(_) => panic!("leaf tail links past its own node"),
            }
        }
        assert_eq!(total as u64, self.length, "stored length disagrees with the chain");
    }

    fn check_subtree(
        &self,
        node_id: NodeId,
        depth: usize,
        leaf_depth: &mut Option<usize>,
        leaves: &mut Vec<NodeId>,
    ) {
        match self.nodes.get(node_id) {
            Node::Leaf(leaf) => {
                assert!(leaf.len <= self.config.fanout());
                match leaf_depth {
                    Some(expected) => assert_eq!(*expected, depth, "leaves at unequal depth"),
                    None => *leaf_depth = Some(depth),
                }
                let mut prev: Option<&K> = None;
                for (key, _) in leaf.entries(&self.entries) {
                    if let Some(p) = prev {
                        assert!(p < key, "leaf entries out of order");
                    }
                    prev = Some(key);
                }
                leaves.push(node_id);
            }
            Node::Internal(internal) => {
                assert!(internal.len >= 1);
                assert!(internal.len <= self.config.fanout());

                let mut cursor = internal.head;
                let mut walked = 0;
                let mut prev_separator: Option<&K> = None;
                loop {
                    let record = self.records.get(cursor);
                    walked += 1;
                    if let Some(prev) = prev_separator {
                        assert!(prev < &record.separator, "separators out of order");
                    }
                    prev_separator = Some(&record.separator);

                    self.check_subtree(record.child, depth + 1, leaf_depth, leaves);

                    // A separator is promoted as the following child's
                    // minimum, but a removal may later unlink that minimum
                    // without re-keying the parent. The separator therefore
                    // stays a bound: above everything in the preceding
                    // subtree, at or below the following subtree's minimum.
                    let preceding_max = self
                        .subtree_max(record.child)
                        .expect("child subtree is empty");
                    assert!(
                        preceding_max < &record.separator,
                        "separator does not bound the preceding child"
                    );
                    let following = match record.next {
                        RecordLink::Next(id) => self.records.get(id).child,
                        RecordLink::LastChild(child) => child,
                    };
                    let following_min = self
                        .subtree_min(following)
                        .expect("child subtree is empty");
                    assert!(
                        &record.separator <= following_min,
                        "separator exceeds the following child's minimum"
                    );

                    match record.next {
                        RecordLink::Next(id) => cursor = id,
                        RecordLink::LastChild(child) => {
                            self.check_subtree(child, depth + 1, leaf_depth, leaves);
                            break;
                        }
                    }
                }
                assert_eq!(walked, internal.len, "stored record count disagrees with chain");
            }
        }
    }

    fn subtree_min(&self, node_id: NodeId) -> Option<&K> {
        let mut id = node_id;
        loop {
            match self.nodes.get(id) {
                Node::Leaf(leaf) => return leaf.entries(&self.entries).next().map(|(k, _)| k),
                Node::Internal(internal) => id = internal.first_child(&self.records),
            }
        }
    }

    fn subtree_max(&self, node_id: NodeId) -> Option<&K> {
        let mut id = node_id;
        loop {
            match self.nodes.get(id) {
                Node::Leaf(leaf) => {
                    if leaf.len == 0 {
                        return None;
                    }
                    let tail = leaf.entry_at(&self.entries, leaf.len - 1);
                    return Some(&self.entries.get(tail).key);
                }
                Node::Internal(internal) => id = internal.last_child(&self.records),
            }
        }
    }
}
