//! The building blocks of the tree: leaf entries chained in sorted order,
//! separator records chained over child nodes, and the two node shapes.
//!
//! A leaf's last entry links either to the sibling leaf that continues the
//! global key order or to the end of the tree, so the leaf level forms one
//! singly linked chain spanning every node. Internal nodes chain separator
//! records; a record's separator is promoted as the minimum key of the
//! child that *follows* it (a removal may later unlink that minimum,
//! leaving the separator a lower bound), and the last record links directly
//! to the final child.

use super::{arena::Arena, Config};
use crate::types::{EntryId, NodeId, RecordId};
use std::cmp::Ordering;


/// What follows a leaf entry in the global key order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum EntryLink {
    /// Another entry in the same leaf.
    Next(EntryId),
    /// The sibling leaf that continues the order.
    Sibling(NodeId),
    /// Nothing; this is the greatest entry in the tree.
    End,
}

/// What follows a separator record within an internal node.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum RecordLink {
    /// Another record in the same node.
    Next(RecordId),
    /// The node's final child, which has no separator after it.
    LastChild(NodeId),
}

/// One key/value pair on the leaf level.
#[derive(Debug)]
pub(crate) struct Entry<K, V> {
    pub key: K,
    pub value: V,
    pub next: EntryLink,
}

/// One (child, separator) pair on the internal level. `separator` bounds
/// the child that follows this record from below; it is that child's
/// minimum key at the time of the split that promoted it.
#[derive(Debug)]
pub(crate) struct Record<K> {
    pub child: NodeId,
    pub separator: K,
    pub next: RecordLink,
}

/// The outcome of inserting a key/value pair into a subtree or leaf.
#[derive(Debug)]
pub(crate) enum InsertOutcome<K, V> {
    Inserted,
    /// The key already exists; the stored value is untouched.
    Duplicate,
    /// The node is at capacity and refused the insert unchanged. The pair
    /// is handed back so the caller can split and retry.
    Full { key: K, value: V },
}

/// The outcome of absorbing a freshly split child into an internal node.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum RecordInsert {
    Inserted,
    /// The node is at capacity and refused unchanged.
    Full,
}

/// The outcome of removing a key from a leaf.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum RemoveOutcome {
    Removed,
    NotFound,
    /// The key is present, but removing it would drop the leaf below
    /// minimum occupancy. The leaf is unchanged.
    WouldUnderflow,
}

/// A node of the tree. Exactly two shapes, so no dispatch beyond a match.
#[derive(Debug)]
pub(crate) enum Node {
    Leaf(LeafNode),
    Internal(InternalNode),
}

impl Node {
    pub fn as_leaf(&self) -> &LeafNode {
        match self {
            Node::Leaf(leaf) => leaf,
            Node::Internal(_) => panic!("expected a leaf node"),
        }
    }

    pub fn as_leaf_mut(&mut self) -> &mut LeafNode {
        match self {
            Node::Leaf(leaf) => leaf,
            Node::Internal(_) => panic!("expected a leaf node"),
        }
    }

    pub fn as_internal(&self) -> &InternalNode {
        match self {
            Node::Internal(internal) => internal,
            Node::Leaf(_) => panic!("expected an internal node"),
        }
    }

    pub fn as_internal_mut(&mut self) -> &mut InternalNode {
        match self {
            Node::Internal(internal) => internal,
            Node::Leaf(_) => panic!("expected an internal node"),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }
}

/// A bounded, strictly ordered chain of entries.
///
/// `len` counts only the entries this node owns; the chain continues into
/// the sibling leaf through the last entry's link.
#[derive(Debug)]
pub(crate) struct LeafNode {
    pub head: EntryLink,
    pub len: usize,
}

impl LeafNode {
    pub fn new() -> Self {
        Self {
            head: EntryLink::End,
            len: 0,
        }
    }

    /// Splices `key`/`value` into the ordered chain.
    ///
    /// A full node refuses and hands the pair back; a duplicate key refuses
    /// and drops the offered value. In both cases the node is unchanged.
    pub fn insert<K: Ord, V>(
        &mut self,
        entries: &mut Arena<EntryId, Entry<K, V>>,
        key: K,
        value: V,
        config: Config,
    ) -> InsertOutcome<K, V> {
        if self.len == config.fanout() {
            return InsertOutcome::Full { key, value };
        }

        let mut prev: Option<EntryId> = None;
        let mut cursor = self.head;
        while let EntryLink::Next(id) = cursor {
            match entries.get(id).key.cmp(&key) {
                Ordering::Equal => return InsertOutcome::Duplicate,
                Ordering::Greater => break,
                Ordering::Less => {
                    prev = Some(id);
                    cursor = entries.get(id).next;
                }
            }
        }

        // `cursor` is whatever the new entry must link to: the first
        // greater entry, or the old tail's cross-node link.
        let new_id = entries.alloc(Entry {
            key,
            value,
            next: cursor,
        });
        match prev {
            Some(prev_id) => entries.get_mut(prev_id).next = EntryLink::Next(new_id),
            None => self.head = EntryLink::Next(new_id),
        }
        self.len += 1;
        InsertOutcome::Inserted
    }

    /// Scans the node's chain for `key`.
    pub fn get<'a, K: Ord, V>(
        &self,
        entries: &'a Arena<EntryId, Entry<K, V>>,
        key: &K,
    ) -> Option<&'a V> {
        let mut cursor = self.head;
        while let EntryLink::Next(id) = cursor {
            let entry = entries.get(id);
            match entry.key.cmp(key) {
                Ordering::Equal => return Some(&entry.value),
                Ordering::Greater => return None,
                Ordering::Less => cursor = entry.next,
            }
        }
        None
    }

    /// Unlinks `key` from the chain, refusing if the node would fall below
    /// minimum occupancy.
    pub fn remove<K: Ord, V>(
        &mut self,
        entries: &mut Arena<EntryId, Entry<K, V>>,
        key: &K,
        config: Config,
    ) -> RemoveOutcome {
        let mut prev: Option<EntryId> = None;
        let mut cursor = self.head;
        let (target, successor) = loop {
            let EntryLink::Next(id) = cursor else {
                return RemoveOutcome::NotFound;
            };
            let entry = entries.get(id);
            match entry.key.cmp(key) {
                Ordering::Equal => break (id, entry.next),
                Ordering::Greater => return RemoveOutcome::NotFound,
                Ordering::Less => {
                    prev = Some(id);
                    cursor = entry.next;
                }
            }
        };

        if self.len - 1 < config.min_occupancy() {
            return RemoveOutcome::WouldUnderflow;
        }

        // The predecessor (or the node's head) inherits the target's link,
        // whatever state it is in.
        match prev {
            Some(prev_id) => entries.get_mut(prev_id).next = successor,
            None => self.head = successor,
        }
        entries.free(target);
        self.len -= 1;
        RemoveOutcome::Removed
    }

    /// Moves the upper half of the chain into a new sibling leaf.
    ///
    /// The sibling inherits the old tail's cross-node link; this node's new
    /// tail is relinked to `Sibling(sibling_id)`. Returns the sibling and
    /// its first key as the separator for the parent to adopt.
    ///
    /// Panics unless the node is full.
    pub fn split<K: Clone, V>(
        &mut self,
        entries: &mut Arena<EntryId, Entry<K, V>>,
        sibling_id: NodeId,
        config: Config,
    ) -> (LeafNode, K) {
        assert_eq!(
            self.len,
            config.fanout(),
            "split called on a leaf that is not full"
        );

        let mid = config.fanout() / 2;
        let new_tail = self.entry_at(entries, mid - 1);
        let upper_head = match entries.get(new_tail).next {
            EntryLink::Next(id) => id,
            _ => unreachable!("a full leaf continues past its midpoint"),
        };
        entries.get_mut(new_tail).next = EntryLink::Sibling(sibling_id);

        let separator = entries.get(upper_head).key.clone();
        let sibling = LeafNode {
            head: EntryLink::Next(upper_head),
            len: self.len - mid,
        };
        self.len = mid;
        (sibling, separator)
    }

    /// The id of the entry at ordinal `pos` within this node.
    ///
    /// Panics when `pos` walks past the node's own chain.
    pub fn entry_at<K, V>(&self, entries: &Arena<EntryId, Entry<K, V>>, pos: usize) -> EntryId {
        let mut cursor = self.head;
        let mut remaining = pos;
        loop {
            let EntryLink::Next(id) = cursor else {
                panic!("entry index {pos} walked past the end of the leaf chain");
            };
            if remaining == 0 {
                return id;
            }
            remaining -= 1;
            cursor = entries.get(id).next;
        }
    }

    /// A lazy, restartable walk over this node's entries, in ascending
    /// order and stopping at the first cross-node link.
    pub fn entries<'a, K, V>(
        &self,
        entries: &'a Arena<EntryId, Entry<K, V>>,
    ) -> LeafEntries<'a, K, V> {
        LeafEntries {
            entries,
            cursor: self.head,
        }
    }
}

/// Iterator over the entries owned by a single leaf.
pub(crate) struct LeafEntries<'a, K, V> {
    entries: &'a Arena<EntryId, Entry<K, V>>,
    cursor: EntryLink,
}

impl<'a, K, V> Iterator for LeafEntries<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let EntryLink::Next(id) = self.cursor else {
            return None;
        };
        let entry = self.entries.get(id);
        self.cursor = entry.next;
        Some((&entry.key, &entry.value))
    }
}

/// A bounded, strictly ordered chain of separator records.
///
/// An internal node always holds at least one record; the last record's
/// link names the node's final child.
#[derive(Debug)]
pub(crate) struct InternalNode {
    pub head: RecordId,
    pub len: usize,
}

impl InternalNode {
    /// The child whose subtree covers `key`: the child of the first record
    /// whose separator is greater than `key`, or the final child.
    ///
    /// A key equal to a separator belongs to the *following* child, since
    /// the separator is that child's minimum.
    pub fn child_for_key<K: Ord>(
        &self,
        records: &Arena<RecordId, Record<K>>,
        key: &K,
    ) -> NodeId {
        let mut cursor = self.head;
        loop {
            let record = records.get(cursor);
            if *key < record.separator {
                return record.child;
            }
            match record.next {
                RecordLink::Next(id) => cursor = id,
                RecordLink::LastChild(child) => return child,
            }
        }
    }

    /// Splices in a record for the freshly split `child`, ordered by
    /// `separator`.
    ///
    /// The record previously covering the separator's range keeps its
    /// lower half: its child moves into the new record and `child` (the
    /// upper half of the split) takes its slot, so every separator still
    /// labels the child that follows it.
    ///
    /// Panics on a duplicate separator; separators are promoted from
    /// unique keys, so a duplicate means the structure is corrupt.
    pub fn insert_record<K: Ord>(
        &mut self,
        records: &mut Arena<RecordId, Record<K>>,
        child: NodeId,
        separator: K,
        config: Config,
    ) -> RecordInsert {
        if self.len == config.fanout() {
            return RecordInsert::Full;
        }

        let mut prev: Option<RecordId> = None;
        let mut cursor = self.head;
        loop {
            match separator.cmp(&records.get(cursor).separator) {
                Ordering::Equal => panic!("duplicate separator in an internal node"),
                Ordering::Less => {
                    let displaced = records.get(cursor).child;
                    let new_id = records.alloc(Record {
                        child: displaced,
                        separator,
                        next: RecordLink::Next(cursor),
                    });
                    records.get_mut(cursor).child = child;
                    match prev {
                        Some(prev_id) => records.get_mut(prev_id).next = RecordLink::Next(new_id),
                        None => self.head = new_id,
                    }
                    break;
                }
                Ordering::Greater => match records.get(cursor).next {
                    RecordLink::Next(id) => {
                        prev = Some(cursor);
                        cursor = id;
                    }
                    RecordLink::LastChild(last) => {
                        // The split child was the final child; the new
                        // record adopts it and `child` becomes the new
                        // final child.
                        let new_id = records.alloc(Record {
                            child: last,
                            separator,
                            next: RecordLink::LastChild(child),
                        });
                        records.get_mut(cursor).next = RecordLink::Next(new_id);
                        break;
                    }
                },
            }
        }
        self.len += 1;
        RecordInsert::Inserted
    }

    /// Moves the records above the midpoint into a new sibling node.
    ///
    /// The midpoint record is consumed: its child becomes this node's
    /// final child and its separator, already stored, is returned for the
    /// parent to adopt. No key is synthesized at this level.
    ///
    /// Panics unless the node is full.
    pub fn split<K>(
        &mut self,
        records: &mut Arena<RecordId, Record<K>>,
        config: Config,
    ) -> (InternalNode, K) {
        assert_eq!(
            self.len,
            config.fanout(),
            "split called on an internal node that is not full"
        );

        let mid = config.fanout() / 2;
        let left_tail = self.record_at(records, mid - 1);
        let mid_id = match records.get(left_tail).next {
            RecordLink::Next(id) => id,
            RecordLink::LastChild(_) => {
                unreachable!("a full internal node continues past its midpoint")
            }
        };

        let mid_record = records.free(mid_id);
        records.get_mut(left_tail).next = RecordLink::LastChild(mid_record.child);

        let upper_head = match mid_record.next {
            RecordLink::Next(id) => id,
            RecordLink::LastChild(_) => {
                unreachable!("the midpoint record of a full internal node has a successor")
            }
        };
        let sibling = InternalNode {
            head: upper_head,
            len: self.len - mid - 1,
        };
        self.len = mid;
        (sibling, mid_record.separator)
    }

    /// The id of the record at ordinal `pos` within this node.
    ///
    /// Panics when `pos` walks past the record chain.
    pub fn record_at<K>(&self, records: &Arena<RecordId, Record<K>>, pos: usize) -> RecordId {
        let mut cursor = self.head;
        let mut remaining = pos;
        loop {
            if remaining == 0 {
                return cursor;
            }
            remaining -= 1;
            cursor = match records.get(cursor).next {
                RecordLink::Next(id) => id,
                RecordLink::LastChild(_) => {
                    panic!("record index {pos} walked past the end of the record chain")
                }
            };
        }
    }

    /// The leftmost child of this node.
    pub fn first_child<K>(&self, records: &Arena<RecordId, Record<K>>) -> NodeId {
        records.get(self.head).child
    }

    /// The rightmost child of this node.
    pub fn last_child<K>(&self, records: &Arena<RecordId, Record<K>>) -> NodeId {
        let mut cursor = self.head;
        loop {
            match records.get(cursor).next {
                RecordLink::Next(id) => cursor = id,
                RecordLink::LastChild(child) => return child,
            }
        }
    }
}
