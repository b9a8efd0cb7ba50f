use super::{node::EntryLink, BPlusTreeMap};
use crate::types::{EntryId, NodeId};

/// The iterator's position on the leaf chain.
enum Cursor {
    /// About to yield this entry.
    Entry(EntryId),
    /// About to enter this leaf at its head.
    Leaf(NodeId),
    Done,
}

impl Cursor {
    fn from_link(link: EntryLink) -> Self {
        match link {
            EntryLink::Next(id) => Cursor::Entry(id),
            EntryLink::Sibling(node) => Cursor::Leaf(node),
            EntryLink::End => Cursor::Done,
        }
    }
}

/// An iterator over the entries of a [`BPlusTreeMap`] in ascending key
/// order.
///
/// Walks the leaf chain end to end through the sibling links; internal
/// nodes are only consulted once, to locate the leftmost leaf.
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Iter<'a, K, V>
where
    K: Ord + Clone,
{
    map: &'a BPlusTreeMap<K, V>,
    cursor: Cursor,
}

impl<'a, K, V> Iter<'a, K, V>
where
    K: Ord + Clone,
{
    pub(crate) fn new(map: &'a BPlusTreeMap<K, V>) -> Self {
        let cursor = match map.leftmost_leaf() {
            Some(leaf_id) => Cursor::Leaf(leaf_id),
            None => Cursor::Done,
        };
        Self { map, cursor }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V>
where
    K: Ord + Clone,
{
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.cursor {
                Cursor::Done => return None,
                Cursor::Leaf(node_id) => {
                    let leaf = self.map.nodes.get(node_id).as_leaf();
                    self.cursor = Cursor::from_link(leaf.head);
                }
                Cursor::Entry(id) => {
                    let entry = self.map.entries.get(id);
                    self.cursor = Cursor::from_link(entry.next);
                    return Some((&entry.key, &entry.value));
                }
            }
        }
    }
}

/// An iterator over the keys of a [`BPlusTreeMap`] in ascending order.
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Keys<'a, K, V>
where
    K: Ord + Clone,
{
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Keys<'a, K, V>
where
    K: Ord + Clone,
{
    pub(crate) fn new(map: &'a BPlusTreeMap<K, V>) -> Self {
        Self {
            inner: Iter::new(map),
        }
    }
}

impl<'a, K, V> Iterator for Keys<'a, K, V>
where
    K: Ord + Clone,
{
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(key, _)| key)
    }
}

/// An iterator over the values of a [`BPlusTreeMap`], ordered by key.
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Values<'a, K, V>
where
    K: Ord + Clone,
{
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Values<'a, K, V>
where
    K: Ord + Clone,
{
    pub(crate) fn new(map: &'a BPlusTreeMap<K, V>) -> Self {
        Self {
            inner: Iter::new(map),
        }
    }
}

impl<'a, K, V> Iterator for Values<'a, K, V>
where
    K: Ord + Clone,
{
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, value)| value)
    }
}

#[cfg(test)]
mod test {
    use crate::bplustree::{BPlusTreeMap, DEFAULT_FANOUT};

    #[test]
    fn iterate_leaf() {
        let mut map = BPlusTreeMap::new();

        for i in 0..DEFAULT_FANOUT as u32 {
            map.insert(i, i + 1);
        }

        let mut i = 0;
        for (key, value) in map.iter() {
            assert_eq!(*key, i);
            assert_eq!(*value, i + 1);
            i += 1;
        }

        assert_eq!(i, DEFAULT_FANOUT as u32);
    }

    #[test]
    fn iterate_children() {
        let mut map = BPlusTreeMap::new();

        // Insert the elements in reverse order.
        for i in (0..100u64).rev() {
            map.insert(i, i + 1);
        }

        // Iteration should be in ascending order.
        let mut i = 0;
        for (key, value) in map.iter() {
            assert_eq!(*key, i);
            assert_eq!(*value, i + 1);
            i += 1;
        }

        assert_eq!(i, 100);
    }

    #[test]
    fn iteration_is_restartable() {
        let mut map = BPlusTreeMap::new();
        for i in 0..300u32 {
            map.insert(i, i);
        }

        let first: Vec<u32> = map.keys().copied().collect();
        let second: Vec<u32> = map.keys().copied().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 300);
    }

    #[test]
    fn keys_and_values() {
        let mut map = BPlusTreeMap::new();
        for i in 0..100u32 {
            map.insert(i, i * 3);
        }

        let keys: Vec<u32> = map.keys().copied().collect();
        assert_eq!(keys, (0..100).collect::<Vec<u32>>());

        let values: Vec<u32> = map.values().copied().collect();
        assert_eq!(values, (0..100).map(|i| i * 3).collect::<Vec<u32>>());
    }
}
