/// An index into one of the tree's arenas.
///
/// Ids are stable for the lifetime of the slot they name: they are only
/// invalidated when that slot is freed.
pub(crate) trait ArenaId: Copy {
    fn from_raw(raw: u32) -> Self;
    fn raw(self) -> u32;
}

/// Identifies a node (leaf or internal) in the node arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct NodeId(u32);

/// Identifies a leaf entry in the entry arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct EntryId(u32);

/// Identifies a separator record in the record arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct RecordId(u32);

impl ArenaId for NodeId {
    fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    fn raw(self) -> u32 {
        self.0
    }
}

impl ArenaId for EntryId {
    fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    fn raw(self) -> u32 {
        self.0
    }
}

impl ArenaId for RecordId {
    fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    fn raw(self) -> u32 {
        self.0
    }
}
