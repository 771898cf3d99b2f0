use std::fmt;

use crate::key::OrderKey;

/// Raw item payload bytes.
pub type Value = Vec<u8>;

/// Identifies an item for its whole life, independent of its position.
///
/// Ids are allocated monotonically per list and never handed out twice,
/// even after the item is removed and the journal compacted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single change to an ordered list.
///
/// This is the unit both the in-memory list applies and the journal
/// records, so replaying a journal reproduces the list exactly.
/// A move carries the item's fresh key; keys are never edited in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Insert { id: ItemId, key: OrderKey, value: Value },
    Move { id: ItemId, key: OrderKey },
    Update { id: ItemId, value: Value },
    Remove { id: ItemId },
}

impl Mutation {
    /// Item the mutation targets.
    pub fn id(&self) -> ItemId {
        match self {
            Mutation::Insert { id, .. }
            | Mutation::Move { id, .. }
            | Mutation::Update { id, .. }
            | Mutation::Remove { id } => *id,
        }
    }
}
