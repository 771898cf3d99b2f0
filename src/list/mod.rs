use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

use crate::error::{Error, Result};
use crate::key::OrderKey;
use crate::types::{ItemId, Mutation, Value};

/// An item owned by an [`OrderedList`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: ItemId,
    pub key: OrderKey,
    pub value: Value,
}

/// In-memory collection of items ordered by their [`OrderKey`].
///
/// Two indexes are kept in step:
///
/// ```text
///   order: BTreeMap<OrderKey, ItemId>   "c" → #2, "n" → #0, "u" → #1
///   items: HashMap<ItemId, Item>        #0 → {key "n", value ..}, ...
/// ```
///
/// Inserting or moving an item only ever assigns a new key computed from
/// its two neighbors; no other item's key changes.
#[derive(Debug, Default, Clone)]
pub struct OrderedList {
    order: BTreeMap<OrderKey, ItemId>,
    items: HashMap<ItemId, Item>,
    next_id: u64,
}

impl OrderedList {
    /// Create a new empty list.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.items.contains_key(&id)
    }

    /// Items in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = &Item> + '_ {
        self.order.values().map(|id| &self.items[id])
    }

    pub fn first(&self) -> Option<&Item> {
        self.order.values().next().map(|id| &self.items[id])
    }

    pub fn last(&self) -> Option<&Item> {
        self.order.values().next_back().map(|id| &self.items[id])
    }

    /// Id the next inserted item will receive.
    pub fn next_id(&self) -> ItemId {
        ItemId(self.next_id)
    }

    /// Length of the longest key in the list.
    pub fn max_key_len(&self) -> usize {
        self.order.keys().map(OrderKey::len).max().unwrap_or(0)
    }

    /// Compute a key that sorts directly after `previous`, or at the front
    /// when `previous` is `None`.
    ///
    /// `moving` names an item that is about to be repositioned; it is
    /// skipped when looking for the upper neighbor so the new key is not
    /// squeezed against the item's own old key.
    pub fn key_after(&self, previous: Option<ItemId>, moving: Option<ItemId>) -> Result<OrderKey> {
        let lower = match previous {
            Some(id) => Some(&self.items.get(&id).ok_or(Error::NotFound)?.key),
            None => None,
        };
        let range = match lower {
            Some(key) => self
                .order
                .range::<OrderKey, _>((Bound::Excluded(key), Bound::Unbounded)),
            None => self.order.range::<OrderKey, _>(..),
        };
        let upper = range
            .filter(|(_, id)| Some(**id) != moving)
            .map(|(key, _)| key)
            .next();
        OrderKey::between(lower, upper)
    }

    /// Insert at the front.
    pub fn push_front(&mut self, value: Value) -> Result<ItemId> {
        self.insert_after(None, value)
    }

    /// Insert at the back.
    pub fn push_back(&mut self, value: Value) -> Result<ItemId> {
        let last = self.last().map(|item| item.id);
        self.insert_after(last, value)
    }

    /// Insert after `previous`, or at the front when `None`.
    pub fn insert_after(&mut self, previous: Option<ItemId>, value: Value) -> Result<ItemId> {
        let id = self.next_id();
        let key = self.key_after(previous, None)?;
        self.apply(Mutation::Insert { id, key, value })?;
        Ok(id)
    }

    /// Reposition `id` directly after `previous`, or at the front when
    /// `None`. Returns the mutation applied, or `None` if the item already
    /// sat there.
    pub fn move_after(&mut self, previous: Option<ItemId>, id: ItemId) -> Result<Option<Mutation>> {
        let Some(mutation) = self.plan_move(previous, id)? else {
            return Ok(None);
        };
        self.apply(mutation.clone())?;
        Ok(Some(mutation))
    }

    /// Replace the value of `id`.
    pub fn update(&mut self, id: ItemId, value: Value) -> Result<()> {
        self.apply(Mutation::Update { id, value })
    }

    /// Remove `id`, returning it.
    pub fn remove(&mut self, id: ItemId) -> Result<Item> {
        let item = self.items.get(&id).cloned().ok_or(Error::NotFound)?;
        self.apply(Mutation::Remove { id })?;
        Ok(item)
    }

    /// Work out the move mutation without applying it.
    pub(crate) fn plan_move(
        &self,
        previous: Option<ItemId>,
        id: ItemId,
    ) -> Result<Option<Mutation>> {
        if previous == Some(id) {
            return Err(Error::invalid(format!("cannot move {id} after itself")));
        }
        let current = &self.items.get(&id).ok_or(Error::NotFound)?.key;
        if self.predecessor(current) == previous {
            return Ok(None);
        }
        let key = self.key_after(previous, Some(id))?;
        Ok(Some(Mutation::Move { id, key }))
    }

    fn predecessor(&self, key: &OrderKey) -> Option<ItemId> {
        self.order
            .range::<OrderKey, _>(..key)
            .next_back()
            .map(|(_, id)| *id)
    }

    /// Check a mutation against the list without applying it.
    pub fn validate(&self, mutation: &Mutation) -> Result<()> {
        match mutation {
            Mutation::Insert { id, key, .. } => {
                if self.items.contains_key(id) {
                    return Err(Error::invalid(format!("item {id} already exists")));
                }
                if self.order.contains_key(key) {
                    return Err(Error::invalid(format!("order key {key} already in use")));
                }
            }
            Mutation::Move { id, key } => {
                let item = self.items.get(id).ok_or(Error::NotFound)?;
                if item.key != *key && self.order.contains_key(key) {
                    return Err(Error::invalid(format!("order key {key} already in use")));
                }
            }
            Mutation::Update { id, .. } | Mutation::Remove { id } => {
                if !self.items.contains_key(id) {
                    return Err(Error::NotFound);
                }
            }
        }
        Ok(())
    }

    /// Apply one mutation and return the mutation that reverses it.
    ///
    /// ```text
    ///   Insert { id, .. }      ⇄  Remove { id }
    ///   Move   { id, key }     →  Move   { id, old key }
    ///   Update { id, value }   →  Update { id, old value }
    /// ```
    ///
    /// Ids stay spent: reversing an insert does not lower `next_id`.
    pub fn apply_reversible(&mut self, mutation: Mutation) -> Result<Mutation> {
        self.validate(&mutation)?;
        let inverse = match &mutation {
            Mutation::Insert { id, .. } => Mutation::Remove { id: *id },
            Mutation::Move { id, .. } | Mutation::Update { id, .. } | Mutation::Remove { id } => {
                let item = self.items.get(id).ok_or(Error::NotFound)?;
                match &mutation {
                    Mutation::Move { .. } => Mutation::Move {
                        id: *id,
                        key: item.key.clone(),
                    },
                    Mutation::Update { .. } => Mutation::Update {
                        id: *id,
                        value: item.value.clone(),
                    },
                    _ => Mutation::Insert {
                        id: *id,
                        key: item.key.clone(),
                        value: item.value.clone(),
                    },
                }
            }
        };
        self.apply(mutation)?;
        Ok(inverse)
    }

    /// Mark every id below `next` as handed out.
    pub fn reserve_ids(&mut self, next: ItemId) {
        self.next_id = self.next_id.max(next.0);
    }

    /// Apply one mutation. Nothing changes if it is rejected.
    pub fn apply(&mut self, mutation: Mutation) -> Result<()> {
        self.validate(&mutation)?;
        match mutation {
            Mutation::Insert { id, key, value } => {
                self.order.insert(key.clone(), id);
                self.items.insert(id, Item { id, key, value });
                self.next_id = self.next_id.max(id.0 + 1);
            }
            Mutation::Move { id, key } => {
                if let Some(item) = self.items.get_mut(&id) {
                    self.order.remove(&item.key);
                    self.order.insert(key.clone(), id);
                    item.key = key;
                }
            }
            Mutation::Update { id, value } => {
                if let Some(item) = self.items.get_mut(&id) {
                    item.value = value;
                }
            }
            Mutation::Remove { id } => {
                if let Some(item) = self.items.remove(&id) {
                    self.order.remove(&item.key);
                }
            }
        }
        Ok(())
    }
}
