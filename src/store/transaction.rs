use std::mem;

use crate::error::{Error, Result};
use crate::list::{Item, OrderedList};
use crate::store::{Change, Store, revert};
use crate::types::{ItemId, Mutation, Value};

/// A group of mutations committed to the journal as one unit.
///
/// Each operation is applied to the store's list immediately, so later
/// operations in the same transaction see earlier ones. Nothing reaches
/// the journal until [`commit`](Transaction::commit). Dropping the
/// transaction without committing reverts the list.
///
/// ```text
///   store.with_transaction(|txn| {
///       let a = txn.push_back(b"a".to_vec())?;
///       txn.insert_after(Some(a), b"b".to_vec())
///   })
///     → journal: Batch { count: 2 }, Insert a, Insert b
/// ```
pub struct Transaction<'a> {
    store: &'a mut Store,
    forward: Vec<Mutation>,
    /// Inverses of `forward`, in the same order.
    inverse: Vec<Mutation>,
}

impl<'a> Transaction<'a> {
    pub(crate) fn new(store: &'a mut Store) -> Self {
        Transaction {
            store,
            forward: Vec::new(),
            inverse: Vec::new(),
        }
    }

    /// The list as this transaction currently sees it.
    pub fn list(&self) -> &OrderedList {
        &self.store.list
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.store.list.get(id)
    }

    /// Mutations staged so far.
    pub fn mutations(&self) -> &[Mutation] {
        &self.forward
    }

    pub fn push_front(&mut self, value: Value) -> Result<ItemId> {
        self.insert_after(None, value)
    }

    pub fn push_back(&mut self, value: Value) -> Result<ItemId> {
        let last = self.store.list.last().map(|item| item.id);
        self.insert_after(last, value)
    }

    pub fn insert_after(&mut self, previous: Option<ItemId>, value: Value) -> Result<ItemId> {
        let id = self.store.list.next_id();
        let key = self.store.list.key_after(previous, None)?;
        self.apply(Mutation::Insert { id, key, value })?;
        Ok(id)
    }

    /// No-op if `id` already sits after `previous`.
    pub fn move_after(&mut self, previous: Option<ItemId>, id: ItemId) -> Result<()> {
        match self.store.list.plan_move(previous, id)? {
            Some(mutation) => self.apply(mutation),
            None => Ok(()),
        }
    }

    pub fn update(&mut self, id: ItemId, value: Value) -> Result<()> {
        self.apply(Mutation::Update { id, value })
    }

    pub fn remove(&mut self, id: ItemId) -> Result<Item> {
        let item = self.store.list.get(id).cloned().ok_or(Error::NotFound)?;
        self.apply(Mutation::Remove { id })?;
        Ok(item)
    }

    /// Stage a raw mutation. A rejected mutation changes nothing and
    /// leaves earlier ones staged.
    pub fn apply(&mut self, mutation: Mutation) -> Result<()> {
        let inverse = self.store.list.apply_reversible(mutation.clone())?;
        self.forward.push(mutation);
        self.inverse.push(inverse);
        Ok(())
    }

    /// Journal every staged mutation as one unit. On error the list is
    /// reverted as if the transaction had been dropped.
    pub fn commit(mut self) -> Result<()> {
        let forward = mem::take(&mut self.forward);
        let mut inverse = mem::take(&mut self.inverse);
        inverse.reverse();
        self.store.commit_change(Change { forward, inverse })
    }

    /// Revert every staged mutation.
    pub fn rollback(self) {}
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        self.forward.clear();
        let inverse = mem::take(&mut self.inverse);
        revert(&mut self.store.list, inverse.into_iter().rev());
    }
}
