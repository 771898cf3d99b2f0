mod transaction;

pub use transaction::Transaction;

use std::collections::VecDeque;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, error, warn};

use crate::error::{Error, Result};
use crate::journal::{JournalReader, JournalRecord, JournalWriter, SyncPolicy};
use crate::list::{Item, OrderedList};
use crate::types::{ItemId, Mutation, Value};

/// Store configuration.
#[derive(Debug, Clone)]
pub struct Options {
    /// When to fsync journal appends.
    pub sync_policy: SyncPolicy,
    /// Compact once the journal holds this many records beyond the live
    /// item count. `None` compacts only on request. Must not be `Some(0)`.
    pub compact_threshold: Option<usize>,
    /// Committed changes kept for [`Store::undo`]. 0 disables undo.
    pub history_limit: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            sync_policy: SyncPolicy::default(),
            compact_threshold: None,
            history_limit: 100,
        }
    }
}

impl Options {
    fn validate(&self) -> Result<()> {
        if self.compact_threshold == Some(0) {
            return Err(Error::invalid("compact_threshold must be at least 1"));
        }
        Ok(())
    }
}

/// Point-in-time counters for a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub items: usize,
    pub journal_records: u64,
    pub journal_bytes: u64,
    pub compactions: u64,
    /// Longest key in the list. Grows under repeated insertion at one spot.
    pub max_key_len: usize,
    pub undo_depth: usize,
    pub redo_depth: usize,
}

/// One committed unit of work.
#[derive(Debug, Clone)]
struct Change {
    forward: Vec<Mutation>,
    /// Reverses `forward`, in application order.
    inverse: Vec<Mutation>,
}

/// An ordered list persisted through a journal.
///
/// Open replays the journal. Every change is applied to the in-memory
/// list, then journaled as one unit; if the append fails the list is put
/// back:
///
/// ```text
///   insert_after(p, v)
///     ├─ key = between(key(p), key(next(p)))   (in memory, no I/O)
///     ├─ list.apply(Insert { id, key, v })     → inverse Remove { id }
///     ├─ journal.append(Insert { id, key, v })
///     └─ on append error: list.apply(Remove { id })
/// ```
///
/// Changes of more than one mutation are framed by a `Batch` record so a
/// crash mid-append never replays half of them. Committed changes are
/// kept in memory for [`undo`](Store::undo) and [`redo`](Store::redo);
/// the history does not survive reopen.
pub struct Store {
    path: PathBuf,
    options: Options,
    list: OrderedList,
    writer: JournalWriter,
    compactions: u64,
    /// `NextId` records in the current journal.
    reserved: u64,
    undo: VecDeque<Change>,
    redo: Vec<Change>,
}

impl Store {
    /// Open the journal at `path`, creating it if missing.
    ///
    /// A torn tail left by a crash is truncated, including a batch whose
    /// records did not all make it to disk. A record that decodes but
    /// cannot be applied is reported as corruption.
    pub fn open(path: &Path, options: Options) -> Result<Self> {
        options.validate()?;
        let reader = JournalReader::open_or_empty(path)?;
        let replayed = replay(&reader)?;

        if replayed.valid_len < reader.len() {
            warn!(
                path = %path.display(),
                valid_len = replayed.valid_len,
                dropped = reader.len() - replayed.valid_len,
                "truncating torn journal tail"
            );
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(replayed.valid_len as u64)?;
            file.sync_all()?;
        }

        debug!(
            path = %path.display(),
            records = replayed.records,
            items = replayed.list.len(),
            "journal replayed"
        );

        let writer = JournalWriter::resume(path, options.sync_policy, replayed.records)?;
        Ok(Store {
            path: path.to_path_buf(),
            options,
            list: replayed.list,
            writer,
            compactions: 0,
            reserved: replayed.reserved,
            undo: VecDeque::new(),
            redo: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read-only view of the in-memory list.
    pub fn list(&self) -> &OrderedList {
        &self.list
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.list.get(id)
    }

    /// Items in list order.
    pub fn iter(&self) -> impl Iterator<Item = &Item> + '_ {
        self.list.iter()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn push_front(&mut self, value: Value) -> Result<ItemId> {
        self.with_transaction(|txn| txn.push_front(value))
    }

    pub fn push_back(&mut self, value: Value) -> Result<ItemId> {
        self.with_transaction(|txn| txn.push_back(value))
    }

    /// Insert after `previous`, or at the front when `None`.
    pub fn insert_after(&mut self, previous: Option<ItemId>, value: Value) -> Result<ItemId> {
        self.with_transaction(|txn| txn.insert_after(previous, value))
    }

    /// Move `id` directly after `previous`, or to the front when `None`.
    /// Nothing is journaled if the item is already there.
    pub fn move_after(&mut self, previous: Option<ItemId>, id: ItemId) -> Result<()> {
        self.with_transaction(|txn| txn.move_after(previous, id))
    }

    pub fn update(&mut self, id: ItemId, value: Value) -> Result<()> {
        self.with_transaction(|txn| txn.update(id, value))
    }

    pub fn remove(&mut self, id: ItemId) -> Result<Item> {
        self.with_transaction(|txn| txn.remove(id))
    }

    /// Start a transaction. Its mutations are visible through the
    /// transaction at once and reach the journal together on
    /// [`commit`](Transaction::commit); dropping it uncommitted reverts them.
    pub fn transaction(&mut self) -> Transaction<'_> {
        Transaction::new(self)
    }

    /// Run `f` in a transaction, committing if it returns `Ok`.
    pub fn with_transaction<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T>,
    {
        let mut txn = self.transaction();
        let out = f(&mut txn)?;
        txn.commit()?;
        Ok(out)
    }

    /// Revert the most recent committed change. The reversal is journaled
    /// like any other change. Returns `false` if there is nothing to undo.
    pub fn undo(&mut self) -> Result<bool> {
        let Some(change) = self.undo.pop_back() else {
            return Ok(false);
        };
        if let Err(e) = self.run(&change.inverse) {
            self.undo.push_back(change);
            return Err(e);
        }
        self.redo.push(change);
        self.maybe_compact();
        Ok(true)
    }

    /// Reapply the most recently undone change. Returns `false` if there is
    /// nothing to redo; any new commit clears the redo history.
    pub fn redo(&mut self) -> Result<bool> {
        let Some(change) = self.redo.pop() else {
            return Ok(false);
        };
        if let Err(e) = self.run(&change.forward) {
            self.redo.push(change);
            return Err(e);
        }
        self.remember(change);
        self.maybe_compact();
        Ok(true)
    }

    /// Force all journaled mutations to disk.
    pub fn sync(&mut self) -> Result<()> {
        self.writer.sync()
    }

    /// Rewrite the journal as one insert per live item, preceded by a
    /// `NextId` record so ids of removed items stay spent.
    ///
    /// The new journal is written beside the old one, synced, renamed over
    /// it, and the directory is synced, so a crash leaves either the old or
    /// the new journal intact.
    pub fn compact(&mut self) -> Result<()> {
        let tmp = self.compaction_path();
        match fs::remove_file(&tmp) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e.into()),
            _ => {}
        }

        let mut records = Vec::with_capacity(self.list.len() + 1);
        records.push(JournalRecord::NextId {
            next: self.list.next_id(),
        });
        records.extend(self.list.iter().map(|item| {
            JournalRecord::new(Mutation::Insert {
                id: item.id,
                key: item.key.clone(),
                value: item.value.clone(),
            })
        }));
        {
            let mut writer = JournalWriter::new(&tmp, SyncPolicy::Never)?;
            writer.append_all(&records)?;
            writer.sync()?;
        }

        let before = self.writer.records();
        fs::rename(&tmp, &self.path)?;
        // The current writer's file is no longer the journal.
        self.writer.poison();
        self.writer =
            JournalWriter::resume(&self.path, self.options.sync_policy, records.len() as u64)?;
        self.reserved = 1;
        self.compactions += 1;
        sync_parent_dir(&self.path)?;

        debug!(
            path = %self.path.display(),
            before,
            after = self.writer.records(),
            "journal compacted"
        );
        Ok(())
    }

    pub fn stats(&self) -> Stats {
        Stats {
            items: self.list.len(),
            journal_records: self.writer.records(),
            journal_bytes: self.writer.offset(),
            compactions: self.compactions,
            max_key_len: self.list.max_key_len(),
            undo_depth: self.undo.len(),
            redo_depth: self.redo.len(),
        }
    }

    /// Journal a change the list already reflects. On failure the list is
    /// reverted.
    fn commit_change(&mut self, change: Change) -> Result<()> {
        if change.forward.is_empty() {
            return Ok(());
        }
        let appended = unit_records(&change.forward)
            .and_then(|records| self.writer.append_all(&records));
        if let Err(e) = appended {
            revert(&mut self.list, change.inverse);
            return Err(e);
        }
        self.remember(change);
        self.redo.clear();
        self.maybe_compact();
        Ok(())
    }

    /// Apply and journal `mutations` as one unit without touching history.
    fn run(&mut self, mutations: &[Mutation]) -> Result<()> {
        let mut inverse = Vec::with_capacity(mutations.len());
        for mutation in mutations {
            match self.list.apply_reversible(mutation.clone()) {
                Ok(undo) => inverse.push(undo),
                Err(e) => {
                    revert(&mut self.list, inverse.into_iter().rev());
                    return Err(e);
                }
            }
        }
        let appended =
            unit_records(mutations).and_then(|records| self.writer.append_all(&records));
        if let Err(e) = appended {
            revert(&mut self.list, inverse.into_iter().rev());
            return Err(e);
        }
        Ok(())
    }

    fn remember(&mut self, change: Change) {
        if self.options.history_limit == 0 {
            return;
        }
        if self.undo.len() >= self.options.history_limit {
            self.undo.pop_front();
        }
        self.undo.push_back(change);
    }

    /// A failed automatic compaction leaves the old journal in place; the
    /// change that triggered it is already committed.
    fn maybe_compact(&mut self) {
        let Some(threshold) = self.options.compact_threshold else {
            return;
        };
        let live = self.list.len() as u64 + self.reserved;
        let dead = self.writer.records().saturating_sub(live);
        if dead >= threshold as u64
            && let Err(e) = self.compact()
        {
            warn!(path = %self.path.display(), error = %e, "automatic compaction failed");
        }
    }

    fn compaction_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".compact");
        self.path.with_file_name(name)
    }
}

/// State rebuilt from a journal.
struct Replayed {
    list: OrderedList,
    /// Records in complete units.
    records: u64,
    reserved: u64,
    /// Bytes covered by complete units.
    valid_len: usize,
}

fn replay(reader: &JournalReader) -> Result<Replayed> {
    let mut replayed = Replayed {
        list: OrderedList::new(),
        records: 0,
        reserved: 0,
        valid_len: 0,
    };
    let mut seen = 0u64;
    let mut pending: Vec<Mutation> = Vec::new();
    let mut remaining = 0u32;
    let mut iter = reader.iter();

    while let Some(record) = iter.next() {
        seen += 1;
        match record {
            JournalRecord::Mutation(mutation) => {
                pending.push(mutation);
                remaining = remaining.saturating_sub(1);
            }
            JournalRecord::Batch { count } if remaining == 0 => remaining = count,
            JournalRecord::NextId { next } if remaining == 0 => {
                replayed.list.reserve_ids(next);
                replayed.reserved += 1;
            }
            other => {
                return Err(Error::Corruption(format!(
                    "journal record {seen}: {:?} inside a batch",
                    other.record_type()
                )));
            }
        }

        if remaining == 0 {
            for mutation in pending.drain(..) {
                replayed.list.apply(mutation).map_err(|e| {
                    Error::Corruption(format!("journal record {seen} does not replay: {e}"))
                })?;
            }
            replayed.records = seen;
            replayed.valid_len = iter.offset();
        }
    }
    Ok(replayed)
}

/// Journal records for one change: a lone mutation as is, several behind
/// a `Batch` header.
fn unit_records(mutations: &[Mutation]) -> Result<Vec<JournalRecord>> {
    let mut records = Vec::with_capacity(mutations.len() + 1);
    if mutations.len() > 1 {
        let count = u32::try_from(mutations.len())
            .map_err(|_| Error::invalid("too many mutations in one transaction"))?;
        records.push(JournalRecord::Batch { count });
    }
    records.extend(mutations.iter().cloned().map(JournalRecord::Mutation));
    Ok(records)
}

/// Apply inverse mutations, most recent first.
fn revert(list: &mut OrderedList, inverse: impl IntoIterator<Item = Mutation>) {
    for mutation in inverse {
        if let Err(e) = list.apply(mutation) {
            error!(error = %e, "failed to revert a mutation");
        }
    }
}

/// Make a rename inside `path`'s directory durable.
#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::File::open(parent)?.sync_all()
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> io::Result<()> {
    Ok(())
}
