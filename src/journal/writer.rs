use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use tracing::warn;

use crate::error::{Error, Result};
use crate::journal::SyncPolicy;
use crate::journal::record::JournalRecord;

/// Appends journal records to a file on disk.
///
/// A mutation is durable once its record is synced; replaying the journal
/// on open rebuilds the list.
///
/// Each append encodes its records into one buffer and hands it to the OS
/// in a single `write_all`:
///   write_all()     → OS page cache
///   sync_all()      → OS page cache → physical disk
///
/// A failed append is cut back off the file, so the journal only ever
/// holds records whose append returned `Ok`. If the cut itself fails the
/// writer is poisoned and refuses further appends.
pub struct JournalWriter {
    file: File,
    offset: u64,
    sync_policy: SyncPolicy,
    writes_since_sync: usize,
    records: u64,
    poisoned: bool,
    #[cfg(test)]
    fail_next_sync: bool,
}

impl JournalWriter {
    /// Open (or create) the journal at `path` for appending.
    pub fn new(path: &Path, sync_policy: SyncPolicy) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let offset = file.metadata()?.len();

        Ok(JournalWriter {
            file,
            offset,
            sync_policy,
            writes_since_sync: 0,
            records: 0,
            poisoned: false,
            #[cfg(test)]
            fail_next_sync: false,
        })
    }

    /// Open for appending to a journal that already holds `records`
    /// valid records.
    pub(crate) fn resume(path: &Path, sync_policy: SyncPolicy, records: u64) -> Result<Self> {
        let mut writer = Self::new(path, sync_policy)?;
        writer.records = records;
        Ok(writer)
    }

    /// Append a record. Depending on SyncPolicy, may fsync after this write.
    pub fn append(&mut self, record: &JournalRecord) -> Result<()> {
        self.append_all(std::slice::from_ref(record))
    }

    /// Append records with a single write. Either all of them end up in the
    /// journal or, on error, none do.
    pub fn append_all(&mut self, records: &[JournalRecord]) -> Result<()> {
        if self.poisoned {
            return Err(Error::Poisoned);
        }

        let mut buf = Vec::with_capacity(records.iter().map(JournalRecord::encoded_size).sum());
        for record in records {
            buf.extend_from_slice(&record.encode());
        }

        let pending = self.writes_since_sync + records.len();
        if let Err(e) = self.write_and_sync(&buf, pending) {
            self.roll_back();
            return Err(e.into());
        }

        self.offset += buf.len() as u64;
        self.records += records.len() as u64;
        Ok(())
    }

    fn write_and_sync(&mut self, buf: &[u8], pending: usize) -> io::Result<()> {
        self.file.write_all(buf)?;

        let sync = match self.sync_policy {
            SyncPolicy::EveryWrite => true,
            SyncPolicy::EveryNWrites(n) => pending >= n,
            SyncPolicy::Never => false,
        };
        if sync {
            self.sync_file()?;
            self.writes_since_sync = 0;
        } else {
            self.writes_since_sync = pending;
        }
        Ok(())
    }

    /// Drop whatever a failed append left past `offset`. The file is in
    /// append mode, so the next write lands right after the cut.
    fn roll_back(&mut self) {
        if let Err(e) = self.file.set_len(self.offset) {
            warn!(offset = self.offset, error = %e, "journal rollback failed, writer poisoned");
            self.poisoned = true;
        }
    }

    /// Force fsync to disk. Ensures all appended records are durable.
    pub fn sync(&mut self) -> Result<()> {
        if self.poisoned {
            return Err(Error::Poisoned);
        }
        self.sync_file()?;
        self.writes_since_sync = 0;
        Ok(())
    }

    fn sync_file(&mut self) -> io::Result<()> {
        #[cfg(test)]
        {
            if std::mem::take(&mut self.fail_next_sync) {
                return Err(io::Error::other("injected sync failure"));
            }
        }
        self.file.sync_all()
    }

    /// Refuse all further appends. Used when the file behind this writer
    /// is no longer the journal.
    pub(crate) fn poison(&mut self) {
        self.poisoned = true;
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Current file offset (bytes in the journal so far).
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Appends not yet covered by an fsync.
    pub fn writes_since_sync(&self) -> usize {
        self.writes_since_sync
    }

    /// Records in the journal, including those present when it was opened
    /// through the store.
    pub fn records(&self) -> u64 {
        self.records
    }

    #[cfg(test)]
    pub(crate) fn fail_next_sync(&mut self) {
        self.fail_next_sync = true;
    }
}
