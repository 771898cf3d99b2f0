use std::fs;
use std::io;
use std::path::Path;

use crate::error::Result;
use crate::journal::record::JournalRecord;

/// Reads journal records from a file for replay.
///
/// Loads the entire file into memory, then iterates record by record.
/// If a record fails to decode, iteration stops: it was a partial write
/// from a crash, and every record before it is valid.
pub struct JournalReader {
    data: Vec<u8>,
}

impl JournalReader {
    /// Open a journal file for reading.
    pub fn new(path: &Path) -> Result<Self> {
        let data = fs::read(path)?;
        Ok(JournalReader { data })
    }

    /// Like `new`, but a missing file reads as an empty journal.
    pub fn open_or_empty(path: &Path) -> Result<Self> {
        match fs::read(path) {
            Ok(data) => Ok(JournalReader { data }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(JournalReader { data: Vec::new() }),
            Err(e) => Err(e.into()),
        }
    }

    pub fn from_bytes(data: Vec<u8>) -> Self {
        JournalReader { data }
    }

    /// Total bytes in the file, valid or not.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Create an iterator over all valid records in the journal.
    pub fn iter(&self) -> JournalIterator<'_> {
        JournalIterator {
            data: &self.data,
            offset: 0,
        }
    }
}

/// Iterator over journal records. Yields records until EOF or corruption.
///
/// After iteration ends, `offset()` is the length of the valid prefix;
/// anything past it is a torn tail.
pub struct JournalIterator<'a> {
    data: &'a [u8],
    offset: usize,
}

impl JournalIterator<'_> {
    /// Bytes consumed by the records yielded so far.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl Iterator for JournalIterator<'_> {
    type Item = JournalRecord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.data.len() {
            return None;
        }

        match JournalRecord::decode(&self.data[self.offset..]) {
            Ok((record, consumed)) => {
                self.offset += consumed;
                Some(record)
            }
            Err(_) => None,
        }
    }
}
