pub mod reader;
pub mod record;
pub mod writer;

pub use reader::JournalReader;
pub use record::{JournalRecord, RecordType};
pub use writer::JournalWriter;

/// Controls when the journal is fsync'd to disk.
///
/// Trade-off: durability vs throughput.
///   - EveryWrite: no acknowledged mutation is lost, slowest
///   - EveryNWrites: lose up to N mutations on crash
///   - Never: leave it to the OS and explicit `sync()` calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPolicy {
    /// fsync after every append.
    #[default]
    EveryWrite,
    /// fsync every N records.
    EveryNWrites(usize),
    /// Only fsync on explicit `sync()`.
    Never,
}
