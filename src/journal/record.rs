use crate::error::{Error, Result};
use crate::key::OrderKey;
use crate::types::{ItemId, Mutation};

/// Record type stored in the journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    Insert = 0x01,
    Move = 0x02,
    Update = 0x03,
    Remove = 0x04,
    Batch = 0x05,
    NextId = 0x06,
}

impl RecordType {
    fn from_u8(byte: u8) -> Result<Self> {
        match byte {
            0x01 => Ok(RecordType::Insert),
            0x02 => Ok(RecordType::Move),
            0x03 => Ok(RecordType::Update),
            0x04 => Ok(RecordType::Remove),
            0x05 => Ok(RecordType::Batch),
            0x06 => Ok(RecordType::NextId),
            _ => Err(Error::Corruption(format!("invalid record type: {}", byte))),
        }
    }
}

/// A single journal entry.
///
/// On-disk format:
/// ```text
/// ┌──────────┬─────────┬──────────┬───────────┬───────────┬───────────┬───────────┐
/// │ CRC (4B) │ Len (4B)│ Type (1B)│ Id (8B)   │ KeyLen(4B)│ Key (var) │ Val (var) │
/// └──────────┴─────────┴──────────┴───────────┴───────────┴───────────┴───────────┘
/// ```
///
/// CRC covers everything after the CRC field itself. Move and Remove carry
/// no value; Update and Remove carry no key. `Batch` stores its count and
/// `NextId` its id in the Id field, with neither key nor value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalRecord {
    /// One list mutation.
    Mutation(Mutation),
    /// The next `count` mutation records commit together: replay applies
    /// all of them or, if the journal ends first, none.
    Batch { count: u32 },
    /// Ids below `next` have been handed out. Written by compaction so
    /// ids of removed items stay spent.
    NextId { next: ItemId },
}

// Header sizes
const CRC_SIZE: usize = 4;
const LEN_SIZE: usize = 4;
const TYPE_SIZE: usize = 1;
const ID_SIZE: usize = 8;
const KEY_LEN_SIZE: usize = 4;
const HEADER_SIZE: usize = CRC_SIZE + LEN_SIZE + TYPE_SIZE + ID_SIZE + KEY_LEN_SIZE;

impl JournalRecord {
    pub fn new(mutation: Mutation) -> Self {
        JournalRecord::Mutation(mutation)
    }

    pub fn record_type(&self) -> RecordType {
        match self {
            JournalRecord::Mutation(Mutation::Insert { .. }) => RecordType::Insert,
            JournalRecord::Mutation(Mutation::Move { .. }) => RecordType::Move,
            JournalRecord::Mutation(Mutation::Update { .. }) => RecordType::Update,
            JournalRecord::Mutation(Mutation::Remove { .. }) => RecordType::Remove,
            JournalRecord::Batch { .. } => RecordType::Batch,
            JournalRecord::NextId { .. } => RecordType::NextId,
        }
    }

    fn id_field(&self) -> u64 {
        match self {
            JournalRecord::Mutation(mutation) => mutation.id().0,
            JournalRecord::Batch { count } => u64::from(*count),
            JournalRecord::NextId { next } => next.0,
        }
    }

    fn key_bytes(&self) -> &[u8] {
        match self {
            JournalRecord::Mutation(Mutation::Insert { key, .. } | Mutation::Move { key, .. }) => {
                key.as_bytes()
            }
            _ => &[],
        }
    }

    fn value_bytes(&self) -> &[u8] {
        match self {
            JournalRecord::Mutation(
                Mutation::Insert { value, .. } | Mutation::Update { value, .. },
            ) => value.as_slice(),
            _ => &[],
        }
    }

    /// Serialize this record to bytes (including CRC header).
    pub fn encode(&self) -> Vec<u8> {
        let key = self.key_bytes();
        let value = self.value_bytes();
        let payload_len = TYPE_SIZE + ID_SIZE + KEY_LEN_SIZE + key.len() + value.len();

        let mut buf = Vec::with_capacity(CRC_SIZE + LEN_SIZE + payload_len);

        // Reserve space for CRC (filled at the end)
        buf.extend_from_slice(&[0u8; CRC_SIZE]);
        buf.extend_from_slice(&(payload_len as u32).to_le_bytes());
        buf.push(self.record_type() as u8);
        buf.extend_from_slice(&self.id_field().to_le_bytes());
        buf.extend_from_slice(&(key.len() as u32).to_le_bytes());
        buf.extend_from_slice(key);
        buf.extend_from_slice(value);

        let crc = crc32fast::hash(&buf[CRC_SIZE..]);
        buf[0..CRC_SIZE].copy_from_slice(&crc.to_le_bytes());

        buf
    }

    /// Deserialize a record from the front of `data`, returning it with the
    /// number of bytes consumed.
    pub fn decode(data: &[u8]) -> Result<(Self, usize)> {
        if data.len() < HEADER_SIZE {
            return Err(Error::Corruption("record too short".into()));
        }

        let stored_crc = read_u32(data, 0);
        let payload_len = read_u32(data, CRC_SIZE) as usize;

        let total_len = CRC_SIZE + LEN_SIZE + payload_len;
        if payload_len < TYPE_SIZE + ID_SIZE + KEY_LEN_SIZE {
            return Err(Error::Corruption("record length too small".into()));
        }
        if data.len() < total_len {
            return Err(Error::Corruption("record truncated".into()));
        }

        let computed_crc = crc32fast::hash(&data[CRC_SIZE..total_len]);
        if stored_crc != computed_crc {
            return Err(Error::Corruption("CRC mismatch".into()));
        }

        let mut offset = CRC_SIZE + LEN_SIZE;

        let record_type = RecordType::from_u8(data[offset])?;
        offset += TYPE_SIZE;

        let id_field = read_u64(data, offset);
        let id = ItemId(id_field);
        offset += ID_SIZE;

        let key_len = read_u32(data, offset) as usize;
        offset += KEY_LEN_SIZE;

        if offset + key_len > total_len {
            return Err(Error::Corruption("key length exceeds record".into()));
        }
        let key = &data[offset..offset + key_len];
        offset += key_len;

        let value = data[offset..total_len].to_vec();

        let record = match record_type {
            RecordType::Insert => JournalRecord::Mutation(Mutation::Insert {
                id,
                key: decode_key(key)?,
                value,
            }),
            RecordType::Move => JournalRecord::Mutation(Mutation::Move {
                id,
                key: decode_key(key)?,
            }),
            RecordType::Update => JournalRecord::Mutation(Mutation::Update { id, value }),
            RecordType::Remove => JournalRecord::Mutation(Mutation::Remove { id }),
            RecordType::Batch => {
                let count = u32::try_from(id_field).map_err(|_| {
                    Error::Corruption(format!("batch count out of range: {id_field}"))
                })?;
                JournalRecord::Batch { count }
            }
            RecordType::NextId => JournalRecord::NextId { next: id },
        };

        Ok((record, total_len))
    }

    /// Size of this record when serialized on disk.
    pub fn encoded_size(&self) -> usize {
        HEADER_SIZE + self.key_bytes().len() + self.value_bytes().len()
    }
}

impl From<Mutation> for JournalRecord {
    fn from(mutation: Mutation) -> Self {
        JournalRecord::new(mutation)
    }
}

fn decode_key(bytes: &[u8]) -> Result<OrderKey> {
    OrderKey::new(bytes).map_err(|e| Error::Corruption(format!("bad order key in record: {e}")))
}

fn read_u32(data: &[u8], at: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&data[at..at + 4]);
    u32::from_le_bytes(bytes)
}

fn read_u64(data: &[u8], at: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&data[at..at + 8]);
    u64::from_le_bytes(bytes)
}
