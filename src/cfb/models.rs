//! Data structures representing container directory and allocation state

use byteorder::{LittleEndian, ReadBytesExt};
use encoding_rs::UTF_16LE;

use super::error::{CfbError, Result};

/// End-of-chain sentinel in an allocation table.
pub const END_OF_CHAIN: u32 = 0xFFFF_FFFE;

/// Free (unallocated) unit marker in an allocation table.
pub const FREE_UNIT: u32 = 0xFFFF_FFFF;

/// Magic signature opening a compound document container.
pub const COMPOUND_MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Reserved directory name of the summary information property.
pub const SUMMARY_INFORMATION: &str = "\u{5}SummaryInformation";

/// Reserved directory name of the document summary information property.
pub const DOC_SUMMARY_INFORMATION: &str = "\u{5}DocumentSummaryInformation";

/// One linked-list allocation table, indexed by unit number.
///
/// `entries[unit]` holds the next unit of the chain containing `unit`, or
/// [`END_OF_CHAIN`]. Supplied by the container's allocation-table reader as
/// raw little-endian sector bytes.
#[derive(Debug, Clone)]
pub struct AllocationTable {
    entries: Vec<u32>,
}

impl AllocationTable {
    pub fn new(entries: Vec<u32>) -> Self {
        Self { entries }
    }

    /// Parse a table from raw sector bytes (little-endian 32-bit entries).
    ///
    /// # Errors
    /// Returns [`CfbError::TruncatedAllocationTable`] if `bytes` is not a
    /// whole number of entries.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() % 4 != 0 {
            return Err(CfbError::TruncatedAllocationTable(bytes.len()));
        }
        let mut reader = bytes;
        let mut entries = Vec::with_capacity(bytes.len() / 4);
        while !reader.is_empty() {
            entries.push(reader.read_u32::<LittleEndian>()?);
        }
        Ok(Self { entries })
    }

    /// Number of units the table describes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Successor of `unit`, or `None` if `unit` is outside the table.
    pub fn next_of(&self, unit: u32) -> Option<u32> {
        self.entries.get(unit as usize).copied()
    }
}

/// Descriptor of one named logical stream from the container's directory
/// table. Immutable once read; index 0 is the container root.
#[derive(Debug, Clone)]
pub struct Property {
    /// Declared name; may contain non-printable identifier characters
    /// (the reserved names start with `\x05`).
    pub name: String,
    /// Declared stream size in bytes.
    pub size: u64,
    /// First allocation unit of the stream's chain.
    pub start: u32,
}

impl Property {
    pub fn new(name: impl Into<String>, size: u64, start: u32) -> Self {
        Self {
            name: name.into(),
            size,
            start,
        }
    }

    /// Decode a directory-entry name from its raw UTF-16LE bytes,
    /// dropping the trailing NUL terminator if present.
    pub fn decode_name(raw: &[u8]) -> String {
        let (decoded, _, _) = UTF_16LE.decode(raw);
        decoded.trim_end_matches('\0').to_string()
    }
}

/// A maximal contiguous span of allocation units discovered by the
/// [`RunCoalescer`](super::RunCoalescer).
///
/// Invariant: `byte_length == (last_unit - first_unit + 1) * unit_size`,
/// and no two adjacently emitted runs are contiguous with each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub first_unit: u32,
    pub last_unit: u32,
    pub byte_length: u64,
}

impl Run {
    /// Number of allocation units covered by this run.
    pub fn unit_count(&self) -> u32 {
        self.last_unit - self.first_unit + 1
    }
}

/// Classification of a fragment's content, decided once per property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentKind {
    /// Property-bag summary structure (summary or document summary).
    Summary,
    /// Class-identification stream (always property index 1).
    ClassId,
    /// Uninterpreted bytes.
    Opaque,
}

/// Parser selection for a materialized fragment group, chosen by content
/// sniffing when the group is wrapped as a recursive source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReparseKind {
    /// Generic compound-fragment parser, applied recursively.
    CompoundFragment,
    /// The content opens with the compound document magic and should be
    /// dissected as a full nested container.
    CompoundDocument,
}
