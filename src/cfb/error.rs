//! Custom error types for the cfb-fragments crate.

use std::path::PathBuf;
use thiserror::Error;

/// The primary error type for all operations in this crate.
#[derive(Debug, Error)]
pub enum CfbError {
    /// An error originating from I/O operations.
    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    /// An allocation chain stepped to a unit outside the allocation table.
    #[error("allocation chain references unit {unit} outside table of {table_len} units")]
    ChainOutOfBounds { unit: u32, table_len: usize },

    /// An allocation chain revisited a unit it already traversed.
    ///
    /// The on-disk format has no inherent cycle protection; without this
    /// fault a crafted container could loop a traversal forever.
    #[error("allocation chain revisits unit {unit}")]
    ChainCycle { unit: u32 },

    /// A fragment read falls outside the container's short-block stream.
    #[error("short-block read of {len} bytes at offset {offset} exceeds stream of {stream_len} bytes")]
    ShortStreamOutOfBounds { offset: u64, len: u64, stream_len: u64 },

    /// The raw allocation table bytes do not form whole 32-bit entries.
    #[error("allocation table of {0} bytes is not a multiple of 4")]
    TruncatedAllocationTable(usize),

    /// A fault confined to a single property's traversal.
    ///
    /// Fields already emitted for the property remain valid; the rest of the
    /// container is unaffected.
    #[error("property '{name}' (index {index}): {source}")]
    PropertyFault {
        name: String,
        index: usize,
        #[source]
        source: Box<CfbError>,
    },

    /// The stress harness found no seed files under any of its directories.
    #[error("no seed files found under {0:?}")]
    EmptySeedCorpus(Vec<PathBuf>),
}

impl CfbError {
    /// True if this error (or its per-property cause) is an allocation
    /// fault: an out-of-bounds or cyclic chain step.
    pub fn is_allocation_fault(&self) -> bool {
        match self {
            CfbError::ChainOutOfBounds { .. } | CfbError::ChainCycle { .. } => true,
            CfbError::PropertyFault { source, .. } => source.is_allocation_fault(),
            _ => false,
        }
    }
}

/// A convenience `Result` type alias using the crate's `CfbError` type.
pub type Result<T> = std::result::Result<T, CfbError>;
