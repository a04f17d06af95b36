//! Container collaborator surface consumed by the fragment subsystem

use log::info;

use super::chain::ChainWalker;
use super::driver::{DiagnosticSink, FieldIterator};
use super::error::{CfbError, Result};
use super::models::{AllocationTable, Property};

/// The slice of a compound-document container this subsystem consumes.
///
/// The directory and allocation-table readers live outside this crate; they
/// hand over the parsed property table, the short-block allocation table and
/// the short-block stream bytes, and this type exposes them behind the
/// read/seek and chain primitives the fragment pipeline needs. A container
/// and everything derived from it belong to one parsing session.
#[derive(Debug)]
pub struct Container {
    threshold: u64,
    short_unit_size: u32,
    sector_size: u32,
    short_table: AllocationTable,
    short_stream: Vec<u8>,
    properties: Vec<Property>,
}

impl Container {
    pub fn new(
        threshold: u64,
        short_unit_size: u32,
        sector_size: u32,
        short_table: AllocationTable,
        short_stream: Vec<u8>,
        properties: Vec<Property>,
    ) -> Self {
        Self {
            threshold,
            short_unit_size,
            sector_size,
            short_table,
            short_stream,
            properties,
        }
    }

    /// Size cutoff separating short-block from regular-sector streams.
    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// Size in bytes of one short-block allocation unit.
    pub fn short_unit_size(&self) -> u32 {
        self.short_unit_size
    }

    /// Size in bytes of one regular sector (informational here; regular
    /// sector streams are handled outside this subsystem).
    pub fn sector_size(&self) -> u32 {
        self.sector_size
    }

    pub fn short_table(&self) -> &AllocationTable {
        &self.short_table
    }

    /// Properties in directory-table order; index 0 is the container root.
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Start a fresh walk of the chain beginning at `start` in the
    /// short-block allocation table.
    pub fn chain(&self, start: u32) -> ChainWalker<'_> {
        ChainWalker::new(start, &self.short_table)
    }

    /// Byte offset of `unit` within the short-block stream.
    pub fn short_offset(&self, unit: u32) -> u64 {
        u64::from(unit) * u64::from(self.short_unit_size)
    }

    /// Bounds-checked read of `len` bytes at `offset` in the short-block
    /// stream.
    pub fn read_short_data(&self, offset: u64, len: u64) -> Result<&[u8]> {
        let stream_len = self.short_stream.len() as u64;
        let end = offset.checked_add(len).filter(|&end| end <= stream_len);
        match end {
            Some(end) => Ok(&self.short_stream[offset as usize..end as usize]),
            None => Err(CfbError::ShortStreamOutOfBounds {
                offset,
                len,
                stream_len,
            }),
        }
    }

    /// Returns a lazy iterator over the container's reconstructed fields.
    ///
    /// Nothing is read until the iterator is pulled; see [`FieldIterator`]
    /// for the skip and fault semantics.
    pub fn fields(&self) -> FieldIterator<'_> {
        info!(
            "Reconstructing short-block fragments: {} properties, unit size {}, sector size {}, threshold {}",
            self.properties.len(),
            self.short_unit_size,
            self.sector_size,
            self.threshold
        );
        FieldIterator::new(self)
    }

    /// Like [`fields`](Self::fields), with a diagnostic sink injected for
    /// the duration of the session.
    pub fn fields_with_sink<'a>(&'a self, sink: &'a dyn DiagnosticSink) -> FieldIterator<'a> {
        FieldIterator::with_sink(self, sink)
    }
}
