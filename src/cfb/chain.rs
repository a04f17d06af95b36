//! Lazy traversal of allocation-unit chains

use super::error::CfbError;
use super::models::{AllocationTable, END_OF_CHAIN};

/// Pull-based cursor over one allocation chain.
///
/// Yields unit indices in traversal order until the table reports
/// [`END_OF_CHAIN`] for the current unit. Finite and not restartable: start
/// a fresh walk per property.
///
/// A step to a unit outside the table, or back to a unit already visited,
/// terminates the walk with an allocation fault. The on-disk format gives no
/// cycle protection of its own, so the walker tracks visited units itself.
pub struct ChainWalker<'a> {
    table: &'a AllocationTable,
    next_unit: Option<u32>,
    visited: Vec<bool>,
}

impl<'a> ChainWalker<'a> {
    /// Start a walk at `start`. A sentinel start yields an empty chain.
    pub fn new(start: u32, table: &'a AllocationTable) -> Self {
        Self {
            table,
            next_unit: Some(start),
            visited: vec![false; table.len()],
        }
    }
}

impl Iterator for ChainWalker<'_> {
    type Item = Result<u32, CfbError>;

    fn next(&mut self) -> Option<Self::Item> {
        let unit = self.next_unit?;
        if unit == END_OF_CHAIN {
            self.next_unit = None;
            return None;
        }
        let successor = match self.table.next_of(unit) {
            Some(next) => next,
            None => {
                self.next_unit = None;
                return Some(Err(CfbError::ChainOutOfBounds {
                    unit,
                    table_len: self.table.len(),
                }));
            }
        };
        let slot = &mut self.visited[unit as usize];
        if *slot {
            self.next_unit = None;
            return Some(Err(CfbError::ChainCycle { unit }));
        }
        *slot = true;
        self.next_unit = Some(successor);
        Some(Ok(unit))
    }
}
