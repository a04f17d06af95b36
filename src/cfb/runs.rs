//! Coalescing of chain steps into maximal contiguous runs

use super::error::CfbError;
use super::models::Run;

/// Collapses a chain of unit indices into the fewest possible [`Run`]s.
///
/// A unit extends the current run when it equals the previous unit plus one;
/// the first non-contiguous unit emits the accumulated run and seeds the next
/// one. An all-contiguous chain therefore emits exactly one run, and a
/// property spread over many scattered units still yields one byte-range
/// field per maximal span rather than one per unit.
///
/// A fault from the underlying chain ends the sequence with that error; the
/// partially accumulated run is discarded, matching the per-property abort
/// semantics of the driver.
pub struct RunCoalescer<I> {
    chain: I,
    unit_size: u32,
    current: Option<Run>,
    done: bool,
}

impl<I> RunCoalescer<I>
where
    I: Iterator<Item = Result<u32, CfbError>>,
{
    pub fn new(chain: I, unit_size: u32) -> Self {
        Self {
            chain,
            unit_size,
            current: None,
            done: false,
        }
    }
}

impl<I> Iterator for RunCoalescer<I>
where
    I: Iterator<Item = Result<u32, CfbError>>,
{
    type Item = Result<Run, CfbError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            match self.chain.next() {
                Some(Ok(unit)) => match self.current {
                    Some(ref mut run) if unit == run.last_unit + 1 => {
                        run.last_unit = unit;
                        run.byte_length += u64::from(self.unit_size);
                    }
                    Some(finished) => {
                        self.current = Some(Run {
                            first_unit: unit,
                            last_unit: unit,
                            byte_length: u64::from(self.unit_size),
                        });
                        return Some(Ok(finished));
                    }
                    None => {
                        self.current = Some(Run {
                            first_unit: unit,
                            last_unit: unit,
                            byte_length: u64::from(self.unit_size),
                        });
                    }
                },
                Some(Err(e)) => {
                    self.done = true;
                    self.current = None;
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    return self.current.take().map(Ok);
                }
            }
        }
    }
}
