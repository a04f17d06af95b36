//! Fragments and per-property fragment groups

use std::cell::RefCell;
use std::rc::Rc;

use log::debug;

use super::container::Container;
use super::error::Result;
use super::models::{FragmentKind, ReparseKind, COMPOUND_MAGIC};

/// One byte-range field covering a single run of a property's chain.
///
/// Read-only once created; carries its byte length and the seek offset into
/// the container's short-block stream.
#[derive(Debug, Clone)]
pub struct Fragment {
    pub first_unit: u32,
    pub last_unit: u32,
    /// Byte offset of `first_unit` in the short-block stream.
    pub offset: u64,
    pub byte_length: u64,
}

impl Fragment {
    /// Human-readable span description, e.g. `short blocks 5..7 (3)`.
    pub fn description(&self) -> String {
        format!(
            "short blocks {}..{} ({})",
            self.first_unit,
            self.last_unit,
            self.last_unit - self.first_unit + 1
        )
    }
}

/// All fragments of one property, in chain emission order (which is the
/// property's logical byte order).
///
/// Created on the property's first fragment and shared by every later one;
/// holds a back-reference to the owning container so a materialized stream
/// can be re-dispatched with the right container context.
#[derive(Debug)]
pub struct FragmentGroup<'a> {
    container: &'a Container,
    kind: FragmentKind,
    /// Declared property size, authoritative for trimming the materialized
    /// length (the final unit of a chain is usually only partially used).
    declared_size: u64,
    items: Vec<Fragment>,
}

impl<'a> FragmentGroup<'a> {
    fn new(container: &'a Container, kind: FragmentKind, declared_size: u64) -> Self {
        Self {
            container,
            kind,
            declared_size,
            items: Vec::new(),
        }
    }

    fn add(&mut self, fragment: Fragment) {
        self.items.push(fragment);
    }

    /// Concatenate the raw bytes of every member fragment, in group order,
    /// trimmed to the property's declared size.
    ///
    /// Computed fresh on every call; with an unchanged container the result
    /// is byte-identical across calls.
    fn materialize(&self) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity(self.declared_size as usize);
        for item in &self.items {
            data.extend_from_slice(self.container.read_short_data(item.offset, item.byte_length)?);
        }
        if (self.declared_size as usize) < data.len() {
            data.truncate(self.declared_size as usize);
        }
        debug!(
            "Materialized fragment group: {} fragments, {} bytes",
            self.items.len(),
            data.len()
        );
        Ok(data)
    }
}

/// Shared handle to a [`FragmentGroup`].
///
/// Parsing is single-threaded by design, so the group is shared through
/// `Rc<RefCell<_>>`; every field of one property holds a clone of the same
/// handle.
#[derive(Debug, Clone)]
pub struct FragmentGroupHandle<'a>(Rc<RefCell<FragmentGroup<'a>>>);

impl<'a> FragmentGroupHandle<'a> {
    pub(super) fn new(container: &'a Container, kind: FragmentKind, declared_size: u64) -> Self {
        Self(Rc::new(RefCell::new(FragmentGroup::new(
            container,
            kind,
            declared_size,
        ))))
    }

    pub(super) fn add(&self, fragment: Fragment) {
        self.0.borrow_mut().add(fragment);
    }

    /// Number of fragments registered so far.
    pub fn fragment_count(&self) -> usize {
        self.0.borrow().items.len()
    }

    /// Content classification shared by the group's fragments.
    pub fn kind(&self) -> FragmentKind {
        self.0.borrow().kind
    }

    /// Read and concatenate every member fragment's bytes, in group order.
    ///
    /// # Errors
    /// Fails if any fragment's range falls outside the container's
    /// short-block stream.
    pub fn materialize(&self) -> Result<Vec<u8>> {
        self.0.borrow().materialize()
    }

    /// Wrap the materialized bytes as an independently addressable stream
    /// tagged for recursive dispatch.
    ///
    /// The tag names the owning container (nested compound sub-documents
    /// resolve container-relative structures through it) and the parser the
    /// dispatcher should hand the content to.
    pub fn as_recursive_source(&self) -> Result<RecursiveSource<'a>> {
        let group = self.0.borrow();
        let data = group.materialize()?;
        let kind = sniff(&data);
        Ok(RecursiveSource {
            data,
            tag: ReparseTag {
                kind,
                container: group.container,
            },
        })
    }
}

/// Dispatch tag attached to a materialized fragment stream.
#[derive(Debug, Clone, Copy)]
pub struct ReparseTag<'a> {
    pub kind: ReparseKind,
    /// The container the fragments came from; nested parsing runs against
    /// this same container context.
    pub container: &'a Container,
}

/// A property's reconstructed content, ready for recursive parsing.
#[derive(Debug)]
pub struct RecursiveSource<'a> {
    data: Vec<u8>,
    tag: ReparseTag<'a>,
}

impl<'a> RecursiveSource<'a> {
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn tag(&self) -> ReparseTag<'a> {
        self.tag
    }

    pub fn into_parts(self) -> (Vec<u8>, ReparseTag<'a>) {
        (self.data, self.tag)
    }
}

/// Choose a parser for reconstructed content by sniffing its leading bytes.
fn sniff(data: &[u8]) -> ReparseKind {
    if data.len() >= COMPOUND_MAGIC.len() && data[..COMPOUND_MAGIC.len()] == COMPOUND_MAGIC {
        ReparseKind::CompoundDocument
    } else {
        ReparseKind::CompoundFragment
    }
}
