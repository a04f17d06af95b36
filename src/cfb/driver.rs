//! Property driver: streams named fields out of a container

use log::{debug, warn};

use super::chain::ChainWalker;
use super::container::Container;
use super::error::CfbError;
use super::fragment::{Fragment, FragmentGroupHandle};
use super::models::{FragmentKind, DOC_SUMMARY_INFORMATION, SUMMARY_INFORMATION};
use super::runs::RunCoalescer;

/// Severity of a diagnostic emitted during parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Info,
    Error,
}

/// Receiver for parse diagnostics, injected into the parsing session.
///
/// External consumers (such as a fuzzing harness) implement this to observe
/// recovered anomalies without installing any process-global hook.
pub trait DiagnosticSink {
    fn report(&self, level: DiagnosticLevel, message: &str);
}

/// Sink that discards every diagnostic.
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn report(&self, _level: DiagnosticLevel, _message: &str) {}
}

static NULL_SINK: NullSink = NullSink;

/// One named byte-range field emitted by the driver.
#[derive(Debug, Clone)]
pub struct Field<'a> {
    /// Path-addressable name: `summary[0]`, `doc_summary[0]`, `comp_obj`,
    /// or `<name>content[i]`.
    pub name: String,
    pub kind: FragmentKind,
    pub fragment: Fragment,
    /// Shared handle to the group collecting every fragment of this
    /// property.
    pub group: FragmentGroupHandle<'a>,
}

/// Lazy sequence of fields reconstructed from a container's short-block
/// properties.
///
/// Enumerates the property table in order, skipping the root entry (index 0)
/// and any property whose size falls outside `1..threshold` (the latter
/// belong to the regular-sector path and are a policy boundary, not an
/// error). Nothing is read from the container until the consumer pulls the
/// next field.
///
/// An allocation fault aborts only the faulted property: the fault is
/// yielded as one `Err` item and iteration resumes with the next property.
/// Fields already emitted for the faulted property remain valid.
pub struct FieldIterator<'a> {
    container: &'a Container,
    sink: &'a dyn DiagnosticSink,
    next_property: usize,
    current: Option<PropertyState<'a>>,
}

/// Per-property pipeline: chain walk, run coalescing, fragment emission.
struct PropertyState<'a> {
    index: usize,
    raw_name: String,
    semantic: String,
    kind: FragmentKind,
    group: FragmentGroupHandle<'a>,
    runs: RunCoalescer<ChainWalker<'a>>,
    emitted: usize,
}

impl<'a> FieldIterator<'a> {
    pub(super) fn new(container: &'a Container) -> Self {
        Self::with_sink(container, &NULL_SINK)
    }

    pub(super) fn with_sink(container: &'a Container, sink: &'a dyn DiagnosticSink) -> Self {
        Self {
            container,
            sink,
            next_property: 0,
            current: None,
        }
    }

    /// Set up the pipeline for the property at `index`, or `None` if the
    /// property is filtered out.
    fn start_property(&self, index: usize) -> Option<PropertyState<'a>> {
        let container = self.container;
        let property = &container.properties()[index];
        if index == 0 {
            debug!("Skipping property 0 (container root)");
            return None;
        }
        if property.size == 0 {
            debug!("Skipping empty property '{}'", property.name);
            return None;
        }
        if property.size >= container.threshold() {
            debug!(
                "Skipping property '{}': {} bytes >= threshold {}, stored in regular sectors",
                property.name,
                property.size,
                container.threshold()
            );
            return None;
        }
        let semantic = self.semantic_name(&property.name);
        let kind = classify(index, &semantic);
        let group = FragmentGroupHandle::new(container, kind, property.size);
        let runs = RunCoalescer::new(
            container.chain(property.start),
            container.short_unit_size(),
        );
        Some(PropertyState {
            index,
            raw_name: property.name.clone(),
            semantic,
            kind,
            group,
            runs,
            emitted: 0,
        })
    }

    /// Map a declared property name to its semantic label; anything outside
    /// the reserved mapping falls back to a generic content label.
    fn semantic_name(&self, raw: &str) -> String {
        match raw {
            SUMMARY_INFORMATION => "summary".to_string(),
            DOC_SUMMARY_INFORMATION => "doc_summary".to_string(),
            other => {
                self.sink.report(
                    DiagnosticLevel::Info,
                    &format!("unknown property name {:?}, using generic content label", other),
                );
                format!("{}content", other)
            }
        }
    }
}

impl<'a> Iterator for FieldIterator<'a> {
    type Item = Result<Field<'a>, CfbError>;

    fn next(&mut self) -> Option<Self::Item> {
        let container = self.container;
        loop {
            if let Some(state) = self.current.as_mut() {
                match state.runs.next() {
                    Some(Ok(run)) => {
                        let fragment = Fragment {
                            first_unit: run.first_unit,
                            last_unit: run.last_unit,
                            offset: container.short_offset(run.first_unit),
                            byte_length: run.byte_length,
                        };
                        state.group.add(fragment.clone());
                        let name = match state.kind {
                            FragmentKind::ClassId => "comp_obj".to_string(),
                            _ => format!("{}[{}]", state.semantic, state.emitted),
                        };
                        state.emitted += 1;
                        return Some(Ok(Field {
                            name,
                            kind: state.kind,
                            fragment,
                            group: state.group.clone(),
                        }));
                    }
                    Some(Err(source)) => {
                        let fault = CfbError::PropertyFault {
                            name: state.raw_name.clone(),
                            index: state.index,
                            source: Box::new(source),
                        };
                        warn!("{}", fault);
                        self.sink.report(DiagnosticLevel::Error, &fault.to_string());
                        self.current = None;
                        return Some(Err(fault));
                    }
                    None => {
                        self.current = None;
                    }
                }
                continue;
            }
            if self.next_property >= container.properties().len() {
                return None;
            }
            let index = self.next_property;
            self.next_property += 1;
            self.current = self.start_property(index);
        }
    }
}

/// Decide a property's fragment kind once, up front.
///
/// The class-identification stream always sits at directory index 1 and wins
/// over the reserved-name check, so a hostile container cannot relabel it by
/// reusing a summary name.
fn classify(index: usize, semantic_name: &str) -> FragmentKind {
    if index == 1 {
        return FragmentKind::ClassId;
    }
    match semantic_name {
        "summary" | "doc_summary" => FragmentKind::Summary,
        _ => FragmentKind::Opaque,
    }
}
