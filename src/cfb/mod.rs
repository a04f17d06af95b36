//! Core compound-document fragment module

pub mod error;
pub mod models;
mod chain;
mod container;
mod driver;
mod fragment;
mod runs;

pub use chain::ChainWalker;
pub use container::Container;
pub use driver::{DiagnosticLevel, DiagnosticSink, Field, FieldIterator, NullSink};
pub use error::{CfbError, Result};
pub use fragment::{Fragment, FragmentGroup, FragmentGroupHandle, RecursiveSource, ReparseTag};
pub use runs::RunCoalescer;
