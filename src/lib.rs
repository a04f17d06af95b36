//! # cfb-fragments
//!
//! Reconstruction of fragmented short-block property streams stored inside
//! compound document containers (the legacy office "short sector" allocation
//! model), and their re-presentation as independently parseable sub-documents.
//!
//! A property's content is spread over fixed-size allocation units linked
//! through an allocation table. This crate walks those chains, coalesces them
//! into maximal contiguous runs, emits one byte-range field per run, and can
//! concatenate all fragments of a property back into one logical byte source
//! tagged for recursive parsing.
pub mod cfb;
pub mod stress;

// Re-export the main types for convenience
pub use cfb::{
    error::{CfbError, Result},
    models::{
        AllocationTable, FragmentKind, Property, ReparseKind, Run, COMPOUND_MAGIC, END_OF_CHAIN,
        FREE_UNIT,
    },
    ChainWalker, Container, DiagnosticLevel, DiagnosticSink, Field, FieldIterator, Fragment,
    FragmentGroupHandle, RecursiveSource, RunCoalescer,
};
