//! The per-person export pipeline: facts in, guide-conformant bundle out.
//!
//! This crate assembles the generic resource drafts from a person's profile
//! and timeline, routes every draft through the active [`Specialisation`]'s
//! hooks, and collects the results into one FHIR R4 [`Bundle`] per person.
//!
//! Responsibilities:
//!
//! - Build locale-neutral drafts from clinical facts ([`builder`]).
//! - Drive the specialisation hooks over those drafts in a fixed resource
//!   order, so exports stay reproducible per seed ([`pipeline`]).
//! - Resolve the run configuration into a loaded guide ([`config`]).
//! - Ship fixed sample persons so the pipeline is exercisable without a
//!   record generator ([`sample`]).
//!
//! [`Specialisation`]: synfhir_guides::Specialisation
//! [`Bundle`]: synfhir_model::Bundle

pub mod builder;
pub mod config;
pub mod pipeline;
pub mod sample;

use synfhir_guides::GuideError;
use synfhir_tables::TableError;
use thiserror::Error;

pub use config::ExportConfig;
pub use pipeline::{export_batch, export_person, PersonRecord};

/// Errors raised while configuring a run or exporting one person.
#[derive(Debug, Error)]
pub enum ExportError {
    /// A lookup table could not be loaded at startup.
    #[error("lookup tables failed to load: {0}")]
    Table(#[from] TableError),

    /// The active guide rejected the person's record.
    #[error("specialisation failed: {0}")]
    Guide(#[from] GuideError),
}

/// Type alias for Results that can fail with an [`ExportError`].
pub type ExportResult<T> = Result<T, ExportError>;
