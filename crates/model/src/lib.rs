//! FHIR R4 wire models for synthetic-record export.
//!
//! This crate provides the **resource drafts** that the export pipeline
//! assembles and the specialisation hooks decorate:
//! - shared element types (codings, identifiers, names, addresses, extensions)
//! - one draft struct per exported resource kind
//! - the bundle container with cross-reference lookups
//!
//! Everything here is a wire model: serialising a [`Bundle`] yields FHIR R4
//! JSON, including the `_field` companions FHIR uses for extensions on
//! primitive elements. Drafts carry no behaviour beyond structural helpers;
//! guide-specific decoration lives in the specialisation crate.

pub mod bundle;
pub mod clinical;
pub mod datatypes;
pub mod encounter;
pub mod medication;
pub mod patient;
pub mod provenance;
pub mod provider;
pub mod report;
pub mod terminology;

// Re-export facades
pub use bundle::{full_url, Bundle, BundleEntry, BundleType, Resource, ResourceKind};
pub use clinical::{
    AllergyIntolerance, Condition, Device, DeviceUdiCarrier, Immunization, Observation,
    ObservationComponent, Procedure,
};
pub use datatypes::{
    Address, Attachment, CodeableConcept, Coding, ContactPoint, Extension, HumanName, Identifier,
    Meta, Period, PrimitiveExtension, Quantity, Reference,
};
pub use encounter::{Encounter, EncounterLocation, EncounterParticipant, EncounterStatusHistory};
pub use medication::{Medication, MedicationRequest};
pub use patient::Patient;
pub use provenance::{Provenance, ProvenanceAgent};
pub use provider::{Location, LocationPosition, Organization, Practitioner, PractitionerRole};
pub use report::{
    DiagnosticReport, DocumentReference, DocumentReferenceContent, DocumentReferenceContext,
};

/// Errors returned by the wire-model crate.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("serialisation failed: {0}")]
    Serialisation(#[from] serde_json::Error),

    #[error("bundle schema mismatch at {0}")]
    Translation(String),
}

/// Type alias for Results that can fail with a [`ModelError`].
pub type ModelResult<T> = Result<T, ModelError>;
