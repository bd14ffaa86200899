//! Person profiles, clinical fact timelines and the per-person RNG.
//!
//! This crate is the input side of the export pipeline: a [`PersonProfile`]
//! describes who a synthetic person is, a [`RecordTimeline`] describes what
//! happened to them, and [`PersonRng`] is the seeded random stream every
//! probabilistic decision about that person draws from. Exporting the same
//! profile and timeline twice yields byte-identical output because all
//! randomness flows through the profile's seed.

pub mod fact;
pub mod movement;
pub mod profile;
pub mod rng;

pub use fact::{
    AllergyFact, ClinicianFact, Code, ConditionFact, DeviceFact, DeviceUdiFact, EncounterFact,
    ImmunizationFact, MedicationFact, Movement, ObservationFact, ObservationValue, ProcedureFact,
    ProviderFact, RecordTimeline, ReportFact,
};
pub use profile::{PersonAddress, PersonIdentifiers, PersonName, PersonProfile, Sex};
pub use rng::PersonRng;
