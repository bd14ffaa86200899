//! What happened to a person: the clinical facts the export pipeline turns
//! into resources.
//!
//! Facts are deliberately plain. They carry codes, times and values from
//! the record generator, with no FHIR structure; the export crate decides
//! how each fact becomes a resource and the active guide decides how that
//! resource is shaped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::profile::PersonAddress;

/// A coded concept from a terminology system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Code {
    pub system: String,
    pub code: String,
    pub display: String,
}

impl Code {
    pub fn new(
        system: impl Into<String>,
        code: impl Into<String>,
        display: impl Into<String>,
    ) -> Self {
        Code {
            system: system.into(),
            code: code.into(),
            display: display.into(),
        }
    }
}

/// Everything that happened to one person, as a sequence of encounters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RecordTimeline {
    #[serde(default)]
    pub encounters: Vec<EncounterFact>,
}

impl RecordTimeline {
    /// The end of the record: the last encounter's end, or its start while
    /// it is still open. Falls back to the UNIX epoch for empty records.
    pub fn stop_time(&self) -> DateTime<Utc> {
        self.encounters
            .last()
            .map(|e| e.end.unwrap_or(e.start))
            .unwrap_or_default()
    }
}

/// One step of an inpatient stay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Movement {
    /// The intake at the facility.
    Admission,
    /// The transfer to a ward bed after intake.
    Inpatient,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterFact {
    pub code: Code,

    /// ActCode class, e.g. `AMB`, `EMER`, `IMP`.
    #[serde(rename = "classCode")]
    pub class_code: String,

    /// Movement steps of an inpatient stay, in order. Empty until the
    /// movement pass fills them in; outpatient encounters carry none.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub movements: Vec<Movement>,

    pub start: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<Code>,

    pub provider: ProviderFact,

    pub clinician: ClinicianFact,

    /// Free-text clinical note for the encounter, when one was written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<ConditionFact>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allergies: Vec<AllergyFact>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub observations: Vec<ObservationFact>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub procedures: Vec<ProcedureFact>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub medications: Vec<MedicationFact>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub immunizations: Vec<ImmunizationFact>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reports: Vec<ReportFact>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub devices: Vec<DeviceFact>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionFact {
    pub code: Code,

    pub onset: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllergyFact {
    pub code: Code,

    pub onset: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
}

/// The measured value of an observation. Shapes are structurally distinct
/// on the wire, so the enum is untagged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObservationValue {
    Quantity { value: f64, unit: String },
    Concept(Code),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationFact {
    pub code: Code,

    /// Observation category code, e.g. `vital-signs` or `laboratory`.
    pub category: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<ObservationValue>,

    pub effective: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcedureFact {
    pub code: Code,

    pub start: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationFact {
    pub code: Code,

    pub start: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<DateTime<Utc>>,

    /// True when the medication was administered during the encounter
    /// rather than prescribed.
    #[serde(default)]
    pub administration: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImmunizationFact {
    pub code: Code,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportFact {
    pub code: Code,

    pub issued: DateTime<Utc>,

    /// Indexes into the encounter's `observations` that this report covers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub observations: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceFact {
    pub code: Code,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub udi: Option<DeviceUdiFact>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceUdiFact {
    #[serde(rename = "deviceIdentifier")]
    pub device_identifier: String,

    /// Human readable form of the full UDI barcode.
    pub carrier: String,
}

/// The facility an encounter took place at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderFact {
    /// Stable id of the facility in the generating system.
    pub id: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    pub address: PersonAddress,

    pub latitude: f64,

    pub longitude: f64,
}

/// The clinician who attended an encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicianFact {
    /// Stable id of the clinician in the generating system.
    pub id: String,

    /// National provider identifier.
    pub npi: String,

    pub given: String,

    pub family: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<PersonAddress>,
}

impl ClinicianFact {
    /// Rendered display name, "Given Family".
    pub fn display_name(&self) -> String {
        format!("{} {}", self.given, self.family)
    }
}
