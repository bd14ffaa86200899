//! The Encounter resource draft.

use serde::{Deserialize, Serialize};

use crate::datatypes::{CodeableConcept, Coding, Identifier, Meta, Period, Reference};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Encounter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifier: Vec<Identifier>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(rename = "statusHistory", default, skip_serializing_if = "Vec::is_empty")]
    pub status_history: Vec<EncounterStatusHistory>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<Coding>,

    #[serde(rename = "type", default, skip_serializing_if = "Vec::is_empty")]
    pub type_: Vec<CodeableConcept>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<Reference>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub participant: Vec<EncounterParticipant>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<Period>,

    #[serde(rename = "reasonCode", default, skip_serializing_if = "Vec::is_empty")]
    pub reason_code: Vec<CodeableConcept>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub location: Vec<EncounterLocation>,

    #[serde(rename = "serviceProvider", skip_serializing_if = "Option::is_none")]
    pub service_provider: Option<Reference>,
}

impl Encounter {
    /// The first participating individual, usually the attending clinician.
    pub fn first_participant(&self) -> Option<&Reference> {
        self.participant.first().map(|p| &p.individual)
    }
}

/// One earlier status of the encounter and the period it held for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterStatusHistory {
    pub status: String,
    pub period: Period,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterParticipant {
    pub individual: Reference,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterLocation {
    pub location: Reference,
}
