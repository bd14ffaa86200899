//! The Patient resource draft.
//!
//! Responsibilities:
//!
//! - Model the demographic fields the export pipeline fills in before a
//!   guide reshapes them.
//! - Enforce identifier uniqueness on the (system, value) pair.
//! - Give guides direct access to the official name record.

use serde::{Deserialize, Serialize};

use crate::datatypes::{
    Address, ContactPoint, Extension, HumanName, Identifier, Meta, PrimitiveExtension,
};

// ============================================================================
// Patient
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Patient {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Extension>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifier: Vec<Identifier>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub name: Vec<HumanName>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub telecom: Vec<ContactPoint>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,

    /// Companion element carrying extensions for the `gender` primitive.
    #[serde(rename = "_gender", skip_serializing_if = "Option::is_none")]
    pub gender_element: Option<PrimitiveExtension>,

    #[serde(rename = "birthDate", skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,

    /// Companion element for `birthDate`, used when the date itself is
    /// withheld and only a data-absent-reason remains.
    #[serde(rename = "_birthDate", skip_serializing_if = "Option::is_none")]
    pub birth_date_element: Option<PrimitiveExtension>,

    #[serde(rename = "deceasedBoolean", skip_serializing_if = "Option::is_none")]
    pub deceased_boolean: Option<bool>,

    #[serde(rename = "deceasedDateTime", skip_serializing_if = "Option::is_none")]
    pub deceased_date_time: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub address: Vec<Address>,
}

impl Patient {
    /// Appends an identifier unless one with the same (system, value) pair
    /// is already present. Duplicate submissions are silently coalesced so
    /// a guide can re-add an identifier it already produced.
    pub fn add_identifier(&mut self, identifier: Identifier) {
        let duplicate = self.identifier.iter().any(|existing| {
            existing.system == identifier.system && existing.value == identifier.value
        });
        if !duplicate {
            self.identifier.push(identifier);
        }
    }

    /// The first name record marked `official`, if any.
    pub fn official_name(&self) -> Option<&HumanName> {
        self.name.iter().find(|name| name.is_official())
    }

    pub fn official_name_mut(&mut self) -> Option<&mut HumanName> {
        self.name.iter_mut().find(|name| name.is_official())
    }
}

// ============================================================================
// Tests
// ============================================================================
