//! Who a synthetic person is: demographics, identifiers and the seed their
//! export randomness derives from.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    /// The FHIR administrative-gender code for this sex.
    pub fn fhir_gender(&self) -> &'static str {
        match self {
            Sex::Male => "male",
            Sex::Female => "female",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonName {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,

    pub given: Vec<String>,

    pub family: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonAddress {
    pub line: String,
    pub city: String,
    pub state: String,

    #[serde(rename = "postalCode")]
    pub postal_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonIdentifiers {
    /// Stable internal id of the person in the generating system.
    #[serde(rename = "internalId")]
    pub internal_id: String,

    #[serde(rename = "medicalRecordNumber")]
    pub medical_record_number: String,

    #[serde(
        rename = "socialSecurityNumber",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub social_security_number: Option<String>,

    #[serde(
        rename = "driversLicense",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub drivers_license: Option<String>,

    #[serde(
        rename = "passportNumber",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub passport_number: Option<String>,
}

/// The demographic profile of one synthetic person.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonProfile {
    /// Seed for this person's random stream. The same profile and timeline
    /// always export to the same bundle.
    pub seed: u64,

    pub name: PersonName,

    pub sex: Sex,

    /// Race keyword as produced by the demographic generator, e.g. `white`
    /// or `asian`.
    pub race: String,

    /// Ethnicity keyword, `hispanic` or `nonhispanic`.
    pub ethnicity: String,

    #[serde(rename = "birthDate")]
    pub birth_date: NaiveDate,

    #[serde(
        rename = "deceasedAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub deceased_at: Option<DateTime<Utc>>,

    pub address: PersonAddress,

    pub identifiers: PersonIdentifiers,
}

impl PersonProfile {
    /// Short non-identifying tag for log lines, two letters each of the
    /// first given name and the family name: `Ma-Mu` for Max Mustermann.
    pub fn initials(&self) -> String {
        let given: String = self
            .name
            .given
            .first()
            .map(|g| g.chars().take(2).collect())
            .unwrap_or_default();
        let family: String = self.name.family.chars().take(2).collect();
        format!("{given}-{family}")
    }
}
