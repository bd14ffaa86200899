//! Built-in sample persons.
//!
//! Two hand-written records that between them exercise every fact kind the
//! pipeline exports: a two-encounter record with a repeated facility and
//! clinician, and a minimal single-encounter record. The binary exports
//! them when no input file is given, and the pipeline tests run over the
//! same fixtures.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use synfhir_person::{
    AllergyFact, ClinicianFact, Code, ConditionFact, DeviceFact, DeviceUdiFact, EncounterFact,
    ImmunizationFact, MedicationFact, ObservationFact, ObservationValue, PersonAddress,
    PersonIdentifiers, PersonName, PersonProfile, ProcedureFact, ProviderFact, RecordTimeline,
    ReportFact, Sex,
};

use crate::pipeline::PersonRecord;

const SNOMED: &str = "http://snomed.info/sct";
const LOINC: &str = "http://loinc.org";
const RXNORM: &str = "http://www.nlm.nih.gov/research/umls/rxnorm";
const CVX: &str = "http://hl7.org/fhir/sid/cvx";

fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .unwrap_or_default()
}

fn on(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

/// The built-in sample persons, in a stable order.
pub fn sample_records() -> Vec<PersonRecord> {
    vec![rivera(), muster()]
}

/// Two encounters at the same facility with the same clinician, covering
/// every clinical fact kind.
fn rivera() -> PersonRecord {
    let lakeside = ProviderFact {
        id: "facility-0001".to_string(),
        name: "Lakeside Community Hospital".to_string(),
        phone: Some("555-0100".to_string()),
        address: PersonAddress {
            line: "3 Harbor Platz".to_string(),
            city: "Boston".to_string(),
            state: "Massachusetts".to_string(),
            postal_code: "02108".to_string(),
        },
        latitude: 42.3601,
        longitude: -71.0589,
    };
    let harris = ClinicianFact {
        id: "doc-0001".to_string(),
        npi: "9999990001".to_string(),
        given: "Greta".to_string(),
        family: "Harris".to_string(),
        email: Some("greta.harris@example.com".to_string()),
        address: None,
    };

    let sinusitis_visit = EncounterFact {
        code: Code::new(SNOMED, "185345009", "Encounter for symptom"),
        class_code: "AMB".to_string(),
        movements: vec![],
        start: at(2019, 5, 14, 9, 0),
        end: Some(at(2019, 5, 14, 9, 45)),
        reason: Some(Code::new(SNOMED, "36971009", "Sinusitis (disorder)")),
        provider: lakeside.clone(),
        clinician: harris.clone(),
        note: Some(
            "Robert presented with sinus pressure and a low-grade fever. \
             Amoxicillin prescribed; bloodwork ordered to rule out a \
             bacterial cause."
                .to_string(),
        ),
        conditions: vec![ConditionFact {
            code: Code::new(SNOMED, "444814009", "Viral sinusitis (disorder)"),
            onset: at(2019, 5, 14, 9, 0),
            end: None,
        }],
        allergies: vec![AllergyFact {
            code: Code::new(SNOMED, "419263009", "Allergy to tree pollen"),
            onset: at(1975, 4, 2, 0, 0),
            end: None,
        }],
        observations: vec![
            ObservationFact {
                code: Code::new(LOINC, "8302-2", "Body Height"),
                category: "vital-signs".to_string(),
                value: Some(ObservationValue::Quantity {
                    value: 175.2,
                    unit: "cm".to_string(),
                }),
                effective: at(2019, 5, 14, 9, 10),
            },
            ObservationFact {
                code: Code::new(LOINC, "8867-4", "Heart rate"),
                category: "vital-signs".to_string(),
                value: Some(ObservationValue::Quantity {
                    value: 88.0,
                    unit: "/min".to_string(),
                }),
                effective: at(2019, 5, 14, 9, 10),
            },
            ObservationFact {
                code: Code::new(LOINC, "718-7", "Hemoglobin [Mass/volume] in Blood"),
                category: "laboratory".to_string(),
                value: Some(ObservationValue::Quantity {
                    value: 13.8,
                    unit: "g/dL".to_string(),
                }),
                effective: at(2019, 5, 14, 9, 25),
            },
        ],
        procedures: vec![],
        medications: vec![MedicationFact {
            code: Code::new(RXNORM, "308182", "Amoxicillin 250 MG Oral Capsule"),
            start: at(2019, 5, 14, 9, 40),
            stop: Some(at(2019, 5, 24, 9, 0)),
            administration: false,
        }],
        immunizations: vec![],
        reports: vec![ReportFact {
            code: Code::new(LOINC, "58410-2", "CBC panel - Blood by Automated count"),
            issued: at(2019, 5, 14, 9, 45),
            observations: vec![2],
        }],
        devices: vec![],
    };

    let checkup = EncounterFact {
        code: Code::new(SNOMED, "162673000", "General examination of patient"),
        class_code: "AMB".to_string(),
        movements: vec![],
        start: at(2020, 3, 1, 10, 0),
        end: Some(at(2020, 3, 1, 11, 30)),
        reason: None,
        provider: lakeside,
        clinician: harris,
        note: Some(
            "Annual examination. Medications reconciled, seasonal influenza \
             vaccine administered, home pulse oximeter issued."
                .to_string(),
        ),
        conditions: vec![],
        allergies: vec![],
        observations: vec![],
        procedures: vec![ProcedureFact {
            code: Code::new(SNOMED, "430193006", "Medication reconciliation (procedure)"),
            start: at(2020, 3, 1, 10, 5),
            end: Some(at(2020, 3, 1, 10, 20)),
        }],
        medications: vec![MedicationFact {
            code: Code::new(RXNORM, "313782", "Acetaminophen 325 MG Oral Tablet"),
            start: at(2020, 3, 1, 10, 30),
            stop: None,
            administration: true,
        }],
        immunizations: vec![ImmunizationFact {
            code: Code::new(
                CVX,
                "140",
                "Influenza, seasonal, injectable, preservative free",
            ),
            at: at(2020, 3, 1, 11, 0),
        }],
        reports: vec![],
        devices: vec![DeviceFact {
            code: Code::new(SNOMED, "448703006", "Pulse oximeter (physical object)"),
            udi: Some(DeviceUdiFact {
                device_identifier: "00844588003288".to_string(),
                carrier: "(01)00844588003288(11)200301(17)250301(10)LOT123(21)SN456"
                    .to_string(),
            }),
        }],
    };

    PersonRecord {
        profile: PersonProfile {
            seed: 4211,
            name: PersonName {
                prefix: None,
                given: vec!["Robert".to_string()],
                family: "Rivera".to_string(),
                suffix: None,
            },
            sex: Sex::Male,
            race: "white".to_string(),
            ethnicity: "nonhispanic".to_string(),
            birth_date: on(1961, 9, 3),
            deceased_at: None,
            address: PersonAddress {
                line: "1021 Ferry Weg Apt 60".to_string(),
                city: "Boston".to_string(),
                state: "Massachusetts".to_string(),
                postal_code: "02108".to_string(),
            },
            identifiers: PersonIdentifiers {
                internal_id: "person-0001".to_string(),
                medical_record_number: "mr-77152".to_string(),
                social_security_number: Some("999-54-3187".to_string()),
                drivers_license: Some("S99943120".to_string()),
                passport_number: Some("X54991823".to_string()),
            },
        },
        timeline: RecordTimeline {
            encounters: vec![sinusitis_visit, checkup],
        },
    }
}

/// A minimal single-encounter record with no note and sparse identifiers.
fn muster() -> PersonRecord {
    let hanse = ProviderFact {
        id: "facility-0002".to_string(),
        name: "Hanse Clinic".to_string(),
        phone: None,
        address: PersonAddress {
            line: "3 Hafen Weg".to_string(),
            city: "Lübeck".to_string(),
            state: "SH".to_string(),
            postal_code: "23552".to_string(),
        },
        latitude: 53.8655,
        longitude: 10.6866,
    };

    let pharyngitis_visit = EncounterFact {
        code: Code::new(SNOMED, "185345009", "Encounter for symptom"),
        class_code: "AMB".to_string(),
        movements: vec![],
        start: at(2021, 7, 20, 8, 30),
        end: Some(at(2021, 7, 20, 9, 0)),
        reason: Some(Code::new(SNOMED, "267102003", "Sore throat symptom")),
        provider: hanse,
        clinician: ClinicianFact {
            id: "doc-0002".to_string(),
            npi: "9999990002".to_string(),
            given: "Jonas".to_string(),
            family: "Weber".to_string(),
            email: None,
            address: None,
        },
        note: None,
        conditions: vec![ConditionFact {
            code: Code::new(SNOMED, "195662009", "Acute viral pharyngitis (disorder)"),
            onset: at(2021, 7, 20, 8, 30),
            end: Some(at(2021, 7, 27, 8, 0)),
        }],
        allergies: vec![],
        observations: vec![ObservationFact {
            code: Code::new(LOINC, "8310-5", "Body temperature"),
            category: "vital-signs".to_string(),
            value: Some(ObservationValue::Quantity {
                value: 38.1,
                unit: "Cel".to_string(),
            }),
            effective: at(2021, 7, 20, 8, 40),
        }],
        procedures: vec![],
        medications: vec![MedicationFact {
            code: Code::new(RXNORM, "310965", "Ibuprofen 200 MG Oral Tablet"),
            start: at(2021, 7, 20, 8, 55),
            stop: Some(at(2021, 7, 27, 8, 0)),
            administration: false,
        }],
        immunizations: vec![],
        reports: vec![],
        devices: vec![],
    };

    PersonRecord {
        profile: PersonProfile {
            seed: 77,
            name: PersonName {
                prefix: Some("Mr.".to_string()),
                given: vec!["Max".to_string()],
                family: "Muster".to_string(),
                suffix: Some("MD".to_string()),
            },
            sex: Sex::Male,
            race: "white".to_string(),
            ethnicity: "nonhispanic".to_string(),
            birth_date: on(1980, 4, 12),
            deceased_at: None,
            address: PersonAddress {
                line: "42 Example Allee".to_string(),
                city: "Lübeck".to_string(),
                state: "SH".to_string(),
                postal_code: "23552".to_string(),
            },
            identifiers: PersonIdentifiers {
                internal_id: "person-0002".to_string(),
                medical_record_number: "mr-20543".to_string(),
                social_security_number: Some("999-31-8820".to_string()),
                drivers_license: None,
                passport_number: Some("X81923461".to_string()),
            },
        },
        timeline: RecordTimeline {
            encounters: vec![pharyngitis_visit],
        },
    }
}

// ============================================================================
// Tests
// ============================================================================
