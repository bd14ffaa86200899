//! Locale-neutral resource drafts built from clinical facts.
//!
//! Builders are pure: the caller supplies the resource id (drawn from the
//! person's random stream by the pipeline) and every cross-reference url,
//! and gets back a draft that carries no guide opinion. Whatever a guide
//! adds or strips afterwards happens through its hooks, never here.

use chrono::{DateTime, SecondsFormat, Utc};
use synfhir_model::terminology::{
    SYSTEM_ALLERGY_CLINICAL, SYSTEM_ALLERGY_VERIFICATION, SYSTEM_CONDITION_CLINICAL,
    SYSTEM_CONDITION_VER_STATUS, SYSTEM_MEDICAL_RECORD, SYSTEM_OBSERVATION_CATEGORY,
    SYSTEM_PASSPORT, SYSTEM_SYNTHETIC_RECORD, SYSTEM_UCUM, SYSTEM_US_DRIVERS_LICENSE,
    SYSTEM_US_NPI, SYSTEM_US_SSN, SYSTEM_V2_0203, SYSTEM_V3_ACT_CODE,
};
use synfhir_model::{
    Address, AllergyIntolerance, CodeableConcept, Coding, Condition, ContactPoint, Device,
    DeviceUdiCarrier, DiagnosticReport, Encounter, EncounterParticipant, EncounterStatusHistory,
    HumanName, Identifier, Immunization, MedicationRequest, Observation, Organization, Patient,
    Period, Practitioner, Procedure, Quantity, Reference,
};
use synfhir_person::{
    AllergyFact, ClinicianFact, Code, ConditionFact, DeviceFact, EncounterFact, ImmunizationFact,
    MedicationFact, Movement, ObservationFact, ObservationValue, PersonAddress, PersonProfile,
    ProcedureFact, ProviderFact, ReportFact,
};

/// RFC 3339 with second precision and a `Z` suffix, the rendering every
/// exported instant field uses.
fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn concept(code: &Code) -> CodeableConcept {
    CodeableConcept::from_coding(Coding::new(&code.system, &code.code, &code.display))
}

fn status_concept(system: &str, code: &str) -> CodeableConcept {
    CodeableConcept {
        coding: vec![Coding::code_only(system, code)],
        text: None,
    }
}

fn postal_address(address: &PersonAddress) -> Address {
    Address {
        line: vec![address.line.clone()],
        city: Some(address.city.clone()),
        state: Some(address.state.clone()),
        postal_code: Some(address.postal_code.clone()),
        ..Address::default()
    }
}

// ============================================================================
// Patient
// ============================================================================

/// The generic patient draft: every identifier the profile carries, the
/// official name with its salutation prefix and academic suffix intact, and
/// the single-line address. Guides reshape all of this later.
pub fn patient(id: &str, profile: &PersonProfile) -> Patient {
    let mut draft = Patient::default();
    draft.id = Some(id.to_string());

    draft.add_identifier(Identifier::new(
        SYSTEM_SYNTHETIC_RECORD,
        &profile.identifiers.internal_id,
    ));
    draft.add_identifier(
        Identifier::new(
            SYSTEM_MEDICAL_RECORD,
            &profile.identifiers.medical_record_number,
        )
        .with_type(CodeableConcept::from_coding(Coding::new(
            SYSTEM_V2_0203,
            "MR",
            "Medical Record Number",
        ))),
    );
    if let Some(ssn) = &profile.identifiers.social_security_number {
        draft.add_identifier(Identifier::new(SYSTEM_US_SSN, ssn).with_type(
            CodeableConcept::from_coding(Coding::new(
                SYSTEM_V2_0203,
                "SS",
                "Social Security Number",
            )),
        ));
    }
    if let Some(license) = &profile.identifiers.drivers_license {
        draft.add_identifier(Identifier::new(SYSTEM_US_DRIVERS_LICENSE, license).with_type(
            CodeableConcept::from_coding(Coding::new(SYSTEM_V2_0203, "DL", "Driver's License")),
        ));
    }
    if let Some(passport) = &profile.identifiers.passport_number {
        draft.add_identifier(Identifier::new(SYSTEM_PASSPORT, passport).with_type(
            CodeableConcept::from_coding(Coding::new(SYSTEM_V2_0203, "PPN", "Passport Number")),
        ));
    }

    let mut official = HumanName::official(&profile.name.family, profile.name.given.clone());
    if let Some(prefix) = &profile.name.prefix {
        official.prefix.push(prefix.clone());
    }
    if let Some(suffix) = &profile.name.suffix {
        official.suffix.push(suffix.clone());
    }
    draft.name.push(official);

    draft.gender = Some(profile.sex.fhir_gender().to_string());
    draft.birth_date = Some(profile.birth_date.to_string());
    if let Some(deceased_at) = profile.deceased_at {
        draft.deceased_date_time = Some(rfc3339(deceased_at));
    }
    draft.address.push(postal_address(&profile.address));

    draft
}

// ============================================================================
// Care providers
// ============================================================================

/// The facility as an Organization draft, identified by its generator id
/// under the internal tracking system.
pub fn organization(id: &str, fact: &ProviderFact) -> Organization {
    let mut draft = Organization::default();
    draft.id = Some(id.to_string());
    draft
        .identifier
        .push(Identifier::new(SYSTEM_SYNTHETIC_RECORD, &fact.id));
    draft.active = Some(true);
    draft.name = Some(fact.name.clone());
    if let Some(phone) = &fact.phone {
        draft.telecom.push(ContactPoint::phone(phone));
    }
    draft.address.push(postal_address(&fact.address));
    draft
}

pub fn practitioner(id: &str, fact: &ClinicianFact) -> Practitioner {
    let mut draft = Practitioner::default();
    draft.id = Some(id.to_string());
    draft
        .identifier
        .push(Identifier::new(SYSTEM_US_NPI, &fact.npi));
    draft.active = Some(true);
    draft.name.push(HumanName {
        family: Some(fact.family.clone()),
        given: vec![fact.given.clone()],
        ..HumanName::default()
    });
    if let Some(email) = &fact.email {
        draft.telecom.push(ContactPoint::email(email));
    }
    if let Some(address) = &fact.address {
        draft.address.push(postal_address(address));
    }
    draft
}

// ============================================================================
// Encounter
// ============================================================================

pub fn encounter(
    id: &str,
    fact: &EncounterFact,
    patient_url: &str,
    practitioner_url: &str,
    organization_url: &str,
) -> Encounter {
    let mut draft = Encounter::default();
    draft.id = Some(id.to_string());
    draft.status = Some(
        if fact.end.is_some() {
            "finished"
        } else {
            "in-progress"
        }
        .to_string(),
    );
    // An inpatient stay's movement steps become the status trail. Steps
    // carry no timestamps of their own, so each one starts with the stay
    // and only the last spans to its end.
    let last = fact.movements.len().saturating_sub(1);
    for (index, movement) in fact.movements.iter().enumerate() {
        let status = match movement {
            Movement::Admission => "arrived",
            Movement::Inpatient => "in-progress",
        };
        draft.status_history.push(EncounterStatusHistory {
            status: status.to_string(),
            period: Period {
                start: Some(rfc3339(fact.start)),
                end: if index == last {
                    fact.end.map(rfc3339)
                } else {
                    Some(rfc3339(fact.start))
                },
            },
        });
    }
    draft.class = Some(Coding::code_only(SYSTEM_V3_ACT_CODE, &fact.class_code));
    draft.type_.push(concept(&fact.code));
    draft.subject = Some(Reference::to(patient_url));
    draft.participant.push(EncounterParticipant {
        individual: Reference::to(practitioner_url).with_display(fact.clinician.display_name()),
    });
    draft.period = Some(Period {
        start: Some(rfc3339(fact.start)),
        end: fact.end.map(rfc3339),
    });
    if let Some(reason) = &fact.reason {
        draft.reason_code.push(concept(reason));
    }
    draft.service_provider =
        Some(Reference::to(organization_url).with_display(&fact.provider.name));
    draft
}

// ============================================================================
// Clinical resources
// ============================================================================

pub fn condition(
    id: &str,
    fact: &ConditionFact,
    patient_url: &str,
    encounter_url: &str,
) -> Condition {
    let mut draft = Condition::default();
    draft.id = Some(id.to_string());
    let clinical = if fact.end.is_some() { "resolved" } else { "active" };
    draft.clinical_status = Some(status_concept(SYSTEM_CONDITION_CLINICAL, clinical));
    draft.verification_status = Some(status_concept(SYSTEM_CONDITION_VER_STATUS, "confirmed"));
    draft.code = Some(concept(&fact.code));
    draft.subject = Some(Reference::to(patient_url));
    draft.encounter = Some(Reference::to(encounter_url));
    draft.onset_date_time = Some(rfc3339(fact.onset));
    draft.abatement_date_time = fact.end.map(rfc3339);
    draft.recorded_date = Some(rfc3339(fact.onset));
    draft
}

pub fn allergy(id: &str, fact: &AllergyFact, patient_url: &str) -> AllergyIntolerance {
    let mut draft = AllergyIntolerance::default();
    draft.id = Some(id.to_string());
    let clinical = if fact.end.is_some() { "inactive" } else { "active" };
    draft.clinical_status = Some(status_concept(SYSTEM_ALLERGY_CLINICAL, clinical));
    draft.verification_status = Some(status_concept(SYSTEM_ALLERGY_VERIFICATION, "confirmed"));
    draft.code = Some(concept(&fact.code));
    draft.patient = Some(Reference::to(patient_url));
    draft.recorded_date = Some(rfc3339(fact.onset));
    draft
}

pub fn observation(
    id: &str,
    fact: &ObservationFact,
    patient_url: &str,
    encounter_url: &str,
) -> Observation {
    let mut draft = Observation::default();
    draft.id = Some(id.to_string());
    draft.status = Some("final".to_string());
    draft
        .category
        .push(status_concept(SYSTEM_OBSERVATION_CATEGORY, &fact.category));
    draft.code = Some(concept(&fact.code));
    draft.subject = Some(Reference::to(patient_url));
    draft.encounter = Some(Reference::to(encounter_url));
    draft.effective_date_time = Some(rfc3339(fact.effective));
    draft.issued = Some(rfc3339(fact.effective));
    match &fact.value {
        Some(ObservationValue::Quantity { value, unit }) => {
            draft.value_quantity = Some(Quantity {
                value: Some(*value),
                unit: Some(unit.clone()),
                system: Some(SYSTEM_UCUM.to_string()),
                code: Some(unit.clone()),
            });
        }
        Some(ObservationValue::Concept(code)) => {
            draft.value_codeable_concept = Some(concept(code));
        }
        Some(ObservationValue::Text(text)) => {
            draft.value_string = Some(text.clone());
        }
        None => {}
    }
    draft
}

pub fn procedure(
    id: &str,
    fact: &ProcedureFact,
    patient_url: &str,
    encounter_url: &str,
) -> Procedure {
    let mut draft = Procedure::default();
    draft.id = Some(id.to_string());
    draft.status = Some("completed".to_string());
    draft.code = Some(concept(&fact.code));
    draft.subject = Some(Reference::to(patient_url));
    draft.encounter = Some(Reference::to(encounter_url));
    draft.performed_period = Some(Period {
        start: Some(rfc3339(fact.start)),
        end: fact.end.map(rfc3339),
    });
    draft
}

pub fn device(id: &str, fact: &DeviceFact, patient_url: &str) -> Device {
    let mut draft = Device::default();
    draft.id = Some(id.to_string());
    if let Some(udi) = &fact.udi {
        draft.udi_carrier.push(DeviceUdiCarrier {
            device_identifier: Some(udi.device_identifier.clone()),
            carrier_hrf: Some(udi.carrier.clone()),
        });
    }
    draft.status = Some("active".to_string());
    draft.type_ = Some(concept(&fact.code));
    draft.patient = Some(Reference::to(patient_url));
    draft
}

/// The medication starts as an inline concept; a guide may trade it for a
/// reference to a stand-alone Medication entry.
pub fn medication_request(
    id: &str,
    fact: &MedicationFact,
    patient_url: &str,
    encounter_url: &str,
    requester: Reference,
) -> MedicationRequest {
    let mut draft = MedicationRequest::default();
    draft.id = Some(id.to_string());
    draft.status = Some(
        if fact.stop.is_some() {
            "stopped"
        } else {
            "active"
        }
        .to_string(),
    );
    draft.intent = Some("order".to_string());
    draft.medication_codeable_concept = Some(concept(&fact.code));
    draft.subject = Some(Reference::to(patient_url));
    draft.encounter = Some(Reference::to(encounter_url));
    draft.authored_on = Some(rfc3339(fact.start));
    draft.requester = Some(requester);
    draft
}

pub fn immunization(
    id: &str,
    fact: &ImmunizationFact,
    patient_url: &str,
    encounter_url: &str,
) -> Immunization {
    let mut draft = Immunization::default();
    draft.id = Some(id.to_string());
    draft.status = Some("completed".to_string());
    draft.vaccine_code = Some(concept(&fact.code));
    draft.patient = Some(Reference::to(patient_url));
    draft.encounter = Some(Reference::to(encounter_url));
    draft.occurrence_date_time = Some(rfc3339(fact.at));
    draft.primary_source = Some(true);
    draft
}

/// `results` are the references to the observation entries this report
/// covers, resolved by the pipeline from the fact's indexes.
pub fn report(
    id: &str,
    fact: &ReportFact,
    patient_url: &str,
    encounter_url: &str,
    results: Vec<Reference>,
) -> DiagnosticReport {
    let mut draft = DiagnosticReport::default();
    draft.id = Some(id.to_string());
    draft.status = Some("final".to_string());
    draft.code = Some(concept(&fact.code));
    draft.subject = Some(Reference::to(patient_url));
    draft.encounter = Some(Reference::to(encounter_url));
    draft.effective_date_time = Some(rfc3339(fact.issued));
    draft.issued = Some(rfc3339(fact.issued));
    draft.result = results;
    draft
}

// ============================================================================
// Tests
// ============================================================================
