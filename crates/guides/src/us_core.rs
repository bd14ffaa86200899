//! The US Core implementation guide.
//!
//! Claims every resource kind the pipeline dispatches. Most hooks stamp the
//! draft with its US Core profile; several also emit companion entries: a
//! Location per facility, a PractitionerRole per practitioner, a stand-alone
//! Medication for administered drugs, a DiagnosticReport/DocumentReference
//! pair per clinical note, and one Provenance entry targeting the whole
//! bundle.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, SecondsFormat, Utc};

use synfhir_model::terminology::{
    SYSTEM_CONDITION_CATEGORY, SYSTEM_LOINC, SYSTEM_PROVENANCE_PARTICIPANT_TYPE,
    SYSTEM_SYNTHETIC_RECORD, SYSTEM_V3_NULL_FLAVOR,
};
use synfhir_model::{
    full_url, Address, AllergyIntolerance, Attachment, Bundle, CodeableConcept, Coding, Condition,
    ContactPoint, Device, DiagnosticReport, DocumentReference, DocumentReferenceContent,
    DocumentReferenceContext, Encounter, EncounterLocation, Extension, Identifier, Immunization,
    Location, LocationPosition, Medication, MedicationRequest, Meta, Observation, Organization,
    Patient, Practitioner, PractitionerRole, Procedure, Provenance, ProvenanceAgent, Reference,
    Resource, ResourceKind,
};
use synfhir_person::{
    EncounterFact, MedicationFact, PersonProfile, PersonRng, ProviderFact, RecordTimeline, Sex,
};
use synfhir_tables::LookupTables;

use crate::contract::Specialisation;
use crate::GuideResult;

// ============================================================================
// Profiles and systems
// ============================================================================

const PROFILE_PATIENT: &str = "http://hl7.org/fhir/us/core/StructureDefinition/us-core-patient";
const PROFILE_ENCOUNTER: &str =
    "http://hl7.org/fhir/us/core/StructureDefinition/us-core-encounter";
const PROFILE_CONDITION: &str =
    "http://hl7.org/fhir/us/core/StructureDefinition/us-core-condition";
const PROFILE_ALLERGY: &str =
    "http://hl7.org/fhir/us/core/StructureDefinition/us-core-allergyintolerance";
const PROFILE_OBSERVATION_LAB: &str =
    "http://hl7.org/fhir/us/core/StructureDefinition/us-core-observation-lab";
const PROFILE_VITAL_SIGNS: &str = "http://hl7.org/fhir/StructureDefinition/vitalsigns";
const PROFILE_PROCEDURE: &str =
    "http://hl7.org/fhir/us/core/StructureDefinition/us-core-procedure";
const PROFILE_IMPLANTABLE_DEVICE: &str =
    "http://hl7.org/fhir/us/core/StructureDefinition/us-core-implantable-device";
const PROFILE_MEDICATION_REQUEST: &str =
    "http://hl7.org/fhir/us/core/StructureDefinition/us-core-medicationrequest";
const PROFILE_MEDICATION: &str =
    "http://hl7.org/fhir/us/core/StructureDefinition/us-core-medication";
const PROFILE_IMMUNIZATION: &str =
    "http://hl7.org/fhir/us/core/StructureDefinition/us-core-immunization";
const PROFILE_REPORT_LAB: &str =
    "http://hl7.org/fhir/us/core/StructureDefinition/us-core-diagnosticreport-lab";
const PROFILE_REPORT_NOTE: &str =
    "http://hl7.org/fhir/us/core/StructureDefinition/us-core-diagnosticreport-note";
const PROFILE_DOCUMENT_REFERENCE: &str =
    "http://hl7.org/fhir/us/core/StructureDefinition/us-core-documentreference";
const PROFILE_ORGANIZATION: &str =
    "http://hl7.org/fhir/us/core/StructureDefinition/us-core-organization";
const PROFILE_LOCATION: &str = "http://hl7.org/fhir/us/core/StructureDefinition/us-core-location";
const PROFILE_PRACTITIONER: &str =
    "http://hl7.org/fhir/us/core/StructureDefinition/us-core-practitioner";
const PROFILE_PRACTITIONER_ROLE: &str =
    "http://hl7.org/fhir/us/core/StructureDefinition/us-core-practitionerrole";
const PROFILE_PROVENANCE: &str =
    "http://hl7.org/fhir/us/core/StructureDefinition/us-core-provenance";

const EXTENSION_RACE: &str = "http://hl7.org/fhir/us/core/StructureDefinition/us-core-race";
const EXTENSION_ETHNICITY: &str =
    "http://hl7.org/fhir/us/core/StructureDefinition/us-core-ethnicity";
const EXTENSION_BIRTHSEX: &str =
    "http://hl7.org/fhir/us/core/StructureDefinition/us-core-birthsex";
const EXTENSION_DIRECT: &str = "http://hl7.org/fhir/us/core/StructureDefinition/us-core-direct";

/// OMB race and ethnicity category code system.
const SYSTEM_OMB_CATEGORY: &str = "urn:oid:2.16.840.1.113883.6.238";
const SYSTEM_DOCREF_CATEGORY: &str =
    "http://hl7.org/fhir/us/core/CodeSystem/us-core-documentreference-category";
const SYSTEM_US_PROVENANCE_PARTICIPANT_TYPE: &str =
    "http://hl7.org/fhir/us/core/CodeSystem/us-core-provenance-participant-type";
const SYSTEM_NUCC_TAXONOMY: &str = "http://nucc.org/provider-taxonomy";
const SYSTEM_IHE_FORMAT: &str = "http://ihe.net/fhir/ValueSet/IHE.FormatCode.codesystem";

const FALLBACK_PHONE: &str = "(555) 555-5555";

/// USPS two-letter codes by state name. Unknown names pass through
/// unchanged.
static STATE_ABBREVIATIONS: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("Alabama", "AL"),
        ("Alaska", "AK"),
        ("Arizona", "AZ"),
        ("Arkansas", "AR"),
        ("California", "CA"),
        ("Colorado", "CO"),
        ("Connecticut", "CT"),
        ("Delaware", "DE"),
        ("District of Columbia", "DC"),
        ("Florida", "FL"),
        ("Georgia", "GA"),
        ("Hawaii", "HI"),
        ("Idaho", "ID"),
        ("Illinois", "IL"),
        ("Indiana", "IN"),
        ("Iowa", "IA"),
        ("Kansas", "KS"),
        ("Kentucky", "KY"),
        ("Louisiana", "LA"),
        ("Maine", "ME"),
        ("Maryland", "MD"),
        ("Massachusetts", "MA"),
        ("Michigan", "MI"),
        ("Minnesota", "MN"),
        ("Mississippi", "MS"),
        ("Missouri", "MO"),
        ("Montana", "MT"),
        ("Nebraska", "NE"),
        ("Nevada", "NV"),
        ("New Hampshire", "NH"),
        ("New Jersey", "NJ"),
        ("New Mexico", "NM"),
        ("New York", "NY"),
        ("North Carolina", "NC"),
        ("North Dakota", "ND"),
        ("Ohio", "OH"),
        ("Oklahoma", "OK"),
        ("Oregon", "OR"),
        ("Pennsylvania", "PA"),
        ("Rhode Island", "RI"),
        ("South Carolina", "SC"),
        ("South Dakota", "SD"),
        ("Tennessee", "TN"),
        ("Texas", "TX"),
        ("Utah", "UT"),
        ("Vermont", "VT"),
        ("Virginia", "VA"),
        ("Washington", "WA"),
        ("West Virginia", "WV"),
        ("Wisconsin", "WI"),
        ("Wyoming", "WY"),
    ])
});

// ============================================================================
// Guide
// ============================================================================

pub struct UsCoreGuide {
    tables: Arc<LookupTables>,
}

impl UsCoreGuide {
    pub fn new(tables: Arc<LookupTables>) -> Self {
        UsCoreGuide { tables }
    }

    /// The us-core-race complex extension: an `ombCategory` coding plus a
    /// `text` repeat. Races outside the OMB categories become a null-flavor
    /// coding without a table lookup; a lookup miss for a category race
    /// omits the extension.
    fn race_extension(&self, profile: &PersonProfile) -> Option<Extension> {
        let display = match profile.race.as_str() {
            "white" => "White",
            "black" => "Black or African American",
            "asian" => "Asian",
            "native" => "American Indian or Alaska Native",
            _ => "Other",
        };

        let coding = if display == "Other" {
            Coding::new(SYSTEM_V3_NULL_FLAVOR, "UNK", "Unknown")
        } else {
            let code = self.tables.race_ethnicity_codes.code_for(&profile.race)?;
            Coding::new(SYSTEM_OMB_CATEGORY, code, display)
        };

        Some(Extension::nested(
            EXTENSION_RACE,
            vec![
                Extension::coding("ombCategory", coding),
                Extension::string("text", display),
            ],
        ))
    }

    /// The us-core-ethnicity complex extension. A lookup miss omits it.
    fn ethnicity_extension(&self, profile: &PersonProfile) -> Option<Extension> {
        let display = if profile.ethnicity == "hispanic" {
            "Hispanic or Latino"
        } else {
            "Not Hispanic or Latino"
        };
        let code = self
            .tables
            .race_ethnicity_codes
            .code_for(&profile.ethnicity)?;

        Some(Extension::nested(
            EXTENSION_ETHNICITY,
            vec![
                Extension::coding(
                    "ombCategory",
                    Coding::new(SYSTEM_OMB_CATEGORY, code, display),
                ),
                Extension::string("text", display),
            ],
        ))
    }

    /// Push the companion Location entry for a facility. It lands in the
    /// bundle before the Organization itself, which the pipeline pushes
    /// after this hook returns.
    fn facility_location(
        &self,
        organization: &Organization,
        fact: &ProviderFact,
        rng: &mut PersonRng,
        bundle: &mut Bundle,
    ) {
        let Some(organization_id) = &organization.id else {
            return;
        };

        let phone = fact
            .phone
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(FALLBACK_PHONE);

        let id = rng.uuid();
        let location = Location {
            id: Some(id.clone()),
            meta: Some(Meta::conforming_to(PROFILE_LOCATION)),
            status: Some("active".to_string()),
            name: Some(fact.name.clone()),
            telecom: vec![ContactPoint::phone(phone)],
            address: Some(Address {
                line: vec![fact.address.line.clone()],
                city: Some(fact.address.city.clone()),
                state: Some(fact.address.state.clone()),
                postal_code: Some(fact.address.postal_code.clone()),
                ..Address::default()
            }),
            position: Some(LocationPosition {
                longitude: fact.longitude,
                latitude: fact.latitude,
            }),
            managing_organization: Some(
                Reference::to(full_url(organization_id)).with_display(&fact.name),
            ),
        };
        bundle.push(&id, Resource::Location(location));
    }
}

/// The location reference of the encounter a draft points at, if resolvable.
fn encounter_location(encounter: Option<&Reference>, bundle: &Bundle) -> Option<Reference> {
    let url = encounter?.reference.as_deref()?;
    let encounter = bundle.encounter_by_url(url)?;
    encounter.location.first().map(|l| l.location.clone())
}

impl Specialisation for UsCoreGuide {
    fn handles(&self, _kind: ResourceKind) -> bool {
        true
    }

    fn patient_extension(
        &self,
        draft: &mut Patient,
        profile: &PersonProfile,
        _rng: &mut PersonRng,
    ) -> GuideResult<()> {
        draft.meta = Some(Meta::conforming_to(PROFILE_PATIENT));

        if let Some(race) = self.race_extension(profile) {
            draft.extension.push(race);
        }
        if let Some(ethnicity) = self.ethnicity_extension(profile) {
            draft.extension.push(ethnicity);
        }
        let birthsex = match profile.sex {
            Sex::Male => "M",
            Sex::Female => "F",
        };
        draft
            .extension
            .push(Extension::code(EXTENSION_BIRTHSEX, birthsex));
        draft.gender = Some(profile.sex.fhir_gender().to_string());

        // Addresses carry the USPS two-letter state code.
        for address in &mut draft.address {
            if let Some(state) = &address.state {
                if let Some(abbreviation) = STATE_ABBREVIATIONS.get(state.as_str()) {
                    address.state = Some((*abbreviation).to_string());
                }
            }
        }

        Ok(())
    }

    fn encounter_extension(&self, draft: &mut Encounter, bundle: &Bundle) -> GuideResult<()> {
        draft.meta = Some(Meta::conforming_to(PROFILE_ENCOUNTER));

        // Point the encounter at the facility's Location entry.
        let facility = draft
            .service_provider
            .as_ref()
            .and_then(|r| r.reference.as_deref())
            .and_then(|organization_url| bundle.location_managed_by(organization_url));
        if let Some((location_url, location)) = facility {
            let mut reference = Reference::to(location_url);
            if let Some(name) = &location.name {
                reference = reference.with_display(name);
            }
            draft.location.push(EncounterLocation {
                location: reference,
            });
        }

        // An identifier backs the required Encounter.identifier search
        // parameter.
        if let Some(id) = &draft.id {
            draft
                .identifier
                .push(Identifier::new(SYSTEM_SYNTHETIC_RECORD, id.clone()).with_use("official"));
        }

        Ok(())
    }

    fn condition_extension(&self, draft: &mut Condition) -> GuideResult<()> {
        draft.meta = Some(Meta::conforming_to(PROFILE_CONDITION));
        draft.category.push(CodeableConcept {
            coding: vec![Coding::new(
                SYSTEM_CONDITION_CATEGORY,
                "encounter-diagnosis",
                "Encounter Diagnosis",
            )],
            text: None,
        });
        Ok(())
    }

    fn allergy_extension(&self, draft: &mut AllergyIntolerance) -> GuideResult<()> {
        self.allergy_forbidden(draft);
        draft.meta = Some(Meta::conforming_to(PROFILE_ALLERGY));
        Ok(())
    }

    fn observation_extension(&self, draft: &mut Observation, in_report: bool) -> GuideResult<()> {
        self.observation_forbidden(draft);

        let mapped = draft
            .primary_coding()
            .and_then(|(system, code)| self.tables.profile_mappings.profile_for(system, code));

        let mut profiles: Vec<String> = Vec::new();
        if let Some(uri) = mapped {
            profiles.push(uri.to_string());
            // Mappings outside US Core are vital-signs profiles from the
            // FHIR base spec, which also expect the base vitalsigns claim.
            if !uri.contains("/us/core/") && draft.has_category("vital-signs") {
                profiles.push(PROFILE_VITAL_SIGNS.to_string());
            }
        } else if in_report && draft.has_category("laboratory") {
            profiles.push(PROFILE_OBSERVATION_LAB.to_string());
        }

        if !profiles.is_empty() {
            draft.meta = Some(Meta {
                profile: profiles,
                source: None,
            });
        }

        Ok(())
    }

    fn procedure_extension(&self, draft: &mut Procedure, bundle: &Bundle) -> GuideResult<()> {
        self.procedure_forbidden(draft);
        draft.meta = Some(Meta::conforming_to(PROFILE_PROCEDURE));

        if let Some(location) = encounter_location(draft.encounter.as_ref(), bundle) {
            draft.location = Some(location);
        }
        Ok(())
    }

    fn device_extension(&self, draft: &mut Device) -> GuideResult<()> {
        self.device_forbidden(draft);
        draft.meta = Some(Meta::conforming_to(PROFILE_IMPLANTABLE_DEVICE));
        Ok(())
    }

    fn medication_request_extension(
        &self,
        draft: &mut MedicationRequest,
        fact: &MedicationFact,
        rng: &mut PersonRng,
        bundle: &mut Bundle,
    ) -> GuideResult<()> {
        draft.meta = Some(Meta::conforming_to(PROFILE_MEDICATION_REQUEST));

        // Administered medications are carried as stand-alone Medication
        // entries, exercising the us-core-medication profile.
        if fact.administration {
            let id = rng.uuid();
            let medication = Medication {
                id: Some(id.clone()),
                meta: Some(Meta::conforming_to(PROFILE_MEDICATION)),
                code: Some(CodeableConcept::from_coding(Coding::new(
                    &fact.code.system,
                    &fact.code.code,
                    &fact.code.display,
                ))),
                status: Some("active".to_string()),
            };
            let url = bundle.push(&id, Resource::Medication(medication));
            draft.medication_reference = Some(Reference::to(url));
            draft.medication_codeable_concept = None;
        }

        Ok(())
    }

    fn immunization_extension(&self, draft: &mut Immunization, bundle: &Bundle) -> GuideResult<()> {
        draft.meta = Some(Meta::conforming_to(PROFILE_IMMUNIZATION));

        if let Some(location) = encounter_location(draft.encounter.as_ref(), bundle) {
            draft.location = Some(location);
        }
        Ok(())
    }

    fn report_extension(&self, draft: &mut DiagnosticReport, bundle: &Bundle) -> GuideResult<()> {
        draft.meta = Some(Meta::conforming_to(PROFILE_REPORT_LAB));

        let service_provider = draft
            .encounter
            .as_ref()
            .and_then(|r| r.reference.as_deref())
            .and_then(|url| bundle.encounter_by_url(url))
            .and_then(|encounter| encounter.service_provider.clone());
        if let Some(provider) = service_provider {
            draft.performer.push(provider);
        }
        Ok(())
    }

    fn provider_extension(
        &self,
        draft: &mut Organization,
        fact: &ProviderFact,
        rng: &mut PersonRng,
        bundle: &mut Bundle,
    ) -> GuideResult<()> {
        draft.meta = Some(Meta::conforming_to(PROFILE_ORGANIZATION));
        draft.telecom.push(ContactPoint::phone(FALLBACK_PHONE));
        self.facility_location(draft, fact, rng, bundle);
        Ok(())
    }

    fn practitioner_extension(&self, draft: &mut Practitioner) -> GuideResult<()> {
        draft.meta = Some(Meta::conforming_to(PROFILE_PRACTITIONER));

        // The direct-messaging flag goes on the first telecom, created
        // empty when the practitioner has none.
        if draft.telecom.is_empty() {
            draft.telecom.push(ContactPoint::default());
        }
        if let Some(first) = draft.telecom.first_mut() {
            first
                .extension
                .push(Extension::boolean(EXTENSION_DIRECT, true));
        }
        Ok(())
    }

    fn practitioner_role(
        &self,
        practitioner: &Practitioner,
        practitioner_url: &str,
        organization_url: &str,
        fact: &ProviderFact,
        rng: &mut PersonRng,
        bundle: &mut Bundle,
    ) {
        let general_practice = CodeableConcept::from_coding(Coding::new(
            SYSTEM_NUCC_TAXONOMY,
            "208D00000X",
            "General Practice",
        ));

        let mut practitioner_reference = Reference::to(practitioner_url);
        if let Some(display) = practitioner.display_name() {
            practitioner_reference = practitioner_reference.with_display(display);
        }

        let location = bundle
            .location_managed_by(organization_url)
            .map(|(url, _)| Reference::to(url).with_display(&fact.name));

        let mut telecom = Vec::new();
        if let Some(phone) = fact.phone.as_deref().filter(|p| !p.is_empty()) {
            telecom.push(ContactPoint::phone(phone));
        }
        if let Some(first) = practitioner.telecom.first() {
            telecom.push(first.clone());
        }

        let id = rng.uuid();
        let role = PractitionerRole {
            id: Some(id.clone()),
            meta: Some(Meta::conforming_to(PROFILE_PRACTITIONER_ROLE)),
            practitioner: Some(practitioner_reference),
            organization: Some(Reference::to(organization_url).with_display(&fact.name)),
            code: vec![general_practice.clone()],
            specialty: vec![general_practice],
            location: location.into_iter().collect(),
            telecom,
        };
        bundle.push(&id, Resource::PractitionerRole(role));
    }

    fn encounter_notes(
        &self,
        fact: &EncounterFact,
        encounter_url: &str,
        patient_url: &str,
        latest: bool,
        rng: &mut PersonRng,
        bundle: &mut Bundle,
    ) {
        let Some(note) = &fact.note else {
            return;
        };

        let encounter = bundle.encounter_by_url(encounter_url);
        let period = encounter.and_then(|e| e.period.clone());
        let start = period.as_ref().and_then(|p| p.start.clone());
        let performer = encounter.and_then(|e| {
            e.first_participant()
                .cloned()
                .or_else(|| e.service_provider.clone())
        });
        let custodian = encounter.and_then(|e| e.service_provider.clone());

        let note_concept = CodeableConcept {
            coding: vec![
                Coding::new(SYSTEM_LOINC, "34117-2", "History and physical note"),
                Coding::new(SYSTEM_LOINC, "51847-2", "Evaluation+Plan note"),
            ],
            text: None,
        };
        let attachment = Attachment {
            content_type: Some("text/plain".to_string()),
            data: Some(general_purpose::STANDARD.encode(note)),
        };

        let report_id = rng.uuid();
        let report = DiagnosticReport {
            id: Some(report_id.clone()),
            meta: Some(Meta::conforming_to(PROFILE_REPORT_NOTE)),
            status: Some("final".to_string()),
            category: vec![note_concept.clone()],
            code: Some(note_concept.clone()),
            subject: Some(Reference::to(patient_url)),
            encounter: Some(Reference::to(encounter_url)),
            effective_date_time: start.clone(),
            issued: start.clone(),
            performer: performer.iter().cloned().collect(),
            result: Vec::new(),
            presented_form: vec![attachment.clone()],
        };
        bundle.push(&report_id, Resource::DiagnosticReport(report));

        let status = if latest { "current" } else { "superseded" };
        let document_id = rng.uuid();
        let document = DocumentReference {
            id: Some(document_id.clone()),
            meta: Some(Meta::conforming_to(PROFILE_DOCUMENT_REFERENCE)),
            identifier: vec![Identifier::new("urn:ietf:rfc:3986", report_id)],
            status: Some(status.to_string()),
            type_: Some(note_concept),
            category: vec![CodeableConcept {
                coding: vec![Coding::new(
                    SYSTEM_DOCREF_CATEGORY,
                    "clinical-note",
                    "Clinical Note",
                )],
                text: None,
            }],
            subject: Some(Reference::to(patient_url)),
            date: start,
            author: performer.into_iter().collect(),
            custodian,
            content: vec![DocumentReferenceContent {
                attachment,
                format: Some(Coding::new(
                    SYSTEM_IHE_FORMAT,
                    "urn:ihe:iti:xds:2017:mimeTypeSufficient",
                    "mimeType Sufficient",
                )),
            }],
            context: Some(DocumentReferenceContext {
                encounter: vec![Reference::to(encounter_url)],
                period,
            }),
        };
        bundle.push(&document_id, Resource::DocumentReference(document));
    }

    fn bundle_extensions(
        &self,
        timeline: &RecordTimeline,
        stop_time: DateTime<Utc>,
        rng: &mut PersonRng,
        bundle: &mut Bundle,
    ) {
        // An empty record has no author to attribute the bundle to.
        if timeline.encounters.is_empty() {
            return;
        }

        let targets: Vec<Reference> = bundle
            .entry
            .iter()
            .map(|e| Reference::to(e.full_url.clone()))
            .collect();

        let (who, on_behalf_of) = match bundle.last_encounter() {
            Some((_, encounter)) => (
                encounter
                    .first_participant()
                    .cloned()
                    .or_else(|| encounter.service_provider.clone()),
                encounter.service_provider.clone(),
            ),
            None => (None, None),
        };

        let author = ProvenanceAgent {
            type_: Some(CodeableConcept::from_coding(Coding::new(
                SYSTEM_PROVENANCE_PARTICIPANT_TYPE,
                "author",
                "Author",
            ))),
            who: who.clone(),
            on_behalf_of: on_behalf_of.clone(),
        };
        let transmitter = ProvenanceAgent {
            type_: Some(CodeableConcept::from_coding(Coding::new(
                SYSTEM_US_PROVENANCE_PARTICIPANT_TYPE,
                "transmitter",
                "Transmitter",
            ))),
            who,
            on_behalf_of,
        };

        let id = rng.uuid();
        let provenance = Provenance {
            id: Some(id.clone()),
            meta: Some(Meta::conforming_to(PROFILE_PROVENANCE)),
            target: targets,
            recorded: Some(stop_time.to_rfc3339_opts(SecondsFormat::Secs, true)),
            agent: vec![author, transmitter],
        };
        bundle.push(&id, Resource::Provenance(provenance));
    }
}

// ============================================================================
// Tests
// ============================================================================
