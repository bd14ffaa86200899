//! Terminology system URIs shared by the builders and the guide
//! implementations. Guide-specific profile URIs live with their guide.

/// Internal tracking system for synthetic-record identifiers. Identifiers
/// carrying this system survive every guide's forbidden filter.
pub const SYSTEM_SYNTHETIC_RECORD: &str = "https://github.com/synfhir/synfhir";

pub const SYSTEM_LOINC: &str = "http://loinc.org";
pub const SYSTEM_SNOMED: &str = "http://snomed.info/sct";
pub const SYSTEM_RXNORM: &str = "http://www.nlm.nih.gov/research/umls/rxnorm";
pub const SYSTEM_CVX: &str = "http://hl7.org/fhir/sid/cvx";
pub const SYSTEM_UCUM: &str = "http://unitsofmeasure.org";

pub const SYSTEM_V2_0203: &str = "http://terminology.hl7.org/CodeSystem/v2-0203";
pub const SYSTEM_V3_ACT_CODE: &str = "http://terminology.hl7.org/CodeSystem/v3-ActCode";
pub const SYSTEM_V3_NULL_FLAVOR: &str = "http://terminology.hl7.org/CodeSystem/v3-NullFlavor";
pub const SYSTEM_CONDITION_CATEGORY: &str =
    "http://terminology.hl7.org/CodeSystem/condition-category";
pub const SYSTEM_CONDITION_CLINICAL: &str =
    "http://terminology.hl7.org/CodeSystem/condition-clinical";
pub const SYSTEM_CONDITION_VER_STATUS: &str =
    "http://terminology.hl7.org/CodeSystem/condition-ver-status";
pub const SYSTEM_ALLERGY_CLINICAL: &str =
    "http://terminology.hl7.org/CodeSystem/allergyintolerance-clinical";
pub const SYSTEM_ALLERGY_VERIFICATION: &str =
    "http://terminology.hl7.org/CodeSystem/allergyintolerance-verification";
pub const SYSTEM_OBSERVATION_CATEGORY: &str =
    "http://terminology.hl7.org/CodeSystem/observation-category";
pub const SYSTEM_PROVENANCE_PARTICIPANT_TYPE: &str =
    "http://terminology.hl7.org/CodeSystem/provenance-participant-type";

pub const SYSTEM_US_NPI: &str = "http://hl7.org/fhir/sid/us-npi";
pub const SYSTEM_US_SSN: &str = "http://hl7.org/fhir/sid/us-ssn";
pub const SYSTEM_US_DRIVERS_LICENSE: &str = "urn:oid:2.16.840.1.113883.4.3.25";
pub const SYSTEM_PASSPORT: &str =
    "http://standardhealthrecord.org/fhir/StructureDefinition/passportNumber";
pub const SYSTEM_MEDICAL_RECORD: &str = "http://hospital.smarthealthit.org";
