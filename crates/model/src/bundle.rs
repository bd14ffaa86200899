//! The Bundle container and the tagged resource union.
//!
//! Responsibilities:
//!
//! - Collect finished resource drafts as bundle entries with `urn:uuid:`
//!   full urls.
//! - Dispatch entries by [`ResourceKind`] so specialisation hooks can be
//!   routed per resource kind.
//! - Resolve cross-references (encounter by url, location by managing
//!   organization) for hooks that decorate one resource from another.
//! - Render to and parse from FHIR R4 JSON.

use serde::{Deserialize, Serialize};

use crate::clinical::{AllergyIntolerance, Condition, Device, Immunization, Observation, Procedure};
use crate::encounter::Encounter;
use crate::medication::{Medication, MedicationRequest};
use crate::patient::Patient;
use crate::provenance::Provenance;
use crate::provider::{Location, Organization, Practitioner, PractitionerRole};
use crate::report::{DiagnosticReport, DocumentReference};
use crate::{ModelError, ModelResult};

/// The full url for a resource id, `urn:uuid:{id}`. Every entry in an
/// exported bundle is addressed this way.
pub fn full_url(id: &str) -> String {
    format!("urn:uuid:{id}")
}

// ============================================================================
// Resource union
// ============================================================================

/// Every resource an exported bundle can contain, tagged with the FHIR
/// `resourceType` discriminator on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "resourceType")]
pub enum Resource {
    Patient(Patient),
    Encounter(Encounter),
    Condition(Condition),
    AllergyIntolerance(AllergyIntolerance),
    Observation(Observation),
    Procedure(Procedure),
    Device(Device),
    MedicationRequest(MedicationRequest),
    Medication(Medication),
    Immunization(Immunization),
    DiagnosticReport(DiagnosticReport),
    DocumentReference(DocumentReference),
    Organization(Organization),
    Location(Location),
    Practitioner(Practitioner),
    PractitionerRole(PractitionerRole),
    Provenance(Provenance),
}

impl Resource {
    /// The resource's logical id, when assigned.
    pub fn id(&self) -> Option<&str> {
        match self {
            Resource::Patient(r) => r.id.as_deref(),
            Resource::Encounter(r) => r.id.as_deref(),
            Resource::Condition(r) => r.id.as_deref(),
            Resource::AllergyIntolerance(r) => r.id.as_deref(),
            Resource::Observation(r) => r.id.as_deref(),
            Resource::Procedure(r) => r.id.as_deref(),
            Resource::Device(r) => r.id.as_deref(),
            Resource::MedicationRequest(r) => r.id.as_deref(),
            Resource::Medication(r) => r.id.as_deref(),
            Resource::Immunization(r) => r.id.as_deref(),
            Resource::DiagnosticReport(r) => r.id.as_deref(),
            Resource::DocumentReference(r) => r.id.as_deref(),
            Resource::Organization(r) => r.id.as_deref(),
            Resource::Location(r) => r.id.as_deref(),
            Resource::Practitioner(r) => r.id.as_deref(),
            Resource::PractitionerRole(r) => r.id.as_deref(),
            Resource::Provenance(r) => r.id.as_deref(),
        }
    }

    /// The wire `resourceType` name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Resource::Patient(_) => "Patient",
            Resource::Encounter(_) => "Encounter",
            Resource::Condition(_) => "Condition",
            Resource::AllergyIntolerance(_) => "AllergyIntolerance",
            Resource::Observation(_) => "Observation",
            Resource::Procedure(_) => "Procedure",
            Resource::Device(_) => "Device",
            Resource::MedicationRequest(_) => "MedicationRequest",
            Resource::Medication(_) => "Medication",
            Resource::Immunization(_) => "Immunization",
            Resource::DiagnosticReport(_) => "DiagnosticReport",
            Resource::DocumentReference(_) => "DocumentReference",
            Resource::Organization(_) => "Organization",
            Resource::Location(_) => "Location",
            Resource::Practitioner(_) => "Practitioner",
            Resource::PractitionerRole(_) => "PractitionerRole",
            Resource::Provenance(_) => "Provenance",
        }
    }

    /// The dispatch kind for specialisation hooks. Resources only ever
    /// emitted *by* hooks (Medication, DocumentReference, Location,
    /// PractitionerRole, Provenance) have none.
    pub fn kind(&self) -> Option<ResourceKind> {
        match self {
            Resource::Patient(_) => Some(ResourceKind::Patient),
            Resource::Encounter(_) => Some(ResourceKind::Encounter),
            Resource::Condition(_) => Some(ResourceKind::Condition),
            Resource::AllergyIntolerance(_) => Some(ResourceKind::Allergy),
            Resource::Observation(_) => Some(ResourceKind::Observation),
            Resource::Procedure(_) => Some(ResourceKind::Procedure),
            Resource::Device(_) => Some(ResourceKind::Device),
            Resource::MedicationRequest(_) => Some(ResourceKind::MedicationRequest),
            Resource::Immunization(_) => Some(ResourceKind::Immunization),
            Resource::DiagnosticReport(_) => Some(ResourceKind::Report),
            Resource::Organization(_) => Some(ResourceKind::Provider),
            Resource::Practitioner(_) => Some(ResourceKind::Practitioner),
            _ => None,
        }
    }
}

/// The resource kinds a specialisation can claim to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Patient,
    Encounter,
    Condition,
    Allergy,
    Observation,
    Procedure,
    Device,
    MedicationRequest,
    Immunization,
    Report,
    Provider,
    Practitioner,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResourceKind::Patient => "patient",
            ResourceKind::Encounter => "encounter",
            ResourceKind::Condition => "condition",
            ResourceKind::Allergy => "allergy",
            ResourceKind::Observation => "observation",
            ResourceKind::Procedure => "procedure",
            ResourceKind::Device => "device",
            ResourceKind::MedicationRequest => "medication_request",
            ResourceKind::Immunization => "immunization",
            ResourceKind::Report => "report",
            ResourceKind::Provider => "provider",
            ResourceKind::Practitioner => "practitioner",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Bundle
// ============================================================================

/// How the exported bundle should be processed by a receiving server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BundleType {
    #[serde(rename = "collection")]
    Collection,

    #[serde(rename = "transaction")]
    Transaction,
}

impl BundleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BundleType::Collection => "collection",
            BundleType::Transaction => "transaction",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    #[serde(rename = "resourceType")]
    pub resource_type: String,

    #[serde(rename = "type")]
    pub bundle_type: BundleType,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entry: Vec<BundleEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleEntry {
    #[serde(rename = "fullUrl")]
    pub full_url: String,

    pub resource: Resource,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<BundleRequest>,
}

/// The transaction line attached to each entry of a transaction bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleRequest {
    pub method: String,
    pub url: String,
}

impl Bundle {
    pub fn new(bundle_type: BundleType) -> Self {
        Bundle {
            resource_type: "Bundle".to_string(),
            bundle_type,
            entry: Vec::new(),
        }
    }

    /// Appends an entry for `resource` under `urn:uuid:{id}` and returns
    /// that full url. Transaction bundles get a POST request line per entry.
    pub fn push(&mut self, id: &str, resource: Resource) -> String {
        let url = full_url(id);
        let request = match self.bundle_type {
            BundleType::Transaction => Some(BundleRequest {
                method: "POST".to_string(),
                url: resource.type_name().to_string(),
            }),
            BundleType::Collection => None,
        };
        self.entry.push(BundleEntry {
            full_url: url.clone(),
            resource,
            request,
        });
        url
    }

    pub fn entry_by_url(&self, url: &str) -> Option<&BundleEntry> {
        self.entry.iter().find(|e| e.full_url == url)
    }

    /// The patient entry. Exported bundles carry exactly one.
    pub fn patient(&self) -> Option<&Patient> {
        self.entry.iter().find_map(|e| match &e.resource {
            Resource::Patient(patient) => Some(patient),
            _ => None,
        })
    }

    pub fn encounter_by_url(&self, url: &str) -> Option<&Encounter> {
        match &self.entry_by_url(url)?.resource {
            Resource::Encounter(encounter) => Some(encounter),
            _ => None,
        }
    }

    pub fn organization_by_url(&self, url: &str) -> Option<&Organization> {
        match &self.entry_by_url(url)?.resource {
            Resource::Organization(organization) => Some(organization),
            _ => None,
        }
    }

    /// The most recently pushed encounter, with its full url.
    pub fn last_encounter(&self) -> Option<(&str, &Encounter)> {
        self.entry.iter().rev().find_map(|e| match &e.resource {
            Resource::Encounter(encounter) => Some((e.full_url.as_str(), encounter)),
            _ => None,
        })
    }

    /// The first location entry managed by the organization at
    /// `organization_url`, with its full url.
    pub fn location_managed_by(&self, organization_url: &str) -> Option<(&str, &Location)> {
        self.entry.iter().find_map(|e| match &e.resource {
            Resource::Location(location)
                if location
                    .managing_organization
                    .as_ref()
                    .and_then(|r| r.reference.as_deref())
                    == Some(organization_url) =>
            {
                Some((e.full_url.as_str(), location))
            }
            _ => None,
        })
    }

    /// Render the bundle as pretty-printed FHIR R4 JSON.
    pub fn render(&self) -> ModelResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a bundle from FHIR R4 JSON text, surfacing the path to the
    /// failing field when the text does not match the wire schema.
    pub fn parse(json_text: &str) -> ModelResult<Bundle> {
        let deserializer = &mut serde_json::Deserializer::from_str(json_text);

        let bundle = match serde_path_to_error::deserialize::<_, Bundle>(deserializer) {
            Ok(parsed) => parsed,
            Err(err) => {
                let path = err.path().to_string();
                let source = err.into_inner();
                let path = if path.is_empty() {
                    "<root>"
                } else {
                    path.as_str()
                };
                return Err(ModelError::Translation(format!("{path}: {source}")));
            }
        };

        if bundle.resource_type != "Bundle" {
            return Err(ModelError::Translation(format!(
                "resourceType: expected 'Bundle', got '{}'",
                bundle.resource_type
            )));
        }

        Ok(bundle)
    }
}

// ============================================================================
// Tests
// ============================================================================
