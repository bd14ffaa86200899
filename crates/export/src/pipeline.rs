//! The per-person export walk: build each draft, run the active guide's
//! hook pair over it, push it into the bundle.
//!
//! Resource kinds are visited in a fixed order: patient first, then per
//! encounter the facility, the clinician, the encounter itself and its
//! clinical resources, then the encounter's notes, and finally the
//! bundle-level extensions. Resource ids come from the person's seeded
//! random stream, so the same inputs always export to the same bytes.
//! For every kind the guide claims via `handles`, the extension pass runs
//! first and the forbidden pass afterwards; unclaimed drafts go into the
//! bundle untouched.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use synfhir_guides::Specialisation;
use synfhir_model::{Bundle, BundleType, Reference, Resource, ResourceKind};
use synfhir_person::{PersonProfile, PersonRng, RecordTimeline};

use crate::builder;
use crate::ExportResult;

/// One person's complete export input, as read from record files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonRecord {
    pub profile: PersonProfile,

    #[serde(default)]
    pub timeline: RecordTimeline,
}

/// Export one person's record as a bundle shaped by `guide`. `stop_time`
/// marks the end of the simulated period and is handed to the guide's
/// bundle-level hook. The first guide error aborts this person and surfaces
/// as [`ExportError::Guide`].
///
/// [`ExportError::Guide`]: crate::ExportError::Guide
pub fn export_person(
    guide: &dyn Specialisation,
    bundle_type: BundleType,
    profile: &PersonProfile,
    timeline: &RecordTimeline,
    stop_time: DateTime<Utc>,
) -> ExportResult<Bundle> {
    guide.before_export(profile);
    tracing::debug!(
        "[{}] exporting {} encounters",
        profile.initials(),
        timeline.encounters.len()
    );

    let mut rng = PersonRng::from_seed(profile.seed);
    let mut bundle = Bundle::new(bundle_type);

    let patient_id = rng.uuid();
    let mut patient = builder::patient(&patient_id, profile);
    if guide.handles(ResourceKind::Patient) {
        guide.patient_extension(&mut patient, profile, &mut rng)?;
        guide.patient_forbidden(&mut patient);
    }
    let patient_url = bundle.push(&patient_id, Resource::Patient(patient));

    // Facilities and clinicians repeat across encounters; each is exported
    // once and reused by its generator id.
    let mut organizations: HashMap<String, String> = HashMap::new();
    let mut practitioners: HashMap<String, String> = HashMap::new();

    let last_index = timeline.encounters.len().saturating_sub(1);
    for (index, fact) in timeline.encounters.iter().enumerate() {
        let organization_url = match organizations.get(&fact.provider.id) {
            Some(url) => url.clone(),
            None => {
                let id = rng.uuid();
                let mut draft = builder::organization(&id, &fact.provider);
                if guide.handles(ResourceKind::Provider) {
                    guide.provider_extension(&mut draft, &fact.provider, &mut rng, &mut bundle)?;
                    guide.provider_forbidden(&mut draft);
                }
                let url = bundle.push(&id, Resource::Organization(draft));
                organizations.insert(fact.provider.id.clone(), url.clone());
                url
            }
        };

        let practitioner_url = match practitioners.get(&fact.clinician.id) {
            Some(url) => url.clone(),
            None => {
                let id = rng.uuid();
                let mut draft = builder::practitioner(&id, &fact.clinician);
                if guide.handles(ResourceKind::Practitioner) {
                    guide.practitioner_extension(&mut draft)?;
                    guide.practitioner_forbidden(&mut draft);
                }
                // The role hook reads the finished draft, so keep a copy
                // across the push.
                let pushed = draft.clone();
                let url = bundle.push(&id, Resource::Practitioner(draft));
                if guide.handles(ResourceKind::Practitioner) {
                    guide.practitioner_role(
                        &pushed,
                        &url,
                        &organization_url,
                        &fact.provider,
                        &mut rng,
                        &mut bundle,
                    );
                }
                practitioners.insert(fact.clinician.id.clone(), url.clone());
                url
            }
        };

        let encounter_id = rng.uuid();
        let mut encounter = builder::encounter(
            &encounter_id,
            fact,
            &patient_url,
            &practitioner_url,
            &organization_url,
        );
        if guide.handles(ResourceKind::Encounter) {
            guide.encounter_extension(&mut encounter, &bundle)?;
            guide.encounter_forbidden(&mut encounter);
        }
        let encounter_url = bundle.push(&encounter_id, Resource::Encounter(encounter));

        for condition_fact in &fact.conditions {
            let id = rng.uuid();
            let mut draft = builder::condition(&id, condition_fact, &patient_url, &encounter_url);
            if guide.handles(ResourceKind::Condition) {
                guide.condition_extension(&mut draft)?;
                guide.condition_forbidden(&mut draft);
            }
            bundle.push(&id, Resource::Condition(draft));
        }

        for allergy_fact in &fact.allergies {
            let id = rng.uuid();
            let mut draft = builder::allergy(&id, allergy_fact, &patient_url);
            if guide.handles(ResourceKind::Allergy) {
                guide.allergy_extension(&mut draft)?;
                guide.allergy_forbidden(&mut draft);
            }
            bundle.push(&id, Resource::AllergyIntolerance(draft));
        }

        // Observation indexes referenced by any report in this encounter.
        let reported: HashSet<usize> = fact
            .reports
            .iter()
            .flat_map(|report| report.observations.iter().copied())
            .collect();

        let mut observation_urls: Vec<String> = Vec::with_capacity(fact.observations.len());
        for (observation_index, observation_fact) in fact.observations.iter().enumerate() {
            let id = rng.uuid();
            let mut draft =
                builder::observation(&id, observation_fact, &patient_url, &encounter_url);
            if guide.handles(ResourceKind::Observation) {
                guide.observation_extension(&mut draft, reported.contains(&observation_index))?;
                guide.observation_forbidden(&mut draft);
            }
            observation_urls.push(bundle.push(&id, Resource::Observation(draft)));
        }

        for procedure_fact in &fact.procedures {
            let id = rng.uuid();
            let mut draft = builder::procedure(&id, procedure_fact, &patient_url, &encounter_url);
            if guide.handles(ResourceKind::Procedure) {
                guide.procedure_extension(&mut draft, &bundle)?;
                guide.procedure_forbidden(&mut draft);
            }
            bundle.push(&id, Resource::Procedure(draft));
        }

        let requester =
            Reference::to(&practitioner_url).with_display(fact.clinician.display_name());
        for medication_fact in &fact.medications {
            let id = rng.uuid();
            let mut draft = builder::medication_request(
                &id,
                medication_fact,
                &patient_url,
                &encounter_url,
                requester.clone(),
            );
            if guide.handles(ResourceKind::MedicationRequest) {
                guide.medication_request_extension(
                    &mut draft,
                    medication_fact,
                    &mut rng,
                    &mut bundle,
                )?;
                guide.medication_request_forbidden(&mut draft);
            }
            bundle.push(&id, Resource::MedicationRequest(draft));
        }

        for immunization_fact in &fact.immunizations {
            let id = rng.uuid();
            let mut draft =
                builder::immunization(&id, immunization_fact, &patient_url, &encounter_url);
            if guide.handles(ResourceKind::Immunization) {
                guide.immunization_extension(&mut draft, &bundle)?;
                guide.immunization_forbidden(&mut draft);
            }
            bundle.push(&id, Resource::Immunization(draft));
        }

        for report_fact in &fact.reports {
            let results: Vec<Reference> = report_fact
                .observations
                .iter()
                .filter_map(|&observation_index| {
                    let url = observation_urls.get(observation_index)?;
                    let observed = fact.observations.get(observation_index)?;
                    Some(Reference::to(url.clone()).with_display(&observed.code.display))
                })
                .collect();

            let id = rng.uuid();
            let mut draft =
                builder::report(&id, report_fact, &patient_url, &encounter_url, results);
            if guide.handles(ResourceKind::Report) {
                guide.report_extension(&mut draft, &bundle)?;
                guide.report_forbidden(&mut draft);
            }
            bundle.push(&id, Resource::DiagnosticReport(draft));
        }

        for device_fact in &fact.devices {
            let id = rng.uuid();
            let mut draft = builder::device(&id, device_fact, &patient_url);
            if guide.handles(ResourceKind::Device) {
                guide.device_extension(&mut draft)?;
                guide.device_forbidden(&mut draft);
            }
            bundle.push(&id, Resource::Device(draft));
        }

        guide.encounter_notes(
            fact,
            &encounter_url,
            &patient_url,
            index == last_index,
            &mut rng,
            &mut bundle,
        );
    }

    guide.bundle_extensions(timeline, stop_time, &mut rng, &mut bundle);

    tracing::debug!(
        "[{}] exported {} entries",
        profile.initials(),
        bundle.entry.len()
    );
    guide.after_export(profile);
    Ok(bundle)
}

/// Export a batch of persons under one `stop_time`. Failures are isolated:
/// one person's error is logged and returned in their slot, and the rest of
/// the batch proceeds.
pub fn export_batch(
    guide: &dyn Specialisation,
    bundle_type: BundleType,
    records: &[PersonRecord],
    stop_time: DateTime<Utc>,
) -> Vec<ExportResult<Bundle>> {
    records
        .iter()
        .map(|record| {
            let exported =
                export_person(guide, bundle_type, &record.profile, &record.timeline, stop_time);
            if let Err(error) = &exported {
                tracing::error!("[{}] export failed: {error}", record.profile.initials());
            }
            exported
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use chrono::TimeZone;
    use synfhir_guides::{DeKdsGuide, GuideError, UsCoreGuide};
    use synfhir_person::movement;
    use synfhir_tables::LookupTables;

    use crate::sample::sample_records;
    use crate::ExportError;

    fn us_guide() -> UsCoreGuide {
        UsCoreGuide::new(Arc::new(LookupTables::default()))
    }

    fn de_guide() -> DeKdsGuide {
        DeKdsGuide::new(Arc::new(LookupTables::default()))
    }

    /// A fixed simulation end past every sample encounter.
    fn sample_stop_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).single().expect("time")
    }

    fn count_of(bundle: &Bundle, type_name: &str) -> usize {
        bundle
            .entry
            .iter()
            .filter(|e| e.resource.type_name() == type_name)
            .count()
    }

    /// Whether the rendered resource carries a `meta` element.
    fn has_meta(resource: &Resource) -> bool {
        serde_json::to_value(resource)
            .ok()
            .is_some_and(|value| value.get("meta").is_some())
    }

    #[test]
    fn exports_are_byte_identical_per_seed() {
        let us = us_guide();
        let de = de_guide();

        for record in &sample_records() {
            for guide in [&us as &dyn Specialisation, &de as &dyn Specialisation] {
                let first = export_person(
                    guide,
                    BundleType::Collection,
                    &record.profile,
                    &record.timeline,
                    sample_stop_time(),
                )
                .expect("exports");
                let second = export_person(
                    guide,
                    BundleType::Collection,
                    &record.profile,
                    &record.timeline,
                    sample_stop_time(),
                )
                .expect("exports");

                assert_eq!(
                    first.render().expect("renders"),
                    second.render().expect("renders"),
                    "person {}",
                    record.profile.identifiers.internal_id
                );
            }
        }
    }

    #[test]
    fn entries_follow_the_fixed_resource_order() {
        let guide = de_guide();
        let records = sample_records();

        let bundle = export_person(
            &guide,
            BundleType::Collection,
            &records[1].profile,
            &records[1].timeline,
            sample_stop_time(),
        )
        .expect("exports");

        let names: Vec<&str> = bundle
            .entry
            .iter()
            .map(|e| e.resource.type_name())
            .collect();
        assert_eq!(
            names,
            [
                "Patient",
                "Organization",
                "Practitioner",
                "Encounter",
                "Condition",
                "Observation",
                "MedicationRequest",
            ]
        );
    }

    #[test]
    fn unclaimed_kinds_pass_through_untouched() {
        let guide = de_guide();
        let records = sample_records();

        let bundle = export_person(
            &guide,
            BundleType::Collection,
            &records[0].profile,
            &records[0].timeline,
            sample_stop_time(),
        )
        .expect("exports");

        // The claimed patient is reshaped...
        assert!(bundle.patient().is_some_and(|p| p.meta.is_some()));

        // ...while drafts of unclaimed kinds keep their generic shape.
        for entry in &bundle.entry {
            let unclaimed = matches!(
                entry.resource,
                Resource::Organization(_)
                    | Resource::Practitioner(_)
                    | Resource::AllergyIntolerance(_)
                    | Resource::Immunization(_)
                    | Resource::DiagnosticReport(_)
                    | Resource::Device(_)
            );
            if unclaimed {
                assert!(
                    !has_meta(&entry.resource),
                    "{} gained meta",
                    entry.resource.type_name()
                );
            }
        }

        // Claimed kinds left at their default hook pair stay generic too.
        assert!(bundle.last_encounter().is_some_and(|(_, e)| e.meta.is_none()));

        // Companion entries only ever come from hooks.
        for companion in [
            "Location",
            "PractitionerRole",
            "Medication",
            "DocumentReference",
            "Provenance",
        ] {
            assert_eq!(count_of(&bundle, companion), 0, "{companion}");
        }
    }

    #[test]
    fn facilities_and_clinicians_export_once() {
        let guide = us_guide();
        let records = sample_records();

        let bundle = export_person(
            &guide,
            BundleType::Collection,
            &records[0].profile,
            &records[0].timeline,
            sample_stop_time(),
        )
        .expect("exports");

        assert_eq!(count_of(&bundle, "Encounter"), 2);
        assert_eq!(count_of(&bundle, "Organization"), 1);
        assert_eq!(count_of(&bundle, "Practitioner"), 1);
        assert_eq!(count_of(&bundle, "Location"), 1);
        assert_eq!(count_of(&bundle, "PractitionerRole"), 1);

        // Both encounters point at the same facility entry.
        let providers: HashSet<&str> = bundle
            .entry
            .iter()
            .filter_map(|e| match &e.resource {
                Resource::Encounter(encounter) => encounter
                    .service_provider
                    .as_ref()
                    .and_then(|r| r.reference.as_deref()),
                _ => None,
            })
            .collect();
        assert_eq!(providers.len(), 1);
    }

    #[test]
    fn reported_laboratory_observations_get_the_lab_profile() {
        let guide = us_guide();
        let records = sample_records();

        let bundle = export_person(
            &guide,
            BundleType::Collection,
            &records[0].profile,
            &records[0].timeline,
            sample_stop_time(),
        )
        .expect("exports");

        let mut lab_url = None;
        for entry in &bundle.entry {
            if let Resource::Observation(observation) = &entry.resource {
                if observation.has_category("laboratory") {
                    assert!(observation.meta.as_ref().is_some_and(|m| m.has_profile(
                        "http://hl7.org/fhir/us/core/StructureDefinition/us-core-observation-lab"
                    )));
                    lab_url = Some(entry.full_url.clone());
                } else {
                    // Without a code mapping, vitals outside reports claim
                    // no profile at all.
                    assert!(observation.meta.is_none());
                }
            }
        }
        let lab_url = lab_url.expect("laboratory observation");

        let panel = bundle
            .entry
            .iter()
            .find_map(|e| match &e.resource {
                Resource::DiagnosticReport(report) if !report.result.is_empty() => Some(report),
                _ => None,
            })
            .expect("panel report");
        assert_eq!(panel.result[0].reference.as_deref(), Some(lab_url.as_str()));
    }

    #[test]
    fn only_the_final_encounter_note_stays_current() {
        let guide = us_guide();
        let records = sample_records();

        let bundle = export_person(
            &guide,
            BundleType::Collection,
            &records[0].profile,
            &records[0].timeline,
            sample_stop_time(),
        )
        .expect("exports");

        let statuses: Vec<&str> = bundle
            .entry
            .iter()
            .filter_map(|e| match &e.resource {
                Resource::DocumentReference(document) => document.status.as_deref(),
                _ => None,
            })
            .collect();
        assert_eq!(statuses, ["superseded", "current"]);
    }

    #[test]
    fn enriched_inpatient_stays_export_their_status_trail() {
        let guide = us_guide();
        let mut record = sample_records().remove(1);
        record.timeline.encounters[0].class_code = "IMP".to_string();

        assert!(movement::needs_movements(&record.timeline));
        movement::add_inpatient_movements(&mut record.timeline);

        let bundle = export_person(
            &guide,
            BundleType::Collection,
            &record.profile,
            &record.timeline,
            sample_stop_time(),
        )
        .expect("exports");

        let (_, encounter) = bundle.last_encounter().expect("encounter");
        let statuses: Vec<&str> = encounter
            .status_history
            .iter()
            .map(|h| h.status.as_str())
            .collect();
        assert_eq!(statuses, ["arrived", "in-progress"]);
    }

    #[test]
    fn transaction_bundles_carry_request_lines() {
        let guide = de_guide();
        let records = sample_records();

        let transaction = export_person(
            &guide,
            BundleType::Transaction,
            &records[1].profile,
            &records[1].timeline,
            sample_stop_time(),
        )
        .expect("exports");
        let request = transaction.entry[0].request.as_ref().expect("request line");
        assert_eq!(request.method, "POST");
        assert_eq!(request.url, "Patient");
        assert!(transaction.entry.iter().all(|e| e.request.is_some()));

        let collection = export_person(
            &guide,
            BundleType::Collection,
            &records[1].profile,
            &records[1].timeline,
            sample_stop_time(),
        )
        .expect("exports");
        assert!(collection.entry.iter().all(|e| e.request.is_none()));
    }

    #[test]
    fn batch_failures_stay_per_person() {
        let guide = de_guide();
        let records = sample_records();

        // "St" is not a street type the address grammar knows, so exports
        // of this person fail whenever the guide takes the street branch.
        let mut bad = records[1].clone();
        bad.profile.address.line = "123 Main St".to_string();
        let mut good = records[1].clone();

        let mut failures = 0;
        for seed in 0..64 {
            bad.profile.seed = seed;
            good.profile.seed = seed;

            let batch = export_batch(
                &guide,
                BundleType::Collection,
                &[bad.clone(), good.clone()],
                sample_stop_time(),
            );

            match &batch[0] {
                Ok(_) => {} // PO-box branch, nothing to parse
                Err(ExportError::Guide(GuideError::AddressFormat { line })) => {
                    assert_eq!(line, "123 Main St");
                    failures += 1;
                }
                Err(other) => panic!("unexpected error: {other}"),
            }
            assert!(batch[1].is_ok(), "seed {seed} failed the good person");
        }
        assert!(failures > 0, "no seed took the street branch");
    }
}
