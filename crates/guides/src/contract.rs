//! The contract between the export pipeline and an implementation guide.
//!
//! Every resource kind a guide can claim gets a pair of passes: an
//! *extension* pass that adds or reshapes content, and a *forbidden* pass
//! that removes content the guide does not allow. The pipeline runs the
//! extension pass first and the forbidden pass afterwards, unconditionally,
//! so forbidden rules hold even for guides that leave the extension at its
//! default. Two properties follow for implementors:
//!
//! - a forbidden pass must be idempotent, and
//! - a forbidden pass must not strip what the guide's own extension pass
//!   just produced.
//!
//! Default extension passes delegate straight to their forbidden pass;
//! default forbidden passes allow everything. Beyond the per-resource
//! pairs, a guide can emit companion resources of its own through the
//! [`practitioner_role`], [`encounter_notes`] and [`bundle_extensions`]
//! hooks, which default to doing nothing.
//!
//! [`practitioner_role`]: Specialisation::practitioner_role
//! [`encounter_notes`]: Specialisation::encounter_notes
//! [`bundle_extensions`]: Specialisation::bundle_extensions

use chrono::{DateTime, Utc};

use synfhir_model::{
    AllergyIntolerance, Bundle, Condition, Device, DiagnosticReport, Encounter, Immunization,
    MedicationRequest, Observation, Organization, Patient, Practitioner, Procedure, ResourceKind,
};
use synfhir_person::{
    EncounterFact, MedicationFact, PersonProfile, PersonRng, ProviderFact, RecordTimeline,
};

use crate::GuideResult;

/// One implementation guide's reshaping rules.
///
/// `handles` gates everything: the pipeline only invokes hooks for resource
/// kinds the guide claims, and pushes drafts of unclaimed kinds into the
/// bundle untouched.
pub trait Specialisation: Send + Sync {
    /// Whether this guide reshapes resources of `kind` at all.
    fn handles(&self, kind: ResourceKind) -> bool;

    /// Called once before a person's resources are built.
    fn before_export(&self, profile: &PersonProfile) {
        let _ = profile;
    }

    /// Called once after a person's bundle is complete.
    fn after_export(&self, profile: &PersonProfile) {
        let _ = profile;
    }

    // ------------------------------------------------------------------
    // Patient
    // ------------------------------------------------------------------

    fn patient_extension(
        &self,
        draft: &mut Patient,
        profile: &PersonProfile,
        rng: &mut PersonRng,
    ) -> GuideResult<()> {
        let _ = (profile, rng);
        self.patient_forbidden(draft);
        Ok(())
    }

    fn patient_forbidden(&self, draft: &mut Patient) {
        let _ = draft;
    }

    // ------------------------------------------------------------------
    // Encounter
    // ------------------------------------------------------------------

    fn encounter_extension(&self, draft: &mut Encounter, bundle: &Bundle) -> GuideResult<()> {
        let _ = bundle;
        self.encounter_forbidden(draft);
        Ok(())
    }

    fn encounter_forbidden(&self, draft: &mut Encounter) {
        let _ = draft;
    }

    // ------------------------------------------------------------------
    // Condition
    // ------------------------------------------------------------------

    fn condition_extension(&self, draft: &mut Condition) -> GuideResult<()> {
        self.condition_forbidden(draft);
        Ok(())
    }

    fn condition_forbidden(&self, draft: &mut Condition) {
        let _ = draft;
    }

    // ------------------------------------------------------------------
    // AllergyIntolerance
    // ------------------------------------------------------------------

    fn allergy_extension(&self, draft: &mut AllergyIntolerance) -> GuideResult<()> {
        self.allergy_forbidden(draft);
        Ok(())
    }

    fn allergy_forbidden(&self, draft: &mut AllergyIntolerance) {
        let _ = draft;
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    /// `in_report` is true when the observation is referenced by a
    /// diagnostic report in the same encounter.
    fn observation_extension(&self, draft: &mut Observation, in_report: bool) -> GuideResult<()> {
        let _ = in_report;
        self.observation_forbidden(draft);
        Ok(())
    }

    fn observation_forbidden(&self, draft: &mut Observation) {
        let _ = draft;
    }

    // ------------------------------------------------------------------
    // Procedure
    // ------------------------------------------------------------------

    fn procedure_extension(&self, draft: &mut Procedure, bundle: &Bundle) -> GuideResult<()> {
        let _ = bundle;
        self.procedure_forbidden(draft);
        Ok(())
    }

    fn procedure_forbidden(&self, draft: &mut Procedure) {
        let _ = draft;
    }

    // ------------------------------------------------------------------
    // Device
    // ------------------------------------------------------------------

    fn device_extension(&self, draft: &mut Device) -> GuideResult<()> {
        self.device_forbidden(draft);
        Ok(())
    }

    fn device_forbidden(&self, draft: &mut Device) {
        let _ = draft;
    }

    // ------------------------------------------------------------------
    // MedicationRequest
    // ------------------------------------------------------------------

    /// Guides may push a stand-alone Medication entry and rewire the draft
    /// to reference it, which is why this hook gets the bundle mutably.
    fn medication_request_extension(
        &self,
        draft: &mut MedicationRequest,
        fact: &MedicationFact,
        rng: &mut PersonRng,
        bundle: &mut Bundle,
    ) -> GuideResult<()> {
        let _ = (fact, rng, bundle);
        self.medication_request_forbidden(draft);
        Ok(())
    }

    fn medication_request_forbidden(&self, draft: &mut MedicationRequest) {
        let _ = draft;
    }

    // ------------------------------------------------------------------
    // Immunization
    // ------------------------------------------------------------------

    fn immunization_extension(&self, draft: &mut Immunization, bundle: &Bundle) -> GuideResult<()> {
        let _ = bundle;
        self.immunization_forbidden(draft);
        Ok(())
    }

    fn immunization_forbidden(&self, draft: &mut Immunization) {
        let _ = draft;
    }

    // ------------------------------------------------------------------
    // DiagnosticReport
    // ------------------------------------------------------------------

    fn report_extension(&self, draft: &mut DiagnosticReport, bundle: &Bundle) -> GuideResult<()> {
        let _ = bundle;
        self.report_forbidden(draft);
        Ok(())
    }

    fn report_forbidden(&self, draft: &mut DiagnosticReport) {
        let _ = draft;
    }

    // ------------------------------------------------------------------
    // Organization (provider)
    // ------------------------------------------------------------------

    /// Guides may push a companion Location entry for the facility, which
    /// is why this hook gets the bundle mutably.
    fn provider_extension(
        &self,
        draft: &mut Organization,
        fact: &ProviderFact,
        rng: &mut PersonRng,
        bundle: &mut Bundle,
    ) -> GuideResult<()> {
        let _ = (fact, rng, bundle);
        self.provider_forbidden(draft);
        Ok(())
    }

    fn provider_forbidden(&self, draft: &mut Organization) {
        let _ = draft;
    }

    // ------------------------------------------------------------------
    // Practitioner
    // ------------------------------------------------------------------

    fn practitioner_extension(&self, draft: &mut Practitioner) -> GuideResult<()> {
        self.practitioner_forbidden(draft);
        Ok(())
    }

    fn practitioner_forbidden(&self, draft: &mut Practitioner) {
        let _ = draft;
    }

    /// Emit a companion PractitionerRole entry for a freshly pushed
    /// practitioner. Runs after `practitioner_extension`, once per
    /// practitioner.
    fn practitioner_role(
        &self,
        practitioner: &Practitioner,
        practitioner_url: &str,
        organization_url: &str,
        fact: &ProviderFact,
        rng: &mut PersonRng,
        bundle: &mut Bundle,
    ) {
        let _ = (
            practitioner,
            practitioner_url,
            organization_url,
            fact,
            rng,
            bundle,
        );
    }

    // ------------------------------------------------------------------
    // Whole-encounter and whole-bundle hooks
    // ------------------------------------------------------------------

    /// Emit companion resources for an encounter's clinical note. Runs
    /// after the encounter and its clinical resources are in the bundle.
    /// `latest` is true for the final encounter of the record.
    fn encounter_notes(
        &self,
        fact: &EncounterFact,
        encounter_url: &str,
        patient_url: &str,
        latest: bool,
        rng: &mut PersonRng,
        bundle: &mut Bundle,
    ) {
        let _ = (fact, encounter_url, patient_url, latest, rng, bundle);
    }

    /// Emit bundle-level companion resources once everything else is in
    /// place. `stop_time` is the end of the simulated period the record was
    /// drawn from, handed through from the export call.
    fn bundle_extensions(
        &self,
        timeline: &RecordTimeline,
        stop_time: DateTime<Utc>,
        rng: &mut PersonRng,
        bundle: &mut Bundle,
    ) {
        let _ = (timeline, stop_time, rng, bundle);
    }
}

impl std::fmt::Debug for dyn Specialisation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn Specialisation")
    }
}

/// Keep only the patient identifiers whose system is on `allowed`: the
/// plain system-URI whitelist policy. A driver's licence, say, identifies
/// nobody under a guide that does not model it. Guides whose rules hinge on
/// the coded identifier type write their own forbidden pass instead.
pub fn retain_identifiers_by_system(draft: &mut Patient, allowed: &[&str]) {
    draft.identifier.retain(|identifier| {
        identifier
            .system
            .as_deref()
            .is_some_and(|system| allowed.contains(&system))
    });
}
