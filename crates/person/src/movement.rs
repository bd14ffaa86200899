//! Pre-export enrichment of inpatient stays.
//!
//! Record generators describe an inpatient encounter as a single fact, but
//! a stay is really a sequence of movements through the facility. This pass
//! gives every inpatient encounter that still lacks them the standard
//! two-step sequence, in place. It runs on the record producer's side,
//! before the timeline is handed to the exporter; encounters that already
//! carry steps are skipped, so a second run changes nothing.

use crate::fact::{EncounterFact, Movement, RecordTimeline};

/// ActCode class of an inpatient stay.
const CLASS_INPATIENT: &str = "IMP";

/// Whether [`add_inpatient_movements`] would still change the timeline.
pub fn needs_movements(timeline: &RecordTimeline) -> bool {
    timeline.encounters.iter().any(awaiting_movements)
}

/// Give every inpatient encounter without movement steps the standard
/// sequence: the admission, then the transfer to a ward bed.
pub fn add_inpatient_movements(timeline: &mut RecordTimeline) {
    for encounter in &mut timeline.encounters {
        if !awaiting_movements(encounter) {
            continue;
        }
        // A stay always opens with the admission.
        encounter.movements.push(Movement::Admission);
        // The ward transfer follows within the same department.
        encounter.movements.push(Movement::Inpatient);
    }
}

fn awaiting_movements(encounter: &EncounterFact) -> bool {
    encounter.class_code.eq_ignore_ascii_case(CLASS_INPATIENT) && encounter.movements.is_empty()
}

// ============================================================================
// Tests
// ============================================================================
