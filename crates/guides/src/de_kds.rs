//! The German MII Kerndatensatz implementation guide.
//!
//! Claims the patient, encounter, condition, observation, procedure and
//! medication-request kinds, but only the patient hooks reshape anything so
//! far; the other claimed kinds run the default passes until their KDS
//! modules are specified. The patient work is substantial: German insurance
//! identifiers, German name conventions (academic prefixes, nobility
//! components), a third administrative gender, withheld birth dates,
//! boolean deceased forms and structured German addresses.

use std::sync::Arc;

use synfhir_model::terminology::{SYSTEM_SYNTHETIC_RECORD, SYSTEM_V2_0203};
use synfhir_model::{
    CodeableConcept, Coding, Extension, Identifier, Meta, Patient, PrimitiveExtension, Reference,
    ResourceKind,
};
use synfhir_person::{PersonProfile, PersonRng};
use synfhir_tables::LookupTables;

use crate::contract::Specialisation;
use crate::{address, draw, name, GuideResult};

// ============================================================================
// Profiles, systems and extensions
// ============================================================================

const PROFILE_MII_PATIENT: &str =
    "https://www.medizininformatik-initiative.de/fhir/core/StructureDefinition/Patient";

const SYSTEM_IDENTIFIER_TYPE_DE_BASIS: &str = "http://fhir.de/CodeSystem/identifier-type-de-basis";
const NAMINGSYSTEM_GKV_KVID10: &str = "http://fhir.de/NamingSystem/gkv/kvid-10";
const NAMINGSYSTEM_ARGE_IK_IKNR: &str = "http://fhir.de/NamingSystem/arge-ik/iknr";

const EXTENSION_GENDER_AMTLICH_DE: &str = "http://fhir.de/StructureDefinition/gender-amtlich-de";
const SYSTEM_GENDER_AMTLICH_DE: &str = "http://fhir.de/CodeSystem/gender-amtlich-de";
const EXTENSION_DATA_ABSENT_REASON: &str =
    "http://hl7.org/fhir/StructureDefinition/data-absent-reason";

const EXTENSION_ADXP_POSTBOX: &str =
    "http://hl7.org/fhir/StructureDefinition/iso21090-ADXP-postBox";
const EXTENSION_ADXP_ADDITIONAL_LOCATOR: &str =
    "http://hl7.org/fhir/StructureDefinition/iso21090-ADXP-additionalLocator";
const EXTENSION_ADXP_HOUSENUMBER: &str =
    "http://hl7.org/fhir/StructureDefinition/iso21090-ADXP-houseNumber";
const EXTENSION_ADXP_STREETNAME: &str =
    "http://hl7.org/fhir/StructureDefinition/iso21090-ADXP-streetName";
const EXTENSION_DESTATIS_AGS: &str = "http://fhir.de/StructureDefinition/destatis/ags";
const SYSTEM_DESTATIS_AGS: &str = "http://fhir.de/NamingSystem/destatis/ags";

/// IK number of the stand-in statutory insurer backing every GKV identifier.
const STAND_IN_IKNR: &str = "123456789";

const DATA_ABSENT_REASONS: [&str; 3] = ["asked-declined", "asked-unknown", "unknown"];

// Per-person chances of the optional reshaping steps.
const CHANCE_PO_BOX: f64 = 0.2;
const CHANCE_AGS: f64 = 0.1;
const CHANCE_BIRTHDAY_MISSING: f64 = 0.1;
const CHANCE_GENDER_CHANGE: f64 = 0.1;
const CHANCE_NOBILITY: f64 = 0.3;

// ============================================================================
// Guide
// ============================================================================

pub struct DeKdsGuide {
    tables: Arc<LookupTables>,
}

impl DeKdsGuide {
    pub fn new(tables: Arc<LookupTables>) -> Self {
        DeKdsGuide { tables }
    }

    /// The generic draft leaves the medical record number without a use or
    /// an assigner; the KDS PID slice requires both. The passport number
    /// stands in for the statutory insurance (GKV) number and the social
    /// security number for the private insurance (PKV) number.
    fn reshape_identifiers(&self, draft: &mut Patient, profile: &PersonProfile) {
        for identifier in &mut draft.identifier {
            if identifier.is_type(SYSTEM_V2_0203, "MR") {
                identifier.use_type = Some("usual".to_string());
                identifier.assigner = Some(Reference::to(SYSTEM_SYNTHETIC_RECORD));
            }
        }

        if let Some(passport) = &profile.identifiers.passport_number {
            let insurer = Identifier {
                use_type: Some("official".to_string()),
                type_: Some(CodeableConcept::from_coding(Coding::new(
                    SYSTEM_V2_0203,
                    "XX",
                    "Organisations-ID",
                ))),
                system: Some(NAMINGSYSTEM_ARGE_IK_IKNR.to_string()),
                value: Some(STAND_IN_IKNR.to_string()),
                assigner: None,
            };
            draft.add_identifier(Identifier {
                use_type: Some("official".to_string()),
                type_: Some(CodeableConcept::from_coding(Coding::new(
                    SYSTEM_IDENTIFIER_TYPE_DE_BASIS,
                    "GKV",
                    "Gesetzliche Krankenversicherung",
                ))),
                system: Some(NAMINGSYSTEM_GKV_KVID10.to_string()),
                value: Some(passport.clone()),
                assigner: Some(Reference {
                    identifier: Some(Box::new(insurer)),
                    ..Reference::default()
                }),
            });
        }

        if let Some(ssn) = &profile.identifiers.social_security_number {
            draft.add_identifier(Identifier {
                use_type: Some("secondary".to_string()),
                type_: Some(CodeableConcept::from_coding(Coding::new(
                    SYSTEM_IDENTIFIER_TYPE_DE_BASIS,
                    "PKV",
                    "Private Krankenversicherung",
                ))),
                system: None,
                value: Some(ssn.clone()),
                assigner: Some(Reference {
                    display: Some("Privates Krankenversicherungsunternehmen".to_string()),
                    ..Reference::default()
                }),
            });
        }
    }

    /// Salutations leave the prefix list, anglophone academic suffixes map
    /// to German academic prefixes, and some families gain nobility
    /// components. Everything applies to the official name only; without
    /// one the step is skipped and no draws are consumed.
    fn reshape_name(
        &self,
        draft: &mut Patient,
        profile: &PersonProfile,
        rng: &mut PersonRng,
        initials: &str,
    ) {
        let Some(official) = draft.official_name_mut() else {
            return;
        };

        name::strip_salutations(official);
        name::map_academic_suffixes(official, rng);

        if rng.chance(CHANCE_NOBILITY) {
            name::augment_nobility(official, profile.sex, rng);
            tracing::debug!(
                "[{initials}] nobility components, family is now {}",
                official.family.as_deref().unwrap_or_default()
            );
        }
    }

    /// The KDS provides for a third administrative gender, which the
    /// generic drafts never produce. Some patients are remapped to `other`
    /// with the official German gender coding on the element.
    fn reshape_gender(&self, draft: &mut Patient, rng: &mut PersonRng, initials: &str) {
        if !rng.chance(CHANCE_GENDER_CHANGE) {
            return;
        }
        let coding = if rng.coin() {
            Coding::new(SYSTEM_GENDER_AMTLICH_DE, "D", "divers")
        } else {
            Coding::new(SYSTEM_GENDER_AMTLICH_DE, "X", "unbestimmt")
        };
        tracing::debug!(
            "[{initials}] gender mapped to other[{}]",
            coding.code.as_deref().unwrap_or_default()
        );
        draft.gender = Some("other".to_string());
        draft
            .gender_element
            .get_or_insert_with(PrimitiveExtension::default)
            .add(Extension::coding(EXTENSION_GENDER_AMTLICH_DE, coding));
    }

    /// Consumers must support a data-absent-reason in place of the birth
    /// date. Some patients lose theirs.
    fn withhold_birth_date(&self, draft: &mut Patient, rng: &mut PersonRng, initials: &str) {
        if !rng.chance(CHANCE_BIRTHDAY_MISSING) {
            return;
        }
        let reason = draw::pick(rng, &DATA_ABSENT_REASONS);
        draft.birth_date = None;
        draft.birth_date_element = Some(PrimitiveExtension::with(Extension::code(
            EXTENSION_DATA_ABSENT_REASON,
            reason,
        )));
        tracing::debug!("[{initials}] withheld birth date: {reason}");
    }

    /// Consumers must support both deceased forms. Half of the drafts trade
    /// the precise form for the boolean one: a death timestamp collapses to
    /// `true`, a living patient gains an explicit `false`.
    fn reshape_deceased(&self, draft: &mut Patient, rng: &mut PersonRng, initials: &str) {
        if !rng.coin() {
            return;
        }
        if draft.deceased_date_time.is_some() {
            draft.deceased_date_time = None;
            draft.deceased_boolean = Some(true);
            tracing::debug!("[{initials}] deceasedDateTime collapsed to deceasedBoolean");
        } else {
            draft.deceased_boolean = Some(false);
        }
    }

    /// The first address becomes a home address in German form. Some become
    /// PO boxes; the rest have their line split into structured components
    /// and recomposed with the house number after the street. A line that
    /// does not fit the expected grammar fails the person's export.
    fn reshape_address(
        &self,
        draft: &mut Patient,
        rng: &mut PersonRng,
        initials: &str,
    ) -> GuideResult<()> {
        let Some(address) = draft.address.first_mut() else {
            return Ok(());
        };
        address.use_type = Some("home".to_string());

        if rng.chance(CHANCE_PO_BOX) {
            address.type_ = Some("postal".to_string());
            let line = format!("Postfach {}", rng.int_inclusive(1, 999_999));
            if address.line.is_empty() {
                address.line.push(line.clone());
            } else {
                address.line[0] = line.clone();
            }
            address
                .line_element_mut(0)
                .add(Extension::string(EXTENSION_ADXP_POSTBOX, line.as_str()));
            tracing::debug!("[{initials}] address is now the PO box '{line}'");
        } else {
            let line = address.line.first().cloned().unwrap_or_default();
            let parts = address::parse_line(&line)?;

            let element = address.line_element_mut(0);
            element.add(Extension::string(
                EXTENSION_ADXP_HOUSENUMBER,
                parts.house_number.as_str(),
            ));
            element.add(Extension::string(EXTENSION_ADXP_STREETNAME, parts.street()));
            if let Some(unit) = &parts.unit {
                element.add(Extension::string(
                    EXTENSION_ADXP_ADDITIONAL_LOCATOR,
                    unit.display(),
                ));
            }

            let recomposed = parts.display_line();
            tracing::debug!("[{initials}] address recomposed to '{recomposed}'");
            address.line[0] = recomposed;
        }

        // Some cities carry their Amtlicher Gemeindeschlüssel. A postal
        // code the municipality table does not know is left without one.
        if rng.chance(CHANCE_AGS) {
            let zip = address.postal_code.clone().unwrap_or_default();
            if let Some(ags) = self.tables.municipality_codes.key_for_zip(&zip) {
                let coding = Coding::code_only(SYSTEM_DESTATIS_AGS, ags);
                address
                    .city_element_mut()
                    .add(Extension::coding(EXTENSION_DESTATIS_AGS, coding));
                tracing::debug!("[{initials}] attached municipality key {ags}");
            }
        }

        Ok(())
    }
}

impl Specialisation for DeKdsGuide {
    fn handles(&self, kind: ResourceKind) -> bool {
        matches!(
            kind,
            ResourceKind::Patient
                | ResourceKind::Encounter
                | ResourceKind::Condition
                | ResourceKind::Observation
                | ResourceKind::Procedure
                | ResourceKind::MedicationRequest
        )
    }

    fn before_export(&self, profile: &PersonProfile) {
        tracing::info!("[{}] started exporting", profile.initials());
    }

    fn after_export(&self, profile: &PersonProfile) {
        tracing::info!("[{}] done exporting", profile.initials());
    }

    fn patient_extension(
        &self,
        draft: &mut Patient,
        profile: &PersonProfile,
        rng: &mut PersonRng,
    ) -> GuideResult<()> {
        self.patient_forbidden(draft);

        draft.meta =
            Some(Meta::conforming_to(PROFILE_MII_PATIENT).with_source(SYSTEM_SYNTHETIC_RECORD));

        let initials = profile.initials();
        self.reshape_identifiers(draft, profile);
        self.reshape_name(draft, profile, rng, &initials);
        self.reshape_gender(draft, rng, &initials);
        self.withhold_birth_date(draft, rng, &initials);
        self.reshape_deceased(draft, rng, &initials);
        self.reshape_address(draft, rng, &initials)?;

        Ok(())
    }

    /// Driver's licenses, passports and American social security numbers
    /// have no place in a German record. The internal id, the medical
    /// record number and the two insurance numbers this guide produces
    /// survive.
    fn patient_forbidden(&self, draft: &mut Patient) {
        draft.identifier.retain(|identifier| {
            identifier.system.as_deref() == Some(SYSTEM_SYNTHETIC_RECORD)
                || identifier.is_type(SYSTEM_V2_0203, "MR")
                || identifier.is_type(SYSTEM_IDENTIFIER_TYPE_DE_BASIS, "GKV")
                || identifier.is_type(SYSTEM_IDENTIFIER_TYPE_DE_BASIS, "PKV")
        });
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use synfhir_model::terminology::{
        SYSTEM_MEDICAL_RECORD, SYSTEM_PASSPORT, SYSTEM_US_DRIVERS_LICENSE, SYSTEM_US_SSN,
    };
    use synfhir_model::{Address, Bundle, BundleType, Encounter, HumanName};
    use synfhir_person::{PersonAddress, PersonIdentifiers, PersonName, Sex};
    use synfhir_tables::MunicipalityCodes;

    use crate::GuideError;

    fn sample_profile() -> PersonProfile {
        PersonProfile {
            seed: 1,
            name: PersonName {
                prefix: Some("Mr.".to_string()),
                given: vec!["Max".to_string()],
                family: "Muster".to_string(),
                suffix: Some("MD".to_string()),
            },
            sex: Sex::Male,
            race: "white".to_string(),
            ethnicity: "nonhispanic".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1980, 4, 12).expect("date"),
            deceased_at: None,
            address: PersonAddress {
                line: "42 Example Allee".to_string(),
                city: "Lübeck".to_string(),
                state: "SH".to_string(),
                postal_code: "23552".to_string(),
            },
            identifiers: PersonIdentifiers {
                internal_id: "person-1".to_string(),
                medical_record_number: "mrn-1".to_string(),
                social_security_number: Some("999-76-5432".to_string()),
                drivers_license: Some("S99912345".to_string()),
                passport_number: Some("X81923461".to_string()),
            },
        }
    }

    /// A patient draft the way the generic builder hands it to the guide.
    fn sample_draft(profile: &PersonProfile) -> Patient {
        let mut draft = Patient::default();
        draft.id = Some("patient-1".to_string());

        draft.add_identifier(Identifier::new(
            SYSTEM_SYNTHETIC_RECORD,
            &profile.identifiers.internal_id,
        ));
        draft.add_identifier(
            Identifier::new(SYSTEM_MEDICAL_RECORD, &profile.identifiers.medical_record_number)
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
                CodeableConcept::from_coding(Coding::new(
                    SYSTEM_V2_0203,
                    "PPN",
                    "Passport Number",
                )),
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
        draft.address.push(Address {
            line: vec![profile.address.line.clone()],
            city: Some(profile.address.city.clone()),
            state: Some(profile.address.state.clone()),
            postal_code: Some(profile.address.postal_code.clone()),
            country: Some("DE".to_string()),
            ..Address::default()
        });
        draft
    }

    fn guide_with_municipalities() -> DeKdsGuide {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("municipality_codes.csv");
        std::fs::write(&path, "zip,ags\n23552,01003000\n10115,11000000\n").expect("write codes");
        let municipality_codes = MunicipalityCodes::load(&path).expect("load codes");

        DeKdsGuide::new(Arc::new(LookupTables {
            municipality_codes,
            ..LookupTables::default()
        }))
    }

    fn empty_guide() -> DeKdsGuide {
        DeKdsGuide::new(Arc::new(LookupTables::default()))
    }

    /// Run the full patient pass for one seed.
    fn exported(guide: &DeKdsGuide, seed: u64) -> Patient {
        let mut profile = sample_profile();
        profile.seed = seed;
        let mut draft = sample_draft(&profile);
        let mut rng = PersonRng::from_seed(seed);
        guide
            .patient_extension(&mut draft, &profile, &mut rng)
            .expect("patient pass");
        guide.patient_forbidden(&mut draft);
        draft
    }

    #[test]
    fn forbidden_keeps_only_german_identifiers() {
        let guide = empty_guide();
        let profile = sample_profile();
        let mut draft = sample_draft(&profile);
        assert_eq!(draft.identifier.len(), 5);

        guide.patient_forbidden(&mut draft);

        assert_eq!(draft.identifier.len(), 2);
        assert!(draft.identifier[0].system.as_deref() == Some(SYSTEM_SYNTHETIC_RECORD));
        assert!(draft.identifier[1].is_type(SYSTEM_V2_0203, "MR"));

        // Idempotent.
        let once = draft.clone();
        guide.patient_forbidden(&mut draft);
        assert_eq!(draft, once);
    }

    #[test]
    fn forbidden_retains_the_insurance_identifiers_it_produced() {
        let guide = empty_guide();

        for seed in 0..16 {
            let mut patient = exported(&guide, seed);
            let before = patient.clone();
            guide.patient_forbidden(&mut patient);
            assert_eq!(patient, before, "seed {seed} lost identifiers");
        }
    }

    #[test]
    fn insurance_identifiers_substitute_passport_and_ssn() {
        let guide = empty_guide();
        let patient = exported(&guide, 1);

        let gkv = patient
            .identifier
            .iter()
            .find(|i| i.is_type(SYSTEM_IDENTIFIER_TYPE_DE_BASIS, "GKV"))
            .expect("GKV identifier");
        assert_eq!(gkv.use_type.as_deref(), Some("official"));
        assert_eq!(gkv.system.as_deref(), Some(NAMINGSYSTEM_GKV_KVID10));
        assert_eq!(gkv.value.as_deref(), Some("X81923461"));
        let insurer = gkv
            .assigner
            .as_ref()
            .and_then(|a| a.identifier.as_deref())
            .expect("insurer identifier");
        assert!(insurer.is_type(SYSTEM_V2_0203, "XX"));
        assert_eq!(insurer.system.as_deref(), Some(NAMINGSYSTEM_ARGE_IK_IKNR));
        assert_eq!(insurer.value.as_deref(), Some(STAND_IN_IKNR));

        let pkv = patient
            .identifier
            .iter()
            .find(|i| i.is_type(SYSTEM_IDENTIFIER_TYPE_DE_BASIS, "PKV"))
            .expect("PKV identifier");
        assert_eq!(pkv.use_type.as_deref(), Some("secondary"));
        assert!(pkv.system.is_none());
        assert_eq!(pkv.value.as_deref(), Some("999-76-5432"));
        assert_eq!(
            pkv.assigner.as_ref().and_then(|a| a.display.as_deref()),
            Some("Privates Krankenversicherungsunternehmen")
        );

        // Without the substitute numbers, no insurance identifiers appear.
        let mut profile = sample_profile();
        profile.identifiers.social_security_number = None;
        profile.identifiers.passport_number = None;
        let mut draft = sample_draft(&profile);
        let mut rng = PersonRng::from_seed(1);
        guide
            .patient_extension(&mut draft, &profile, &mut rng)
            .expect("patient pass");
        assert!(!draft
            .identifier
            .iter()
            .any(|i| i.is_type(SYSTEM_IDENTIFIER_TYPE_DE_BASIS, "GKV")
                || i.is_type(SYSTEM_IDENTIFIER_TYPE_DE_BASIS, "PKV")));
    }

    #[test]
    fn medical_record_number_gains_use_and_assigner() {
        let guide = empty_guide();
        let patient = exported(&guide, 2);

        let mr = patient
            .identifier
            .iter()
            .find(|i| i.is_type(SYSTEM_V2_0203, "MR"))
            .expect("MR identifier");
        assert_eq!(mr.use_type.as_deref(), Some("usual"));
        assert_eq!(
            mr.assigner.as_ref().and_then(|a| a.reference.as_deref()),
            Some(SYSTEM_SYNTHETIC_RECORD)
        );
    }

    #[test]
    fn meta_claims_the_mii_profile_with_source() {
        let guide = empty_guide();
        let patient = exported(&guide, 3);

        let meta = patient.meta.as_ref().expect("meta");
        assert!(meta.has_profile(PROFILE_MII_PATIENT));
        assert_eq!(meta.source.as_deref(), Some(SYSTEM_SYNTHETIC_RECORD));
    }

    #[test]
    fn every_seed_lands_in_exactly_one_address_branch() {
        let guide = empty_guide();
        let mut po_boxes = 0;
        let mut streets = 0;

        for seed in 0..256 {
            let patient = exported(&guide, seed);
            let address = &patient.address[0];
            assert_eq!(address.use_type.as_deref(), Some("home"));

            let element = address.line_elements[0].as_ref().expect("line element");
            if address.type_.as_deref() == Some("postal") {
                po_boxes += 1;
                let line = &address.line[0];
                let number: u32 = line
                    .strip_prefix("Postfach ")
                    .expect("po box line")
                    .parse()
                    .expect("po box number");
                assert!((1..=999_999).contains(&number));
                assert_eq!(
                    element
                        .find(EXTENSION_ADXP_POSTBOX)
                        .and_then(|e| e.value_string.as_deref()),
                    Some(line.as_str())
                );
                assert!(element.find(EXTENSION_ADXP_HOUSENUMBER).is_none());
            } else {
                streets += 1;
                assert_eq!(address.line[0], "ExampleAllee 42");
                assert_eq!(
                    element
                        .find(EXTENSION_ADXP_HOUSENUMBER)
                        .and_then(|e| e.value_string.as_deref()),
                    Some("42")
                );
                assert_eq!(
                    element
                        .find(EXTENSION_ADXP_STREETNAME)
                        .and_then(|e| e.value_string.as_deref()),
                    Some("ExampleAllee")
                );
                assert!(element.find(EXTENSION_ADXP_POSTBOX).is_none());
            }
        }

        assert!(po_boxes > 0, "no seed produced a PO box");
        assert!(streets > 0, "no seed kept a street address");
    }

    #[test]
    fn unit_tails_become_additional_locators() {
        let guide = empty_guide();
        let mut profile = sample_profile();
        profile.address.line = "1021 Ferry Weg Apt 60".to_string();

        // Find a seed that keeps the street form.
        for seed in 0..4096 {
            profile.seed = seed;
            let mut draft = sample_draft(&profile);
            let mut rng = PersonRng::from_seed(seed);
            guide
                .patient_extension(&mut draft, &profile, &mut rng)
                .expect("patient pass");
            let address = &draft.address[0];
            if address.type_.is_some() {
                continue;
            }

            assert_eq!(address.line[0], "FerryWeg 1021, Apt 60");
            let element = address.line_elements[0].as_ref().expect("line element");
            assert_eq!(
                element
                    .find(EXTENSION_ADXP_ADDITIONAL_LOCATOR)
                    .and_then(|e| e.value_string.as_deref()),
                Some("Apt 60")
            );
            return;
        }
        panic!("no seed kept the street form");
    }

    #[test]
    fn unparseable_lines_fail_the_street_branch() {
        let guide = empty_guide();
        let mut profile = sample_profile();
        profile.address.line = "123 Main St".to_string();

        let mut failures = 0;
        for seed in 0..64 {
            profile.seed = seed;
            let mut draft = sample_draft(&profile);
            let mut rng = PersonRng::from_seed(seed);
            match guide.patient_extension(&mut draft, &profile, &mut rng) {
                // PO-box seeds never parse the line.
                Ok(()) => assert_eq!(draft.address[0].type_.as_deref(), Some("postal")),
                Err(GuideError::AddressFormat { line }) => {
                    failures += 1;
                    assert_eq!(line, "123 Main St");
                }
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert!(failures > 0, "no seed reached the street branch");
    }

    #[test]
    fn known_postal_codes_can_gain_a_municipality_key() {
        let guide = guide_with_municipalities();

        for seed in 0..4096 {
            let patient = exported(&guide, seed);
            if let Some(element) = &patient.address[0].city_element {
                let coding = element
                    .find(EXTENSION_DESTATIS_AGS)
                    .and_then(|e| e.value_coding.as_ref())
                    .expect("ags coding");
                assert_eq!(coding.system.as_deref(), Some(SYSTEM_DESTATIS_AGS));
                assert_eq!(coding.code.as_deref(), Some("01003000"));
                return;
            }
        }
        panic!("no seed attached a municipality key");
    }

    #[test]
    fn unknown_postal_codes_never_gain_a_municipality_key() {
        // The empty table knows no postal code at all.
        let guide = empty_guide();

        for seed in 0..64 {
            let patient = exported(&guide, seed);
            assert!(patient.address[0].city_element.is_none());
        }
    }

    #[test]
    fn gender_remaps_carry_the_official_coding() {
        let guide = empty_guide();
        let mut remapped = 0;

        for seed in 0..256 {
            let patient = exported(&guide, seed);
            match patient.gender.as_deref() {
                Some("male") => assert!(patient.gender_element.is_none()),
                Some("other") => {
                    remapped += 1;
                    let coding = patient
                        .gender_element
                        .as_ref()
                        .and_then(|e| e.find(EXTENSION_GENDER_AMTLICH_DE))
                        .and_then(|e| e.value_coding.as_ref())
                        .expect("gender coding");
                    assert_eq!(coding.system.as_deref(), Some(SYSTEM_GENDER_AMTLICH_DE));
                    assert!(matches!(coding.code.as_deref(), Some("D") | Some("X")));
                }
                other => panic!("unexpected gender: {other:?}"),
            }
        }

        assert!(remapped > 0, "no seed remapped the gender");
    }

    #[test]
    fn withheld_birth_dates_leave_a_data_absent_reason() {
        let guide = empty_guide();
        let mut withheld = 0;

        for seed in 0..256 {
            let patient = exported(&guide, seed);
            match (&patient.birth_date, &patient.birth_date_element) {
                (Some(date), None) => assert_eq!(date, "1980-04-12"),
                (None, Some(element)) => {
                    withheld += 1;
                    let reason = element
                        .find(EXTENSION_DATA_ABSENT_REASON)
                        .and_then(|e| e.value_code.as_deref())
                        .expect("absent reason");
                    assert!(DATA_ABSENT_REASONS.contains(&reason));
                }
                other => panic!("birth date in impossible state: {other:?}"),
            }
        }

        assert!(withheld > 0, "no seed withheld the birth date");
    }

    #[test]
    fn deceased_forms_follow_the_boolean_trade() {
        let guide = empty_guide();

        // Alive: either untouched or an explicit false.
        let mut explicit = 0;
        for seed in 0..64 {
            let patient = exported(&guide, seed);
            assert!(patient.deceased_date_time.is_none());
            match patient.deceased_boolean {
                None => {}
                Some(false) => explicit += 1,
                Some(true) => panic!("alive patient marked deceased"),
            }
        }
        assert!(explicit > 0, "no seed set the explicit false");

        // Deceased: either the timestamp survives or collapses to true.
        let mut collapsed = 0;
        for seed in 0..64 {
            let mut profile = sample_profile();
            profile.seed = seed;
            let mut draft = sample_draft(&profile);
            draft.deceased_date_time = Some("2021-05-01T12:00:00Z".to_string());
            let mut rng = PersonRng::from_seed(seed);
            guide
                .patient_extension(&mut draft, &profile, &mut rng)
                .expect("patient pass");

            match (&draft.deceased_date_time, draft.deceased_boolean) {
                (Some(_), None) => {}
                (None, Some(true)) => collapsed += 1,
                other => panic!("deceased in impossible state: {other:?}"),
            }
        }
        assert!(collapsed > 0, "no seed collapsed the timestamp");
    }

    #[test]
    fn salutations_never_survive_the_official_name() {
        let guide = empty_guide();

        for seed in 0..32 {
            let patient = exported(&guide, seed);
            let official = patient.official_name().expect("official name");
            assert!(!official.prefix.iter().any(|p| p == "Mr."));
        }
    }

    #[test]
    fn only_the_official_name_is_reshaped() {
        let guide = empty_guide();
        let profile = sample_profile();
        let mut draft = sample_draft(&profile);

        let mut nickname = HumanName::default();
        nickname.use_type = Some("nickname".to_string());
        nickname.family = Some("M.".to_string());
        nickname.prefix.push("Mr.".to_string());
        nickname.suffix.push("JD".to_string());
        draft.name.push(nickname);

        let mut rng = PersonRng::from_seed(5);
        guide
            .patient_extension(&mut draft, &profile, &mut rng)
            .expect("patient pass");

        // A JD suffix on the official name is always mapped, so a surviving
        // one proves the nickname was left alone.
        let nickname = draft
            .name
            .iter()
            .find(|n| !n.is_official())
            .expect("nickname kept");
        assert_eq!(nickname.prefix, vec!["Mr.".to_string()]);
        assert_eq!(nickname.suffix, vec!["JD".to_string()]);
    }

    #[test]
    fn patients_without_official_names_skip_the_name_draws() {
        let guide = empty_guide();
        let profile = sample_profile();

        for seed in 0..16 {
            let mut nameless = sample_draft(&profile);
            nameless.name.clear();

            let mut nicknamed = sample_draft(&profile);
            nicknamed.name.clear();
            let mut nickname = HumanName::default();
            nickname.use_type = Some("nickname".to_string());
            nickname.family = Some("Misi".to_string());
            nicknamed.name.push(nickname);

            // Neither draft has an official name, so neither consumes name
            // draws and the downstream steps stay aligned draw-for-draw.
            let mut rng_a = PersonRng::from_seed(seed);
            let mut rng_b = PersonRng::from_seed(seed);
            guide
                .patient_extension(&mut nameless, &profile, &mut rng_a)
                .expect("patient pass");
            guide
                .patient_extension(&mut nicknamed, &profile, &mut rng_b)
                .expect("patient pass");

            assert_eq!(rng_a.uuid(), rng_b.uuid());
            assert_eq!(nameless.gender, nicknamed.gender);
            assert_eq!(nameless.birth_date, nicknamed.birth_date);
            assert_eq!(nameless.address, nicknamed.address);
        }
    }

    #[test]
    fn exports_are_deterministic_per_seed() {
        let guide = guide_with_municipalities();

        for seed in [0, 7, 42, 1234] {
            assert_eq!(exported(&guide, seed), exported(&guide, seed));
        }
    }

    #[test]
    fn only_the_kds_kinds_are_claimed() {
        let guide = empty_guide();

        for kind in [
            ResourceKind::Patient,
            ResourceKind::Encounter,
            ResourceKind::Condition,
            ResourceKind::Observation,
            ResourceKind::Procedure,
            ResourceKind::MedicationRequest,
        ] {
            assert!(guide.handles(kind), "{kind} should be claimed");
        }
        for kind in [
            ResourceKind::Allergy,
            ResourceKind::Device,
            ResourceKind::Immunization,
            ResourceKind::Report,
            ResourceKind::Provider,
            ResourceKind::Practitioner,
        ] {
            assert!(!guide.handles(kind), "{kind} should not be claimed");
        }
    }

    #[test]
    fn claimed_kinds_without_overrides_pass_through() {
        let guide = empty_guide();
        let bundle = Bundle::new(BundleType::Collection);

        let mut encounter = Encounter {
            id: Some("enc-1".to_string()),
            status: Some("finished".to_string()),
            ..Encounter::default()
        };
        let before = encounter.clone();
        guide
            .encounter_extension(&mut encounter, &bundle)
            .expect("default pass");
        assert_eq!(encounter, before);
    }
}
