//! Official-name reshaping for the German guide.
//!
//! Three steps, all over the name record marked `official`: salutations
//! are dropped from the structured prefixes, generic academic suffixes are
//! mapped onto German academic prefixes, and some names gain nobility
//! components carried as structured `_family` extensions.

use synfhir_model::{Extension, HumanName};
use synfhir_person::{PersonRng, Sex};

use crate::draw::{self, GenderedPair};

/// Marks a structured prefix as academic.
pub const EXTENSION_PREFIX_QUALIFIER: &str =
    "http://hl7.org/fhir/StructureDefinition/iso21090-EN-qualifier";

/// The bare family name, before nobility components were folded in.
pub const EXTENSION_OWN_NAME: &str =
    "http://hl7.org/fhir/StructureDefinition/humanname-own-name";

/// Nobility particle (Namensvorsatz), e.g. "von der".
pub const EXTENSION_OWN_PREFIX: &str =
    "http://hl7.org/fhir/StructureDefinition/humanname-own-prefix";

/// Nobility title (Namenszusatz), e.g. "Freifrau".
pub const EXTENSION_NAMENSZUSATZ: &str =
    "http://fhir.de/StructureDefinition/humanname-namenszusatz";

// Salutations belong in HumanName.text when needed at all, never in the
// structured prefixes.
const SALUTATIONS: [&str; 3] = ["Mr.", "Mrs.", "Ms."];

const PHD_PREFIXES: [&str; 4] = ["Dr. Phil.", "Dr. rer. nat.", "Dr.", "Dr. Dr. h.c."];
const JD_PREFIXES: [&str; 2] = ["Dr. jur.", "Dr."];
const MD_PREFIXES: [&str; 3] = ["Dr. med.", "Dr. dent.", "Dr."];

/// Chance that a PhD or MD suffix is mapped at all; a JD suffix is always
/// mapped.
const MAP_PHD: f64 = 0.5;
const MAP_MD: f64 = 0.5;

const PARTICLES: [&str; 11] = [
    "von",
    "v.",
    "von und zu",
    "vom",
    "zum",
    "vom und zum",
    "von der",
    "von dem",
    "de",
    "van",
    "van der",
];

// Particles show up in nearly every nobility name; titles are rare today.
const PARTICLE_PRESENT: f64 = 0.95;
const TITLE_PRESENT: f64 = 0.25;

const TITLES: [GenderedPair; 7] = [
    GenderedPair::new("Prinz", "Prinzessin"),
    GenderedPair::new("Kurfürst", "Kurfürstin"),
    GenderedPair::new("Herzog", "Herzogin"),
    GenderedPair::new("Fürst", "Fürstin"),
    GenderedPair::new("Graf", "Gräfin"),
    GenderedPair::new("Freiherr", "Freifrau"),
    GenderedPair::new("Baron", "Baronin"),
];

/// Drop salutation prefixes from the structured prefix list.
pub fn strip_salutations(name: &mut HumanName) {
    for salutation in SALUTATIONS {
        name.remove_prefix(salutation);
    }
}

/// Map generic academic suffixes onto German academic prefixes.
///
/// Each mapped suffix is removed and proposes a prefix; when several
/// suffixes map, the later proposal wins, so at most one academic prefix
/// is added. The added prefix carries an `AC` qualifier on its element.
/// Suffixes whose mapping chance fails stay in place unmapped.
pub fn map_academic_suffixes(name: &mut HumanName, rng: &mut PersonRng) {
    if name.suffix.is_empty() {
        return;
    }

    let mut mapped: Option<&str> = None;

    if name.has_suffix("PhD") && rng.chance(MAP_PHD) {
        mapped = Some(draw::pick(rng, &PHD_PREFIXES));
        name.remove_suffix("PhD");
    }
    if name.has_suffix("JD") {
        mapped = Some(draw::pick(rng, &JD_PREFIXES));
        name.remove_suffix("JD");
    }
    if name.has_suffix("MD") && rng.chance(MAP_MD) {
        mapped = Some(draw::pick(rng, &MD_PREFIXES));
        name.remove_suffix("MD");
    }

    if let Some(prefix) = mapped {
        name.add_prefix_with_extension(prefix, Extension::code(EXTENSION_PREFIX_QUALIFIER, "AC"));
    }
}

/// Draw nobility components for a name and apply them. The particle is
/// drawn before the title; the title form follows the person's sex.
pub fn augment_nobility(name: &mut HumanName, sex: Sex, rng: &mut PersonRng) {
    let particle = draw::pick_optional(rng, PARTICLE_PRESENT, &PARTICLES);
    let title = draw::pick_gendered(rng, TITLE_PRESENT, &TITLES, sex);
    apply_nobility(name, title, particle);
}

/// Fold nobility components into the family name.
///
/// The composed family reads `{title} {particle} {family}`; each component
/// present is also recorded as a structured `_family` extension, alongside
/// the original family name. With neither component the name is left
/// untouched.
pub fn apply_nobility(name: &mut HumanName, title: Option<&str>, particle: Option<&str>) {
    if title.is_none() && particle.is_none() {
        return;
    }
    let Some(family) = name.family.clone() else {
        return;
    };

    let element = name.family_element_mut();
    element.add(Extension::string(EXTENSION_OWN_NAME, &family));

    let mut composed = String::new();
    if let Some(title) = title {
        element.add(Extension::string(EXTENSION_NAMENSZUSATZ, title));
        composed.push_str(title);
        composed.push(' ');
    }
    if let Some(particle) = particle {
        element.add(Extension::string(EXTENSION_OWN_PREFIX, particle));
        composed.push_str(particle);
        composed.push(' ');
    }
    composed.push_str(&family);

    name.family = Some(composed);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn official_name(suffixes: &[&str]) -> HumanName {
        let mut name = HumanName::official("Muster", vec!["Max".to_string()]);
        name.suffix = suffixes.iter().map(|s| s.to_string()).collect();
        name
    }

    #[test]
    fn salutations_are_stripped_and_other_prefixes_kept() {
        let mut name = official_name(&[]);
        name.prefix = vec!["Mr.".to_string(), "Prof.".to_string(), "Ms.".to_string()];

        strip_salutations(&mut name);

        assert_eq!(name.prefix, vec!["Prof."]);
    }

    #[test]
    fn names_without_suffixes_draw_nothing() {
        let mut with_name = PersonRng::from_seed(21);
        let mut untouched = PersonRng::from_seed(21);

        let mut name = official_name(&[]);
        map_academic_suffixes(&mut name, &mut with_name);

        assert!(name.prefix.is_empty());
        // The stream did not move.
        assert_eq!(with_name.uuid(), untouched.uuid());
    }

    #[test]
    fn jd_suffixes_always_map_to_an_academic_prefix() {
        let mut rng = PersonRng::from_seed(4);
        let mut name = official_name(&["JD"]);

        map_academic_suffixes(&mut name, &mut rng);

        assert!(name.suffix.is_empty());
        assert_eq!(name.prefix.len(), 1);
        assert!(JD_PREFIXES.contains(&name.prefix[0].as_str()));

        let element = name.prefix_elements[0].as_ref().expect("qualified");
        let qualifier = element.find(EXTENSION_PREFIX_QUALIFIER).expect("qualifier");
        assert_eq!(qualifier.value_code.as_deref(), Some("AC"));
    }

    #[test]
    fn a_suffix_and_its_mapped_prefix_never_coexist() {
        for seed in 0..64 {
            let mut rng = PersonRng::from_seed(seed);
            let mut name = official_name(&["PhD"]);

            map_academic_suffixes(&mut name, &mut rng);

            let suffix_kept = name.has_suffix("PhD");
            let prefix_added = !name.prefix.is_empty();
            assert_ne!(suffix_kept, prefix_added, "seed {seed}");
        }
    }

    #[test]
    fn later_suffix_mappings_overwrite_earlier_ones() {
        // JD maps unconditionally, so with PhD and JD present the JD
        // proposal is the surviving one unless MD follows.
        for seed in 0..32 {
            let mut rng = PersonRng::from_seed(seed);
            let mut name = official_name(&["PhD", "JD"]);

            map_academic_suffixes(&mut name, &mut rng);

            assert!(!name.has_suffix("JD"));
            assert_eq!(name.prefix.len(), 1, "seed {seed}");
        }
    }

    #[test]
    fn nobility_composes_title_particle_and_family() {
        let mut name = official_name(&[]);

        apply_nobility(&mut name, Some("Prinzessin"), Some("von der"));

        assert_eq!(name.family.as_deref(), Some("Prinzessin von der Muster"));

        let element = name.family_element.as_ref().expect("_family present");
        assert_eq!(element.extension.len(), 3);
        assert_eq!(element.extension[0].url, EXTENSION_OWN_NAME);
        assert_eq!(element.extension[0].value_string.as_deref(), Some("Muster"));
        assert_eq!(element.extension[1].url, EXTENSION_NAMENSZUSATZ);
        assert_eq!(
            element.extension[1].value_string.as_deref(),
            Some("Prinzessin")
        );
        assert_eq!(element.extension[2].url, EXTENSION_OWN_PREFIX);
        assert_eq!(element.extension[2].value_string.as_deref(), Some("von der"));
    }

    #[test]
    fn nobility_components_are_individually_optional() {
        let mut particle_only = official_name(&[]);
        apply_nobility(&mut particle_only, None, Some("von"));
        assert_eq!(particle_only.family.as_deref(), Some("von Muster"));
        let element = particle_only.family_element.as_ref().expect("_family");
        assert!(element.find(EXTENSION_NAMENSZUSATZ).is_none());
        assert!(element.find(EXTENSION_OWN_PREFIX).is_some());

        let mut title_only = official_name(&[]);
        apply_nobility(&mut title_only, Some("Graf"), None);
        assert_eq!(title_only.family.as_deref(), Some("Graf Muster"));

        let mut neither = official_name(&[]);
        apply_nobility(&mut neither, None, None);
        assert_eq!(neither.family.as_deref(), Some("Muster"));
        assert!(neither.family_element.is_none());
    }

    #[test]
    fn augmented_families_retain_the_original_name() {
        for seed in 0..32 {
            let mut rng = PersonRng::from_seed(seed);
            let mut name = official_name(&[]);

            augment_nobility(&mut name, Sex::Female, &mut rng);

            let family = name.family.as_deref().expect("family present");
            assert!(family.ends_with("Muster"), "seed {seed}: {family}");
            if let Some(element) = &name.family_element {
                assert_eq!(
                    element.find(EXTENSION_OWN_NAME).and_then(|e| e.value_string.as_deref()),
                    Some("Muster")
                );
            }
        }
    }

    #[test]
    fn augmentation_is_deterministic_per_seed() {
        let mut first = official_name(&[]);
        let mut second = official_name(&[]);

        augment_nobility(&mut first, Sex::Male, &mut PersonRng::from_seed(99));
        augment_nobility(&mut second, Sex::Male, &mut PersonRng::from_seed(99));

        assert_eq!(first, second);
    }
}
