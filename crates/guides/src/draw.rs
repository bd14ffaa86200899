//! Draw shapes over the per-person random stream.
//!
//! Guides make two kinds of probabilistic choices: "pick one of these", and
//! "maybe pick one of these". Both live here so the draw order stays easy
//! to audit; stream position is part of a guide's observable behaviour.

use synfhir_person::{PersonRng, Sex};

/// A uniform pick from a non-empty slice.
pub fn pick<'a>(rng: &mut PersonRng, options: &'a [&'a str]) -> &'a str {
    options[rng.index(options.len())]
}

/// With probability `apply`, a uniform pick from `options`; otherwise no
/// value. The gate consumes one draw either way; the pick itself only draws
/// when the gate passes.
pub fn pick_optional<'a>(
    rng: &mut PersonRng,
    apply: f64,
    options: &'a [&'a str],
) -> Option<&'a str> {
    if rng.chance(apply) {
        Some(pick(rng, options))
    } else {
        None
    }
}

/// A pair of gendered word forms.
#[derive(Debug, Clone, Copy)]
pub struct GenderedPair {
    pub masculine: &'static str,
    pub feminine: &'static str,
}

impl GenderedPair {
    pub const fn new(masculine: &'static str, feminine: &'static str) -> Self {
        GenderedPair {
            masculine,
            feminine,
        }
    }

    /// The form matching the given sex.
    pub fn for_sex(&self, sex: Sex) -> &'static str {
        match sex {
            Sex::Male => self.masculine,
            Sex::Female => self.feminine,
        }
    }
}

/// Gendered variant of [`pick_optional`]: the pair is drawn, the form is
/// selected by `sex` without a further draw.
pub fn pick_gendered(
    rng: &mut PersonRng,
    apply: f64,
    options: &[GenderedPair],
    sex: Sex,
) -> Option<&'static str> {
    if rng.chance(apply) {
        Some(options[rng.index(options.len())].for_sex(sex))
    } else {
        None
    }
}
