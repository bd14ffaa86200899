//! Implementation-guide specialisations for exported FHIR R4 bundles.
//!
//! A [`Specialisation`] reshapes the generic resource drafts the export
//! pipeline builds, so the finished bundle conforms to one implementation
//! guide. Two guides ship with this crate: [`UsCoreGuide`] decorates every
//! resource kind for US Core, and [`DeKdsGuide`] covers the patient-centric
//! subset of the German KDS while passing unclaimed kinds through untouched.
//!
//! Responsibilities:
//!
//! - Define the contract between the export pipeline and a guide
//!   ([`contract`]).
//! - Parse and recompose generated address lines ([`address`]) and reshape
//!   official names ([`name`]) for the German guide.
//! - Resolve a configured guide name to a boxed implementation
//!   ([`GuideKind`]).

pub mod address;
pub mod contract;
pub mod de_kds;
pub mod draw;
pub mod name;
pub mod us_core;

use std::str::FromStr;
use std::sync::Arc;

use synfhir_tables::LookupTables;
use thiserror::Error;

pub use contract::{retain_identifiers_by_system, Specialisation};
pub use de_kds::DeKdsGuide;
pub use us_core::UsCoreGuide;

// ============================================================================
// Errors
// ============================================================================

/// Errors a guide can raise while reshaping a draft.
#[derive(Debug, Error)]
pub enum GuideError {
    /// The guide needs the address line in structured parts, but the line
    /// does not follow the generic-locale grammar.
    #[error("address line '{line}' does not match the generic-locale format")]
    AddressFormat { line: String },

    #[error("unknown implementation guide '{name}'")]
    UnknownGuide { name: String },
}

pub type GuideResult<T> = Result<T, GuideError>;

// ============================================================================
// Guide selection
// ============================================================================

/// The implementation guides this crate ships.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuideKind {
    /// US Core: full coverage, every resource kind is decorated.
    UsCore,

    /// German KDS (Medizininformatik-Initiative core dataset): partial
    /// coverage centred on the patient resource.
    DeKds,
}

impl GuideKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GuideKind::UsCore => "us-core",
            GuideKind::DeKds => "de-kds",
        }
    }

    /// Construct the guide this kind names, sharing the loaded lookup
    /// tables.
    pub fn build(&self, tables: Arc<LookupTables>) -> Box<dyn Specialisation> {
        match self {
            GuideKind::UsCore => Box::new(UsCoreGuide::new(tables)),
            GuideKind::DeKds => Box::new(DeKdsGuide::new(tables)),
        }
    }
}

impl FromStr for GuideKind {
    type Err = GuideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "us-core" | "us_core" | "uscore" | "us" => Ok(GuideKind::UsCore),
            "de-kds" | "de_kds" | "dekds" | "de" => Ok(GuideKind::DeKds),
            _ => Err(GuideError::UnknownGuide {
                name: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for GuideKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synfhir_model::ResourceKind;

    #[test]
    fn guide_names_parse_flexibly() {
        for name in ["us-core", "US_CORE", "uscore", "us"] {
            assert_eq!(name.parse::<GuideKind>().expect("parses"), GuideKind::UsCore);
        }
        for name in ["de-kds", "DE_KDS", "dekds", "de"] {
            assert_eq!(name.parse::<GuideKind>().expect("parses"), GuideKind::DeKds);
        }
    }

    #[test]
    fn unknown_guide_names_are_rejected() {
        let err = "fr-core".parse::<GuideKind>().expect_err("unknown");
        match err {
            GuideError::UnknownGuide { name } => assert_eq!(name, "fr-core"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn build_selects_the_expected_coverage() {
        let tables = Arc::new(LookupTables::default());

        let us = GuideKind::UsCore.build(Arc::clone(&tables));
        assert!(us.handles(ResourceKind::Device));

        let de = GuideKind::DeKds.build(tables);
        assert!(de.handles(ResourceKind::Patient));
        assert!(!de.handles(ResourceKind::Device));
    }

    #[test]
    fn kind_round_trips_through_display() {
        for kind in [GuideKind::UsCore, GuideKind::DeKds] {
            assert_eq!(kind.to_string().parse::<GuideKind>().expect("parses"), kind);
        }
    }
}
