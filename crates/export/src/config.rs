//! Run configuration: which guide, which bundle form, where the tables live.

use std::path::Path;
use std::sync::Arc;

use synfhir_guides::{GuideKind, Specialisation};
use synfhir_model::BundleType;
use synfhir_tables::{LookupTables, TableSources};

use crate::ExportResult;

/// Everything the binary resolves before the first person is exported.
/// Table loading is deferred to [`ExportConfig::build_guide`] so a bad path
/// fails the run before any export begins.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub guide: GuideKind,
    pub bundle_type: BundleType,
    pub tables: TableSources,
}

impl ExportConfig {
    /// Configuration for the conventional table layout: the three table
    /// files under one directory, with their standard names.
    pub fn with_table_dir(guide: GuideKind, bundle_type: BundleType, dir: &Path) -> Self {
        ExportConfig {
            guide,
            bundle_type,
            tables: TableSources {
                municipality_codes: dir.join("municipality_codes.csv"),
                race_ethnicity_codes: dir.join("race_ethnicity_codes.json"),
                profile_mappings: dir.join("profile_mappings.csv"),
            },
        }
    }

    /// Load the lookup tables and construct the configured guide. The
    /// tables are loaded exactly once and shared with every hook the guide
    /// runs.
    pub fn build_guide(&self) -> ExportResult<Box<dyn Specialisation>> {
        let tables = Arc::new(LookupTables::load(&self.tables)?);
        tracing::debug!(
            "loaded lookup tables: {} municipality codes, {} profile mappings",
            tables.municipality_codes.len(),
            tables.profile_mappings.len(),
        );
        Ok(self.guide.build(tables))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExportError;
    use synfhir_model::ResourceKind;

    fn write_standard_tables(dir: &Path) {
        std::fs::write(
            dir.join("municipality_codes.csv"),
            "zip,ags\n23552,01003000\n",
        )
        .expect("write municipality codes");
        std::fs::write(
            dir.join("race_ethnicity_codes.json"),
            r#"{"white": "2106-3", "hispanic": "2135-2"}"#,
        )
        .expect("write race codes");
        std::fs::write(
            dir.join("profile_mappings.csv"),
            "system,code,profile\nhttp://loinc.org,8302-2,http://hl7.org/fhir/StructureDefinition/bodyheight\n",
        )
        .expect("write profile mappings");
    }

    #[test]
    fn table_dir_layout_uses_the_standard_file_names() {
        let config = ExportConfig::with_table_dir(
            GuideKind::UsCore,
            BundleType::Collection,
            Path::new("data"),
        );

        assert_eq!(
            config.tables.municipality_codes,
            Path::new("data/municipality_codes.csv")
        );
        assert_eq!(
            config.tables.race_ethnicity_codes,
            Path::new("data/race_ethnicity_codes.json")
        );
        assert_eq!(
            config.tables.profile_mappings,
            Path::new("data/profile_mappings.csv")
        );
    }

    #[test]
    fn build_guide_loads_tables_and_selects_the_guide() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_standard_tables(dir.path());

        let config =
            ExportConfig::with_table_dir(GuideKind::DeKds, BundleType::Collection, dir.path());
        let guide = config.build_guide().expect("guide builds");

        assert!(guide.handles(ResourceKind::Patient));
        assert!(!guide.handles(ResourceKind::Device));
    }

    #[test]
    fn missing_tables_fail_before_any_export() {
        let dir = tempfile::tempdir().expect("tempdir");
        // No table files written.
        let config =
            ExportConfig::with_table_dir(GuideKind::UsCore, BundleType::Collection, dir.path());

        let err = config.build_guide().expect_err("tables missing");
        assert!(matches!(err, ExportError::Table(_)));
    }
}
