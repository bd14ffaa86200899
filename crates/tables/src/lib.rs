//! Lookup tables the specialisation guides resolve codes against.
//!
//! Three tables are loaded once at startup and shared read-only afterwards:
//!
//! - municipality codes: Gemeindeschlüssel by postal code (CSV)
//! - race and ethnicity codes: CDC codes by demographic keyword (JSON)
//! - profile mappings: observation profile URIs by coded system and code (CSV)
//!
//! A table that cannot be read or parsed fails the whole load. Lookups for
//! keys the tables do not know return `None`; how to handle a miss is the
//! caller's decision.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use serde::Deserialize;

// ============================================================================
// Errors
// ============================================================================

/// Errors raised while loading lookup tables.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("failed to read table {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed csv table {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("malformed json table {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Type alias for Results that can fail with a [`TableError`].
pub type TableResult<T> = Result<T, TableError>;

// ============================================================================
// Municipality codes
// ============================================================================

#[derive(Debug, Deserialize)]
struct MunicipalityRow {
    zip: String,
    ags: String,
}

/// Amtlicher Gemeindeschlüssel by postal code.
#[derive(Debug, Default)]
pub struct MunicipalityCodes {
    by_zip: HashMap<String, String>,
}

impl MunicipalityCodes {
    /// Load from a CSV file with `zip` and `ags` columns.
    pub fn load(path: &Path) -> TableResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)
            .map_err(|e| TableError::Csv {
                path: path.to_path_buf(),
                source: e,
            })?;

        let mut by_zip = HashMap::new();
        for result in reader.deserialize::<MunicipalityRow>() {
            let row = result.map_err(|e| TableError::Csv {
                path: path.to_path_buf(),
                source: e,
            })?;
            by_zip.insert(row.zip, row.ags);
        }

        Ok(MunicipalityCodes { by_zip })
    }

    /// The municipality key for a postal code, when the table knows it.
    pub fn key_for_zip(&self, zip: &str) -> Option<&str> {
        self.by_zip.get(zip).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_zip.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_zip.is_empty()
    }
}

// ============================================================================
// Race and ethnicity codes
// ============================================================================

/// CDC race and ethnicity codes by demographic keyword (`white`, `asian`,
/// `hispanic`, ...).
#[derive(Debug, Default)]
pub struct RaceEthnicityCodes {
    by_keyword: HashMap<String, String>,
}

impl RaceEthnicityCodes {
    /// Load from a flat JSON object mapping keyword to code.
    pub fn load(path: &Path) -> TableResult<Self> {
        let file = File::open(path).map_err(|e| TableError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let by_keyword: HashMap<String, String> =
            serde_json::from_reader(file).map_err(|e| TableError::Json {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(RaceEthnicityCodes { by_keyword })
    }

    pub fn code_for(&self, keyword: &str) -> Option<&str> {
        self.by_keyword.get(keyword).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_keyword.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_keyword.is_empty()
    }
}

// ============================================================================
// Observation profile mappings
// ============================================================================

#[derive(Debug, Deserialize)]
struct ProfileMappingRow {
    system: String,
    code: String,
    profile: String,
}

/// Observation profile URIs keyed by (system, code).
#[derive(Debug, Default)]
pub struct ProfileMappings {
    by_code: HashMap<(String, String), String>,
}

impl ProfileMappings {
    /// Load from a CSV file with `system`, `code` and `profile` columns.
    pub fn load(path: &Path) -> TableResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)
            .map_err(|e| TableError::Csv {
                path: path.to_path_buf(),
                source: e,
            })?;

        let mut by_code = HashMap::new();
        for result in reader.deserialize::<ProfileMappingRow>() {
            let row = result.map_err(|e| TableError::Csv {
                path: path.to_path_buf(),
                source: e,
            })?;
            by_code.insert((row.system, row.code), row.profile);
        }

        Ok(ProfileMappings { by_code })
    }

    pub fn profile_for(&self, system: &str, code: &str) -> Option<&str> {
        self.by_code
            .get(&(system.to_string(), code.to_string()))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}

// ============================================================================
// Combined loader
// ============================================================================

/// Where the three tables live on disk.
#[derive(Debug, Clone)]
pub struct TableSources {
    pub municipality_codes: PathBuf,
    pub race_ethnicity_codes: PathBuf,
    pub profile_mappings: PathBuf,
}

/// All lookup tables, loaded once and shared by the guides.
#[derive(Debug, Default)]
pub struct LookupTables {
    pub municipality_codes: MunicipalityCodes,
    pub race_ethnicity_codes: RaceEthnicityCodes,
    pub profile_mappings: ProfileMappings,
}

impl LookupTables {
    pub fn load(sources: &TableSources) -> TableResult<Self> {
        Ok(LookupTables {
            municipality_codes: MunicipalityCodes::load(&sources.municipality_codes)?,
            race_ethnicity_codes: RaceEthnicityCodes::load(&sources.race_ethnicity_codes)?,
            profile_mappings: ProfileMappings::load(&sources.profile_mappings)?,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_file_with(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(content.as_bytes()).expect("write");
        file
    }

    #[test]
    fn municipality_codes_load_and_look_up() {
        let file = temp_file_with("zip,ags\n23552,01003000\n10115,11000000\n");
        let codes = MunicipalityCodes::load(file.path()).expect("load");

        assert_eq!(codes.len(), 2);
        assert_eq!(codes.key_for_zip("23552"), Some("01003000"));
        assert_eq!(codes.key_for_zip("99999"), None);
    }

    #[test]
    fn municipality_codes_reject_missing_columns() {
        let file = temp_file_with("plz,gemeinde\n23552,01003000\n");
        let err = MunicipalityCodes::load(file.path()).expect_err("wrong header");

        match err {
            TableError::Csv { path, .. } => assert_eq!(path, file.path()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn race_ethnicity_codes_load_from_json() {
        let file = temp_file_with(r#"{"white": "2106-3", "hispanic": "2135-2"}"#);
        let codes = RaceEthnicityCodes::load(file.path()).expect("load");

        assert_eq!(codes.code_for("white"), Some("2106-3"));
        assert_eq!(codes.code_for("martian"), None);
    }

    #[test]
    fn race_ethnicity_codes_reject_non_object_json() {
        let file = temp_file_with(r#"["white", "black"]"#);

        let err = RaceEthnicityCodes::load(file.path()).expect_err("not a map");
        match err {
            TableError::Json { .. } => {}
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn profile_mappings_key_on_system_and_code() {
        let file = temp_file_with(
            "system,code,profile\n\
             http://loinc.org,8302-2,http://hl7.org/fhir/StructureDefinition/bodyheight\n",
        );
        let mappings = ProfileMappings::load(file.path()).expect("load");

        assert_eq!(
            mappings.profile_for("http://loinc.org", "8302-2"),
            Some("http://hl7.org/fhir/StructureDefinition/bodyheight")
        );
        assert_eq!(mappings.profile_for("http://loinc.org", "0000-0"), None);
        assert_eq!(mappings.profile_for("http://snomed.info/sct", "8302-2"), None);
    }

    #[test]
    fn missing_table_file_is_reported_with_its_path() {
        let err = RaceEthnicityCodes::load(Path::new("/nonexistent/table.json"))
            .expect_err("missing file");

        match err {
            TableError::Read { path, .. } => {
                assert_eq!(path, Path::new("/nonexistent/table.json"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn combined_load_fails_when_any_table_is_missing() {
        let municipality = temp_file_with("zip,ags\n23552,01003000\n");
        let race = temp_file_with(r#"{"white": "2106-3"}"#);

        let sources = TableSources {
            municipality_codes: municipality.path().to_path_buf(),
            race_ethnicity_codes: race.path().to_path_buf(),
            profile_mappings: PathBuf::from("/nonexistent/profiles.csv"),
        };

        LookupTables::load(&sources).expect_err("missing profile mappings");
    }
}
