use std::fs;
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use synfhir_export::{export_batch, sample, ExportConfig, PersonRecord};
use synfhir_guides::GuideKind;
use synfhir_model::BundleType;
use synfhir_person::movement;

#[derive(Parser)]
#[command(name = "synfhir")]
#[command(about = "Export synthetic person records as guide-conformant FHIR R4 bundles")]
struct Cli {
    /// Implementation guide to export under: us-core or de-kds
    #[arg(long)]
    guide: Option<String>,

    /// Bundle type to emit: collection or transaction
    #[arg(long)]
    bundle_type: Option<String>,

    /// Directory holding the lookup tables
    #[arg(long)]
    tables: Option<PathBuf>,

    /// JSON file with person records; the built-in samples when omitted
    #[arg(long)]
    input: Option<PathBuf>,

    /// Directory the exported bundles are written to
    #[arg(long)]
    out: Option<PathBuf>,
}

/// Main entry point for the bundle exporter
///
/// Loads the lookup tables, builds the configured implementation guide and
/// exports every person record to one FHIR R4 JSON file, named after the
/// person's internal id. Failed persons are logged and skipped; the run
/// fails at the end if any person failed.
///
/// # Environment Variables
/// - `SYNFHIR_GUIDE`: implementation guide (default: "us-core")
/// - `SYNFHIR_BUNDLE_TYPE`: bundle type (default: "collection")
/// - `SYNFHIR_TABLE_DIR`: lookup table directory (default: "data")
/// - `SYNFHIR_OUT_DIR`: output directory (default: "out")
///
/// CLI flags take precedence over the environment.
fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("synfhir=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let guide_name = cli
        .guide
        .unwrap_or_else(|| std::env::var("SYNFHIR_GUIDE").unwrap_or_else(|_| "us-core".into()));
    let bundle_type_name = cli.bundle_type.unwrap_or_else(|| {
        std::env::var("SYNFHIR_BUNDLE_TYPE").unwrap_or_else(|_| "collection".into())
    });
    let table_dir = cli.tables.unwrap_or_else(|| {
        PathBuf::from(std::env::var("SYNFHIR_TABLE_DIR").unwrap_or_else(|_| "data".into()))
    });
    let out_dir = cli.out.unwrap_or_else(|| {
        PathBuf::from(std::env::var("SYNFHIR_OUT_DIR").unwrap_or_else(|_| "out".into()))
    });

    let guide_kind: GuideKind = guide_name.parse()?;
    let bundle_type = match bundle_type_name.as_str() {
        "collection" => BundleType::Collection,
        "transaction" => BundleType::Transaction,
        other => {
            anyhow::bail!("unknown bundle type '{other}' (expected collection or transaction)")
        }
    };

    let config = ExportConfig::with_table_dir(guide_kind, bundle_type, &table_dir);
    let guide = config.build_guide()?;

    let mut records: Vec<PersonRecord> = match &cli.input {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => sample::sample_records(),
    };

    // Inpatient stays get their movement steps filled in before export.
    for record in &mut records {
        if movement::needs_movements(&record.timeline) {
            movement::add_inpatient_movements(&mut record.timeline);
        }
    }

    // Replayed records end when their latest encounter does.
    let stop_time = records
        .iter()
        .map(|record| record.timeline.stop_time())
        .max()
        .unwrap_or_default();

    tracing::info!("++ Exporting {} persons under {}", records.len(), guide_kind);
    fs::create_dir_all(&out_dir)?;

    let mut failed = 0usize;
    for (record, exported) in records
        .iter()
        .zip(export_batch(guide.as_ref(), bundle_type, &records, stop_time))
    {
        match exported {
            Ok(bundle) => {
                let path =
                    out_dir.join(format!("{}.json", record.profile.identifiers.internal_id));
                fs::write(&path, bundle.render()?)?;
                tracing::info!("[{}] wrote {}", record.profile.initials(), path.display());
            }
            // The batch already logged the person's error.
            Err(_) => failed += 1,
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} persons failed to export", records.len());
    }
    Ok(())
}
