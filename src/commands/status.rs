use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::commands::upload::count_rows;
use crate::model::ExtractRunManifest;
use crate::util::discover_files;

pub fn run(args: StatusArgs) -> Result<()> {
    info!(output_dir = %args.output_dir.display(), "status requested");

    if args.output_dir.is_dir() {
        let artifacts = discover_files(&args.output_dir, "json")?;
        info!(
            path = %args.output_dir.display(),
            artifacts = artifacts.len(),
            "extraction artifacts"
        );

        match latest_run_manifest(&args.output_dir.join("manifests"))? {
            Some(path) => {
                let raw =
                    fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
                let manifest: ExtractRunManifest = serde_json::from_slice(&raw)
                    .with_context(|| format!("failed to parse {}", path.display()))?;

                info!(
                    run_id = %manifest.run_id,
                    status = %manifest.status,
                    started_at = %manifest.started_at,
                    updated_at = %manifest.updated_at,
                    pdf_count = manifest.counts.pdf_count,
                    extracted = manifest.counts.extracted_count,
                    skipped = manifest.counts.skipped_count,
                    failed = manifest.counts.failed_count,
                    voters = manifest.counts.voters_total,
                    pages_skipped = manifest.counts.pages_skipped,
                    warnings = manifest.warnings.len(),
                    "loaded latest extraction run manifest"
                );
                for outcome in manifest.documents.iter().filter(|doc| doc.status == "failed") {
                    warn!(
                        document = %outcome.filename,
                        error = %outcome.error.as_deref().unwrap_or_default(),
                        "document failed in last run"
                    );
                }
            }
            None => warn!("no extraction run manifest found"),
        }
    } else {
        warn!(path = %args.output_dir.display(), "output directory missing");
    }

    if args.db_path.exists() {
        let conn = Connection::open(&args.db_path)
            .with_context(|| format!("failed to open {}", args.db_path.display()))?;
        let stations = count_rows(&conn, "SELECT COUNT(*) FROM polling_stations").unwrap_or(0);
        let voters = count_rows(&conn, "SELECT COUNT(*) FROM voters").unwrap_or(0);

        info!(
            path = %args.db_path.display(),
            stations,
            voters,
            "database status"
        );
    } else {
        warn!(path = %args.db_path.display(), "database file missing");
    }

    Ok(())
}

/// Run manifests carry a compact UTC stamp, so the lexically last is newest.
fn latest_run_manifest(manifest_dir: &Path) -> Result<Option<PathBuf>> {
    if !manifest_dir.is_dir() {
        return Ok(None);
    }

    let latest = discover_files(manifest_dir, "json")?
        .into_iter()
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with("extract_run_"))
        })
        .next_back();

    Ok(latest)
}
