use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use rusqlite::Connection;
use tracing::{error, info};

use crate::cli::UploadArgs;
use crate::model::DocumentResult;
use crate::util::{discover_files, file_name_string};

use super::store::{
    StationRow, VoterRow, configure_connection, count_rows, ensure_schema,
    find_station_by_file_name, insert_station, insert_voters,
};

/// What happened to one artifact during upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    AlreadyImported { station_id: i64 },
    Imported { station_id: i64, voters: usize },
}

pub fn run(args: UploadArgs) -> Result<()> {
    if !args.input_dir.is_dir() {
        bail!("directory not found: {}", args.input_dir.display());
    }

    let artifacts = discover_files(&args.input_dir, "json")?;
    info!(count = artifacts.len(), input_dir = %args.input_dir.display(), "found artifacts to upload");

    let mut connection = Connection::open(&args.db_path)
        .with_context(|| format!("failed to open {}", args.db_path.display()))?;
    configure_connection(&connection)?;
    ensure_schema(&connection)?;

    let mut imported = 0_usize;
    let mut already_present = 0_usize;
    let mut failed = 0_usize;

    for (index, path) in artifacts.iter().enumerate() {
        let file_name = file_name_string(path);
        info!(
            file = %file_name,
            position = index + 1,
            total = artifacts.len(),
            "processing artifact"
        );

        match import_artifact(&mut connection, path, &file_name, args.batch_size) {
            Ok(ImportOutcome::AlreadyImported { station_id }) => {
                info!(file = %file_name, station_id, "already imported; skipping");
                already_present += 1;
            }
            Ok(ImportOutcome::Imported { station_id, voters }) => {
                info!(file = %file_name, station_id, voters, "imported polling station");
                imported += 1;
            }
            Err(err) => {
                error!(file = %file_name, error = %format!("{err:#}"), "artifact import failed");
                failed += 1;
            }
        }
    }

    let stations_total = count_rows(&connection, "SELECT COUNT(*) FROM polling_stations")?;
    let voters_total = count_rows(&connection, "SELECT COUNT(*) FROM voters")?;
    info!(
        imported,
        already_present,
        failed,
        stations_total,
        voters_total,
        "upload completed"
    );

    Ok(())
}

pub fn import_artifact(
    connection: &mut Connection,
    path: &Path,
    file_name: &str,
    batch_size: usize,
) -> Result<ImportOutcome> {
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let document: DocumentResult = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    import_document(connection, file_name, &document, batch_size)
}

/// Station row and voters land in one transaction, so a failed import leaves
/// nothing behind and the next run retries the artifact.
pub fn import_document(
    connection: &mut Connection,
    file_name: &str,
    document: &DocumentResult,
    batch_size: usize,
) -> Result<ImportOutcome> {
    let mut tx = connection
        .transaction()
        .context("failed to begin import transaction")?;

    if let Some(station_id) = find_station_by_file_name(&tx, file_name)? {
        return Ok(ImportOutcome::AlreadyImported { station_id });
    }

    let station = StationRow::from_common_info(file_name, &document.common_info);
    let station_id = insert_station(&tx, &station)?;

    let voters = document
        .voters
        .iter()
        .map(VoterRow::from_record)
        .collect::<Vec<_>>();
    insert_voters(&mut tx, station_id, &voters, batch_size)?;

    tx.commit()
        .with_context(|| format!("failed to commit import of {file_name}"))?;

    Ok(ImportOutcome::Imported {
        station_id,
        voters: voters.len(),
    })
}
