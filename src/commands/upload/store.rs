use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use tracing::info;

use crate::model::{CommonInfo, VoterRecord};

/// Polling station row ready for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationRow {
    pub file_name: String,
    pub info: CommonInfo,
    pub number_of_electors: i64,
}

/// Voter row ready for insertion, with the age already coerced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoterRow {
    pub name: String,
    pub relative_name: Option<String>,
    pub relative_type: Option<String>,
    pub house_number: Option<String>,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub voter_id: Option<String>,
}

impl StationRow {
    pub fn from_common_info(file_name: &str, info: &CommonInfo) -> Self {
        Self {
            file_name: file_name.to_string(),
            number_of_electors: coerce_elector_count(info.number_of_electors.as_deref()),
            info: info.clone(),
        }
    }
}

impl VoterRow {
    pub fn from_record(record: &VoterRecord) -> Self {
        Self {
            name: record.name.clone(),
            relative_name: record.relative_name.clone(),
            relative_type: record.relative_type.map(|kind| kind.as_str().to_string()),
            house_number: record.house_number.clone(),
            age: coerce_age(record.age.as_deref()),
            gender: record.gender.map(|gender| gender.as_str().to_string()),
            voter_id: record.id.clone(),
        }
    }
}

/// Elector totals arrive as OCR text such as "1,234"; anything without digits
/// counts as zero.
pub fn coerce_elector_count(raw: Option<&str>) -> i64 {
    digits_only(raw.unwrap_or_default())
        .and_then(|digits| digits.parse::<i64>().ok())
        .unwrap_or(0)
}

/// Ages keep only their digits; an age with no digits is unknown.
pub fn coerce_age(raw: Option<&str>) -> Option<i64> {
    raw.and_then(digits_only)
        .and_then(|digits| digits.parse::<i64>().ok())
}

fn digits_only(raw: &str) -> Option<String> {
    let digits = raw
        .chars()
        .filter(char::is_ascii_digit)
        .collect::<String>();
    Some(digits).filter(|value| !value.is_empty())
}

pub fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    connection
        .pragma_update(None, "foreign_keys", "ON")
        .context("failed to enable foreign_keys")?;
    Ok(())
}

pub fn ensure_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            "
            CREATE TABLE IF NOT EXISTS polling_stations (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              file_name TEXT NOT NULL UNIQUE,
              assembly_constituency TEXT,
              part_no TEXT,
              main_town_or_village TEXT,
              post_office TEXT,
              police_station TEXT,
              block TEXT,
              subdivision TEXT,
              district TEXT,
              pin_code TEXT,
              polling_station_name TEXT,
              polling_station_type TEXT,
              polling_station_address TEXT,
              number_of_electors INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS voters (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              polling_station_id INTEGER NOT NULL,
              name TEXT NOT NULL,
              relative_name TEXT,
              relative_type TEXT,
              house_number TEXT,
              age INTEGER,
              gender TEXT,
              voter_id TEXT,
              FOREIGN KEY(polling_station_id) REFERENCES polling_stations(id)
            );

            CREATE INDEX IF NOT EXISTS idx_voters_station ON voters(polling_station_id);
            CREATE INDEX IF NOT EXISTS idx_voters_voter_id ON voters(voter_id);
            ",
        )
        .context("failed to initialize polling station schema")?;
    Ok(())
}

pub fn find_station_by_file_name(connection: &Connection, file_name: &str) -> Result<Option<i64>> {
    connection
        .query_row(
            "SELECT id FROM polling_stations WHERE file_name = ?1",
            params![file_name],
            |row| row.get(0),
        )
        .optional()
        .with_context(|| format!("failed to look up polling station for {file_name}"))
}

pub fn insert_station(connection: &Connection, station: &StationRow) -> Result<i64> {
    let info = &station.info;
    connection
        .execute(
            "
            INSERT INTO polling_stations(
              file_name, assembly_constituency, part_no, main_town_or_village, post_office,
              police_station, block, subdivision, district, pin_code, polling_station_name,
              polling_station_type, polling_station_address, number_of_electors
            )
            VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            ",
            params![
                &station.file_name,
                &info.assembly_constituency,
                &info.part_no,
                &info.main_town_or_village,
                &info.post_office,
                &info.police_station,
                &info.block,
                &info.subdivision,
                &info.district,
                &info.pin_code,
                &info.polling_station_name,
                &info.polling_station_type,
                &info.polling_station_address,
                station.number_of_electors,
            ],
        )
        .with_context(|| format!("failed to insert polling station for {}", station.file_name))?;

    Ok(connection.last_insert_rowid())
}

/// Inserts voters in savepoints of at most `batch_size` rows inside `tx` and
/// returns the number of batches written. Nothing is durable until the caller
/// commits `tx`.
pub fn insert_voters(
    tx: &mut Transaction<'_>,
    station_id: i64,
    voters: &[VoterRow],
    batch_size: usize,
) -> Result<usize> {
    let batch_size = batch_size.max(1);
    let batch_total = voters.len().div_ceil(batch_size);

    for (batch_index, batch) in voters.chunks(batch_size).enumerate() {
        let batch_tx = tx.savepoint()?;
        {
            let mut statement = batch_tx.prepare(
                "
                INSERT INTO voters(
                  polling_station_id, name, relative_name, relative_type, house_number,
                  age, gender, voter_id
                )
                VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ",
            )?;

            for voter in batch {
                statement.execute(params![
                    station_id,
                    &voter.name,
                    &voter.relative_name,
                    &voter.relative_type,
                    &voter.house_number,
                    voter.age,
                    &voter.gender,
                    &voter.voter_id,
                ])?;
            }
        }
        batch_tx.commit().with_context(|| {
            format!(
                "failed to release voter batch {}/{} for station {}",
                batch_index + 1,
                batch_total,
                station_id
            )
        })?;

        info!(
            station_id,
            batch = batch_index + 1,
            batches = batch_total,
            rows = batch.len(),
            "inserted voter batch"
        );
    }

    Ok(batch_total)
}

pub fn count_rows(connection: &Connection, sql: &str) -> Result<i64> {
    let count = connection.query_row(sql, [], |row| row.get(0))?;
    Ok(count)
}
