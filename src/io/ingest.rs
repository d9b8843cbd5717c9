//! CSV ingest and normalization.
//!
//! This module turns provider exports into typed rows:
//!
//! - **series** files: `entity, year, value` (+ optional `name`)
//! - **ODA** files: `entity, year, oda, gni` (+ optional `idrc`, `ukraine`, `name`)
//!
//! Column names are matched case-insensitively and several provider aliases
//! are accepted (`donor_code`, `total_oda_official_definition`, ...). A missing
//! required column fails the run; a row that does not parse is skipped and
//! reported.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::path::Path;

use chrono::{Datelike, NaiveDate};
use csv::StringRecord;

use crate::domain::{EntityId, TimeSeriesPoint};
use crate::error::AppError;
use crate::oda::OdaRecord;
use crate::projection::SeriesTable;

const ENTITY_COLUMNS: [&str; 5] = ["entity", "entity_id", "donor_code", "dac_code", "code"];
const YEAR_COLUMNS: [&str; 1] = ["year"];
const VALUE_COLUMNS: [&str; 1] = ["value"];
const ODA_COLUMNS: [&str; 2] = ["oda", "total_oda_official_definition"];
const GNI_COLUMNS: [&str; 1] = ["gni"];
const IDRC_COLUMNS: [&str; 2] = ["idrc", "idrc_ge_linked"];
const UKRAINE_COLUMNS: [&str; 2] = ["ukraine", "recipient_total_flow_net"];
const NAME_COLUMNS: [&str; 4] = ["name", "name_short", "donor_name", "entity_name"];

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output for a series file.
#[derive(Debug, Clone)]
pub struct IngestedSeries {
    pub table: SeriesTable,
    pub names: BTreeMap<EntityId, String>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
}

/// Ingest output for an ODA file.
#[derive(Debug, Clone)]
pub struct IngestedOda {
    pub records: Vec<OdaRecord>,
    pub names: BTreeMap<EntityId, String>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
}

/// Load an `entity, year, value` CSV into a per-entity table.
pub fn load_series(path: &Path) -> Result<IngestedSeries, AppError> {
    let (headers, mut reader) = open_csv(path)?;
    let header_map = build_header_map(&headers);

    let entity_idx = require_column(&header_map, &ENTITY_COLUMNS, path)?;
    let year_idx = require_column(&header_map, &YEAR_COLUMNS, path)?;
    let value_idx = require_column(&header_map, &VALUE_COLUMNS, path)?;
    let name_idx = find_column(&header_map, &NAME_COLUMNS);

    let mut points = Vec::new();
    let mut names = BTreeMap::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: header is line 1 and lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        let parsed = (|| -> Result<TimeSeriesPoint, String> {
            Ok(TimeSeriesPoint {
                entity: parse_entity(get_required(&record, entity_idx, "entity")?)?,
                year: parse_year(get_required(&record, year_idx, "year")?)?,
                value: parse_f64(get_required(&record, value_idx, "value")?)?,
            })
        })();

        match parsed {
            Ok(point) => {
                if let Some(name) = name_idx.and_then(|i| get_optional(&record, i)) {
                    names.entry(point.entity).or_insert_with(|| name.to_string());
                }
                points.push(point);
            }
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    let rows_used = points.len();
    if rows_used == 0 {
        return Err(AppError::no_data(format!(
            "No valid rows in '{}'.",
            path.display()
        )));
    }

    let table = SeriesTable::from_points(points)?;

    Ok(IngestedSeries {
        table,
        names,
        row_errors,
        rows_read,
        rows_used,
    })
}

/// Load an ODA/GNI CSV.
pub fn load_oda(path: &Path) -> Result<IngestedOda, AppError> {
    let (headers, mut reader) = open_csv(path)?;
    let header_map = build_header_map(&headers);

    let entity_idx = require_column(&header_map, &ENTITY_COLUMNS, path)?;
    let year_idx = require_column(&header_map, &YEAR_COLUMNS, path)?;
    let oda_idx = require_column(&header_map, &ODA_COLUMNS, path)?;
    let gni_idx = require_column(&header_map, &GNI_COLUMNS, path)?;
    let idrc_idx = find_column(&header_map, &IDRC_COLUMNS);
    let ukraine_idx = find_column(&header_map, &UKRAINE_COLUMNS);
    let name_idx = find_column(&header_map, &NAME_COLUMNS);

    let mut records = Vec::new();
    let mut names = BTreeMap::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        let parsed = (|| -> Result<OdaRecord, String> {
            Ok(OdaRecord {
                entity: parse_entity(get_required(&record, entity_idx, "entity")?)?,
                year: parse_year(get_required(&record, year_idx, "year")?)?,
                oda: parse_f64(get_required(&record, oda_idx, "oda")?)?,
                gni: parse_opt_f64(get_optional(&record, gni_idx))?,
                idrc: parse_opt_f64(idrc_idx.and_then(|i| get_optional(&record, i)))?,
                ukraine: parse_opt_f64(ukraine_idx.and_then(|i| get_optional(&record, i)))?,
            })
        })();

        match parsed {
            Ok(rec) => {
                if let Some(name) = name_idx.and_then(|i| get_optional(&record, i)) {
                    names.entry(rec.entity).or_insert_with(|| name.to_string());
                }
                records.push(rec);
            }
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    let rows_used = records.len();
    if rows_used == 0 {
        return Err(AppError::no_data(format!(
            "No valid rows in '{}'.",
            path.display()
        )));
    }

    Ok(IngestedOda {
        records,
        names,
        row_errors,
        rows_read,
        rows_used,
    })
}

/// Load per-entity target overrides from a JSON object `{ "<code>": ratio }`.
pub fn load_target_overrides(path: &Path) -> Result<Vec<(EntityId, f64)>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open targets JSON '{}': {e}", path.display())))?;
    let raw: HashMap<String, f64> = serde_json::from_reader(file)
        .map_err(|e| AppError::input(format!("Invalid targets JSON '{}': {e}", path.display())))?;

    let mut out = Vec::with_capacity(raw.len());
    for (code, target) in raw {
        let entity = code.parse::<EntityId>().map_err(AppError::input)?;
        out.push((entity, target));
    }
    out.sort_by_key(|(entity, _)| *entity);
    Ok(out)
}

fn open_csv(path: &Path) -> Result<(StringRecord, csv::Reader<File>), AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open CSV '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::input(format!("Failed to read CSV headers: {e}")))?
        .clone();

    Ok((headers, reader))
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports may prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn find_column(header_map: &HashMap<String, usize>, aliases: &[&str]) -> Option<usize> {
    aliases.iter().find_map(|a| header_map.get(*a).copied())
}

fn require_column(header_map: &HashMap<String, usize>, aliases: &[&str], path: &Path) -> Result<usize, AppError> {
    find_column(header_map, aliases).ok_or_else(|| {
        AppError::input(format!(
            "Missing required column in '{}': one of `{}`",
            path.display(),
            aliases.join("`, `")
        ))
    })
}

fn get_required<'a>(record: &'a StringRecord, idx: usize, name: &str) -> Result<&'a str, String> {
    get_optional(record, idx).ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn get_optional(record: &StringRecord, idx: usize) -> Option<&str> {
    record.get(idx).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_entity(s: &str) -> Result<EntityId, String> {
    s.parse::<EntityId>()
}

/// Accept a plain year (`2023`) or a date (`2023-01-01`, `01/01/2023`, ...).
fn parse_year(s: &str) -> Result<i32, String> {
    if let Ok(year) = s.parse::<i32>() {
        return Ok(year);
    }
    const FMTS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];
    // Timestamps ("2023-01-01 00:00:00") carry the date in the first token.
    let date_part = s.split_whitespace().next().unwrap_or(s);
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(date_part, fmt) {
            return Ok(d.year());
        }
    }
    Err(format!("Invalid year '{s}'. Expected YYYY or a date such as YYYY-MM-DD."))
}

fn parse_f64(s: &str) -> Result<f64, String> {
    let v = s
        .parse::<f64>()
        .map_err(|_| format!("Invalid number '{s}'."))?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(format!("Non-finite number '{s}'."))
    }
}

fn parse_opt_f64(s: Option<&str>) -> Result<Option<f64>, String> {
    match s {
        // Provider exports write missing values as "NA"/"nan".
        Some(v) if v.eq_ignore_ascii_case("na") || v.eq_ignore_ascii_case("nan") => Ok(None),
        Some(v) => parse_f64(v).map(Some),
        None => Ok(None),
    }
}
