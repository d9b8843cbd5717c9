//! Export report tables to CSV.
//!
//! Tables go to a file when a path is given, otherwise to stdout so the output
//! can be piped into a chart tool or spreadsheet.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::AppError;
use crate::report::Table;

/// Write `table` to `path`, or to stdout when `path` is `None`.
pub fn write_table(table: &Table, path: Option<&Path>) -> Result<(), AppError> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .map_err(|e| AppError::input(format!("Failed to create export CSV '{}': {e}", path.display())))?;
            write_csv(table, file)
        }
        None => write_csv(table, std::io::stdout().lock()),
    }
}

/// Write `table` as CSV (header + rows) to any writer.
pub fn write_csv<W: Write>(table: &Table, out: W) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(out);
    writer
        .write_record(&table.headers)
        .map_err(|e| AppError::input(format!("Failed to write export CSV header: {e}")))?;
    for row in &table.rows {
        writer
            .write_record(row)
            .map_err(|e| AppError::input(format!("Failed to write export CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::input(format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_header_and_quoted_rows() {
        let table = Table {
            headers: vec!["year".to_string(), "name".to_string()],
            rows: vec![vec!["2023".to_string(), "Korea, Republic of".to_string()]],
        };
        let mut buf = Vec::new();
        write_csv(&table, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "year,name\n2023,\"Korea, Republic of\"\n");
    }

    #[test]
    fn writes_to_file() {
        let path = std::env::temp_dir().join(format!("oda_export_{}.csv", std::process::id()));
        let table = Table {
            headers: vec!["a".to_string()],
            rows: vec![vec!["1".to_string()]],
        };
        write_table(&table, Some(&path)).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\n1\n");
        std::fs::remove_file(path).ok();
    }
}
