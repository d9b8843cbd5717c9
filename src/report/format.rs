//! Terminal summaries printed to stderr alongside the CSV output.
//!
//! Kept separate from the table builders so stdout stays pure CSV.

use crate::app::pipeline::{DeflatorRun, EuSpendingRun, ExtendRun, GniRun, TargetRun};
use crate::domain::{EntityId, ReportingGap, TargetConfig};
use crate::io::ingest::RowError;
use crate::projection::SeriesTable;
use crate::report::kind_counts;

/// Maximum number of row errors listed individually.
const MAX_ROW_ERRORS: usize = 10;

pub fn format_extend_summary(run: &ExtendRun, last_year: i32) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== oda extend (to {last_year}) ===\n"));
    push_ingest(&mut out, run.ingest.rows_read, run.ingest.rows_used, &run.ingest.row_errors);
    push_table(&mut out, &run.extended);
    out
}

pub fn format_deflator_summary(run: &DeflatorRun, base_year: i32) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== oda deflators (base {base_year} = 1.0) ===\n"));
    push_ingest(&mut out, run.ingest.rows_read, run.ingest.rows_used, &run.ingest.row_errors);
    push_table(&mut out, &run.deflators);
    out
}

pub fn format_gni_summary(run: &GniRun) -> String {
    let mut out = String::new();
    out.push_str("=== oda gni ===\n");
    push_ingest(&mut out, run.oda.rows_read, run.oda.rows_used, &run.oda.row_errors);
    push_table(&mut out, &run.projection.table);
    push_gaps(&mut out, &run.projection.gaps);
    out
}

pub fn format_target_summary(run: &TargetRun, config: &TargetConfig) -> String {
    let mut out = String::new();
    let req = &config.request;
    out.push_str(&format!(
        "=== oda targets ({}..={} observed, target {} by {}, through {}) ===\n",
        req.start_year,
        req.last_observed_year,
        config.policy.default_target(),
        req.target_year,
        req.projection_end_year,
    ));
    push_ingest(&mut out, run.oda.rows_read, run.oda.rows_used, &run.oda.row_errors);
    if !config.exclude.is_empty() {
        let excluded: Vec<String> = config.exclude.iter().map(EntityId::to_string).collect();
        out.push_str(&format!("Excluded: {}\n", excluded.join(", ")));
    }

    for sp in &run.scenarios {
        out.push_str(&format!("\n{}:\n", sp.scenario.label()));
        push_table(&mut out, &sp.ratios.table);
        push_gaps(&mut out, &sp.ratios.gaps);
    }
    out
}

pub fn format_eu_spending_summary(run: &EuSpendingRun) -> String {
    let mut out = String::new();
    out.push_str("=== oda eu-spending ===\n");
    push_ingest(&mut out, run.oda.rows_read, run.oda.rows_used, &run.oda.row_errors);
    if let (Some(first), Some(last)) = (run.split.first(), run.split.last()) {
        out.push_str(&format!("Years: {}..={}\n", first.year, last.year));
    }
    out
}

fn push_ingest(out: &mut String, rows_read: usize, rows_used: usize, errors: &[RowError]) {
    out.push_str(&format!("Rows: read={rows_read} used={rows_used}\n"));
    if errors.is_empty() {
        return;
    }
    out.push_str(&format!("Row errors: {}\n", errors.len()));
    for e in errors.iter().take(MAX_ROW_ERRORS) {
        out.push_str(&format!("  line {}: {}\n", e.line, e.message));
    }
    if errors.len() > MAX_ROW_ERRORS {
        out.push_str(&format!("  ... {} more\n", errors.len() - MAX_ROW_ERRORS));
    }
}

fn push_table(out: &mut String, table: &SeriesTable) {
    let span = match table.year_span() {
        Some((first, last)) => format!("{first}..={last}"),
        None => "-".to_string(),
    };
    let counts = kind_counts(table)
        .iter()
        .map(|(kind, n)| format!("{}={n}", kind.label()))
        .collect::<Vec<_>>()
        .join(" ");
    out.push_str(&format!("Entities: {} | years {span} | {counts}\n", table.len()));
}

fn push_gaps(out: &mut String, gaps: &[ReportingGap]) {
    for g in gaps {
        out.push_str(&format!("  gap: {} ({})\n", g.entity, g.reason));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Series;

    #[test]
    fn ingest_errors_are_capped() {
        let errors: Vec<RowError> = (0..12)
            .map(|i| RowError {
                line: i + 2,
                message: "bad year".to_string(),
            })
            .collect();
        let mut out = String::new();
        push_ingest(&mut out, 20, 8, &errors);
        assert!(out.contains("Rows: read=20 used=8"));
        assert!(out.contains("Row errors: 12"));
        assert!(out.contains("line 11: bad year"));
        assert!(!out.contains("line 12:"));
        assert!(out.contains("... 2 more"));
    }

    #[test]
    fn table_line_reports_span_and_kinds() {
        let table = SeriesTable::from_iter([Series::from_points(EntityId(3), [(2020, 1.0), (2022, 2.0)]).unwrap()]);
        let mut out = String::new();
        push_table(&mut out, &table);
        assert_eq!(out, "Entities: 1 | years 2020..=2022 | observed=2 interpolated=0 projected=0\n");
    }

    #[test]
    fn gaps_are_listed() {
        let mut out = String::new();
        push_gaps(
            &mut out,
            &[ReportingGap {
                entity: EntityId(7),
                reason: "no observed ratio".to_string(),
            }],
        );
        assert_eq!(out, "  gap: 7 (no observed ratio)\n");
    }
}
