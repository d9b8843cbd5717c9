//! Chart-ready tables.
//!
//! Every subcommand ends in a `Table` (header + string rows) that `io::export`
//! writes as CSV. Long tables keep one row per `(entity, year)`; the wide
//! layout pivots entities into columns, one row per `(year, scenario)`.

use std::collections::{BTreeMap, BTreeSet};

use crate::app::pipeline::ScenarioProjection;
use crate::domain::{EU27_AGGREGATE, EntityId, TargetPolicy, ValueKind};
use crate::oda::{EuSpendingSplit, missing_to_target, target_oda};
use crate::projection::SeriesTable;

pub mod format;

pub use format::*;

const AGGREGATE_NAME: &str = "EU27 countries";

/// A flat table ready for CSV export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    fn with_headers(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }
}

/// Yearly aggregate across entities.
#[derive(Debug, Clone, PartialEq)]
pub struct TotalRow {
    pub year: i32,
    pub oda: f64,
    pub gni: f64,
    /// `None` when total GNI is not positive.
    pub ratio: Option<f64>,
    /// Shortfall against the sum of each entity's own target.
    pub missing_to_target: f64,
    /// Shortfall against the collective target applied to total GNI.
    pub missing_to_collective: f64,
}

/// `entity, name, year, <value_column>, kind` for every value in `table`.
pub fn series_table(table: &SeriesTable, names: &BTreeMap<EntityId, String>, value_column: &str) -> Table {
    let mut out = Table::with_headers(&["entity", "name", "year", value_column, "kind"]);
    for s in table.iter() {
        for (year, v) in s.iter() {
            out.rows.push(vec![
                s.entity().to_string(),
                name_of(names, s.entity()),
                year.to_string(),
                fmt_value(v.value),
                v.kind.label().to_string(),
            ]);
        }
    }
    out
}

/// Long ratio table: one row per scenario, entity and year.
pub fn long_ratio_table(scenarios: &[ScenarioProjection], names: &BTreeMap<EntityId, String>) -> Table {
    let mut out = Table::with_headers(&["indicator", "entity", "name", "year", "oda_gni_ratio", "kind"]);
    for sp in scenarios {
        for s in sp.ratios.table.iter() {
            for (year, v) in s.iter() {
                out.rows.push(vec![
                    sp.scenario.label().to_string(),
                    s.entity().to_string(),
                    name_of(names, s.entity()),
                    year.to_string(),
                    fmt_value(v.value),
                    v.kind.label().to_string(),
                ]);
            }
        }
    }
    out
}

/// Wide ratio table: `year, indicator, <entity...>`, sorted by year then scenario.
pub fn wide_ratio_table(scenarios: &[ScenarioProjection], names: &BTreeMap<EntityId, String>) -> Table {
    let entities: BTreeSet<EntityId> = scenarios
        .iter()
        .flat_map(|sp| sp.ratios.table.entities())
        .collect();
    let years: BTreeSet<i32> = scenarios
        .iter()
        .flat_map(|sp| sp.ratios.table.iter().flat_map(|s| s.years().collect::<Vec<_>>()))
        .collect();

    let mut out = Table::with_headers(&["year", "indicator"]);
    out.headers
        .extend(entities.iter().map(|e| column_name(names, *e)));

    let mut ordered: Vec<&ScenarioProjection> = scenarios.iter().collect();
    ordered.sort_by_key(|sp| sp.scenario);

    for year in years {
        for sp in &ordered {
            let mut row = vec![year.to_string(), sp.scenario.label().to_string()];
            for entity in &entities {
                let cell = sp
                    .ratios
                    .table
                    .get(*entity)
                    .and_then(|s| s.get(year))
                    .map(fmt_value)
                    .unwrap_or_default();
                row.push(cell);
            }
            out.rows.push(row);
        }
    }
    out
}

/// Amounts table: ratio, GNI, ODA and shortfalls per scenario, entity and year.
///
/// `missing_to_target` uses each entity's own target; `missing_to_collective`
/// uses the policy's default target for everyone. With `totals`, aggregate
/// rows are emitted before each scenario's entities.
pub fn spending_table(
    scenarios: &[ScenarioProjection],
    gni: &SeriesTable,
    policy: &TargetPolicy,
    names: &BTreeMap<EntityId, String>,
    totals: bool,
) -> Table {
    let mut out = Table::with_headers(&[
        "indicator",
        "entity",
        "name",
        "year",
        "oda_gni_ratio",
        "gni",
        "oda",
        "missing_to_target",
        "missing_to_collective",
        "kind",
    ]);
    let targets = target_oda(gni, policy);
    let collective = policy.default_target();

    for sp in scenarios {
        let Some(amounts) = &sp.amounts else { continue };
        let label = sp.scenario.label().to_string();

        if totals {
            for t in aggregate_totals(amounts, gni, &targets, collective) {
                out.rows.push(vec![
                    label.clone(),
                    EU27_AGGREGATE.to_string(),
                    AGGREGATE_NAME.to_string(),
                    t.year.to_string(),
                    t.ratio.map(fmt_value).unwrap_or_default(),
                    fmt_amount(t.gni),
                    fmt_amount(t.oda),
                    fmt_amount(t.missing_to_target),
                    fmt_amount(t.missing_to_collective),
                    String::new(),
                ]);
            }
        }

        for s in amounts.iter() {
            let entity = s.entity();
            for (year, oda) in s.iter() {
                let Some(g) = gni.get(entity).and_then(|g| g.get(year)) else {
                    continue;
                };
                let ratio = sp
                    .ratios
                    .table
                    .get(entity)
                    .and_then(|r| r.get(year))
                    .or_else(|| (g > 0.0).then(|| oda.value / g));
                let target = targets.get(entity).and_then(|t| t.get(year)).unwrap_or(0.0);
                out.rows.push(vec![
                    label.clone(),
                    entity.to_string(),
                    name_of(names, entity),
                    year.to_string(),
                    ratio.map(fmt_value).unwrap_or_default(),
                    fmt_amount(g),
                    fmt_amount(oda.value),
                    fmt_amount(missing_to_target(oda.value, target)),
                    fmt_amount(missing_to_target(oda.value, g * collective)),
                    oda.kind.label().to_string(),
                ]);
            }
        }
    }
    out
}

/// Sum ODA, GNI and target amounts per year across entities.
///
/// Only `(entity, year)` pairs with both an amount and a GNI value count, so
/// the ratio is always sum(ODA) / sum(GNI) over the same set.
pub fn aggregate_totals(
    amounts: &SeriesTable,
    gni: &SeriesTable,
    targets: &SeriesTable,
    collective_target: f64,
) -> Vec<TotalRow> {
    let mut by_year: BTreeMap<i32, (f64, f64, f64)> = BTreeMap::new();
    for s in amounts.iter() {
        let Some(g) = gni.get(s.entity()) else { continue };
        let t = targets.get(s.entity());
        for (year, oda) in s.iter() {
            let Some(gv) = g.get(year) else { continue };
            let tv = t.and_then(|t| t.get(year)).unwrap_or(0.0);
            let acc = by_year.entry(year).or_insert((0.0, 0.0, 0.0));
            acc.0 += oda.value;
            acc.1 += gv;
            acc.2 += tv;
        }
    }

    by_year
        .into_iter()
        .map(|(year, (oda, gni, target))| TotalRow {
            year,
            oda,
            gni,
            ratio: (gni > 0.0).then(|| oda / gni),
            missing_to_target: missing_to_target(oda, target),
            missing_to_collective: missing_to_target(oda, gni * collective_target),
        })
        .collect()
}

/// `year, member_states, imputable_eu_institutions, non_imputable_eu_institutions`.
pub fn eu_spending_table(split: &[EuSpendingSplit]) -> Table {
    let mut out = Table::with_headers(&[
        "year",
        "member_states",
        "imputable_eu_institutions",
        "non_imputable_eu_institutions",
    ]);
    for row in split {
        out.rows.push(vec![
            row.year.to_string(),
            fmt_amount(row.member_states),
            fmt_amount(row.imputable),
            fmt_amount(row.non_imputable),
        ]);
    }
    out
}

/// Count values by kind (for summaries).
pub fn kind_counts(table: &SeriesTable) -> [(ValueKind, usize); 3] {
    let mut counts = [
        (ValueKind::Observed, 0),
        (ValueKind::Interpolated, 0),
        (ValueKind::Projected, 0),
    ];
    for s in table.iter() {
        for (_, v) in s.iter() {
            if let Some(slot) = counts.iter_mut().find(|(k, _)| *k == v.kind) {
                slot.1 += 1;
            }
        }
    }
    counts
}

fn name_of(names: &BTreeMap<EntityId, String>, entity: EntityId) -> String {
    names.get(&entity).cloned().unwrap_or_default()
}

fn column_name(names: &BTreeMap<EntityId, String>, entity: EntityId) -> String {
    names.get(&entity).cloned().unwrap_or_else(|| entity.to_string())
}

fn fmt_value(v: f64) -> String {
    format!("{v:.6}")
}

fn fmt_amount(v: f64) -> String {
    format!("{v:.2}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Scenario, Series};
    use crate::projection::TargetOutcome;

    fn projection(scenario: Scenario, series: Vec<Series>, amounts: Option<Vec<Series>>) -> ScenarioProjection {
        ScenarioProjection {
            scenario,
            ratios: TargetOutcome {
                table: series.into_iter().collect(),
                gaps: Vec::new(),
            },
            amounts: amounts.map(|a| a.into_iter().collect()),
        }
    }

    fn series(entity: u32, points: &[(i32, f64)]) -> Series {
        Series::from_points(EntityId(entity), points.iter().copied()).unwrap()
    }

    #[test]
    fn series_table_has_one_row_per_value() {
        let table = SeriesTable::from_iter([series(4, &[(2022, 1.0), (2023, 2.0)])]);
        let names = BTreeMap::from([(EntityId(4), "France".to_string())]);
        let t = series_table(&table, &names, "deflator");
        assert_eq!(t.headers, vec!["entity", "name", "year", "deflator", "kind"]);
        assert_eq!(t.rows.len(), 2);
        assert_eq!(t.rows[1], vec!["4", "France", "2023", "2.000000", "observed"]);
    }

    #[test]
    fn wide_table_orders_by_year_then_scenario() {
        let scenarios = vec![
            projection(Scenario::ExcludingIdrc, vec![series(4, &[(2023, 0.2)])], None),
            projection(Scenario::Official, vec![series(4, &[(2023, 0.3)]), series(5, &[(2022, 0.5)])], None),
        ];
        let names = BTreeMap::from([(EntityId(4), "France".to_string())]);
        let t = wide_ratio_table(&scenarios, &names);
        assert_eq!(t.headers, vec!["year", "indicator", "France", "5"]);
        assert_eq!(t.rows.len(), 4);
        assert_eq!(t.rows[0][0], "2022");
        assert_eq!(t.rows[0][1], "Using latest official data");
        assert_eq!(t.rows[0][3], "0.500000");
        assert_eq!(t.rows[2], vec!["2023", "Using latest official data", "0.300000", ""]);
        assert_eq!(t.rows[3][1], "Excluding IDRC");
    }

    #[test]
    fn totals_are_sum_over_sum() {
        let amounts = SeriesTable::from_iter([series(1, &[(2023, 7.0)]), series(2, &[(2023, 1.0)])]);
        let gni = SeriesTable::from_iter([series(1, &[(2023, 1000.0)]), series(2, &[(2023, 1000.0)])]);
        // Entity 2 holds a lower individual target.
        let targets = SeriesTable::from_iter([series(1, &[(2023, 7.0)]), series(2, &[(2023, 3.3)])]);
        let totals = aggregate_totals(&amounts, &gni, &targets, 0.007);
        assert_eq!(totals.len(), 1);
        assert!((totals[0].ratio.unwrap() - 0.004).abs() < 1e-12);
        assert!((totals[0].missing_to_target - 2.3).abs() < 1e-12);
        assert!((totals[0].missing_to_collective - 6.0).abs() < 1e-12);
    }

    #[test]
    fn zero_total_gni_leaves_ratio_blank() {
        let scenarios = vec![projection(
            Scenario::Official,
            vec![series(1, &[(2023, 0.0)])],
            Some(vec![series(1, &[(2023, 0.0)])]),
        )];
        let gni = SeriesTable::from_iter([series(1, &[(2023, 0.0)])]);
        let policy = TargetPolicy::new(0.007).unwrap();
        let t = spending_table(&scenarios, &gni, &policy, &BTreeMap::new(), true);
        assert_eq!(t.rows[0][1], "91827");
        assert_eq!(t.rows[0][4], "");
        assert!(t.rows.iter().flatten().all(|cell| !cell.contains("NaN")));
    }

    #[test]
    fn spending_table_includes_aggregate_rows() {
        let scenarios = vec![projection(
            Scenario::Official,
            vec![series(1, &[(2023, 0.005)])],
            Some(vec![series(1, &[(2023, 5.0)])]),
        )];
        let gni = SeriesTable::from_iter([series(1, &[(2023, 1000.0)])]);
        let policy = TargetPolicy::new(0.007).unwrap();
        let t = spending_table(&scenarios, &gni, &policy, &BTreeMap::new(), true);
        assert_eq!(t.rows.len(), 2);
        assert_eq!(t.rows[0][1], "91827");
        assert_eq!(t.rows[1][7], "2.00");
        assert_eq!(t.rows[1][8], "2.00");
        assert_eq!(t.headers[8], "missing_to_collective");
    }

    #[test]
    fn eu_spending_rows_are_formatted_as_amounts() {
        let t = eu_spending_table(&[EuSpendingSplit {
            year: 2022,
            member_states: 45.0,
            imputable: 35.0,
            non_imputable: 65.5,
        }]);
        assert_eq!(t.headers[2], "imputable_eu_institutions");
        assert_eq!(t.rows, vec![vec!["2022", "45.00", "35.00", "65.50"]]);
    }

    #[test]
    fn kind_counts_tally_provenance() {
        let mut s = series(1, &[(2023, 1.0)]);
        s.set(2024, 2.0, ValueKind::Projected);
        let counts = kind_counts(&SeriesTable::from_iter([s]));
        assert_eq!(counts[0].1, 1);
        assert_eq!(counts[2].1, 1);
    }
}
