//! ODA accounting: reported totals, scenario adjustments, ratios, targets.

use std::collections::BTreeMap;

use tracing::warn;

use crate::domain::{EntityId, Series};
use crate::error::AppError;
use crate::projection::SeriesTable;

pub mod adjust;
pub mod targets;

pub use adjust::*;
pub use targets::*;

/// Reported ODA of one entity in one year.
#[derive(Debug, Clone, PartialEq)]
pub struct OdaRecord {
    pub entity: EntityId,
    pub year: i32,
    /// Total ODA (official definition).
    pub oda: f64,
    /// Gross national income; absent for multilateral reporters.
    pub gni: Option<f64>,
    /// In-donor refugee costs.
    pub idrc: Option<f64>,
    /// ODA to Ukraine.
    pub ukraine: Option<f64>,
}

/// ODA/GNI ratio per entity and year.
///
/// Entities whose rows all lack a positive GNI still appear, with an empty
/// series, so that later stages can report them instead of dropping them.
pub fn oda_gni_ratios(records: &[OdaRecord]) -> Result<SeriesTable, AppError> {
    let mut series: BTreeMap<EntityId, Series> = BTreeMap::new();
    for r in records {
        let s = series.entry(r.entity).or_insert_with(|| Series::new(r.entity));
        match r.gni {
            Some(gni) if gni > 0.0 && gni.is_finite() => s.push_observed(r.year, r.oda / gni)?,
            _ => warn!(entity = %r.entity, year = r.year, "no usable GNI; ratio skipped"),
        }
    }
    Ok(series.into_values().collect())
}

/// GNI per entity and year, from the records that report it.
pub fn gni_table(records: &[OdaRecord]) -> Result<SeriesTable, AppError> {
    let mut series: BTreeMap<EntityId, Series> = BTreeMap::new();
    for r in records {
        if let Some(gni) = r.gni {
            series
                .entry(r.entity)
                .or_insert_with(|| Series::new(r.entity))
                .push_observed(r.year, gni)?;
        }
    }
    Ok(series.into_values().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(entity: u32, year: i32, oda: f64, gni: Option<f64>) -> OdaRecord {
        OdaRecord {
            entity: EntityId(entity),
            year,
            oda,
            gni,
            idrc: None,
            ukraine: None,
        }
    }

    #[test]
    fn ratio_is_oda_over_gni() {
        let table = oda_gni_ratios(&[record(1, 2023, 7.0, Some(1000.0))]).unwrap();
        assert!((table.get(EntityId(1)).unwrap().get(2023).unwrap() - 0.007).abs() < 1e-12);
    }

    #[test]
    fn entity_without_gni_keeps_an_empty_series() {
        let table = oda_gni_ratios(&[record(918, 2023, 7.0, None)]).unwrap();
        assert!(table.get(EntityId(918)).unwrap().is_empty());
    }

    #[test]
    fn duplicate_rows_fail() {
        let recs = [record(1, 2023, 7.0, Some(1.0)), record(1, 2023, 8.0, Some(1.0))];
        assert!(oda_gni_ratios(&recs).is_err());
        assert!(gni_table(&recs).is_err());
    }
}
