//! Deflator construction and price normalization.
//!
//! Two sources of deflators are supported:
//!
//! - a **nominal** index (e.g. GDP in current prices): year-over-year growth
//!   rates are chained with a cumulative product and rebased;
//! - a **price** index (e.g. a GDP deflator): rebased directly.
//!
//! A rebased deflator reads `1.0` in its base year. Dividing a value series by
//! it expresses the values in base-year prices.

use crate::domain::{EntityId, IndexKind, Series, ValueKind};
use crate::error::AppError;
use crate::projection::table::SeriesTable;

/// Percentage change between consecutive years. The first year is dropped.
pub fn growth_rates(series: &Series) -> Result<Series, AppError> {
    let mut out = Series::new(series.entity());
    let points: Vec<(i32, f64)> = series.iter().map(|(y, v)| (y, v.value)).collect();
    for pair in points.windows(2) {
        let (_, prev) = pair[0];
        let (year, curr) = pair[1];
        if prev == 0.0 || !prev.is_finite() {
            return Err(AppError::compute(format!(
                "Cannot compute growth for entity {} in {year}: previous value is {prev}.",
                series.entity()
            )));
        }
        out.set(year, curr / prev - 1.0, ValueKind::Observed);
    }
    Ok(out)
}

/// Chain growth rates into an index: `Π (1 + g)`.
pub fn deflator_from_growth(rates: &Series) -> Series {
    let mut out = Series::new(rates.entity());
    let mut level = 1.0;
    for (year, g) in rates.iter() {
        level *= 1.0 + g.value;
        out.set(year, level, g.kind);
    }
    out
}

/// Divide every value by the value in `base_year`.
pub fn rebase(series: &Series, base_year: i32) -> Result<Series, AppError> {
    let base = series.get(base_year).ok_or_else(|| {
        AppError::compute(format!(
            "Cannot rebase entity {}: no value in base year {base_year}.",
            series.entity()
        ))
    })?;
    if base == 0.0 || !base.is_finite() {
        return Err(AppError::compute(format!(
            "Cannot rebase entity {}: base year {base_year} value is {base}.",
            series.entity()
        )));
    }
    let mut out = Series::new(series.entity());
    for (year, v) in series.iter() {
        out.set(year, v.value / base, v.kind);
    }
    Ok(out)
}

/// Deflators from a nominal index: growth, cumulative product, rebase.
pub fn current_deflators(index: &SeriesTable, base_year: i32) -> Result<SeriesTable, AppError> {
    index.try_map_series(|s| rebase(&deflator_from_growth(&growth_rates(s)?), base_year))
}

/// Deflators from a price index, rebased to `base_year`.
pub fn constant_deflators(index: &SeriesTable, base_year: i32) -> Result<SeriesTable, AppError> {
    index.try_map_series(|s| rebase(s, base_year))
}

pub fn build_deflators(index: &SeriesTable, kind: IndexKind, base_year: i32) -> Result<SeriesTable, AppError> {
    match kind {
        IndexKind::Nominal => current_deflators(index, base_year),
        IndexKind::Price => constant_deflators(index, base_year),
    }
}

/// Express `values` in constant prices by dividing by the matching deflator.
///
/// Every `(entity, year)` in `values` must have a deflator.
pub fn to_constant(values: &SeriesTable, deflators: &SeriesTable) -> Result<SeriesTable, AppError> {
    values.try_map_series(|s| {
        let mut out = Series::new(s.entity());
        for (year, v) in s.iter() {
            let d = deflator_at(deflators, s.entity(), year)?;
            out.set(year, v.value / d, v.kind);
        }
        Ok(out)
    })
}

pub(crate) fn deflator_at(deflators: &SeriesTable, entity: EntityId, year: i32) -> Result<f64, AppError> {
    let d = deflators
        .get(entity)
        .and_then(|s| s.get(year))
        .ok_or_else(|| AppError::compute(format!("Missing deflator for entity {entity} in {year}.")))?;
    if d == 0.0 || !d.is_finite() {
        return Err(AppError::compute(format!(
            "Invalid deflator {d} for entity {entity} in {year}."
        )));
    }
    Ok(d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TimeSeriesPoint;

    fn series(entity: u32, points: &[(i32, f64)]) -> Series {
        Series::from_points(EntityId(entity), points.iter().copied()).unwrap()
    }

    #[test]
    fn growth_then_cumulative_product_recovers_relative_levels() {
        let nominal = series(1, &[(2020, 200.0), (2021, 220.0), (2022, 242.0)]);
        let rates = growth_rates(&nominal).unwrap();
        assert_eq!(rates.first_year(), Some(2021));
        assert!((rates.get(2021).unwrap() - 0.1).abs() < 1e-12);

        let index = deflator_from_growth(&rates);
        assert!((index.get(2022).unwrap() - 1.21).abs() < 1e-12);

        let rebased = rebase(&index, 2022).unwrap();
        assert!((rebased.get(2022).unwrap() - 1.0).abs() < 1e-12);
        assert!((rebased.get(2021).unwrap() - 1.0 / 1.1).abs() < 1e-12);
    }

    #[test]
    fn rebase_requires_base_year() {
        let s = series(1, &[(2020, 1.0)]);
        assert_eq!(rebase(&s, 2023).unwrap_err().exit_code(), 4);
    }

    #[test]
    fn price_index_is_rebased_per_entity() {
        let table = SeriesTable::from_points(vec![
            TimeSeriesPoint { entity: EntityId(1), year: 2022, value: 90.0 },
            TimeSeriesPoint { entity: EntityId(1), year: 2023, value: 100.0 },
            TimeSeriesPoint { entity: EntityId(2), year: 2023, value: 50.0 },
        ])
        .unwrap();
        let d = build_deflators(&table, IndexKind::Price, 2023).unwrap();
        assert!((d.get(EntityId(1)).unwrap().get(2022).unwrap() - 0.9).abs() < 1e-12);
        assert!((d.get(EntityId(2)).unwrap().get(2023).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn to_constant_divides_by_deflator() {
        let values = SeriesTable::from_iter([series(1, &[(2022, 90.0), (2023, 100.0)])]);
        let deflators = SeriesTable::from_iter([series(1, &[(2022, 0.9), (2023, 1.0)])]);
        let constant = to_constant(&values, &deflators).unwrap();
        assert!((constant.get(EntityId(1)).unwrap().get(2022).unwrap() - 100.0).abs() < 1e-9);

        let missing = SeriesTable::from_iter([series(1, &[(2023, 1.0)])]);
        assert!(to_constant(&values, &missing).is_err());
    }
}
