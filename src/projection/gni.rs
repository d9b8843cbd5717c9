//! GNI projection from a snapshot year with extended deflators.
//!
//! For each entity, interior gaps in the deflator series are filled, the
//! series is extended to the last projection year with `extend_series`, then
//!
//! ```text
//! gni(y) = gni(snapshot) * deflator(y) / deflator(snapshot)     for y > snapshot
//! ```
//!
//! Historical GNI up to the snapshot year is kept as observed. A deflator that
//! does not cover `snapshot..=last year` makes that entity a gap; other
//! entities are still projected.

use tracing::{info, warn};

use crate::domain::{ProjectionRequest, ReportingGap, Series, ValueKind};
use crate::error::AppError;
use crate::projection::deflator::deflator_at;
use crate::projection::extend::{extend_series, fill_interior_gaps};
use crate::projection::table::SeriesTable;

#[derive(Debug, Clone, Default)]
pub struct GniProjection {
    pub table: SeriesTable,
    pub gaps: Vec<ReportingGap>,
}

enum EntityResult {
    Projected(Series),
    Gap(ReportingGap),
}

/// Project GNI for every entity of `gni` to `request.target_year`.
///
/// `request.last_observed_year` is the snapshot year whose GNI is grown.
/// Entities without a snapshot value or without deflators are reported as gaps.
pub fn project_gni(
    gni: &SeriesTable,
    deflators: &SeriesTable,
    request: &ProjectionRequest,
) -> Result<GniProjection, AppError> {
    request.validate()?;
    let snapshot_year = request.last_observed_year;

    let results = gni.map_entities(|s| project_entity(s, deflators, request));

    let mut out = GniProjection::default();
    for result in results {
        match result? {
            EntityResult::Projected(series) => {
                out.table.insert(series);
            }
            EntityResult::Gap(gap) => {
                warn!(entity = %gap.entity, reason = %gap.reason, "GNI not projected");
                out.gaps.push(gap);
            }
        }
    }
    info!(
        entities = out.table.len(),
        gaps = out.gaps.len(),
        snapshot_year,
        last_year = request.target_year,
        "projected GNI"
    );
    Ok(out)
}

fn project_entity(
    gni: &Series,
    deflators: &SeriesTable,
    request: &ProjectionRequest,
) -> Result<EntityResult, AppError> {
    let entity = gni.entity();
    let snapshot_year = request.last_observed_year;

    let Some(base) = gni.get(snapshot_year) else {
        return Ok(EntityResult::Gap(ReportingGap {
            entity,
            reason: format!("no GNI in snapshot year {snapshot_year}"),
        }));
    };
    let Some(deflator) = deflators.get(entity).filter(|d| !d.is_empty()) else {
        return Ok(EntityResult::Gap(ReportingGap {
            entity,
            reason: "no deflator series".to_string(),
        }));
    };

    let filled = fill_interior_gaps(deflator);
    if let Some(first) = filled.first_year().filter(|first| *first > snapshot_year) {
        return Ok(EntityResult::Gap(ReportingGap {
            entity,
            reason: format!("deflator starts in {first}, after snapshot year {snapshot_year}"),
        }));
    }

    let extended = SeriesTable::from_iter([extend_series(&filled, request.target_year, request.rolling_window)?]);
    let factors = match (snapshot_year..=request.target_year)
        .map(|year| deflator_at(&extended, entity, year).map(|d| (year, d)))
        .collect::<Result<Vec<_>, AppError>>()
    {
        Ok(factors) => factors,
        Err(e) => {
            return Ok(EntityResult::Gap(ReportingGap {
                entity,
                reason: e.message().to_string(),
            }));
        }
    };

    let d_snapshot = factors[0].1;
    let mut out = gni.slice(i32::MIN, snapshot_year);
    for &(year, d) in &factors[1..] {
        out.set(year, base * d / d_snapshot, ValueKind::Projected);
    }
    Ok(EntityResult::Projected(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EntityId;

    fn series(entity: u32, points: &[(i32, f64)]) -> Series {
        Series::from_points(EntityId(entity), points.iter().copied()).unwrap()
    }

    #[test]
    fn grows_snapshot_with_extended_deflator() {
        let gni = SeriesTable::from_iter([series(1, &[(2022, 900.0), (2023, 1000.0)])]);
        let deflators = SeriesTable::from_iter([series(1, &[(2021, 0.96), (2022, 0.98), (2023, 1.0)])]);
        let req = ProjectionRequest {
            last_observed_year: 2023,
            target_year: 2025,
            rolling_window: 2,
        };
        let out = project_gni(&gni, &deflators, &req).unwrap();
        let s = out.table.get(EntityId(1)).unwrap();
        assert_eq!(s.get(2022), Some(900.0));
        assert!((s.get(2024).unwrap() - 1020.0).abs() < 1e-9);
        assert!((s.get(2025).unwrap() - 1040.0).abs() < 1e-9);
        assert_eq!(s.entry(2025).unwrap().kind, ValueKind::Projected);
        assert!(out.gaps.is_empty());
    }

    #[test]
    fn missing_inputs_become_gaps() {
        let gni = SeriesTable::from_iter([series(1, &[(2023, 10.0)]), series(2, &[(2020, 5.0)])]);
        let deflators = SeriesTable::from_iter([series(2, &[(2023, 1.0)])]);
        let req = ProjectionRequest {
            last_observed_year: 2023,
            target_year: 2030,
            rolling_window: 3,
        };
        let out = project_gni(&gni, &deflators, &req).unwrap();
        assert!(out.table.is_empty());
        let ids: Vec<EntityId> = out.gaps.iter().map(|g| g.entity).collect();
        assert_eq!(ids, vec![EntityId(1), EntityId(2)]);
    }

    #[test]
    fn bad_deflator_is_a_gap_and_others_still_project() {
        let gni = SeriesTable::from_iter([
            series(1, &[(2023, 1000.0)]),
            series(2, &[(2023, 500.0)]),
            series(3, &[(2023, 1000.0)]),
        ]);
        let deflators = SeriesTable::from_iter([
            series(1, &[(2022, 0.9), (2023, 1.0)]),
            // Starts after the snapshot year.
            series(2, &[(2025, 1.0), (2026, 1.1)]),
            // Already reaches the last year but has interior gaps.
            series(3, &[(2023, 1.0), (2026, 1.3)]),
        ]);
        let req = ProjectionRequest {
            last_observed_year: 2023,
            target_year: 2026,
            rolling_window: 1,
        };
        let out = project_gni(&gni, &deflators, &req).unwrap();

        assert!((out.table.get(EntityId(1)).unwrap().get(2026).unwrap() - 1300.0).abs() < 1e-9);
        let filled = out.table.get(EntityId(3)).unwrap();
        assert!((filled.get(2024).unwrap() - 1100.0).abs() < 1e-9);
        assert!((filled.get(2026).unwrap() - 1300.0).abs() < 1e-9);

        assert!(out.table.get(EntityId(2)).is_none());
        assert_eq!(out.gaps.len(), 1);
        assert_eq!(out.gaps[0].entity, EntityId(2));
        assert!(out.gaps[0].reason.contains("2025"));
    }

    #[test]
    fn zero_deflator_in_snapshot_year_is_a_gap() {
        let gni = SeriesTable::from_iter([series(1, &[(2023, 1000.0)])]);
        let deflators = SeriesTable::from_iter([series(1, &[(2022, 1.0), (2023, 0.0)])]);
        let req = ProjectionRequest {
            last_observed_year: 2023,
            target_year: 2024,
            rolling_window: 1,
        };
        let out = project_gni(&gni, &deflators, &req).unwrap();
        assert!(out.table.is_empty());
        assert_eq!(out.gaps.len(), 1);
    }
}
