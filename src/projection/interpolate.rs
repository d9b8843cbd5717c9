//! Ratio projection towards a target from a target year onwards.
//!
//! The target acts as a floor: an entity whose latest ratio already meets it
//! keeps that ratio, an entity below it is pinned to exactly the target from
//! the target year. Years between the last observation and the pinned years
//! are filled on a straight line.

use tracing::{debug, warn};

use crate::domain::{ReportingGap, Series, TargetPolicy, TargetRequest, ValueKind};
use crate::error::AppError;
use crate::projection::table::SeriesTable;

/// Projected ratios plus the entities that had nothing to project from.
#[derive(Debug, Clone, Default)]
pub struct TargetOutcome {
    pub table: SeriesTable,
    pub gaps: Vec<ReportingGap>,
}

/// Value at `year` on the straight line through two anchors.
pub(crate) fn lerp((y0, v0): (i32, f64), (y1, v1): (i32, f64), year: i32) -> f64 {
    if y1 == y0 {
        return v0;
    }
    let t = f64::from(year - y0) / f64::from(y1 - y0);
    v0 + t * (v1 - v0)
}

/// Project one entity's ratio series onto `start_year..=projection_end_year`.
///
/// Returns `None` when the series has no observation at or before
/// `last_observed_year` to anchor on. If the last observed year is already at
/// or past the target year the series is returned unchanged.
pub fn interpolate_to_target(series: &Series, request: &TargetRequest, target: f64) -> Option<Series> {
    if series.is_empty() {
        return None;
    }
    if request.last_observed_year >= request.target_year {
        return Some(series.clone());
    }

    let (current_year, current) = series.latest_at_or_before(request.last_observed_year)?;
    let pinned = if current >= target { current } else { target };
    debug!(
        entity = %series.entity(),
        current_year,
        current,
        target,
        pinned,
        "ratio anchor"
    );

    let mut anchored = series.clone();
    for year in request.target_year..=request.projection_end_year {
        if anchored.entry(year).is_none() {
            anchored.set(year, pinned, ValueKind::Projected);
        }
    }

    let anchors: Vec<(i32, f64)> = anchored.iter().map(|(y, v)| (y, v.value)).collect();
    let (first, last) = (anchors[0], anchors[anchors.len() - 1]);

    let mut out = anchored.clone();
    let mut next = 0usize;
    for year in request.start_year..=request.projection_end_year {
        while next < anchors.len() && anchors[next].0 < year {
            next += 1;
        }
        if anchored.entry(year).is_some() {
            continue;
        }
        let kind = if year > request.last_observed_year {
            ValueKind::Projected
        } else {
            ValueKind::Interpolated
        };
        let value = if year < first.0 {
            first.1
        } else if year > last.0 {
            last.1
        } else {
            lerp(anchors[next - 1], anchors[next], year)
        };
        out.set(year, value, kind);
    }

    Some(out.slice(request.start_year, request.projection_end_year))
}

/// Project every entity of `table`, collecting entities without anchors as gaps.
pub fn project_ratios(
    table: &SeriesTable,
    request: &TargetRequest,
    policy: &TargetPolicy,
) -> Result<TargetOutcome, AppError> {
    request.validate()?;

    let results = table.map_entities(|s| {
        (
            s.entity(),
            interpolate_to_target(s, request, policy.target_for(s.entity())),
        )
    });

    let mut outcome = TargetOutcome::default();
    for (entity, result) in results {
        match result {
            Some(series) => {
                outcome.table.insert(series);
            }
            None => {
                warn!(%entity, "no observed ratio to project from; entity left out");
                outcome.gaps.push(ReportingGap {
                    entity,
                    reason: format!("no observed ODA/GNI ratio up to {}", request.last_observed_year),
                });
            }
        }
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EntityId;

    fn request() -> TargetRequest {
        TargetRequest {
            start_year: 2018,
            last_observed_year: 2023,
            target_year: 2030,
            projection_end_year: 2034,
        }
    }

    fn series(entity: u32, points: &[(i32, f64)]) -> Series {
        Series::from_points(EntityId(entity), points.iter().copied()).unwrap()
    }

    #[test]
    fn below_target_is_interpolated_towards_the_pin() {
        let req = TargetRequest {
            start_year: 2023,
            ..request()
        };
        let out = interpolate_to_target(&series(1, &[(2023, 0.20)]), &req, 0.70).unwrap();
        let v = out.get(2026).unwrap();
        assert!((v - (0.20 + 3.0 / 7.0 * 0.50)).abs() < 1e-12);
        assert!((v - 0.4143).abs() < 1e-4);
        assert!((out.get(2030).unwrap() - 0.70).abs() < 1e-12);
        assert!((out.get(2034).unwrap() - 0.70).abs() < 1e-12);
        assert_eq!(out.entry(2026).unwrap().kind, ValueKind::Projected);
    }

    #[test]
    fn at_or_above_target_keeps_its_ratio() {
        let s = series(2, &[(2018, 0.9), (2020, 1.1), (2023, 1.0)]);
        let out = interpolate_to_target(&s, &request(), 0.7).unwrap();
        for (year, v) in s.iter() {
            assert_eq!(out.get(year), Some(v.value));
        }
        assert!((out.get(2030).unwrap() - 1.0).abs() < 1e-12);
        assert!((out.get(2026).unwrap() - 1.0).abs() < 1e-12);
        assert!((out.get(2019).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn output_has_one_row_per_year() {
        let s = series(3, &[(2020, 0.3), (2023, 0.4)]);
        let out = interpolate_to_target(&s, &request(), 0.7).unwrap();
        let years: Vec<i32> = out.years().collect();
        assert_eq!(years, (2018..=2034).collect::<Vec<_>>());
        // Leading years take the first anchor.
        assert!((out.get(2018).unwrap() - 0.3).abs() < 1e-12);
        assert_eq!(out.entry(2018).unwrap().kind, ValueKind::Interpolated);
    }

    #[test]
    fn boundary_returns_input_unchanged() {
        let req = TargetRequest {
            last_observed_year: 2030,
            ..request()
        };
        let s = series(4, &[(2022, 0.1), (2030, 0.2)]);
        assert_eq!(interpolate_to_target(&s, &req, 0.7).unwrap(), s);
    }

    #[test]
    fn entity_without_observations_is_reported() {
        let mut table = SeriesTable::new();
        table.insert(series(1, &[(2023, 0.5)]));
        table.insert(Series::new(EntityId(9)));
        let policy = TargetPolicy::new(0.7).unwrap();
        let outcome = project_ratios(&table, &request(), &policy).unwrap();
        assert_eq!(outcome.table.len(), 1);
        assert_eq!(outcome.gaps.len(), 1);
        assert_eq!(outcome.gaps[0].entity, EntityId(9));
    }

    #[test]
    fn per_entity_targets_come_from_policy() {
        let mut table = SeriesTable::new();
        table.insert(series(1, &[(2023, 0.2)]));
        table.insert(series(68, &[(2023, 0.2)]));
        let policy = TargetPolicy::new(0.7)
            .unwrap()
            .with_override(EntityId(68), 0.33)
            .unwrap();
        let outcome = project_ratios(&table, &request(), &policy).unwrap();
        assert!((outcome.table.get(EntityId(1)).unwrap().get(2031).unwrap() - 0.7).abs() < 1e-12);
        assert!((outcome.table.get(EntityId(68)).unwrap().get(2031).unwrap() - 0.33).abs() < 1e-12);
    }

    #[test]
    fn only_later_observations_is_a_gap() {
        let s = series(5, &[(2025, 0.9)]);
        assert_eq!(interpolate_to_target(&s, &request(), 0.7), None);

        let table = SeriesTable::from_iter([s]);
        let policy = TargetPolicy::new(0.7).unwrap();
        let outcome = project_ratios(&table, &request(), &policy).unwrap();
        assert!(outcome.table.is_empty());
        assert_eq!(outcome.gaps[0].entity, EntityId(5));
        assert!(outcome.gaps[0].reason.contains("2023"));
    }
}
