//! Targets expressed as amounts: what the ratio implies given GNI.

use crate::domain::{Series, TargetPolicy, ValueKind};
use crate::projection::SeriesTable;

/// ODA amount needed to reach each entity's target in each GNI year.
pub fn target_oda(gni: &SeriesTable, policy: &TargetPolicy) -> SeriesTable {
    gni.iter()
        .map(|s| {
            let target = policy.target_for(s.entity());
            let mut out = Series::new(s.entity());
            for (year, v) in s.iter() {
                out.set(year, v.value * target, v.kind);
            }
            out
        })
        .collect()
}

/// Shortfall against a target amount, never negative.
pub fn missing_to_target(oda: f64, target_amount: f64) -> f64 {
    (target_amount - oda).max(0.0)
}

/// ODA amounts implied by ratios: `ratio * gni` where both exist.
///
/// The resulting kind is the more derived of the two inputs.
pub fn oda_amounts(ratios: &SeriesTable, gni: &SeriesTable) -> SeriesTable {
    ratios
        .iter()
        .filter_map(|r| {
            let g = gni.get(r.entity())?;
            let mut out = Series::new(r.entity());
            for (year, ratio) in r.iter() {
                if let Some(gv) = g.entry(year) {
                    out.set(year, ratio.value * gv.value, more_derived(ratio.kind, gv.kind));
                }
            }
            Some(out)
        })
        .collect()
}

fn more_derived(a: ValueKind, b: ValueKind) -> ValueKind {
    fn rank(k: ValueKind) -> u8 {
        match k {
            ValueKind::Observed => 0,
            ValueKind::Interpolated => 1,
            ValueKind::Projected => 2,
        }
    }
    if rank(a) >= rank(b) { a } else { b }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EntityId;

    #[test]
    fn amounts_follow_ratio_and_gni() {
        let mut ratio = Series::from_points(EntityId(1), [(2023, 0.5)]).unwrap();
        ratio.set(2024, 0.6, ValueKind::Projected);
        let gni = Series::from_points(EntityId(1), [(2023, 100.0), (2024, 200.0)]).unwrap();

        let amounts = oda_amounts(&SeriesTable::from_iter([ratio]), &SeriesTable::from_iter([gni]));
        let s = amounts.get(EntityId(1)).unwrap();
        assert!((s.get(2024).unwrap() - 120.0).abs() < 1e-9);
        assert_eq!(s.entry(2024).unwrap().kind, ValueKind::Projected);
        assert_eq!(s.entry(2023).unwrap().kind, ValueKind::Observed);
    }

    #[test]
    fn target_amounts_use_policy() {
        let gni = SeriesTable::from_iter([Series::from_points(EntityId(68), [(2023, 1000.0)]).unwrap()]);
        let policy = TargetPolicy::new(0.007)
            .unwrap()
            .with_override(EntityId(68), 0.0033)
            .unwrap();
        let t = target_oda(&gni, &policy);
        assert!((t.get(EntityId(68)).unwrap().get(2023).unwrap() - 3.3).abs() < 1e-9);
    }

    #[test]
    fn missing_is_clipped_at_zero() {
        assert_eq!(missing_to_target(10.0, 7.0), 0.0);
        assert_eq!(missing_to_target(5.0, 7.0), 2.0);
    }
}
