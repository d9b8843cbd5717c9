//! Adjustments to reported ODA totals.
//!
//! Each toggle in `AdjustmentToggles` maps to one subtraction from the total:
//!
//! | toggle                           | effect on `oda`                                  |
//! |----------------------------------|--------------------------------------------------|
//! | `include_idrc = false`           | minus in-donor refugee costs (missing = 0)       |
//! | `include_ukraine = false`        | minus ODA to Ukraine (missing = 0)               |
//! | `+ carry_forward_ukraine = true` | missing Ukraine years reuse the last known value |

use std::collections::BTreeMap;

use tracing::debug;

use crate::domain::{AdjustmentToggles, EntityId, TimeSeriesPoint};
use crate::oda::OdaRecord;

/// Apply the configured subtractions to every record.
///
/// Records are returned sorted by `(entity, year)`.
pub fn apply_adjustments(records: &[OdaRecord], toggles: AdjustmentToggles) -> Vec<OdaRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by_key(|r| (r.entity, r.year));

    let mut last_ukraine: Option<(EntityId, f64)> = None;
    for r in sorted.iter_mut() {
        if !toggles.include_idrc {
            r.oda -= r.idrc.unwrap_or(0.0);
        }
        if !toggles.include_ukraine {
            let ukraine = match r.ukraine {
                Some(v) => {
                    last_ukraine = Some((r.entity, v));
                    v
                }
                None if toggles.carry_forward_ukraine => match last_ukraine {
                    Some((entity, v)) if entity == r.entity => v,
                    _ => 0.0,
                },
                None => 0.0,
            };
            r.oda -= ukraine;
        }
    }
    sorted
}

/// Remove member-state contributions from the EU institutions' own total.
///
/// `contributions` holds what each member state paid to the institutions in a
/// year; their yearly sum is subtracted from `institution`'s ODA so that
/// spending is not counted twice. Years without contribution data are left as
/// reported.
pub fn net_of_member_contributions(
    records: &[OdaRecord],
    institution: EntityId,
    contributions: &[TimeSeriesPoint],
) -> Vec<OdaRecord> {
    let mut by_year: BTreeMap<i32, f64> = BTreeMap::new();
    for c in contributions {
        *by_year.entry(c.year).or_insert(0.0) += c.value;
    }

    records
        .iter()
        .map(|r| {
            let mut r = r.clone();
            if r.entity == institution {
                match by_year.get(&r.year) {
                    Some(total) => r.oda -= total,
                    None => debug!(year = r.year, "no member contributions reported"),
                }
            }
            r
        })
        .collect()
}

/// One year of EU spending split by who finances it.
#[derive(Debug, Clone, PartialEq)]
pub struct EuSpendingSplit {
    pub year: i32,
    /// Member states' ODA net of what they channel through the institutions.
    pub member_states: f64,
    /// Institutions' ODA financed by member-state contributions.
    pub imputable: f64,
    /// Institutions' ODA from own resources.
    pub non_imputable: f64,
}

/// Split the institutions' ODA into imputable and non-imputable parts, per
/// year the institutions report.
///
/// Every other entity in `records` counts as a member state. A year without
/// contribution data imputes nothing.
pub fn eu_spending_split(
    records: &[OdaRecord],
    institution: EntityId,
    contributions: &[TimeSeriesPoint],
) -> Vec<EuSpendingSplit> {
    let mut imputed: BTreeMap<i32, f64> = BTreeMap::new();
    for c in contributions {
        *imputed.entry(c.year).or_insert(0.0) += c.value;
    }

    let mut institutions: BTreeMap<i32, f64> = BTreeMap::new();
    let mut members: BTreeMap<i32, f64> = BTreeMap::new();
    for r in records {
        let bucket = if r.entity == institution {
            &mut institutions
        } else {
            &mut members
        };
        *bucket.entry(r.year).or_insert(0.0) += r.oda;
    }

    institutions
        .into_iter()
        .map(|(year, total)| {
            let imputable = imputed.get(&year).copied().unwrap_or(0.0);
            EuSpendingSplit {
                year,
                member_states: members.get(&year).copied().unwrap_or(0.0) - imputable,
                imputable,
                non_imputable: total - imputable,
            }
        })
        .collect()
}
