//! Shared domain types.
//!
//! Everything the pipeline passes between stages lives here: entity codes,
//! annual series (with the provenance of each value), projection requests,
//! target policies, and the typed adjustment toggles behind each scenario.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// DAC code of the EU institutions as a reporting entity.
pub const EU_INSTITUTIONS: EntityId = EntityId(918);

/// Code used for the aggregate "EU27 countries" rows in reports.
pub const EU27_AGGREGATE: EntityId = EntityId(91827);

/// Collective ODA/GNI target for older member states (0.7%).
pub const DEFAULT_TARGET: f64 = 0.007;

/// ODA/GNI target for member states that joined the EU after 2002 (0.33%).
pub const DEFAULT_LOWER_TARGET: f64 = 0.0033;

/// A donor or country identifier (usually a DAC code).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        // Upstream exports sometimes write integer codes as floats ("918.0").
        let trimmed = trimmed.strip_suffix(".0").unwrap_or(trimmed);
        trimmed
            .parse::<u32>()
            .map(EntityId)
            .map_err(|_| format!("Invalid entity code '{s}' (expected a non-negative integer)."))
    }
}

/// One observation of one entity in one year.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSeriesPoint {
    pub entity: EntityId,
    pub year: i32,
    pub value: f64,
}

/// Where a value in a series came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// Supplied by the upstream provider.
    Observed,
    /// Filled in between (or before) observed values.
    Interpolated,
    /// Derived beyond the last observed year.
    Projected,
}

impl ValueKind {
    pub fn label(self) -> &'static str {
        match self {
            ValueKind::Observed => "observed",
            ValueKind::Interpolated => "interpolated",
            ValueKind::Projected => "projected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesValue {
    pub value: f64,
    pub kind: ValueKind,
}

impl SeriesValue {
    pub fn observed(value: f64) -> Self {
        Self {
            value,
            kind: ValueKind::Observed,
        }
    }
}

/// Annual series of a single entity, ordered by year.
///
/// Years need not be contiguous. A year holds at most one value.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    entity: EntityId,
    points: BTreeMap<i32, SeriesValue>,
}

impl Series {
    pub fn new(entity: EntityId) -> Self {
        Self {
            entity,
            points: BTreeMap::new(),
        }
    }

    /// Build a series of observed values, failing on a repeated year.
    pub fn from_points(
        entity: EntityId,
        points: impl IntoIterator<Item = (i32, f64)>,
    ) -> Result<Self, AppError> {
        let mut series = Self::new(entity);
        for (year, value) in points {
            series.push_observed(year, value)?;
        }
        Ok(series)
    }

    pub fn push_observed(&mut self, year: i32, value: f64) -> Result<(), AppError> {
        if self.points.contains_key(&year) {
            return Err(AppError::input(format!(
                "Duplicate value for entity {} in year {year}.",
                self.entity
            )));
        }
        self.points.insert(year, SeriesValue::observed(value));
        Ok(())
    }

    /// Set a derived value. Returns the value it replaced, if any.
    pub(crate) fn set(&mut self, year: i32, value: f64, kind: ValueKind) -> Option<SeriesValue> {
        self.points.insert(year, SeriesValue { value, kind })
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_year(&self) -> Option<i32> {
        self.points.keys().next().copied()
    }

    pub fn last_year(&self) -> Option<i32> {
        self.points.keys().next_back().copied()
    }

    pub fn get(&self, year: i32) -> Option<f64> {
        self.points.get(&year).map(|v| v.value)
    }

    pub fn entry(&self, year: i32) -> Option<SeriesValue> {
        self.points.get(&year).copied()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (i32, SeriesValue)> + '_ {
        self.points.iter().map(|(year, v)| (*year, *v))
    }

    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.points.keys().copied()
    }

    /// Latest `(year, value)` at or before `year`.
    pub fn latest_at_or_before(&self, year: i32) -> Option<(i32, f64)> {
        self.points
            .range(..=year)
            .next_back()
            .map(|(y, v)| (*y, v.value))
    }

    /// Copy restricted to `[from, to]` (inclusive).
    pub fn slice(&self, from: i32, to: i32) -> Series {
        Series {
            entity: self.entity,
            points: if from > to {
                BTreeMap::new()
            } else {
                self.points
                    .range(from..=to)
                    .map(|(y, v)| (*y, *v))
                    .collect()
            },
        }
    }

    pub fn to_points(&self) -> Vec<TimeSeriesPoint> {
        self.points
            .iter()
            .map(|(year, v)| TimeSeriesPoint {
                entity: self.entity,
                year: *year,
                value: v.value,
            })
            .collect()
    }
}

/// Parameters of one forward projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectionRequest {
    pub last_observed_year: i32,
    pub target_year: i32,
    /// Trailing window (years) of the average growth step.
    pub rolling_window: usize,
}

impl ProjectionRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.rolling_window == 0 {
            return Err(AppError::input("Rolling window must be >= 1."));
        }
        if self.target_year < self.last_observed_year {
            return Err(AppError::input(format!(
                "Target year {} is before the last observed year {}.",
                self.target_year, self.last_observed_year
            )));
        }
        Ok(())
    }
}

/// Years that drive a ratio-to-target projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetRequest {
    /// First year of the output table.
    pub start_year: i32,
    /// Latest year with official data; decides which entities already meet target.
    pub last_observed_year: i32,
    /// Year from which entities below target are pinned to it.
    pub target_year: i32,
    /// Last year of the output table.
    pub projection_end_year: i32,
}

impl TargetRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.start_year > self.target_year {
            return Err(AppError::input(format!(
                "Start year {} is after the target year {}.",
                self.start_year, self.target_year
            )));
        }
        if self.projection_end_year < self.start_year {
            return Err(AppError::input(format!(
                "Projection end year {} is before the start year {}.",
                self.projection_end_year, self.start_year
            )));
        }
        Ok(())
    }
}

/// Ratio floor per entity: a default target plus per-entity overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetPolicy {
    default: f64,
    overrides: HashMap<EntityId, f64>,
}

impl TargetPolicy {
    pub fn new(default: f64) -> Result<Self, AppError> {
        check_target(default)?;
        Ok(Self {
            default,
            overrides: HashMap::new(),
        })
    }

    pub fn with_override(mut self, entity: EntityId, target: f64) -> Result<Self, AppError> {
        check_target(target)?;
        self.overrides.insert(entity, target);
        Ok(self)
    }

    pub fn target_for(&self, entity: EntityId) -> f64 {
        self.overrides.get(&entity).copied().unwrap_or(self.default)
    }

    pub fn default_target(&self) -> f64 {
        self.default
    }
}

fn check_target(target: f64) -> Result<(), AppError> {
    if !(target.is_finite() && target >= 0.0) {
        return Err(AppError::input(format!(
            "Invalid target ratio {target} (must be finite and >= 0)."
        )));
    }
    Ok(())
}

/// Which adjustment terms are subtracted from total ODA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdjustmentToggles {
    /// When false, in-donor refugee costs are subtracted (missing = 0).
    pub include_idrc: bool,
    /// When false, ODA to Ukraine is subtracted.
    pub include_ukraine: bool,
    /// With Ukraine excluded: carry the last known Ukraine value forward
    /// into later years instead of treating missing years as 0.
    pub carry_forward_ukraine: bool,
}

impl Default for AdjustmentToggles {
    fn default() -> Self {
        Self {
            include_idrc: true,
            include_ukraine: true,
            carry_forward_ukraine: false,
        }
    }
}

/// Named reporting variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    Official,
    ExcludingUkraine,
    ExcludingIdrc,
    ExcludingUkraineAndIdrc,
}

impl Scenario {
    pub const ALL: [Scenario; 4] = [
        Scenario::Official,
        Scenario::ExcludingUkraine,
        Scenario::ExcludingIdrc,
        Scenario::ExcludingUkraineAndIdrc,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Scenario::Official => "Using latest official data",
            Scenario::ExcludingUkraine => "Excluding Ukraine",
            Scenario::ExcludingIdrc => "Excluding IDRC",
            Scenario::ExcludingUkraineAndIdrc => "Excluding Ukraine and IDRC",
        }
    }

    pub fn toggles(self, carry_forward_ukraine: bool) -> AdjustmentToggles {
        let (include_idrc, include_ukraine) = match self {
            Scenario::Official => (true, true),
            Scenario::ExcludingUkraine => (true, false),
            Scenario::ExcludingIdrc => (false, true),
            Scenario::ExcludingUkraineAndIdrc => (false, false),
        };
        AdjustmentToggles {
            include_idrc,
            include_ukraine,
            carry_forward_ukraine,
        }
    }
}

/// Which kind of index a deflator is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    /// Nominal level (e.g. GDP in current prices): growth rates are chained.
    Nominal,
    /// Price index (e.g. GDP deflator): rebased directly.
    Price,
}

/// Price basis of reported amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Prices {
    #[default]
    Current,
    /// Deflated to the prices of `base_year`.
    Constant { base_year: i32 },
}

impl Prices {
    pub fn from_base_year(base_year: Option<i32>) -> Self {
        match base_year {
            Some(base_year) => Prices::Constant { base_year },
            None => Prices::Current,
        }
    }
}

/// An entity the pipeline could not produce values for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportingGap {
    pub entity: EntityId,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_rejects_duplicate_years() {
        let err = Series::from_points(EntityId(4), vec![(2020, 1.0), (2020, 2.0)]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().contains("2020"));
    }

    #[test]
    fn latest_at_or_before_skips_gaps() {
        let s = Series::from_points(EntityId(1), vec![(2018, 1.0), (2021, 4.0)]).unwrap();
        assert_eq!(s.latest_at_or_before(2020), Some((2018, 1.0)));
        assert_eq!(s.latest_at_or_before(2030), Some((2021, 4.0)));
        assert_eq!(s.latest_at_or_before(2017), None);
    }

    #[test]
    fn entity_id_parses_float_formatted_codes() {
        assert_eq!("918.0".parse::<EntityId>().unwrap(), EntityId(918));
        assert!("abc".parse::<EntityId>().is_err());
    }

    #[test]
    fn target_policy_prefers_overrides() {
        let policy = TargetPolicy::new(DEFAULT_TARGET)
            .unwrap()
            .with_override(EntityId(68), DEFAULT_LOWER_TARGET)
            .unwrap();
        assert_eq!(policy.target_for(EntityId(68)), DEFAULT_LOWER_TARGET);
        assert_eq!(policy.target_for(EntityId(4)), DEFAULT_TARGET);
        assert!(TargetPolicy::new(f64::NAN).is_err());
    }

    #[test]
    fn scenario_toggles_match_labels() {
        let t = Scenario::ExcludingUkraineAndIdrc.toggles(true);
        assert!(!t.include_idrc && !t.include_ukraine && t.carry_forward_ukraine);
        assert_eq!(Scenario::Official.toggles(false), AdjustmentToggles::default());
    }

    #[test]
    fn prices_from_optional_base_year() {
        assert_eq!(Prices::from_base_year(None), Prices::Current);
        assert_eq!(Prices::from_base_year(Some(2023)), Prices::Constant { base_year: 2023 });
    }

    #[test]
    fn request_validation() {
        let bad = ProjectionRequest {
            last_observed_year: 2023,
            target_year: 2030,
            rolling_window: 0,
        };
        assert!(bad.validate().is_err());
        let backwards = TargetRequest {
            start_year: 2031,
            last_observed_year: 2023,
            target_year: 2030,
            projection_end_year: 2034,
        };
        assert!(backwards.validate().is_err());
    }
}
