//! Per-entity grouping of annual series.
//!
//! Flat `(entity, year, value)` rows are grouped once into a `SeriesTable`.
//! Every projection is then a pure function of one `Series`, mapped over the
//! table with no shared state between entities.

use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::domain::{EntityId, Series, TimeSeriesPoint};
use crate::error::AppError;

/// Series keyed by entity, iterated in entity order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesTable {
    series: BTreeMap<EntityId, Series>,
}

impl SeriesTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group flat rows by entity. A repeated `(entity, year)` pair is an error.
    pub fn from_points(points: impl IntoIterator<Item = TimeSeriesPoint>) -> Result<Self, AppError> {
        let mut series: BTreeMap<EntityId, Series> = BTreeMap::new();
        for p in points {
            series
                .entry(p.entity)
                .or_insert_with(|| Series::new(p.entity))
                .push_observed(p.year, p.value)?;
        }
        Ok(Self { series })
    }

    /// Add (or replace) the series of its entity.
    pub fn insert(&mut self, series: Series) -> Option<Series> {
        self.series.insert(series.entity(), series)
    }

    pub fn get(&self, entity: EntityId) -> Option<&Series> {
        self.series.get(&entity)
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.series.contains_key(&entity)
    }

    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.series.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Series> {
        self.series.values()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Smallest first year and largest last year across all entities.
    pub fn year_span(&self) -> Option<(i32, i32)> {
        let first = self.series.values().filter_map(Series::first_year).min()?;
        let last = self.series.values().filter_map(Series::last_year).max()?;
        Some((first, last))
    }

    pub fn to_points(&self) -> Vec<TimeSeriesPoint> {
        self.series.values().flat_map(Series::to_points).collect()
    }

    /// Apply `f` to every entity independently, in parallel.
    ///
    /// Results come back in entity order regardless of scheduling.
    pub fn map_entities<T, F>(&self, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(&Series) -> T + Sync + Send,
    {
        self.series.par_iter().map(|(_, s)| f(s)).collect()
    }

    /// Like `map_entities`, but each call yields a new series; the first error
    /// aborts the whole table.
    pub fn try_map_series<F>(&self, f: F) -> Result<SeriesTable, AppError>
    where
        F: Fn(&Series) -> Result<Series, AppError> + Sync + Send,
    {
        let mapped: Vec<Series> = self
            .series
            .par_iter()
            .map(|(_, s)| f(s))
            .collect::<Result<Vec<_>, AppError>>()?;
        Ok(mapped.into_iter().collect())
    }
}

impl FromIterator<Series> for SeriesTable {
    fn from_iter<I: IntoIterator<Item = Series>>(iter: I) -> Self {
        let mut table = SeriesTable::new();
        for s in iter {
            table.insert(s);
        }
        table
    }
}

impl IntoIterator for SeriesTable {
    type Item = Series;
    type IntoIter = std::collections::btree_map::IntoValues<EntityId, Series>;

    fn into_iter(self) -> Self::IntoIter {
        self.series.into_values()
    }
}
