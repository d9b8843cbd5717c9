//! Shared pipeline logic behind every subcommand.
//!
//! Each `run_*` function loads its inputs through a `DataSource`, runs the
//! projection steps, and returns the computed outputs. Printing and writing
//! are left to `app`.

use tracing::info;

use crate::data::DataSource;
use crate::domain::{
    DeflatorConfig, EU_INSTITUTIONS, EuSpendingConfig, ExtendConfig, GniConfig, Prices, ProjectionRequest,
    Scenario, Series, TargetConfig, ValueKind,
};
use crate::error::AppError;
use crate::io::ingest::{IngestedOda, IngestedSeries, load_oda, load_series};
use crate::oda::{
    EuSpendingSplit, OdaRecord, apply_adjustments, eu_spending_split, gni_table, net_of_member_contributions,
    oda_amounts, oda_gni_ratios,
};
use crate::projection::{
    GniProjection, SeriesTable, TargetOutcome, build_deflators, extend_table, project_gni, project_ratios, rebase,
    to_constant,
};

/// Outputs of `oda extend`.
#[derive(Debug, Clone)]
pub struct ExtendRun {
    pub ingest: IngestedSeries,
    pub extended: SeriesTable,
}

/// Outputs of `oda deflators`.
#[derive(Debug, Clone)]
pub struct DeflatorRun {
    pub ingest: IngestedSeries,
    pub deflators: SeriesTable,
}

/// Outputs of `oda gni`.
#[derive(Debug, Clone)]
pub struct GniRun {
    pub oda: IngestedOda,
    pub projection: GniProjection,
}

/// Outputs of `oda eu-spending`.
#[derive(Debug, Clone)]
pub struct EuSpendingRun {
    pub oda: IngestedOda,
    pub split: Vec<EuSpendingSplit>,
}

/// Ratio projection of one scenario.
#[derive(Debug, Clone)]
pub struct ScenarioProjection {
    pub scenario: Scenario,
    pub ratios: TargetOutcome,
    /// `ratio * gni`, when GNI projections were supplied.
    pub amounts: Option<SeriesTable>,
}

/// Outputs of `oda targets`.
#[derive(Debug, Clone)]
pub struct TargetRun {
    pub oda: IngestedOda,
    pub scenarios: Vec<ScenarioProjection>,
    /// Historical GNI merged with projections (when supplied).
    pub gni: Option<SeriesTable>,
}

pub fn run_extend(config: &ExtendConfig, source: &DataSource) -> Result<ExtendRun, AppError> {
    let ingest = load_series(&source.resolve(&config.input)?)?;
    let extended = extend_table(&ingest.table, config.last_year, config.rolling_window)?;
    info!(
        entities = extended.len(),
        last_year = config.last_year,
        window = config.rolling_window,
        "extended series"
    );
    Ok(ExtendRun { ingest, extended })
}

pub fn run_deflators(config: &DeflatorConfig, source: &DataSource) -> Result<DeflatorRun, AppError> {
    let ingest = load_series(&source.resolve(&config.input)?)?;
    let mut deflators = build_deflators(&ingest.table, config.index, config.base_year)?;
    if let Some(last_year) = config.last_year {
        deflators = extend_table(&deflators, last_year, config.rolling_window)?;
    }
    info!(
        entities = deflators.len(),
        base_year = config.base_year,
        index = ?config.index,
        "built deflators"
    );
    Ok(DeflatorRun { ingest, deflators })
}

pub fn run_gni(config: &GniConfig, source: &DataSource) -> Result<GniRun, AppError> {
    let oda = load_oda(&source.resolve(&config.oda)?)?;
    let deflators = load_series(&source.resolve(&config.deflators)?)?;

    let request = ProjectionRequest {
        last_observed_year: config.snapshot_year,
        target_year: config.last_year,
        rolling_window: config.rolling_window,
    };
    let gni = gni_table(&oda.records)?;
    let mut projection = project_gni(&gni, &deflators.table, &request)?;

    if let Prices::Constant { base_year } = config.prices {
        let extended = extend_table(&deflators.table, config.last_year, config.rolling_window)?;
        let rebased = extended.try_map_series(|s| rebase(s, base_year))?;
        projection.table = to_constant(&projection.table, &rebased)?;
        info!(base_year, "GNI expressed in constant prices");
    }
    Ok(GniRun { oda, projection })
}

pub fn run_targets(config: &TargetConfig, source: &DataSource) -> Result<TargetRun, AppError> {
    config.request.validate()?;
    let oda = load_oda(&source.resolve(&config.oda)?)?;

    let netted;
    let reported = match &config.member_contributions {
        Some(location) => {
            let contributions = load_series(&source.resolve(location)?)?;
            netted = net_of_member_contributions(&oda.records, EU_INSTITUTIONS, &contributions.table.to_points());
            &netted
        }
        None => &oda.records,
    };
    let records = historical_records(reported, config);
    if records.is_empty() {
        return Err(AppError::no_data(format!(
            "No ODA rows between {} and {} after exclusions.",
            config.request.start_year, config.request.last_observed_year
        )));
    }

    let gni = match &config.gni_projections {
        Some(location) => {
            let projected = load_series(&source.resolve(location)?)?;
            Some(merge_gni(&gni_table(&records)?, &projected.table))
        }
        None => None,
    };

    let mut scenarios = Vec::with_capacity(config.scenarios.len());
    for &scenario in &config.scenarios {
        let adjusted = apply_adjustments(&records, scenario.toggles(config.carry_forward_ukraine));
        let ratios = project_ratios(&oda_gni_ratios(&adjusted)?, &config.request, &config.policy)?;
        let amounts = gni.as_ref().map(|g| oda_amounts(&ratios.table, g));
        info!(
            scenario = scenario.label(),
            entities = ratios.table.len(),
            gaps = ratios.gaps.len(),
            "projected ratios"
        );
        scenarios.push(ScenarioProjection {
            scenario,
            ratios,
            amounts,
        });
    }

    Ok(TargetRun { oda, scenarios, gni })
}

pub fn run_eu_spending(config: &EuSpendingConfig, source: &DataSource) -> Result<EuSpendingRun, AppError> {
    let oda = load_oda(&source.resolve(&config.oda)?)?;
    let contributions = load_series(&source.resolve(&config.member_contributions)?)?;

    let split = eu_spending_split(&oda.records, EU_INSTITUTIONS, &contributions.table.to_points());
    if split.is_empty() {
        return Err(AppError::no_data(format!(
            "No ODA rows for the EU institutions ({EU_INSTITUTIONS})."
        )));
    }
    info!(years = split.len(), "split EU institutions spending");
    Ok(EuSpendingRun { oda, split })
}

/// Rows inside `[start_year, last_observed_year]`, minus excluded entities.
fn historical_records(records: &[OdaRecord], config: &TargetConfig) -> Vec<OdaRecord> {
    let req = &config.request;
    records
        .iter()
        .filter(|r| r.year >= req.start_year && r.year <= req.last_observed_year)
        .filter(|r| !config.exclude.contains(&r.entity))
        .cloned()
        .collect()
}

/// Observed GNI wins; projections fill the years after it.
fn merge_gni(observed: &SeriesTable, projected: &SeriesTable) -> SeriesTable {
    let mut merged = observed.clone();
    for p in projected.iter() {
        let mut series = merged
            .get(p.entity())
            .cloned()
            .unwrap_or_else(|| Series::new(p.entity()));
        let last_observed = series.last_year().unwrap_or(i32::MIN);
        for (year, v) in p.iter() {
            if year > last_observed {
                series.set(year, v.value, ValueKind::Projected);
            }
        }
        merged.insert(series);
    }
    merged
}
