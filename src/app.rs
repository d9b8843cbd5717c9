//! Top-level application orchestration.
//!
//! `src/main.rs` stays tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - turns args into run configs
//! - runs the pipeline
//! - prints a summary to stderr and writes the CSV

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, DeflatorArgs, EuSpendingArgs, ExtendArgs, GniArgs, TargetArgs};
use crate::data::DataSource;
use crate::domain::{
    DeflatorConfig, EuSpendingConfig, ExtendConfig, GniConfig, Prices, Scenario, TargetConfig, TargetPolicy,
    TargetRequest,
};
use crate::error::AppError;
use crate::io::export::write_table;
use crate::io::ingest::load_target_overrides;
use crate::report;

pub mod pipeline;

/// Entry point for the `oda` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let source = DataSource::from_env(cli.refresh)?;

    match cli.command {
        Command::Extend(args) => handle_extend(&args, &source),
        Command::Deflators(args) => handle_deflators(&args, &source),
        Command::Gni(args) => handle_gni(&args, &source),
        Command::Targets(args) => handle_targets(&args, &source),
        Command::EuSpending(args) => handle_eu_spending(&args, &source),
    }
}

/// Log to stderr; `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A subscriber may already be installed (tests, embedding).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_extend(args: &ExtendArgs, source: &DataSource) -> Result<(), AppError> {
    let config = extend_config_from_args(args);
    let run = pipeline::run_extend(&config, source)?;
    eprint!("{}", report::format_extend_summary(&run, config.last_year));
    let table = report::series_table(&run.extended, &run.ingest.names, "value");
    write_table(&table, config.output.as_deref())
}

fn handle_deflators(args: &DeflatorArgs, source: &DataSource) -> Result<(), AppError> {
    let config = deflator_config_from_args(args);
    let run = pipeline::run_deflators(&config, source)?;
    eprint!("{}", report::format_deflator_summary(&run, config.base_year));
    let table = report::series_table(&run.deflators, &run.ingest.names, "deflator");
    write_table(&table, config.output.as_deref())
}

fn handle_gni(args: &GniArgs, source: &DataSource) -> Result<(), AppError> {
    let config = gni_config_from_args(args);
    let run = pipeline::run_gni(&config, source)?;
    eprint!("{}", report::format_gni_summary(&run));
    let table = report::series_table(&run.projection.table, &run.oda.names, "gni");
    write_table(&table, config.output.as_deref())
}

fn handle_targets(args: &TargetArgs, source: &DataSource) -> Result<(), AppError> {
    let config = target_config_from_args(args)?;
    let run = pipeline::run_targets(&config, source)?;
    eprint!("{}", report::format_target_summary(&run, &config));

    let names = &run.oda.names;
    let table = match (&run.gni, config.wide) {
        (_, true) => report::wide_ratio_table(&run.scenarios, names),
        (Some(gni), false) => report::spending_table(&run.scenarios, gni, &config.policy, names, config.totals),
        (None, false) => report::long_ratio_table(&run.scenarios, names),
    };
    write_table(&table, config.output.as_deref())
}

fn handle_eu_spending(args: &EuSpendingArgs, source: &DataSource) -> Result<(), AppError> {
    let config = EuSpendingConfig {
        oda: args.oda.clone(),
        member_contributions: args.member_contributions.clone(),
        output: args.output.clone(),
    };
    let run = pipeline::run_eu_spending(&config, source)?;
    eprint!("{}", report::format_eu_spending_summary(&run));
    write_table(&report::eu_spending_table(&run.split), config.output.as_deref())
}

pub fn extend_config_from_args(args: &ExtendArgs) -> ExtendConfig {
    ExtendConfig {
        input: args.input.clone(),
        last_year: args.last_year,
        rolling_window: args.window,
        output: args.output.clone(),
    }
}

pub fn deflator_config_from_args(args: &DeflatorArgs) -> DeflatorConfig {
    DeflatorConfig {
        input: args.input.clone(),
        index: args.index,
        base_year: args.base_year,
        last_year: args.last_year,
        rolling_window: args.window,
        output: args.output.clone(),
    }
}

pub fn gni_config_from_args(args: &GniArgs) -> GniConfig {
    GniConfig {
        oda: args.oda.clone(),
        deflators: args.deflators.clone(),
        snapshot_year: args.snapshot_year,
        last_year: args.last_year,
        rolling_window: args.window,
        prices: Prices::from_base_year(args.constant_base_year),
        output: args.output.clone(),
    }
}

/// Build the targets config. Per-entity targets: lower-target flags first,
/// then the JSON file on top.
pub fn target_config_from_args(args: &TargetArgs) -> Result<TargetConfig, AppError> {
    if args.totals && args.gni_projections.is_none() {
        return Err(AppError::input("--totals needs --gni-projections."));
    }
    if args.totals && args.wide {
        return Err(AppError::input("--totals cannot be combined with --wide."));
    }

    let request = TargetRequest {
        start_year: args.start_year,
        last_observed_year: args.last_data_year,
        target_year: args.target_year,
        projection_end_year: args.end_year,
    };
    request.validate()?;

    let mut policy = TargetPolicy::new(args.target)?;
    for &entity in &args.lower_target_entities {
        policy = policy.with_override(entity, args.lower_target)?;
    }
    if let Some(path) = &args.targets_json {
        for (entity, target) in load_target_overrides(path)? {
            policy = policy.with_override(entity, target)?;
        }
    }

    let mut scenarios = if args.scenarios.is_empty() {
        Scenario::ALL.to_vec()
    } else {
        args.scenarios.clone()
    };
    scenarios.sort();
    scenarios.dedup();

    Ok(TargetConfig {
        oda: args.oda.clone(),
        request,
        policy,
        scenarios,
        carry_forward_ukraine: args.carry_forward_ukraine,
        exclude: args.exclude.clone(),
        member_contributions: args.member_contributions.clone(),
        gni_projections: args.gni_projections.clone(),
        wide: args.wide,
        totals: args.totals,
        output: args.output.clone(),
    })
}
