//! Command-line parsing for the ODA projection toolkit.
//!
//! Argument parsing stays here; `app` turns parsed args into run configs.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{DEFAULT_LOWER_TARGET, DEFAULT_TARGET, EntityId, IndexKind, Scenario};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "oda", version, about = "ODA/GNI projections towards aid targets")]
pub struct Cli {
    /// Re-download remote inputs even when a cached copy exists.
    #[arg(long, global = true)]
    pub refresh: bool,

    /// Debug-level logging (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extend every series of a file to a target year with a rolling-average step.
    Extend(ExtendArgs),
    /// Build rebased deflators from a nominal or price index.
    Deflators(DeflatorArgs),
    /// Project GNI past the snapshot year with deflators.
    Gni(GniArgs),
    /// Project ODA/GNI ratios towards a target, per scenario.
    Targets(TargetArgs),
    /// Split EU institutions' ODA into imputable and own-resource parts.
    EuSpending(EuSpendingArgs),
}

#[derive(Debug, Args, Clone)]
pub struct EuSpendingArgs {
    /// ODA CSV with the EU institutions (918) and the member states.
    #[arg(long, value_name = "CSV|URL")]
    pub oda: String,

    /// Member-state contributions to the institutions (`entity, year, value`).
    #[arg(long, value_name = "CSV|URL")]
    pub member_contributions: String,

    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct ExtendArgs {
    /// Series CSV (`entity, year, value`): path or http(s) URL.
    #[arg(long, value_name = "CSV|URL")]
    pub input: String,

    /// Last year to cover.
    #[arg(long)]
    pub last_year: i32,

    /// Number of trailing yearly changes averaged per step.
    #[arg(long, default_value_t = 3)]
    pub window: usize,

    /// Output CSV (stdout when omitted).
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct DeflatorArgs {
    /// Index CSV (`entity, year, value`): path or http(s) URL.
    #[arg(long, value_name = "CSV|URL")]
    pub input: String,

    /// Year whose deflator equals 1.0.
    #[arg(long)]
    pub base_year: i32,

    /// Extend the deflators to this year.
    #[arg(long)]
    pub last_year: Option<i32>,

    #[arg(long, default_value_t = 3)]
    pub window: usize,

    #[arg(long, value_enum, default_value_t = IndexKind::Nominal)]
    pub index: IndexKind,

    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct GniArgs {
    /// ODA CSV carrying `gni` per entity and year.
    #[arg(long, value_name = "CSV|URL")]
    pub oda: String,

    /// Deflator CSV (`entity, year, value`).
    #[arg(long, value_name = "CSV|URL")]
    pub deflators: String,

    /// Last year of reported GNI.
    #[arg(long)]
    pub snapshot_year: i32,

    #[arg(long)]
    pub last_year: i32,

    #[arg(long, default_value_t = 3)]
    pub window: usize,

    /// Express GNI in constant prices of this year.
    #[arg(long, value_name = "YEAR")]
    pub constant_base_year: Option<i32>,

    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct TargetArgs {
    /// ODA CSV (`entity, year, oda, gni`, optional `idrc`, `ukraine`).
    #[arg(long, value_name = "CSV|URL")]
    pub oda: String,

    /// First historical year kept.
    #[arg(long)]
    pub start_year: i32,

    /// Last year with reported data.
    #[arg(long)]
    pub last_data_year: i32,

    /// Year the target ratio is reached.
    #[arg(long)]
    pub target_year: i32,

    /// Last year of the output.
    #[arg(long)]
    pub end_year: i32,

    /// Default ODA/GNI target.
    #[arg(long, default_value_t = DEFAULT_TARGET)]
    pub target: f64,

    /// Target used for `--lower-target-entities`.
    #[arg(long, default_value_t = DEFAULT_LOWER_TARGET)]
    pub lower_target: f64,

    /// Entity codes held to the lower target.
    #[arg(long, value_delimiter = ',')]
    pub lower_target_entities: Vec<EntityId>,

    /// JSON object of per-entity targets (`{"4": 0.007}`); wins over flags.
    #[arg(long, value_name = "JSON")]
    pub targets_json: Option<PathBuf>,

    /// Scenarios to run (all when omitted).
    #[arg(long = "scenario", value_enum, value_delimiter = ',')]
    pub scenarios: Vec<Scenario>,

    /// With Ukraine excluded, reuse its last known value for later years.
    #[arg(long)]
    pub carry_forward_ukraine: bool,

    /// Entity codes left out of the projection.
    #[arg(long, value_delimiter = ',', default_value = "918")]
    pub exclude: Vec<EntityId>,

    /// Member-state contributions to the EU institutions (`entity, year, value`),
    /// netted from entity 918 before projecting.
    #[arg(long, value_name = "CSV|URL")]
    pub member_contributions: Option<String>,

    /// Projected GNI CSV; adds ODA amounts and shortfall columns.
    #[arg(long, value_name = "CSV|URL")]
    pub gni_projections: Option<String>,

    /// One column per entity, one row per year and scenario.
    #[arg(long)]
    pub wide: bool,

    /// Add aggregate rows (requires `--gni-projections`).
    #[arg(long)]
    pub totals: bool,

    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
