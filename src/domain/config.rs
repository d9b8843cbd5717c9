//! Run configurations as understood by the pipeline.
//!
//! These are derived from CLI flags (plus defaults) in `app`.

use std::path::PathBuf;

use crate::domain::{EntityId, IndexKind, Prices, Scenario, TargetPolicy, TargetRequest};

/// `oda extend`: extend every series of a file to `last_year`.
#[derive(Debug, Clone)]
pub struct ExtendConfig {
    /// Local path or http(s) URL.
    pub input: String,
    pub last_year: i32,
    pub rolling_window: usize,
    pub output: Option<PathBuf>,
}

/// `oda deflators`: build rebased deflators from an index file.
#[derive(Debug, Clone)]
pub struct DeflatorConfig {
    pub input: String,
    pub index: IndexKind,
    pub base_year: i32,
    /// Extend the deflators to this year when set.
    pub last_year: Option<i32>,
    pub rolling_window: usize,
    pub output: Option<PathBuf>,
}

/// `oda gni`: grow snapshot GNI with extended deflators.
#[derive(Debug, Clone)]
pub struct GniConfig {
    pub oda: String,
    pub deflators: String,
    pub snapshot_year: i32,
    pub last_year: i32,
    pub rolling_window: usize,
    pub prices: Prices,
    pub output: Option<PathBuf>,
}

/// `oda targets`: project ODA/GNI ratios towards targets per scenario.
#[derive(Debug, Clone)]
pub struct TargetConfig {
    pub oda: String,
    pub request: TargetRequest,
    pub policy: TargetPolicy,
    pub scenarios: Vec<Scenario>,
    /// With Ukraine excluded, reuse the last known Ukraine value for later years.
    pub carry_forward_ukraine: bool,
    /// Entities left out of the ratio projection (multilateral reporters).
    pub exclude: Vec<EntityId>,
    /// Member-state contributions (`entity, year, value`) netted from the
    /// EU institutions' total.
    pub member_contributions: Option<String>,
    /// Projected GNI (`entity, year, value`) used to turn ratios into amounts.
    pub gni_projections: Option<String>,
    /// Pivot to one column per entity.
    pub wide: bool,
    /// Prepend aggregate rows (sum of ODA over sum of GNI) per year.
    pub totals: bool,
    pub output: Option<PathBuf>,
}

/// `oda eu-spending`: split EU institutions' ODA by who finances it.
#[derive(Debug, Clone)]
pub struct EuSpendingConfig {
    /// ODA file with the institutions and the member states.
    pub oda: String,
    /// Member-state contributions to the institutions (`entity, year, value`).
    pub member_contributions: String,
    pub output: Option<PathBuf>,
}
