//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - entity codes and annual series (`EntityId`, `Series`, `ValueKind`)
//! - projection inputs (`ProjectionRequest`, `TargetRequest`, `TargetPolicy`)
//! - scenario configuration (`Scenario`, `AdjustmentToggles`)
//! - per-command run configurations (`config`)

pub mod config;
pub mod types;

pub use config::*;
pub use types::*;
