//! `oda-projections` library crate.
//!
//! The binary (`oda`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - projection steps can be reused from other tools or notebooks

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod oda;
pub mod projection;
pub mod report;
