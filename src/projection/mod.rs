//! Deflator projection pipeline.
//!
//! Responsibilities:
//!
//! - group flat rows into per-entity series (`table`)
//! - extend series forward with a rolling-average step (`extend`)
//! - project ratios towards a target floor (`interpolate`)
//! - build and apply deflators (`deflator`)
//! - grow GNI from a snapshot year (`gni`)

pub mod deflator;
pub mod extend;
pub mod gni;
pub mod interpolate;
pub mod table;

pub use deflator::*;
pub use extend::*;
pub use gni::*;
pub use interpolate::*;
pub use table::*;
