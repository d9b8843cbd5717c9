//! Upstream data acquisition.
//!
//! The provider is treated as an opaque source of already-cleaned CSV exports;
//! this module only knows how to fetch and cache them.

pub mod source;

pub use source::DataSource;
