//! Report Configuration Module
//!
//! Provides the run configuration loaded from TOML files, replacing every
//! cutoff of the analysis with an operator-tunable value.
//!
//! ## Loading Order
//!
//! 1. `ACTIVITY_FOREST_CONFIG` environment variable (path to TOML file)
//! 2. `report_config.toml` in the current working directory
//! 3. Built-in defaults (the documented cutoffs)
//!
//! ## Usage
//!
//! ```ignore
//! let config = ReportConfig::load();
//! let cutoff = config.filtering.correlation_cutoff;
//! ```

mod report_config;
pub mod defaults;
pub mod validation;

pub use report_config::*;
