//! Report Configuration - every cutoff and size of the analysis as TOML values
//!
//! Each section implements `Default` with the documented values, so a run
//! without a config file reproduces the reference analysis exactly.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "ACTIVITY_FOREST_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "report_config.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for one report run.
///
/// Load with `ReportConfig::load()` which searches:
/// 1. `$ACTIVITY_FOREST_CONFIG` env var
/// 2. `./report_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub run: RunConfig,

    /// Input files and column roles
    #[serde(default)]
    pub input: InputConfig,

    #[serde(default)]
    pub cleaning: CleaningConfig,

    /// Near-zero-variance and correlation cutoffs
    #[serde(default)]
    pub filtering: FilteringConfig,

    #[serde(default)]
    pub partition: PartitionConfig,

    #[serde(default)]
    pub forest: ForestConfig,

    #[serde(default)]
    pub cross_validation: CrossValidationConfig,

    /// Plot destinations
    #[serde(default)]
    pub output: OutputConfig,
}

impl ReportConfig {
    /// Load configuration using the standard search order:
    /// 1. `$ACTIVITY_FOREST_CONFIG` environment variable
    /// 2. `./report_config.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        // 1. Check env var
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded report config from {CONFIG_ENV_VAR}");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {CONFIG_ENV_VAR}, falling back");
                    }
                }
            } else {
                warn!(path = %path, "{CONFIG_ENV_VAR} points to non-existent file, falling back");
            }
        }

        // 2. Check ./report_config.toml
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded report config from ./{LOCAL_CONFIG_FILE}");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{LOCAL_CONFIG_FILE}, using defaults");
                }
            }
        }

        // 3. Defaults
        info!("No {LOCAL_CONFIG_FILE} found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    ///
    /// Two-pass: unknown keys are reported as warnings first, then serde
    /// deserialization and range validation run.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self = toml::from_str(contents)
            .map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        for w in super::validation::validate_suspicious_values(&config) {
            warn!("{}", w);
        }
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate every section for usable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        if self.input.delimiter.len() != 1 {
            errors.push(format!(
                "input.delimiter = {:?} must be a single ASCII character",
                self.input.delimiter
            ));
        }
        if self.input.label_column.trim().is_empty() {
            errors.push("input.label_column must not be empty".to_string());
        }

        if !self.cleaning.fill_value.is_finite() {
            errors.push(format!(
                "cleaning.fill_value ({}) must be a finite number",
                self.cleaning.fill_value
            ));
        }

        let f = &self.filtering;
        if !(f.freq_cut >= 1.0) {
            errors.push(format!("filtering.freq_cut ({:.3}) must be >= 1", f.freq_cut));
        }
        if !(f.unique_cut > 0.0 && f.unique_cut <= 100.0) {
            errors.push(format!(
                "filtering.unique_cut ({:.3}) must be in (0, 100]",
                f.unique_cut
            ));
        }
        if !(f.correlation_cutoff > 0.0 && f.correlation_cutoff <= 1.0) {
            errors.push(format!(
                "filtering.correlation_cutoff ({:.3}) must be in (0, 1]",
                f.correlation_cutoff
            ));
        }

        let p = self.partition.train_fraction;
        if !(p > 0.0 && p < 1.0) {
            errors.push(format!("partition.train_fraction ({p:.3}) must be in (0, 1)"));
        }

        Self::check_at_least(&mut errors, "forest.n_trees", self.forest.n_trees, 1);
        Self::check_at_least(&mut errors, "forest.mtry", self.forest.mtry, 1);
        Self::check_at_least(&mut errors, "forest.min_node_size", self.forest.min_node_size, 1);
        if let Some(depth) = self.forest.max_depth {
            Self::check_at_least(&mut errors, "forest.max_depth", depth, 1);
        }
        Self::check_at_least(&mut errors, "cross_validation.folds", self.cross_validation.folds, 2);
        Self::check_at_least(&mut errors, "cross_validation.repeats", self.cross_validation.repeats, 1);

        if self.output.cell_px < 2 {
            errors.push(format!("output.cell_px ({}) must be >= 2", self.output.cell_px));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_at_least(errors: &mut Vec<String>, name: &str, value: usize, min: usize) {
        if value < min {
            errors.push(format!("{name} ({value}) must be >= {min}"));
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Run
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Seed for partitioning, fold assignment, bootstrap and predictor sampling
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_seed() -> u64 { defaults::DEFAULT_SEED }

impl Default for RunConfig {
    fn default() -> Self {
        Self { seed: default_seed() }
    }
}

// ============================================================================
// Input
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    #[serde(default = "default_train_path")]
    pub train_path: PathBuf,

    #[serde(default = "default_test_path")]
    pub test_path: PathBuf,

    /// Field separator (one ASCII character)
    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    /// Cell values read as missing before numeric parsing
    #[serde(default = "default_na_tokens")]
    pub na_tokens: Vec<String>,

    #[serde(default = "default_label_column")]
    pub label_column: String,

    /// Row identifier column of the test file (never a predictor)
    #[serde(default = "default_id_column")]
    pub id_column: String,
}

fn default_train_path() -> PathBuf { PathBuf::from(defaults::DEFAULT_TRAIN_PATH) }
fn default_test_path() -> PathBuf { PathBuf::from(defaults::DEFAULT_TEST_PATH) }
fn default_delimiter() -> String { ",".to_string() }
fn default_na_tokens() -> Vec<String> { vec!["NA".to_string()] }
fn default_label_column() -> String { defaults::DEFAULT_LABEL_COLUMN.to_string() }
fn default_id_column() -> String { defaults::DEFAULT_ID_COLUMN.to_string() }

impl InputConfig {
    /// Delimiter as the single byte the CSV reader expects.
    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter.as_bytes().first().copied().unwrap_or(b',')
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            train_path: default_train_path(),
            test_path: default_test_path(),
            delimiter: default_delimiter(),
            na_tokens: default_na_tokens(),
            label_column: default_label_column(),
            id_column: default_id_column(),
        }
    }
}

// ============================================================================
// Cleaning
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningConfig {
    /// Leading identifier/timestamp columns to drop
    #[serde(default = "default_metadata_columns")]
    pub metadata_columns: usize,

    /// Replacement for missing and unparseable cells
    #[serde(default = "default_fill_value")]
    pub fill_value: f64,
}

fn default_metadata_columns() -> usize { defaults::METADATA_COLUMNS }
fn default_fill_value() -> f64 { defaults::FILL_VALUE }

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            metadata_columns: default_metadata_columns(),
            fill_value: default_fill_value(),
        }
    }
}

// ============================================================================
// Filtering
// ============================================================================

/// How the frequency and uniqueness cutoffs combine into a near-zero-variance flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NzvRule {
    /// Both cutoffs must trip
    #[default]
    Both,
    /// Either cutoff trips
    Either,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilteringConfig {
    #[serde(default = "default_freq_cut")]
    pub freq_cut: f64,

    /// Percent
    #[serde(default = "default_unique_cut")]
    pub unique_cut: f64,

    #[serde(default)]
    pub nzv_rule: NzvRule,

    #[serde(default = "default_correlation_cutoff")]
    pub correlation_cutoff: f64,
}

fn default_freq_cut() -> f64 { defaults::FREQ_CUT }
fn default_unique_cut() -> f64 { defaults::UNIQUE_CUT }
fn default_correlation_cutoff() -> f64 { defaults::CORRELATION_CUTOFF }

impl Default for FilteringConfig {
    fn default() -> Self {
        Self {
            freq_cut: default_freq_cut(),
            unique_cut: default_unique_cut(),
            nzv_rule: NzvRule::default(),
            correlation_cutoff: default_correlation_cutoff(),
        }
    }
}

// ============================================================================
// Partition
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionConfig {
    #[serde(default = "default_train_fraction")]
    pub train_fraction: f64,
}

fn default_train_fraction() -> f64 { defaults::TRAIN_FRACTION }

impl Default for PartitionConfig {
    fn default() -> Self {
        Self { train_fraction: default_train_fraction() }
    }
}

// ============================================================================
// Forest
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    #[serde(default = "default_n_trees")]
    pub n_trees: usize,

    /// Candidate predictors per split (fixed, no grid search)
    #[serde(default = "default_mtry")]
    pub mtry: usize,

    #[serde(default = "default_min_node_size")]
    pub min_node_size: usize,

    /// Unbounded when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,

    /// Worker threads for tree construction (0 = one per core)
    #[serde(default)]
    pub threads: usize,
}

fn default_n_trees() -> usize { defaults::N_TREES }
fn default_mtry() -> usize { defaults::MTRY }
fn default_min_node_size() -> usize { defaults::MIN_NODE_SIZE }

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: default_n_trees(),
            mtry: default_mtry(),
            min_node_size: default_min_node_size(),
            max_depth: None,
            threads: 0,
        }
    }
}

// ============================================================================
// Cross-Validation
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationConfig {
    #[serde(default = "default_folds")]
    pub folds: usize,

    #[serde(default = "default_repeats")]
    pub repeats: usize,
}

fn default_folds() -> usize { defaults::CV_FOLDS }
fn default_repeats() -> usize { defaults::CV_REPEATS }

impl Default for CrossValidationConfig {
    fn default() -> Self {
        Self {
            folds: default_folds(),
            repeats: default_repeats(),
        }
    }
}

// ============================================================================
// Output
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    #[serde(default = "default_confusion_plot")]
    pub confusion_plot: String,

    #[serde(default = "default_correlation_plot")]
    pub correlation_plot: String,

    /// Heatmap cell side (pixels)
    #[serde(default = "default_cell_px")]
    pub cell_px: u32,
}

fn default_output_dir() -> PathBuf { PathBuf::from(defaults::OUTPUT_DIR) }
fn default_confusion_plot() -> String { defaults::CONFUSION_PLOT_FILE.to_string() }
fn default_correlation_plot() -> String { defaults::CORRELATION_PLOT_FILE.to_string() }
fn default_cell_px() -> u32 { defaults::CELL_PX }

impl OutputConfig {
    pub fn confusion_plot_path(&self) -> PathBuf {
        self.dir.join(&self.confusion_plot)
    }

    pub fn correlation_plot_path(&self) -> PathBuf {
        self.dir.join(&self.correlation_plot)
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            confusion_plot: default_confusion_plot(),
            correlation_plot: default_correlation_plot(),
            cell_px: default_cell_px(),
        }
    }
}
