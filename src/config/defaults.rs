//! System-wide default constants.
//!
//! Centralises the documented cutoffs and sizes of the analysis.
//! Grouped by workflow stage for easy discovery.

// ============================================================================
// Run
// ============================================================================

/// Seed for every random draw of a run (partition, folds, bootstrap, mtry).
pub const DEFAULT_SEED: u64 = 32_343;

// ============================================================================
// Input
// ============================================================================

pub const DEFAULT_TRAIN_PATH: &str = "data/pml-training.csv";
pub const DEFAULT_TEST_PATH: &str = "data/pml-testing.csv";

/// Label column of the training file (five classes A..E).
pub const DEFAULT_LABEL_COLUMN: &str = "classe";

/// Row identifier of the test file.
pub const DEFAULT_ID_COLUMN: &str = "problem_id";

// ============================================================================
// Cleaning
// ============================================================================

/// Leading identifier/timestamp columns (row index, user, 3 timestamps, 2 window fields).
pub const METADATA_COLUMNS: usize = 7;

/// Value written into every missing or unparseable cell.
pub const FILL_VALUE: f64 = 0.0;

// ============================================================================
// Feature Filtering
// ============================================================================

/// Most-common / second-most-common ratio above which a predictor is near-constant.
///
/// 95:5.
pub const FREQ_CUT: f64 = 95.0 / 5.0;

/// Percent of distinct values (relative to rows) below which a predictor is near-constant.
pub const UNIQUE_CUT: f64 = 10.0;

/// Maximum absolute pairwise correlation between retained predictors.
pub const CORRELATION_CUTOFF: f64 = 0.90;

// ============================================================================
// Partition & Resampling
// ============================================================================

/// Share of cleaned training rows used for fitting; the rest is validation.
pub const TRAIN_FRACTION: f64 = 0.8;

pub const CV_FOLDS: usize = 5;

pub const CV_REPEATS: usize = 5;

// ============================================================================
// Random Forest
// ============================================================================

pub const N_TREES: usize = 500;

/// Candidate predictors per split.
pub const MTRY: usize = 10;

/// Nodes smaller than this become leaves (1 = grow until pure).
pub const MIN_NODE_SIZE: usize = 1;

/// Number of predictors listed in the printed importance table.
pub const IMPORTANCE_TOP_N: usize = 20;

// ============================================================================
// Output
// ============================================================================

pub const OUTPUT_DIR: &str = "output";
pub const CONFUSION_PLOT_FILE: &str = "confusion_matrix.png";
pub const CORRELATION_PLOT_FILE: &str = "correlation_matrix.png";

/// Side length of one heatmap cell (pixels).
pub const CELL_PX: u32 = 24;
