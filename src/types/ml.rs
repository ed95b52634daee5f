//! Report types: cleaning/filter summaries, resampling results, confusion statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Row/column count at a named workflow stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionSummary {
    pub stage: String,
    pub rows: usize,
    pub cols: usize,
}

impl DimensionSummary {
    pub fn new(stage: impl Into<String>, rows: usize, cols: usize) -> Self {
        Self { stage: stage.into(), rows, cols }
    }
}

/// What the cleaning stage did to one table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningReport {
    /// Leading metadata columns removed
    pub dropped_columns: Vec<String>,
    /// Columns holding at least one non-numeric, non-NA token
    pub coerced_columns: Vec<String>,
    /// NA tokens replaced with the fill value
    pub missing_filled: usize,
    /// Non-numeric tokens treated as missing, then filled
    pub unparseable_filled: usize,
}

/// Near-zero-variance metrics for one predictor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NzvMetrics {
    pub name: String,
    /// Most common / second most common count; `None` for a single distinct value
    pub freq_ratio: Option<f64>,
    /// 100 × distinct values / rows
    pub percent_unique: f64,
    pub zero_var: bool,
    pub nzv: bool,
}

impl NzvMetrics {
    pub fn is_removed(&self) -> bool {
        self.zero_var || self.nzv
    }
}

/// Columns removed by each filter and the final shared predictor set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSummary {
    pub near_zero_variance: Vec<String>,
    pub correlated: Vec<String>,
    pub retained: Vec<String>,
    pub correlation_cutoff: f64,
}

/// Scores of one cross-validation resample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResampleResult {
    /// `FoldF.RepR`
    pub name: String,
    pub accuracy: f64,
    pub kappa: f64,
    pub holdout_rows: usize,
}

/// Repeated k-fold summary for the single fixed `mtry`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvSummary {
    pub n_samples: usize,
    pub n_predictors: usize,
    pub classes: Vec<String>,
    pub folds: usize,
    pub repeats: usize,
    pub mtry: usize,
    pub n_trees: usize,
    pub accuracy_mean: f64,
    pub accuracy_sd: f64,
    pub kappa_mean: f64,
    pub kappa_sd: f64,
    pub resamples: Vec<ResampleResult>,
}

/// Overall confusion-matrix statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallStats {
    pub accuracy: f64,
    /// Exact binomial 95% interval on accuracy
    pub accuracy_lower: f64,
    pub accuracy_upper: f64,
    pub no_information_rate: f64,
    /// One-sided binomial P-value for accuracy > NIR
    pub accuracy_p_value: f64,
    pub kappa: f64,
    /// Symmetry test of the off-diagonal cells; `None` when undefined
    pub mcnemar_p_value: Option<f64>,
}

/// One-vs-rest statistics for one class. `None` marks a zero denominator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassStats {
    pub class: String,
    pub sensitivity: Option<f64>,
    pub specificity: Option<f64>,
    pub pos_pred_value: Option<f64>,
    pub neg_pred_value: Option<f64>,
    pub prevalence: Option<f64>,
    pub detection_rate: Option<f64>,
    pub detection_prevalence: Option<f64>,
    pub balanced_accuracy: Option<f64>,
}

/// Full statistics block over a confusion matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfusionStats {
    pub classes: Vec<String>,
    /// `table[predicted][reference]`
    pub table: Vec<Vec<usize>>,
    pub overall: OverallStats,
    pub by_class: Vec<ClassStats>,
}

/// Mean decrease in Gini impurity for one predictor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableImportance {
    pub name: String,
    pub mean_decrease_gini: f64,
}

/// Forest summary independent of any held-out data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestSummary {
    pub n_trees: usize,
    pub mtry: usize,
    /// Out-of-bag misclassification rate; `None` if no row was ever out of bag
    pub oob_error: Option<f64>,
    pub classes: Vec<String>,
    /// `oob_confusion[predicted][actual]` over rows with at least one out-of-bag vote
    pub oob_confusion: Vec<Vec<usize>>,
    pub importance: Vec<VariableImportance>,
}

/// One test-set prediction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestPrediction {
    /// Id column value, or the 1-based row number if the table has none
    pub id: String,
    pub class: String,
}

/// Everything a run reports, in print order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub generated_at: DateTime<Utc>,
    pub seed: u64,
    pub dimensions: Vec<DimensionSummary>,
    pub training_cleaning: CleaningReport,
    pub test_cleaning: CleaningReport,
    pub filters: FilterSummary,
    pub cross_validation: CvSummary,
    pub forest: ForestSummary,
    pub validation: ConfusionStats,
    pub test_predictions: Vec<TestPrediction>,
}
