//! Core Activity Analyzer & Report Builder
//!
//! Main orchestrator for the classification workflow:
//! 1. Loads the training and test tables
//! 2. Cleans both identically (metadata drop, numeric coercion, zero fill)
//! 3. Filters predictors on the training table (near-zero variance, then correlation)
//! 4. Projects the test table onto the retained predictors by name
//! 5. Splits training rows into a stratified train/validation partition
//! 6. Cross-validates the forest configuration on the train partition
//! 7. Fits the final forest, scores the validation rows and predicts the test rows
//! 8. Builds a [`RunReport`] with every intermediate summary

use chrono::Utc;
use tracing::info;

use crate::acquisition::{load_table, CsvOptions};
use crate::config::ReportConfig;
use crate::types::{
    DimensionSummary, FeatureMatrix, FilterSummary, LabelSet, RawTable, RunReport, TestPrediction,
};

use super::{
    cleaning::{check_metadata_alignment, Cleaner},
    correlations::{CorrelationEngine, CorrelationMatrix},
    cross_validation::CrossValidator,
    evaluation::ConfusionMatrix,
    forest::{ForestParams, RandomForest},
    partition::stratified_split,
    variance_filter::NearZeroVariance,
    PipelineError,
};

/// Everything a run produces: the printable report plus the objects the plots need.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub report: RunReport,
    /// Correlations among the retained predictors
    pub correlation: CorrelationMatrix,
    /// Validation confusion matrix
    pub confusion: ConfusionMatrix,
    pub forest: RandomForest,
}

/// Predictor set chosen on the training table.
struct FilteredPredictors {
    features: FeatureMatrix,
    summary: FilterSummary,
    correlation: CorrelationMatrix,
}

/// Core analyzer that orchestrates the full workflow
pub struct ActivityAnalyzer;

impl ActivityAnalyzer {
    /// Load both tables from the configured paths and run the workflow.
    pub fn run(config: &ReportConfig) -> Result<AnalysisOutcome, PipelineError> {
        let options = CsvOptions {
            delimiter: config.input.delimiter_byte(),
        };
        let train = load_table(&config.input.train_path, options)?;
        let test = load_table(&config.input.test_path, options)?;
        Self::run_tables(config, &train, &test)
    }

    /// Run the workflow on tables already in memory.
    pub fn run_tables(
        config: &ReportConfig,
        train_raw: &RawTable,
        test_raw: &RawTable,
    ) -> Result<AnalysisOutcome, PipelineError> {
        let seed = config.run.seed;
        let mut dimensions = vec![
            DimensionSummary::new("training (raw)", train_raw.n_rows(), train_raw.n_cols()),
            DimensionSummary::new("testing (raw)", test_raw.n_rows(), test_raw.n_cols()),
        ];

        // Step 1: Cleaning
        check_metadata_alignment(train_raw, test_raw, config.cleaning.metadata_columns);
        let cleaner = Cleaner::new(&config.input, &config.cleaning);
        let train = cleaner.clean(train_raw, "training", true)?;
        let test = cleaner.clean(test_raw, "testing", false)?;

        let raw_labels = train.labels.as_deref().ok_or_else(|| PipelineError::MissingLabel {
            table: "training".to_string(),
            column: config.input.label_column.clone(),
        })?;
        let labels = LabelSet::encode(raw_labels);
        if labels.n_classes() < 2 {
            return Err(PipelineError::TooFewClasses(labels.n_classes()));
        }
        dimensions.push(DimensionSummary::new("training (cleaned)", train.features.n_rows(), train.features.n_cols()));
        dimensions.push(DimensionSummary::new("testing (cleaned)", test.features.n_rows(), test.features.n_cols()));

        // Step 2: Predictor filtering (training table decides)
        let filtered = Self::filter_predictors(&train.features, config)?;
        let test_features = test
            .features
            .project(&filtered.summary.retained)
            .map_err(|missing| PipelineError::IncompatibleColumns(missing.0))?;
        dimensions.push(DimensionSummary::new("training (filtered)", filtered.features.n_rows(), filtered.features.n_cols()));
        dimensions.push(DimensionSummary::new("testing (filtered)", test_features.n_rows(), test_features.n_cols()));

        // Step 3: Stratified partition
        let partition = stratified_split(&labels, config.partition.train_fraction, seed)?;
        let train_x = filtered.features.select_rows(&partition.train);
        let train_y = labels.select_rows(&partition.train);
        let validation_x = filtered.features.select_rows(&partition.validation);
        let validation_y = labels.select_rows(&partition.validation);
        dimensions.push(DimensionSummary::new("train partition", train_x.n_rows(), train_x.n_cols()));
        dimensions.push(DimensionSummary::new("validation partition", validation_x.n_rows(), validation_x.n_cols()));

        // Step 4: Cross-validation, then the final fit on the whole train partition
        let params = ForestParams::from_config(&config.forest, seed);
        let cross_validation = CrossValidator::run(
            &train_x,
            &train_y,
            &params,
            config.cross_validation.folds,
            config.cross_validation.repeats,
        )?;
        let forest = RandomForest::fit(&train_x, &train_y, &params)?;

        // Step 5: Validation
        let validation_pred = forest.predict(&validation_x)?;
        let confusion = ConfusionMatrix::from_predictions(&validation_pred, validation_y.codes(), labels.classes());
        let validation = confusion.stats();
        info!(
            rows = validation_x.n_rows(),
            accuracy = validation.overall.accuracy,
            kappa = validation.overall.kappa,
            "Validation scored"
        );

        // Step 6: Test predictions
        let test_classes = forest.predict_labels(&test_features)?;
        let test_predictions: Vec<TestPrediction> = test_classes
            .into_iter()
            .enumerate()
            .map(|(i, class)| TestPrediction {
                id: test
                    .ids
                    .as_ref()
                    .and_then(|ids| ids.get(i))
                    .map_or_else(|| (i + 1).to_string(), |id| id.trim().to_string()),
                class,
            })
            .collect();
        info!(rows = test_predictions.len(), "Test table predicted");

        let report = RunReport {
            generated_at: Utc::now(),
            seed,
            dimensions,
            training_cleaning: train.report,
            test_cleaning: test.report,
            filters: filtered.summary,
            cross_validation,
            forest: forest.summary(),
            validation,
            test_predictions,
        };

        Ok(AnalysisOutcome {
            report,
            correlation: filtered.correlation,
            confusion,
            forest,
        })
    }

    /// Near-zero-variance filter, then the correlation filter.
    fn filter_predictors(features: &FeatureMatrix, config: &ReportConfig) -> Result<FilteredPredictors, PipelineError> {
        let (after_nzv, near_zero_variance) = NearZeroVariance::filter(features, &config.filtering);
        if after_nzv.n_cols() == 0 {
            return Err(PipelineError::NoPredictors);
        }

        let cutoff = config.filtering.correlation_cutoff;
        let (retained, correlated, correlation) = CorrelationEngine::filter(&after_nzv, cutoff);
        if retained.n_cols() == 0 {
            return Err(PipelineError::NoPredictors);
        }

        let summary = FilterSummary {
            near_zero_variance,
            correlated,
            retained: retained.names().to_vec(),
            correlation_cutoff: cutoff,
        };
        Ok(FilteredPredictors {
            features: retained,
            summary,
            correlation,
        })
    }
}
