//! Repeated k-fold Cross-Validation
//!
//! Estimates out-of-sample accuracy and kappa of the forest at the single
//! configured `mtry`. Each resample fits a fresh forest on its training rows
//! and scores the hold-out fold. Resamples run one after another; each forest
//! parallelises over its own trees.

use statrs::statistics::Statistics;
use tracing::{debug, info};

use crate::types::{CvSummary, FeatureMatrix, LabelSet, ResampleResult};

use super::evaluation::ConfusionMatrix;
use super::forest::{ForestParams, RandomForest};
use super::partition::repeated_kfold;
use super::PipelineError;

/// Repeated stratified k-fold evaluation of a forest configuration.
pub struct CrossValidator;

impl CrossValidator {
    /// Run `repeats` × `folds` resamples of `x`/`y`.
    ///
    /// Fold assignment is seeded from `params.seed`; the forest of resample `r`
    /// is seeded from `params.seed + r + 1`.
    pub fn run(
        x: &FeatureMatrix,
        y: &LabelSet,
        params: &ForestParams,
        folds: usize,
        repeats: usize,
    ) -> Result<CvSummary, PipelineError> {
        if repeats == 0 {
            return Err(PipelineError::InvalidInput("cross-validation needs at least one repeat".to_string()));
        }
        let resamples = repeated_kfold(y, folds, repeats, params.seed)?;
        let mut results = Vec::with_capacity(resamples.len());
        let mut mtry = params.mtry;

        for (r, resample) in resamples.iter().enumerate() {
            let fold_params = ForestParams {
                seed: params.seed.wrapping_add(r as u64 + 1),
                ..*params
            };
            let forest = RandomForest::fit(
                &x.select_rows(&resample.train),
                &y.select_rows(&resample.train),
                &fold_params,
            )?;
            mtry = forest.mtry();

            let holdout_y = y.select_rows(&resample.holdout);
            let predicted = forest.predict(&x.select_rows(&resample.holdout))?;
            let cm = ConfusionMatrix::from_predictions(&predicted, holdout_y.codes(), y.classes());
            let result = ResampleResult {
                name: resample.name.clone(),
                accuracy: cm.accuracy(),
                kappa: cm.kappa(),
                holdout_rows: resample.holdout.len(),
            };
            debug!(
                resample = %result.name,
                accuracy = result.accuracy,
                kappa = result.kappa,
                "Resample scored"
            );
            results.push(result);
        }

        let (accuracy_mean, accuracy_sd) = mean_sd(results.iter().map(|r| r.accuracy));
        let (kappa_mean, kappa_sd) = mean_sd(results.iter().map(|r| r.kappa));
        info!(
            resamples = results.len(),
            accuracy_mean,
            accuracy_sd,
            kappa_mean,
            kappa_sd,
            "Cross-validation complete"
        );

        Ok(CvSummary {
            n_samples: x.n_rows(),
            n_predictors: x.n_cols(),
            classes: y.classes().to_vec(),
            folds,
            repeats,
            mtry,
            n_trees: params.n_trees,
            accuracy_mean,
            accuracy_sd,
            kappa_mean,
            kappa_sd,
            resamples: results,
        })
    }
}

/// Mean and sample standard deviation over the finite values.
///
/// The deviation is NaN with fewer than two finite values.
fn mean_sd(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let finite: Vec<f64> = values.filter(|v| v.is_finite()).collect();
    let mean = (&finite).mean();
    let sd = if finite.len() < 2 { f64::NAN } else { (&finite).std_dev() };
    (mean, sd)
}
