//! Near-Zero-Variance Filter
//!
//! Flags predictors whose value distribution is almost constant.
//!
//! Per column:
//! - `freq_ratio`: count of the most common value / count of the second most common
//! - `percent_unique`: 100 × distinct values / rows
//! - `zero_var`: a single distinct value
//!
//! A column is removed when it is zero-variance, or when the frequency and
//! uniqueness cutoffs trip according to [`NzvRule`].

use std::collections::HashMap;

use tracing::{debug, info};

use crate::config::{FilteringConfig, NzvRule};
use crate::types::{FeatureMatrix, NzvMetrics};

/// Near-zero-variance analysis over a feature matrix.
pub struct NearZeroVariance;

impl NearZeroVariance {
    /// Compute metrics for every column (the "save metrics" view).
    pub fn analyze(features: &FeatureMatrix, config: &FilteringConfig) -> Vec<NzvMetrics> {
        features
            .names()
            .iter()
            .zip(features.columns())
            .map(|(name, col)| Self::column_metrics(name, col, config))
            .collect()
    }

    /// Indices of the columns that survive the filter, in column order.
    pub fn retained_indices(metrics: &[NzvMetrics]) -> Vec<usize> {
        metrics
            .iter()
            .enumerate()
            .filter(|(_, m)| !m.is_removed())
            .map(|(j, _)| j)
            .collect()
    }

    /// Apply the filter, returning the reduced matrix and the removed column names.
    pub fn filter(features: &FeatureMatrix, config: &FilteringConfig) -> (FeatureMatrix, Vec<String>) {
        let metrics = Self::analyze(features, config);
        let keep = Self::retained_indices(&metrics);
        let removed: Vec<String> = metrics
            .iter()
            .filter(|m| m.is_removed())
            .map(|m| {
                debug!(
                    column = %m.name,
                    freq_ratio = ?m.freq_ratio,
                    percent_unique = m.percent_unique,
                    zero_var = m.zero_var,
                    "Near-zero-variance predictor removed"
                );
                m.name.clone()
            })
            .collect();

        info!(
            before = features.n_cols(),
            after = keep.len(),
            removed = removed.len(),
            "Near-zero-variance filter applied"
        );
        (features.select_columns(&keep), removed)
    }

    fn column_metrics(name: &str, col: &[f64], config: &FilteringConfig) -> NzvMetrics {
        let counts = value_counts(col);
        let n = col.len();

        let mut freqs: Vec<usize> = counts.into_values().collect();
        freqs.sort_unstable_by(|a, b| b.cmp(a));

        let distinct = freqs.len();
        let zero_var = distinct <= 1;
        let freq_ratio = if distinct >= 2 {
            Some(freqs[0] as f64 / freqs[1] as f64)
        } else {
            None
        };
        let percent_unique = if n == 0 { 0.0 } else { 100.0 * distinct as f64 / n as f64 };

        let freq_trips = freq_ratio.map_or(false, |r| r > config.freq_cut);
        let unique_trips = percent_unique < config.unique_cut;
        let nzv = match config.nzv_rule {
            NzvRule::Both => freq_trips && unique_trips,
            NzvRule::Either => freq_trips || unique_trips,
        };

        NzvMetrics {
            name: name.to_string(),
            freq_ratio,
            percent_unique,
            zero_var,
            nzv,
        }
    }
}

/// Count occurrences of each distinct value (`-0.0` and `0.0` are the same value).
fn value_counts(col: &[f64]) -> HashMap<u64, usize> {
    let mut counts: HashMap<u64, usize> = HashMap::new();
    for &v in col {
        let key = if v == 0.0 { 0.0f64.to_bits() } else { v.to_bits() };
        *counts.entry(key).or_insert(0) += 1;
    }
    counts
}
