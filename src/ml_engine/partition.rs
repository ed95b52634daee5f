//! Stratified Partitioning
//!
//! Row splits that preserve label-class proportions:
//! - train/validation split (`train_fraction` of every class goes to training)
//! - stratified k-fold assignment, and repeated k-fold resamples for CV
//!
//! Every split is a pure function of the labels and a seed.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::info;

use crate::types::LabelSet;

use super::PipelineError;

/// Added to the run seed for fold assignment so folds and the train/validation
/// split draw from separate random streams.
const FOLD_SEED_OFFSET: u64 = 0xF01D_5EED;

/// Row indices of a train/validation split, each sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
}

/// One cross-validation resample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resample {
    /// `FoldF.RepR`, 1-based
    pub name: String,
    pub train: Vec<usize>,
    pub holdout: Vec<usize>,
}

/// Row indices of each class, in row order.
fn rows_by_class(labels: &LabelSet) -> Vec<Vec<usize>> {
    let mut by_class = vec![Vec::new(); labels.n_classes()];
    for (row, &code) in labels.codes().iter().enumerate() {
        by_class[code].push(row);
    }
    by_class
}

/// Stratified train/validation split.
///
/// A class with `n_c` rows sends `ceil(p · n_c)` rows to training, capped at
/// `n_c − 1` so every class is also present in validation. Classes with fewer
/// than two rows cannot be represented in both splits and are an error.
pub fn stratified_split(labels: &LabelSet, train_fraction: f64, seed: u64) -> Result<Partition, PipelineError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(labels.len());
    let mut validation = Vec::new();

    for (code, mut rows) in rows_by_class(labels).into_iter().enumerate() {
        let n_c = rows.len();
        if n_c < 2 {
            return Err(PipelineError::ClassTooSmall {
                class: labels.class_name(code).to_string(),
                count: n_c,
                required: 2,
            });
        }
        rows.shuffle(&mut rng);
        let n_train = ((train_fraction * n_c as f64).ceil() as usize).clamp(1, n_c - 1);
        train.extend_from_slice(&rows[..n_train]);
        validation.extend_from_slice(&rows[n_train..]);
    }

    train.sort_unstable();
    validation.sort_unstable();
    info!(
        train = train.len(),
        validation = validation.len(),
        train_fraction,
        "Stratified partition"
    );
    Ok(Partition { train, validation })
}

/// Assign each row to one of `k` folds, class by class.
///
/// Rows of each class are shuffled and dealt round-robin; the dealing offset
/// carries over between classes so overall fold sizes differ by at most one.
pub fn stratified_folds(labels: &LabelSet, k: usize, rng: &mut StdRng) -> Result<Vec<usize>, PipelineError> {
    if k < 2 || labels.len() < k {
        return Err(PipelineError::InvalidInput(format!(
            "cannot split {} rows into {k} folds",
            labels.len()
        )));
    }
    let mut fold_of = vec![0usize; labels.len()];
    let mut next = 0usize;
    for mut rows in rows_by_class(labels) {
        rows.shuffle(rng);
        for row in rows {
            fold_of[row] = next % k;
            next += 1;
        }
    }
    Ok(fold_of)
}

/// `repeats` independent stratified k-fold splits, as train/hold-out resamples.
pub fn repeated_kfold(
    labels: &LabelSet,
    folds: usize,
    repeats: usize,
    seed: u64,
) -> Result<Vec<Resample>, PipelineError> {
    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(FOLD_SEED_OFFSET));
    let mut resamples = Vec::with_capacity(folds * repeats);

    for rep in 0..repeats {
        let fold_of = stratified_folds(labels, folds, &mut rng)?;
        for fold in 0..folds {
            let (holdout, train): (Vec<usize>, Vec<usize>) =
                (0..labels.len()).partition(|&row| fold_of[row] == fold);
            resamples.push(Resample {
                name: format!("Fold{}.Rep{}", fold + 1, rep + 1),
                train,
                holdout,
            });
        }
    }
    Ok(resamples)
}
