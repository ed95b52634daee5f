//! Random Forest Classifier
//!
//! Bagged ensemble of CART trees:
//! - each tree is grown on a bootstrap sample (n draws with replacement)
//! - each split considers `mtry` randomly chosen predictors
//! - prediction is the majority vote of all trees (ties to the lowest class code)
//!
//! Trees are built in parallel with rayon. Every tree seeds its own RNG from
//! the run seed and its index, so a fit is reproducible regardless of the
//! number of worker threads.
//!
//! The fit also yields the out-of-bag error estimate and mean-decrease-Gini
//! variable importance.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::ForestConfig;
use crate::types::{FeatureMatrix, ForestSummary, LabelSet, VariableImportance};

use super::tree::{majority_class, DecisionTree, TreeParams};
use super::PipelineError;

/// Golden-ratio increment used to spread per-tree seeds.
const SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// Hyperparameters of one forest fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForestParams {
    pub n_trees: usize,
    pub mtry: usize,
    pub min_node_size: usize,
    pub max_depth: Option<usize>,
    pub seed: u64,
}

impl ForestParams {
    pub fn from_config(config: &ForestConfig, seed: u64) -> Self {
        Self {
            n_trees: config.n_trees,
            mtry: config.mtry,
            min_node_size: config.min_node_size,
            max_depth: config.max_depth,
            seed,
        }
    }

    fn tree_seed(&self, tree: usize) -> u64 {
        self.seed ^ (tree as u64 + 1).wrapping_mul(SEED_STRIDE)
    }
}

/// A fitted random forest.
#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    classes: Vec<String>,
    feature_names: Vec<String>,
    mtry: usize,
    oob_error: Option<f64>,
    /// `oob_confusion[predicted][actual]` over rows with at least one OOB vote
    oob_confusion: Vec<Vec<usize>>,
    /// Mean decrease in Gini impurity per predictor
    importance: Vec<f64>,
}

/// Output of growing one tree.
struct GrownTree {
    tree: DecisionTree,
    in_bag: Vec<bool>,
    importance: Vec<f64>,
}

impl RandomForest {
    /// Fit a forest on every row of `x` with labels `y`.
    pub fn fit(x: &FeatureMatrix, y: &LabelSet, params: &ForestParams) -> Result<Self, PipelineError> {
        let n = x.n_rows();
        let p = x.n_cols();
        let k = y.n_classes();

        if n == 0 || n != y.len() {
            return Err(PipelineError::InvalidInput(format!(
                "forest needs matching non-empty rows: {n} feature rows, {} labels",
                y.len()
            )));
        }
        if p == 0 {
            return Err(PipelineError::NoPredictors);
        }
        if k < 2 {
            return Err(PipelineError::TooFewClasses(k));
        }
        if params.n_trees == 0 {
            return Err(PipelineError::InvalidInput("forest needs at least one tree".to_string()));
        }

        let mtry = if params.mtry > p {
            warn!(mtry = params.mtry, predictors = p, "mtry exceeds predictor count, clamping");
            p
        } else {
            params.mtry.max(1)
        };
        let tree_params = TreeParams {
            mtry,
            min_node_size: params.min_node_size.max(1),
            max_depth: params.max_depth,
        };
        let codes = y.codes();

        let grown: Vec<GrownTree> = (0..params.n_trees)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(params.tree_seed(t));
                let mut in_bag = vec![false; n];
                let rows: Vec<usize> = (0..n)
                    .map(|_| {
                        let r = rng.gen_range(0..n);
                        in_bag[r] = true;
                        r
                    })
                    .collect();
                let mut importance = vec![0.0; p];
                let tree = DecisionTree::fit(x, codes, k, rows, &tree_params, &mut rng, &mut importance);
                GrownTree { tree, in_bag, importance }
            })
            .collect();

        let mut importance = vec![0.0; p];
        for g in &grown {
            for (acc, v) in importance.iter_mut().zip(&g.importance) {
                *acc += v;
            }
        }
        for v in &mut importance {
            *v /= params.n_trees as f64;
        }

        let (oob_error, oob_confusion) = Self::out_of_bag(x, codes, k, &grown);
        let trees: Vec<DecisionTree> = grown.into_iter().map(|g| g.tree).collect();

        debug!(
            mean_depth = trees.iter().map(DecisionTree::depth).sum::<usize>() as f64 / trees.len() as f64,
            mean_leaves = trees.iter().map(DecisionTree::n_leaves).sum::<usize>() as f64 / trees.len() as f64,
            "Forest structure"
        );
        info!(
            trees = trees.len(),
            rows = n,
            predictors = p,
            mtry,
            oob_error = ?oob_error,
            "Random forest fitted"
        );

        Ok(Self {
            trees,
            classes: y.classes().to_vec(),
            feature_names: x.names().to_vec(),
            mtry,
            oob_error,
            oob_confusion,
            importance,
        })
    }

    /// Score each training row with only the trees that did not see it.
    fn out_of_bag(
        x: &FeatureMatrix,
        y: &[usize],
        k: usize,
        grown: &[GrownTree],
    ) -> (Option<f64>, Vec<Vec<usize>>) {
        let oob_predictions: Vec<Option<usize>> = (0..x.n_rows())
            .into_par_iter()
            .map(|row| {
                let mut votes = vec![0usize; k];
                let mut any = false;
                for g in grown.iter().filter(|g| !g.in_bag[row]) {
                    votes[g.tree.predict_row(x, row)] += 1;
                    any = true;
                }
                any.then(|| majority_class(&votes))
            })
            .collect();

        let mut confusion = vec![vec![0usize; k]; k];
        let mut scored = 0usize;
        let mut wrong = 0usize;
        for (row, pred) in oob_predictions.iter().enumerate() {
            if let Some(pred) = *pred {
                confusion[pred][y[row]] += 1;
                scored += 1;
                if pred != y[row] {
                    wrong += 1;
                }
            }
        }
        let error = (scored > 0).then(|| wrong as f64 / scored as f64);
        (error, confusion)
    }

    /// Vote counts per class for one row.
    pub fn votes_row(&self, x: &FeatureMatrix, row: usize) -> Vec<usize> {
        let mut votes = vec![0usize; self.classes.len()];
        for tree in &self.trees {
            votes[tree.predict_row(x, row)] += 1;
        }
        votes
    }

    /// Predicted class codes for every row of `x`.
    ///
    /// `x` is projected onto the training predictors by name first; a missing
    /// predictor is an error.
    pub fn predict(&self, x: &FeatureMatrix) -> Result<Vec<usize>, PipelineError> {
        let projected;
        let x = if x.names() == self.feature_names.as_slice() {
            x
        } else {
            projected = x
                .project(&self.feature_names)
                .map_err(|missing| PipelineError::IncompatibleColumns(missing.0))?;
            &projected
        };

        Ok((0..x.n_rows())
            .into_par_iter()
            .map(|row| majority_class(&self.votes_row(x, row)))
            .collect())
    }

    /// Predicted class names for every row of `x`.
    pub fn predict_labels(&self, x: &FeatureMatrix) -> Result<Vec<String>, PipelineError> {
        Ok(self
            .predict(x)?
            .into_iter()
            .map(|c| self.classes[c].clone())
            .collect())
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn mtry(&self) -> usize {
        self.mtry
    }

    pub fn oob_error(&self) -> Option<f64> {
        self.oob_error
    }

    pub fn oob_confusion(&self) -> &[Vec<usize>] {
        &self.oob_confusion
    }

    pub fn importance(&self) -> &[f64] {
        &self.importance
    }

    /// Structure summary with importance sorted descending.
    pub fn summary(&self) -> ForestSummary {
        let mut importance: Vec<VariableImportance> = self
            .feature_names
            .iter()
            .zip(&self.importance)
            .map(|(name, &v)| VariableImportance {
                name: name.clone(),
                mean_decrease_gini: v,
            })
            .collect();
        importance.sort_by(|a, b| b.mean_decrease_gini.total_cmp(&a.mean_decrease_gini));

        ForestSummary {
            n_trees: self.trees.len(),
            mtry: self.mtry,
            oob_error: self.oob_error,
            classes: self.classes.clone(),
            oob_confusion: self.oob_confusion.clone(),
            importance,
        }
    }
}
