//! CART Classification Tree
//!
//! One tree of the random forest. Grown depth-first from a bootstrap sample:
//! - every node draws `mtry` candidate predictors without replacement
//! - each candidate is sorted and scanned for the threshold with the lowest
//!   weighted Gini impurity (midpoint between consecutive distinct values)
//! - a node becomes a leaf when it is pure, has `min_node_size` rows or fewer,
//!   hits `max_depth`, or no candidate reduces impurity
//!
//! Nodes live in one flat `Vec`, children referenced by index.

use rand::rngs::StdRng;
use rand::seq::index;

use crate::types::FeatureMatrix;

/// Minimum impurity decrease for a split to count.
const MIN_GINI_DECREASE: f64 = 1e-12;

/// Growth limits for a single tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeParams {
    pub mtry: usize,
    pub min_node_size: usize,
    pub max_depth: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Rows with `value <= threshold` go left
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        class: usize,
    },
}

/// A fitted classification tree.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    nodes: Vec<Node>,
    depth: usize,
}

/// Best split found for one node.
#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    /// Σ l_k²/n_l + Σ r_k²/n_r (larger is purer)
    score: f64,
}

/// Pending node on the build stack.
struct WorkItem {
    node: usize,
    rows: Vec<usize>,
    depth: usize,
}

impl DecisionTree {
    /// Grow a tree on `rows` (a bootstrap multiset of row indices).
    ///
    /// `importance[j]` accumulates the Gini decrease of every split on predictor `j`.
    pub fn fit(
        x: &FeatureMatrix,
        y: &[usize],
        n_classes: usize,
        rows: Vec<usize>,
        params: &TreeParams,
        rng: &mut StdRng,
        importance: &mut [f64],
    ) -> Self {
        let p = x.n_cols();
        let mtry = params.mtry.clamp(1, p.max(1));
        let mut nodes = vec![Node::Leaf { class: 0 }];
        let mut max_seen_depth = 0usize;
        let mut stack = vec![WorkItem { node: 0, rows, depth: 0 }];
        let mut scratch: Vec<(f64, usize)> = Vec::new();

        while let Some(WorkItem { node, rows, depth }) = stack.pop() {
            max_seen_depth = max_seen_depth.max(depth);
            let counts = class_counts(&rows, y, n_classes);
            let majority = majority_class(&counts);

            let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
            let depth_reached = params.max_depth.map_or(false, |d| depth >= d);
            if pure || rows.len() <= params.min_node_size || depth_reached || p == 0 {
                nodes[node] = Node::Leaf { class: majority };
                continue;
            }

            let parent_score = sum_sq(&counts) / rows.len() as f64;
            let mut best: Option<SplitCandidate> = None;
            for feature in index::sample(rng, p, mtry).into_iter() {
                if let Some(c) = best_split_for_feature(x, y, n_classes, &rows, &counts, feature, &mut scratch) {
                    if best.map_or(true, |b| c.score > b.score) {
                        best = Some(c);
                    }
                }
            }

            let Some(split) = best.filter(|b| b.score - parent_score > MIN_GINI_DECREASE) else {
                nodes[node] = Node::Leaf { class: majority };
                continue;
            };
            importance[split.feature] += split.score - parent_score;

            let column = x.column(split.feature);
            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
                rows.into_iter().partition(|&r| column[r] <= split.threshold);

            let left = nodes.len();
            let right = left + 1;
            nodes.push(Node::Leaf { class: majority });
            nodes.push(Node::Leaf { class: majority });
            nodes[node] = Node::Split {
                feature: split.feature,
                threshold: split.threshold,
                left,
                right,
            };
            stack.push(WorkItem { node: right, rows: right_rows, depth: depth + 1 });
            stack.push(WorkItem { node: left, rows: left_rows, depth: depth + 1 });
        }

        Self {
            nodes,
            depth: max_seen_depth,
        }
    }

    /// Predicted class code for one row of `x`.
    pub fn predict_row(&self, x: &FeatureMatrix, row: usize) -> usize {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                Node::Leaf { class } => return class,
                Node::Split { feature, threshold, left, right } => {
                    idx = if x.value(row, feature) <= threshold { left } else { right };
                }
            }
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| matches!(n, Node::Leaf { .. })).count()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}

fn class_counts(rows: &[usize], y: &[usize], n_classes: usize) -> Vec<usize> {
    let mut counts = vec![0usize; n_classes];
    for &r in rows {
        counts[y[r]] += 1;
    }
    counts
}

/// Most frequent class; ties go to the lowest class code.
pub(crate) fn majority_class(counts: &[usize]) -> usize {
    let mut best = 0;
    for (k, &c) in counts.iter().enumerate() {
        if c > counts[best] {
            best = k;
        }
    }
    best
}

fn sum_sq(counts: &[usize]) -> f64 {
    counts.iter().map(|&c| (c * c) as f64).sum()
}

/// Scan one predictor for its best Gini threshold within a node.
fn best_split_for_feature(
    x: &FeatureMatrix,
    y: &[usize],
    n_classes: usize,
    rows: &[usize],
    node_counts: &[usize],
    feature: usize,
    scratch: &mut Vec<(f64, usize)>,
) -> Option<SplitCandidate> {
    let column = x.column(feature);
    scratch.clear();
    scratch.extend(rows.iter().map(|&r| (column[r], y[r])));
    scratch.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

    let n = scratch.len();
    if n < 2 || scratch[0].0 == scratch[n - 1].0 {
        return None;
    }

    let mut left = vec![0usize; n_classes];
    let mut right = node_counts.to_vec();
    let mut left_sq = 0.0f64;
    let mut right_sq = sum_sq(node_counts);
    let mut best: Option<SplitCandidate> = None;

    for i in 0..n - 1 {
        let (value, class) = scratch[i];
        // Moving one row of `class` from right to left
        left_sq += (2 * left[class] + 1) as f64;
        right_sq -= (2 * right[class] - 1) as f64;
        left[class] += 1;
        right[class] -= 1;

        let next = scratch[i + 1].0;
        if value == next {
            continue;
        }
        let n_left = (i + 1) as f64;
        let n_right = (n - i - 1) as f64;
        let score = left_sq / n_left + right_sq / n_right;
        if best.map_or(true, |b| score > b.score) {
            let mid = value + (next - value) / 2.0;
            let threshold = if mid < next { mid } else { value };
            best = Some(SplitCandidate { feature, threshold, score });
        }
    }
    best
}
