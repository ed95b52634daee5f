//! Correlation Engine
//!
//! Pearson correlation matrix over all predictors, and the redundancy filter
//! that removes predictors until no retained pair exceeds the cutoff.
//!
//! ## Redundancy filter
//! While some retained pair has |r| > cutoff:
//! 1. take the retained pair with the largest |r|
//! 2. for each member, average its |r| against every other retained column
//! 3. drop the member with the larger average (ties drop the later column)

use rayon::prelude::*;
use tracing::{debug, info};

use crate::types::FeatureMatrix;

/// Symmetric correlation matrix with named rows/columns.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    names: Vec<String>,
    /// Row-major, `values[i * n + j]`
    values: Vec<f64>,
}

impl CorrelationMatrix {
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.names.len() + j]
    }

    /// Sub-matrix over `indices` (in the given order).
    pub fn select(&self, indices: &[usize]) -> Self {
        let values = indices
            .iter()
            .flat_map(|&i| indices.iter().map(move |&j| (i, j)))
            .map(|(i, j)| self.get(i, j))
            .collect();
        Self {
            names: indices.iter().map(|&i| self.names[i].clone()).collect(),
            values,
        }
    }

    /// Largest |r| over distinct pairs (0 for fewer than two columns).
    pub fn max_abs_off_diagonal(&self) -> f64 {
        let n = self.len();
        let mut best = 0.0f64;
        for i in 0..n {
            for j in (i + 1)..n {
                best = best.max(self.get(i, j).abs());
            }
        }
        best
    }
}

/// Column scaled into [-1, 1], centered, then divided by its Euclidean norm.
///
/// Scaling first keeps the sums of squares finite for any finite input.
/// `None` for constant columns and columns with fewer than two values.
fn unit_centered(col: &[f64]) -> Option<Vec<f64>> {
    let n = col.len();
    if n < 2 {
        return None;
    }
    let scale = col.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    if scale == 0.0 || !scale.is_finite() {
        return None;
    }
    let scaled: Vec<f64> = col.iter().map(|v| v / scale).collect();
    let mean = scaled.iter().sum::<f64>() / n as f64;
    let centered: Vec<f64> = scaled.into_iter().map(|v| v - mean).collect();
    let norm = centered.iter().map(|v| v * v).sum::<f64>().sqrt();
    (norm > 0.0).then(|| centered.into_iter().map(|v| v / norm).collect())
}

/// Dot product of two unit columns. A non-finite result counts as fully correlated.
fn dot_r(a: &[f64], b: &[f64]) -> f64 {
    let r: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    if r.is_finite() { r.clamp(-1.0, 1.0) } else { 1.0 }
}

/// Correlation analysis engine
pub struct CorrelationEngine;

impl CorrelationEngine {
    /// Pearson correlation coefficient (0 when either input is constant).
    ///
    /// Formula: r = Σ[(xi - x̄)(yi - ȳ)] / sqrt(Σ(xi - x̄)² × Σ(yi - ȳ)²)
    pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
        let n = x.len().min(y.len());
        match (unit_centered(&x[..n]), unit_centered(&y[..n])) {
            (Some(a), Some(b)) => dot_r(&a, &b),
            _ => 0.0,
        }
    }

    /// Full pairwise matrix, rows computed in parallel.
    pub fn matrix(features: &FeatureMatrix) -> CorrelationMatrix {
        let p = features.n_cols();

        // Center and normalise each column once
        let normalised: Vec<Option<Vec<f64>>> =
            features.columns().par_iter().map(|col| unit_centered(col)).collect();

        let rows: Vec<Vec<f64>> = (0..p)
            .into_par_iter()
            .map(|i| {
                (0..p)
                    .map(|j| match (&normalised[i], &normalised[j]) {
                        _ if i == j => 1.0,
                        (Some(a), Some(b)) => dot_r(a, b),
                        _ => 0.0,
                    })
                    .collect()
            })
            .collect();

        CorrelationMatrix {
            names: features.names().to_vec(),
            values: rows.into_iter().flatten().collect(),
        }
    }

    /// Column indices to remove so every retained pair has |r| ≤ `cutoff`.
    ///
    /// Returned in removal order.
    pub fn find_correlated(matrix: &CorrelationMatrix, cutoff: f64) -> Vec<usize> {
        let n = matrix.len();
        let mut retained = vec![true; n];
        let mut removed = Vec::new();

        let mean_abs = |k: usize, retained: &[bool]| -> f64 {
            let (sum, count) = (0..n)
                .filter(|&o| o != k && retained[o])
                .fold((0.0, 0usize), |(s, c), o| (s + matrix.get(k, o).abs(), c + 1));
            if count == 0 { 0.0 } else { sum / count as f64 }
        };

        loop {
            let mut worst: Option<(usize, usize, f64)> = None;
            for i in (0..n).filter(|&i| retained[i]) {
                for j in ((i + 1)..n).filter(|&j| retained[j]) {
                    let r = matrix.get(i, j).abs();
                    if r > cutoff && worst.map_or(true, |(_, _, w)| r > w) {
                        worst = Some((i, j, r));
                    }
                }
            }
            let Some((i, j, r)) = worst else { break };

            let mean_i = mean_abs(i, &retained);
            let mean_j = mean_abs(j, &retained);
            let drop = if mean_i > mean_j { i } else { j };
            debug!(
                dropped = %matrix.names[drop],
                kept = %matrix.names[if drop == i { j } else { i }],
                r,
                "Correlated predictor removed"
            );
            retained[drop] = false;
            removed.push(drop);
        }
        removed
    }

    /// Apply the redundancy filter.
    ///
    /// Returns the reduced matrix, the removed names, and the correlation
    /// matrix of the retained predictors.
    pub fn filter(
        features: &FeatureMatrix,
        cutoff: f64,
    ) -> (FeatureMatrix, Vec<String>, CorrelationMatrix) {
        let full = Self::matrix(features);
        let removed = Self::find_correlated(&full, cutoff);

        let keep: Vec<usize> = (0..features.n_cols()).filter(|j| !removed.contains(j)).collect();
        let removed_names = removed.iter().map(|&j| full.names[j].clone()).collect();
        let retained_matrix = full.select(&keep);

        info!(
            before = features.n_cols(),
            after = keep.len(),
            cutoff,
            max_abs_r = retained_matrix.max_abs_off_diagonal(),
            "Correlation filter applied"
        );
        (features.select_columns(&keep), removed_names, retained_matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn matrix(cols: Vec<(&str, Vec<f64>)>) -> FeatureMatrix {
        let (names, columns): (Vec<String>, Vec<Vec<f64>>) =
            cols.into_iter().map(|(n, c)| (n.to_string(), c)).unzip();
        FeatureMatrix::new(names, columns).unwrap()
    }

    #[test]
    fn test_perfect_positive_correlation() {
        let x: Vec<f64> = (0..100).map(f64::from).collect();
        let y: Vec<f64> = (0..100).map(|i| f64::from(i) * 2.0 + 3.0).collect();
        assert!((CorrelationEngine::pearson(&x, &y) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_perfect_negative_correlation() {
        let x: Vec<f64> = (0..100).map(f64::from).collect();
        let y: Vec<f64> = (0..100).map(|i| 100.0 - f64::from(i)).collect();
        assert!((CorrelationEngine::pearson(&x, &y) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_constant_column_correlates_zero() {
        let x: Vec<f64> = (0..10).map(f64::from).collect();
        let y = vec![4.0; 10];
        assert_eq!(CorrelationEngine::pearson(&x, &y), 0.0);

        let m = CorrelationEngine::matrix(&matrix(vec![("x", x), ("flat", y)]));
        assert_eq!(m.get(0, 1), 0.0);
        assert_eq!(m.get(1, 1), 1.0);
    }

    #[test]
    fn test_matrix_matches_pairwise_and_is_symmetric() {
        let mut rng = StdRng::seed_from_u64(7);
        let cols: Vec<(&str, Vec<f64>)> = ["a", "b", "c", "d"]
            .into_iter()
            .map(|n| (n, (0..200).map(|_| rng.gen_range(-1.0..1.0)).collect()))
            .collect();
        let fm = matrix(cols);
        let m = CorrelationEngine::matrix(&fm);
        for i in 0..4 {
            for j in 0..4 {
                assert!((m.get(i, j) - m.get(j, i)).abs() < 1e-12);
                let direct = if i == j { 1.0 } else { CorrelationEngine::pearson(fm.column(i), fm.column(j)) };
                assert!((m.get(i, j) - direct).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_filter_drops_redundant_copy() {
        let mut rng = StdRng::seed_from_u64(11);
        let base: Vec<f64> = (0..300).map(|_| rng.gen_range(0.0..10.0)).collect();
        let copy: Vec<f64> = base.iter().map(|v| v * 1.01 + rng.gen_range(-0.01..0.01)).collect();
        let other: Vec<f64> = (0..300).map(|_| rng.gen_range(0.0..10.0)).collect();
        let fm = matrix(vec![("base", base), ("copy", copy), ("other", other)]);

        let (reduced, removed, retained) = CorrelationEngine::filter(&fm, 0.90);
        assert_eq!(removed.len(), 1);
        assert!(removed[0] == "base" || removed[0] == "copy");
        assert_eq!(reduced.n_cols(), 2);
        assert!(reduced.names().contains(&"other".to_string()));
        assert!(retained.max_abs_off_diagonal() <= 0.90);
    }

    #[test]
    fn test_filter_prefers_dropping_hub_column() {
        // `hub` correlates strongly with both `a` and `b`; `a` and `b` are independent-ish
        let mut rng = StdRng::seed_from_u64(5);
        let a: Vec<f64> = (0..500).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let b: Vec<f64> = (0..500).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let hub: Vec<f64> = a.iter().zip(&b).map(|(x, y)| x + y).collect();
        let fm = matrix(vec![("a", a), ("b", b), ("hub", hub)]);

        let m = CorrelationEngine::matrix(&fm);
        let removed = CorrelationEngine::find_correlated(&m, 0.5);
        assert_eq!(removed, vec![2]);
    }

    #[test]
    fn test_retained_pairs_below_cutoff() {
        let mut rng = StdRng::seed_from_u64(99);
        let latent: Vec<f64> = (0..400).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let cols: Vec<(&str, Vec<f64>)> = ["p", "q", "r", "s", "t", "u"]
            .into_iter()
            .enumerate()
            .map(|(k, n)| {
                let noise = 0.1 * k as f64;
                (n, latent.iter().map(|v| v + rng.gen_range(-noise..=noise)).collect())
            })
            .collect();
        let fm = matrix(cols);
        let (_, _, retained) = CorrelationEngine::filter(&fm, 0.90);
        assert!(retained.len() >= 1);
        assert!(retained.max_abs_off_diagonal() <= 0.90);
    }

    #[test]
    fn test_large_magnitude_collinear_columns_are_flagged() {
        let a: Vec<f64> = (1..=50).map(|i| f64::from(i) * 1e200).collect();
        let b: Vec<f64> = a.iter().map(|v| v * 0.5).collect();
        let mut rng = StdRng::seed_from_u64(3);
        let c: Vec<f64> = (0..50).map(|_| rng.gen_range(-1.0..1.0)).collect();

        assert!((CorrelationEngine::pearson(&a, &b) - 1.0).abs() < 1e-12);

        let fm = matrix(vec![("a", a), ("b", b), ("c", c)]);
        let m = CorrelationEngine::matrix(&fm);
        assert!((m.get(0, 1) - 1.0).abs() < 1e-12);

        let (reduced, removed, retained) = CorrelationEngine::filter(&fm, 0.90);
        assert_eq!(removed.len(), 1);
        assert_eq!(reduced.n_cols(), 2);
        assert!(reduced.names().contains(&"c".to_string()));
        assert!(retained.max_abs_off_diagonal() <= 0.90);
    }
}
