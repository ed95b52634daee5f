//! Confusion Matrix & Classification Statistics
//!
//! Compares predicted against reference classes and derives:
//! - accuracy with an exact (Clopper-Pearson) 95% binomial interval
//! - no-information rate and the one-sided binomial P-value of accuracy > NIR
//! - Cohen's kappa
//! - McNemar/Bowker symmetry test P-value
//! - one-vs-rest statistics per class (sensitivity, specificity, predictive values, ...)
//!
//! Distribution functions come from statrs.

use serde::Serialize;
use statrs::distribution::{Beta, Binomial, ChiSquared, ContinuousCDF, DiscreteCDF};
use tracing::warn;

use crate::types::{ClassStats, ConfusionStats, OverallStats};

/// Two-sided level of the accuracy interval.
const CONFIDENCE_ALPHA: f64 = 0.05;

/// Halvings of [0, 1] for Beta quantiles (resolution below 1e-15).
const BISECTION_STEPS: usize = 52;

/// Square contingency table of predicted vs reference class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    classes: Vec<String>,
    /// `table[predicted][reference]`
    table: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    /// Tabulate class codes. Codes index into `classes`.
    pub fn from_predictions(predicted: &[usize], reference: &[usize], classes: &[String]) -> Self {
        let k = classes.len();
        if predicted.len() != reference.len() {
            warn!(
                predicted = predicted.len(),
                reference = reference.len(),
                "Prediction and reference lengths differ, extra rows ignored"
            );
        }
        let mut table = vec![vec![0usize; k]; k];
        for (&p, &r) in predicted.iter().zip(reference) {
            table[p][r] += 1;
        }
        Self {
            classes: classes.to_vec(),
            table,
        }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn table(&self) -> &[Vec<usize>] {
        &self.table
    }

    pub fn total(&self) -> usize {
        self.table.iter().flatten().sum()
    }

    fn correct(&self) -> usize {
        (0..self.classes.len()).map(|i| self.table[i][i]).sum()
    }

    fn row_sums(&self) -> Vec<usize> {
        self.table.iter().map(|row| row.iter().sum()).collect()
    }

    fn col_sums(&self) -> Vec<usize> {
        let k = self.classes.len();
        (0..k).map(|j| (0..k).map(|i| self.table[i][j]).sum()).collect()
    }

    /// Fraction of correct predictions (NaN for an empty table).
    pub fn accuracy(&self) -> f64 {
        let n = self.total();
        if n == 0 {
            return f64::NAN;
        }
        self.correct() as f64 / n as f64
    }

    /// Cohen's kappa: (p_o − p_e) / (1 − p_e).
    ///
    /// NaN when chance agreement is already perfect (p_e = 1) or the table is empty.
    pub fn kappa(&self) -> f64 {
        let n = self.total() as f64;
        if n == 0.0 {
            return f64::NAN;
        }
        let po = self.correct() as f64 / n;
        let pe = self
            .row_sums()
            .iter()
            .zip(self.col_sums())
            .map(|(&r, c)| r as f64 * c as f64)
            .sum::<f64>()
            / (n * n);
        if (1.0 - pe).abs() < f64::EPSILON {
            f64::NAN
        } else {
            (po - pe) / (1.0 - pe)
        }
    }

    /// Largest reference-class share.
    pub fn no_information_rate(&self) -> f64 {
        let n = self.total();
        if n == 0 {
            return f64::NAN;
        }
        self.col_sums().into_iter().max().unwrap_or(0) as f64 / n as f64
    }

    /// Full statistics block.
    pub fn stats(&self) -> ConfusionStats {
        let n = self.total();
        let correct = self.correct();
        let nir = self.no_information_rate();
        let (accuracy_lower, accuracy_upper) = clopper_pearson(correct, n, CONFIDENCE_ALPHA);

        let overall = OverallStats {
            accuracy: self.accuracy(),
            accuracy_lower,
            accuracy_upper,
            no_information_rate: nir,
            accuracy_p_value: binomial_upper_tail(correct, n, nir),
            kappa: self.kappa(),
            mcnemar_p_value: self.mcnemar_p_value(),
        };

        ConfusionStats {
            classes: self.classes.clone(),
            table: self.table.clone(),
            overall,
            by_class: (0..self.classes.len()).map(|c| self.class_stats(c)).collect(),
        }
    }

    /// Bowker's symmetry test (McNemar for two classes, with continuity correction).
    ///
    /// `None` when any mirrored off-diagonal pair is empty or there is only one class.
    pub fn mcnemar_p_value(&self) -> Option<f64> {
        let k = self.classes.len();
        if k < 2 {
            return None;
        }
        let mut statistic = 0.0;
        for i in 0..k {
            for j in (i + 1)..k {
                let (a, b) = (self.table[i][j] as f64, self.table[j][i] as f64);
                if a + b == 0.0 {
                    return None;
                }
                let diff = if k == 2 { ((a - b).abs() - 1.0).max(0.0) } else { (a - b).abs() };
                statistic += diff * diff / (a + b);
            }
        }
        let df = (k * (k - 1) / 2) as f64;
        ChiSquared::new(df)
            .ok()
            .map(|dist| (1.0 - dist.cdf(statistic)).clamp(0.0, 1.0))
    }

    /// One-vs-rest statistics with `class` as the positive class.
    fn class_stats(&self, class: usize) -> ClassStats {
        let n = self.total();
        let tp = self.table[class][class];
        let predicted_pos = self.row_sums()[class];
        let actual_pos = self.col_sums()[class];
        let fp = predicted_pos - tp;
        let fn_ = actual_pos - tp;
        let tn = n - tp - fp - fn_;

        let sensitivity = ratio(tp, tp + fn_);
        let specificity = ratio(tn, tn + fp);
        ClassStats {
            class: self.classes[class].clone(),
            sensitivity,
            specificity,
            pos_pred_value: ratio(tp, tp + fp),
            neg_pred_value: ratio(tn, tn + fn_),
            prevalence: ratio(actual_pos, n),
            detection_rate: ratio(tp, n),
            detection_prevalence: ratio(predicted_pos, n),
            balanced_accuracy: sensitivity.zip(specificity).map(|(se, sp)| (se + sp) / 2.0),
        }
    }
}

fn ratio(num: usize, den: usize) -> Option<f64> {
    (den > 0).then(|| num as f64 / den as f64)
}

/// Exact binomial interval for `x` successes out of `n`.
fn clopper_pearson(x: usize, n: usize, alpha: f64) -> (f64, f64) {
    if n == 0 {
        return (f64::NAN, f64::NAN);
    }
    let (xf, nf) = (x as f64, n as f64);
    let lower = if x == 0 {
        0.0
    } else {
        beta_quantile(xf, nf - xf + 1.0, alpha / 2.0)
    };
    let upper = if x == n {
        1.0
    } else {
        beta_quantile(xf + 1.0, nf - xf, 1.0 - alpha / 2.0)
    };
    (lower, upper)
}

/// Quantile of Beta(a, b) by bisection on [0, 1].
fn beta_quantile(a: f64, b: f64, p: f64) -> f64 {
    let Ok(dist) = Beta::new(a, b) else {
        return f64::NAN;
    };
    let (mut lo, mut hi) = (0.0f64, 1.0f64);
    for _ in 0..BISECTION_STEPS {
        let mid = (lo + hi) / 2.0;
        if dist.cdf(mid) < p {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    (lo + hi) / 2.0
}

/// P(X ≥ x) for X ~ Binomial(n, p).
fn binomial_upper_tail(x: usize, n: usize, p: f64) -> f64 {
    if n == 0 || !p.is_finite() {
        return f64::NAN;
    }
    if x == 0 {
        return 1.0;
    }
    match Binomial::new(p, n as u64) {
        Ok(dist) => (1.0 - dist.cdf(x as u64 - 1)).clamp(0.0, 1.0),
        Err(_) => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn matrix(table: Vec<Vec<usize>>, names: &[&str]) -> ConfusionMatrix {
        ConfusionMatrix {
            classes: classes(names),
            table,
        }
    }

    #[test]
    fn test_tabulates_predicted_by_reference() {
        let cm = ConfusionMatrix::from_predictions(&[0, 1, 1, 0], &[0, 1, 0, 0], &classes(&["A", "B"]));
        assert_eq!(cm.table(), &[vec![2, 0], vec![1, 1]]);
        assert_eq!(cm.total(), 4);
        assert!((cm.accuracy() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_kappa_known_value() {
        // po = 0.7, pe = (0.5·0.6 + 0.5·0.4) = 0.5, kappa = 0.4
        let cm = matrix(vec![vec![40, 10], vec![20, 30]], &["A", "B"]);
        assert!((cm.kappa() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_kappa_undefined_when_single_class_everywhere() {
        let cm = matrix(vec![vec![10, 0], vec![0, 0]], &["A", "B"]);
        assert!(cm.kappa().is_nan());
    }

    #[test]
    fn test_perfect_prediction_stats() {
        let cm = matrix(vec![vec![5, 0, 0], vec![0, 3, 0], vec![0, 0, 2]], &["A", "B", "C"]);
        let stats = cm.stats();
        assert_eq!(stats.overall.accuracy, 1.0);
        assert_eq!(stats.overall.accuracy_upper, 1.0);
        assert!(stats.overall.accuracy_lower > 0.6 && stats.overall.accuracy_lower < 0.8);
        assert!((stats.overall.kappa - 1.0).abs() < 1e-12);
        assert!((stats.overall.no_information_rate - 0.5).abs() < 1e-12);
        // Every off-diagonal pair is empty
        assert_eq!(stats.overall.mcnemar_p_value, None);
        for c in &stats.by_class {
            assert_eq!(c.sensitivity, Some(1.0));
            assert_eq!(c.specificity, Some(1.0));
            assert_eq!(c.balanced_accuracy, Some(1.0));
        }
    }

    #[test]
    fn test_clopper_pearson_reference_values() {
        // binom.test(8, 10): [0.4439045, 0.9747893]
        let (lo, hi) = clopper_pearson(8, 10, 0.05);
        assert!((lo - 0.443_904_5).abs() < 1e-5, "lower {lo}");
        assert!((hi - 0.974_789_3).abs() < 1e-5, "upper {hi}");
    }

    #[test]
    fn test_accuracy_p_value() {
        // P(X >= 8 | n=10, p=0.5) = 56/1024
        let p = binomial_upper_tail(8, 10, 0.5);
        assert!((p - 56.0 / 1024.0).abs() < 1e-9);
        assert_eq!(binomial_upper_tail(0, 10, 0.5), 1.0);
    }

    #[test]
    fn test_mcnemar_two_class_with_correction() {
        // (|10 - 4| - 1)² / 14 = 25/14
        let cm = matrix(vec![vec![20, 10], vec![4, 30]], &["A", "B"]);
        let p = cm.mcnemar_p_value().unwrap();
        let expected = 1.0 - ChiSquared::new(1.0).unwrap().cdf(25.0 / 14.0);
        assert!((p - expected).abs() < 1e-12);
    }

    #[test]
    fn test_per_class_one_vs_rest() {
        let cm = matrix(vec![vec![40, 10], vec![20, 30]], &["A", "B"]);
        let stats = cm.stats();
        let a = &stats.by_class[0];
        // tp 40, fp 10, fn 20, tn 30
        assert!((a.sensitivity.unwrap() - 40.0 / 60.0).abs() < 1e-12);
        assert!((a.specificity.unwrap() - 30.0 / 40.0).abs() < 1e-12);
        assert!((a.pos_pred_value.unwrap() - 0.8).abs() < 1e-12);
        assert!((a.neg_pred_value.unwrap() - 0.6).abs() < 1e-12);
        assert!((a.prevalence.unwrap() - 0.6).abs() < 1e-12);
        assert!((a.detection_rate.unwrap() - 0.4).abs() < 1e-12);
        assert!((a.detection_prevalence.unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_unseen_class_has_undefined_sensitivity() {
        let cm = matrix(vec![vec![3, 0], vec![1, 0]], &["A", "B"]);
        let stats = cm.stats();
        assert_eq!(stats.by_class[1].sensitivity, None);
        assert_eq!(stats.by_class[1].balanced_accuracy, None);
        assert_eq!(stats.by_class[1].pos_pred_value, Some(0.0));
    }
}
