//! Plain-text rendering of a [`RunReport`].
//!
//! Layout follows the order the workflow runs in: dimensions, filters,
//! cross-validation, forest, validation statistics, test predictions.

use std::fmt::Write;

use crate::types::{ClassStats, ConfusionStats, CvSummary, ForestSummary, RunReport};

const RULE: &str = "────────────────────────────────────────────────────────────";

/// Format an optional statistic; undefined values print as `NA`.
fn opt(v: Option<f64>) -> String {
    v.filter(|x| x.is_finite()).map_or_else(|| "NA".to_string(), |x| format!("{x:.4}"))
}

fn num(v: f64) -> String {
    opt(Some(v))
}

fn p_value(v: f64) -> String {
    if !v.is_finite() {
        "NA".to_string()
    } else if v < 2.2e-16 {
        "< 2.2e-16".to_string()
    } else {
        format!("{v:.4}")
    }
}

fn section(out: &mut String, title: &str) {
    let _ = writeln!(out, "\n{RULE}\n  {title}\n{RULE}");
}

/// Render the whole report, listing the `top_n` most important predictors.
pub fn render(report: &RunReport, top_n: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Activity quality report (seed {}, {})", report.seed, report.generated_at.to_rfc3339());

    section(&mut out, "Dimensions");
    for d in &report.dimensions {
        let _ = writeln!(out, "  {:<24} {:>7} rows  {:>4} cols", d.stage, d.rows, d.cols);
    }
    let cleaning = &report.training_cleaning;
    let _ = writeln!(
        out,
        "  training cells zero-filled: {} NA, {} non-numeric ({} columns coerced)",
        cleaning.missing_filled,
        cleaning.unparseable_filled,
        cleaning.coerced_columns.len()
    );
    let cleaning = &report.test_cleaning;
    let _ = writeln!(
        out,
        "  testing cells zero-filled:  {} NA, {} non-numeric ({} columns coerced)",
        cleaning.missing_filled,
        cleaning.unparseable_filled,
        cleaning.coerced_columns.len()
    );

    section(&mut out, "Predictor filters");
    let f = &report.filters;
    let _ = writeln!(out, "  near-zero variance removed: {}", f.near_zero_variance.len());
    let _ = writeln!(
        out,
        "  correlated (|r| > {:.2}) removed: {} {}",
        f.correlation_cutoff,
        f.correlated.len(),
        if f.correlated.is_empty() { String::new() } else { format!("[{}]", f.correlated.join(", ")) }
    );
    let _ = writeln!(out, "  retained predictors: {}", f.retained.len());

    section(&mut out, "Random forest: cross-validation");
    render_cv(&mut out, &report.cross_validation);

    section(&mut out, "Random forest: final model");
    render_forest(&mut out, &report.forest, top_n);

    section(&mut out, "Validation: confusion matrix and statistics");
    render_confusion(&mut out, &report.validation);

    section(&mut out, "Test predictions");
    for (i, p) in report.test_predictions.iter().enumerate() {
        let _ = write!(out, "  {:>4}: {:<3}", p.id, p.class);
        if (i + 1) % 5 == 0 {
            out.push('\n');
        }
    }
    if report.test_predictions.len() % 5 != 0 {
        out.push('\n');
    }
    out
}

fn render_cv(out: &mut String, cv: &CvSummary) {
    let _ = writeln!(out, "  {} samples", cv.n_samples);
    let _ = writeln!(out, "  {} predictors", cv.n_predictors);
    let _ = writeln!(out, "  {} classes: {}", cv.classes.len(), cv.classes.join(", "));
    let _ = writeln!(out, "  Resampling: Cross-Validated ({} fold, repeated {} times)", cv.folds, cv.repeats);
    let _ = writeln!(out, "  mtry held constant at {}, {} trees", cv.mtry, cv.n_trees);
    let _ = writeln!(out, "  Accuracy  {}  (SD {})", num(cv.accuracy_mean), num(cv.accuracy_sd));
    let _ = writeln!(out, "  Kappa     {}  (SD {})", num(cv.kappa_mean), num(cv.kappa_sd));
}

fn render_forest(out: &mut String, forest: &ForestSummary, top_n: usize) {
    let _ = writeln!(out, "  Number of trees: {}", forest.n_trees);
    let _ = writeln!(out, "  Variables tried at each split: {}", forest.mtry);
    let _ = writeln!(
        out,
        "  OOB estimate of error rate: {}",
        forest.oob_error.map_or_else(|| "NA".to_string(), |e| format!("{:.2}%", e * 100.0))
    );
    render_oob_confusion(out, forest);
    let _ = writeln!(out, "\n  Top {} predictors (mean decrease Gini):", top_n.min(forest.importance.len()));
    for (rank, v) in forest.importance.iter().take(top_n).enumerate() {
        let _ = writeln!(out, "  {:>3}. {:<28} {:>10.3}", rank + 1, v.name, v.mean_decrease_gini);
    }
}

/// Out-of-bag confusion with actual classes as rows, plus per-class error.
fn render_oob_confusion(out: &mut String, forest: &ForestSummary) {
    let k = forest.classes.len();
    if forest.oob_confusion.len() != k {
        return;
    }
    let width = forest.classes.iter().map(String::len).max().unwrap_or(1).max(6);
    let _ = writeln!(out, "  Confusion matrix:");
    let _ = write!(out, "  {:<8}", "");
    for c in &forest.classes {
        let _ = write!(out, "{c:>width$}");
    }
    let _ = writeln!(out, "{:>13}", "class.error");
    for (actual, name) in forest.classes.iter().enumerate() {
        let _ = write!(out, "  {name:<8}");
        let mut total = 0usize;
        for predicted in 0..k {
            let v = forest.oob_confusion[predicted][actual];
            total += v;
            let _ = write!(out, "{v:>width$}");
        }
        let wrong = total - forest.oob_confusion[actual][actual];
        let error = (total > 0).then(|| wrong as f64 / total as f64);
        let _ = writeln!(out, "{:>13}", opt(error));
    }
}

fn render_confusion(out: &mut String, stats: &ConfusionStats) {
    let width = stats.classes.iter().map(String::len).max().unwrap_or(1).max(6);
    let _ = writeln!(out, "  {:<12}Reference", "");
    let _ = write!(out, "  {:<12}", "Prediction");
    for c in &stats.classes {
        let _ = write!(out, "{c:>width$}");
    }
    out.push('\n');
    for (c, row) in stats.classes.iter().zip(&stats.table) {
        let _ = write!(out, "  {c:<12}");
        for v in row {
            let _ = write!(out, "{v:>width$}");
        }
        out.push('\n');
    }

    let o = &stats.overall;
    let _ = writeln!(out, "\n  {:<28}: {}", "Accuracy", num(o.accuracy));
    let _ = writeln!(out, "  {:<28}: ({}, {})", "95% CI", num(o.accuracy_lower), num(o.accuracy_upper));
    let _ = writeln!(out, "  {:<28}: {}", "No Information Rate", num(o.no_information_rate));
    let _ = writeln!(out, "  {:<28}: {}", "P-Value [Acc > NIR]", p_value(o.accuracy_p_value));
    let _ = writeln!(out, "  {:<28}: {}", "Kappa", num(o.kappa));
    let _ = writeln!(
        out,
        "  {:<28}: {}",
        "Mcnemar's Test P-Value",
        o.mcnemar_p_value.map_or_else(|| "NA".to_string(), p_value)
    );

    let _ = writeln!(out, "\n  Statistics by Class:");
    let _ = write!(out, "  {:<22}", "");
    for c in &stats.by_class {
        let _ = write!(out, "{:>10}", c.class);
    }
    out.push('\n');
    let rows: [(&str, fn(&ClassStats) -> Option<f64>); 8] = [
        ("Sensitivity", |c| c.sensitivity),
        ("Specificity", |c| c.specificity),
        ("Pos Pred Value", |c| c.pos_pred_value),
        ("Neg Pred Value", |c| c.neg_pred_value),
        ("Prevalence", |c| c.prevalence),
        ("Detection Rate", |c| c.detection_rate),
        ("Detection Prevalence", |c| c.detection_prevalence),
        ("Balanced Accuracy", |c| c.balanced_accuracy),
    ];
    for (label, get) in rows {
        let _ = write!(out, "  {label:<22}");
        for c in &stats.by_class {
            let _ = write!(out, "{:>10}", opt(get(c)));
        }
        out.push('\n');
    }
}
