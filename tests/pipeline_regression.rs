//! Pipeline Regression Tests
//!
//! Runs the full workflow on synthetic training/testing CSVs shaped like the
//! weight-lifting dataset: seven leading metadata columns, informative sensor
//! columns, a near-copy of one of them, an all-zero column, a sparse summary
//! column full of blanks and `#DIV/0!`, and the label or id column last.
//!
//! Asserts on cleaning dimensions, filter invariants, partition sizes,
//! accuracy, and determinism across repeated runs and thread counts.

use std::fs;
use std::path::Path;

use activity_forest::config::ReportConfig;
use activity_forest::ml_engine::{ActivityAnalyzer, AnalysisOutcome, PipelineError};
use activity_forest::plots;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const CLASSES: [&str; 5] = ["A", "B", "C", "D", "E"];
const METADATA: [&str; 7] = [
    "",
    "user_name",
    "raw_timestamp_part_1",
    "raw_timestamp_part_2",
    "cvtd_timestamp",
    "new_window",
    "num_window",
];
const SENSORS: [&str; 6] = ["roll_belt", "roll_belt_copy", "pitch_arm", "noise_z", "flat_x", "kurtosis_x"];

/// One CSV row: metadata, sensor cells, then the trailing label/id cell.
fn row(i: usize, class: usize, rng: &mut StdRng, last: &str) -> String {
    let roll = class as f64 * 3.0 + rng.gen_range(-1.0..1.0);
    let copy = roll * 2.0 + rng.gen_range(-0.01..0.01);
    let pitch = if i % 37 == 0 {
        "NA".to_string()
    } else {
        format!("{:.4}", (class % 2) as f64 * 4.0 + rng.gen_range(-1.0..1.0))
    };
    let noise = rng.gen_range(0.0..1.0);
    let kurtosis = match i {
        7 => "1.5",
        _ if i % 50 == 0 => "#DIV/0!",
        _ => "",
    };
    let window = if i % 10 == 0 { "yes" } else { "no" };
    format!(
        "{},user{},{},{},05/12/2011 11:23,{window},{},{roll:.4},{copy:.4},{pitch},{noise:.4},0,{kurtosis},{last}",
        i + 1,
        i % 6,
        1_322_000_000 + i,
        i * 1000,
        i / 20,
    )
}

fn header(last: &str) -> String {
    let mut cols: Vec<&str> = METADATA.to_vec();
    cols.extend(SENSORS);
    cols.push(last);
    cols.join(",")
}

/// Write `per_class` training rows per class and `test_per_class` test rows per class.
fn write_dataset(dir: &Path, per_class: usize, test_per_class: usize) -> Vec<String> {
    let mut rng = StdRng::seed_from_u64(2011);

    let mut train = vec![header("classe")];
    for i in 0..per_class * CLASSES.len() {
        let class = i % CLASSES.len();
        train.push(row(i, class, &mut rng, CLASSES[class]));
    }
    fs::write(dir.join("train.csv"), train.join("\n")).unwrap();

    let mut test = vec![header("problem_id")];
    let mut truth = Vec::new();
    for i in 0..test_per_class * CLASSES.len() {
        let class = i % CLASSES.len();
        test.push(row(i, class, &mut rng, &(i + 1).to_string()));
        truth.push(CLASSES[class].to_string());
    }
    fs::write(dir.join("test.csv"), test.join("\n")).unwrap();
    truth
}

fn config(dir: &Path) -> ReportConfig {
    let mut config = ReportConfig::default();
    config.run.seed = 2024;
    config.input.train_path = dir.join("train.csv");
    config.input.test_path = dir.join("test.csv");
    config.forest.n_trees = 30;
    config.forest.mtry = 2;
    config.cross_validation.folds = 3;
    config.cross_validation.repeats = 1;
    config.output.dir = dir.join("out");
    config
}

fn run(dir: &Path) -> AnalysisOutcome {
    ActivityAnalyzer::run(&config(dir)).unwrap()
}

fn dims(outcome: &AnalysisOutcome, stage: &str) -> (usize, usize) {
    let d = outcome
        .report
        .dimensions
        .iter()
        .find(|d| d.stage == stage)
        .unwrap_or_else(|| panic!("no dimension stage {stage}"));
    (d.rows, d.cols)
}

#[test]
fn cleaning_drops_metadata_and_label() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path(), 40, 4);
    let outcome = run(dir.path());

    assert_eq!(dims(&outcome, "training (raw)"), (200, 14));
    // 14 columns - 7 metadata - 1 label
    assert_eq!(dims(&outcome, "training (cleaned)"), (200, 6));
    // 14 columns - 7 metadata - 1 id
    assert_eq!(dims(&outcome, "testing (cleaned)"), (20, 6));

    let cleaning = &outcome.report.training_cleaning;
    assert_eq!(cleaning.dropped_columns.len(), 7);
    assert_eq!(cleaning.dropped_columns[1], "user_name");
    assert_eq!(cleaning.coerced_columns, vec!["kurtosis_x".to_string()]);
    assert_eq!(cleaning.unparseable_filled, 4);
    // NA in pitch_arm plus blank kurtosis cells
    assert!(cleaning.missing_filled > 190);
}

#[test]
fn filters_remove_flat_sparse_and_redundant_predictors() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path(), 40, 4);
    let outcome = run(dir.path());
    let filters = &outcome.report.filters;

    assert!(filters.near_zero_variance.contains(&"flat_x".to_string()));
    assert!(filters.near_zero_variance.contains(&"kurtosis_x".to_string()));
    assert_eq!(filters.correlated.len(), 1);
    assert!(filters.correlated[0].starts_with("roll_belt"));

    assert_eq!(filters.retained.len(), 3);
    assert!(filters.retained.contains(&"pitch_arm".to_string()));
    assert!(filters.retained.contains(&"noise_z".to_string()));
    assert!(outcome.correlation.max_abs_off_diagonal() <= 0.90);
    assert_eq!(outcome.correlation.names(), filters.retained.as_slice());

    // Test table carries exactly the retained predictors
    assert_eq!(dims(&outcome, "testing (filtered)"), (20, 3));
}

#[test]
fn partition_is_stratified_eighty_twenty() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path(), 40, 4);
    let outcome = run(dir.path());

    assert_eq!(dims(&outcome, "train partition"), (160, 3));
    assert_eq!(dims(&outcome, "validation partition"), (40, 3));

    // 8 validation rows of every class
    let table = &outcome.report.validation.table;
    for class in 0..CLASSES.len() {
        let reference: usize = table.iter().map(|row| row[class]).sum();
        assert_eq!(reference, 8, "class {}", CLASSES[class]);
    }
}

#[test]
fn forest_classifies_validation_and_test_rows() {
    let dir = tempfile::tempdir().unwrap();
    let truth = write_dataset(dir.path(), 40, 4);
    let outcome = run(dir.path());
    let report = &outcome.report;

    assert!(report.validation.overall.accuracy > 0.8, "accuracy {}", report.validation.overall.accuracy);
    assert!(report.validation.overall.accuracy_lower <= report.validation.overall.accuracy);
    assert!(report.cross_validation.accuracy_mean > 0.8);
    assert_eq!(report.cross_validation.resamples.len(), 3);
    assert_eq!(report.forest.n_trees, 30);
    assert_eq!(report.forest.importance.len(), 3);
    assert!(report.forest.importance[0].name.starts_with("roll_belt"));
    let oob_scored: usize = report.forest.oob_confusion.iter().flatten().sum();
    assert!(oob_scored > 0 && oob_scored <= 160);

    assert_eq!(report.test_predictions.len(), 20);
    assert_eq!(report.test_predictions[0].id, "1");
    assert_eq!(report.test_predictions[19].id, "20");
    let correct = report
        .test_predictions
        .iter()
        .zip(&truth)
        .filter(|(p, t)| &p.class == *t)
        .count();
    assert!(correct >= 16, "{correct}/20 test rows correct");
}

#[test]
fn same_seed_reproduces_results() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path(), 30, 2);
    let a = run(dir.path()).report;
    let b = run(dir.path()).report;

    assert_eq!(a.dimensions, b.dimensions);
    assert_eq!(a.filters, b.filters);
    assert_eq!(a.cross_validation, b.cross_validation);
    assert_eq!(a.forest, b.forest);
    assert_eq!(a.validation.table, b.validation.table);
    assert_eq!(a.validation.overall.accuracy, b.validation.overall.accuracy);
    assert_eq!(a.test_predictions, b.test_predictions);
}

#[test]
fn thread_count_does_not_change_results() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path(), 30, 2);
    let config = config(dir.path());

    let single = rayon::ThreadPoolBuilder::new().num_threads(1).build().unwrap();
    let multi = rayon::ThreadPoolBuilder::new().num_threads(3).build().unwrap();
    let a = single.install(|| ActivityAnalyzer::run(&config)).unwrap().report;
    let b = multi.install(|| ActivityAnalyzer::run(&config)).unwrap().report;

    assert_eq!(a.forest, b.forest);
    assert_eq!(a.validation.table, b.validation.table);
    assert_eq!(a.cross_validation.resamples, b.cross_validation.resamples);
    assert_eq!(a.test_predictions, b.test_predictions);
}

#[test]
fn report_serializes_and_plots_render() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path(), 30, 2);
    let config = config(dir.path());
    let outcome = ActivityAnalyzer::run(&config).unwrap();

    let json = serde_json::to_string_pretty(&outcome.report).unwrap();
    assert!(json.contains("\"test_predictions\""));
    assert!(json.contains("\"mean_decrease_gini\""));
    assert!(json.contains("\"oob_confusion\""));

    fs::create_dir_all(&config.output.dir).unwrap();
    plots::save_confusion_plot(&outcome.confusion, config.output.cell_px, &config.output.confusion_plot_path()).unwrap();
    plots::save_correlation_plot(&outcome.correlation, config.output.cell_px, &config.output.correlation_plot_path())
        .unwrap();
    assert!(config.output.confusion_plot_path().exists());
    assert!(config.output.correlation_plot_path().exists());
}

#[test]
fn test_table_missing_retained_predictor_is_error() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path(), 20, 2);

    // Rename pitch_arm in the test header only
    let test_path = dir.path().join("test.csv");
    let contents = fs::read_to_string(&test_path).unwrap().replacen("pitch_arm", "pitch_forearm", 1);
    fs::write(&test_path, contents).unwrap();

    match ActivityAnalyzer::run(&config(dir.path())) {
        Err(PipelineError::IncompatibleColumns(missing)) => assert_eq!(missing, vec!["pitch_arm".to_string()]),
        other => panic!("expected IncompatibleColumns, got {other:?}"),
    }
}

#[test]
fn training_table_without_label_is_error() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path(), 20, 2);
    let mut config = config(dir.path());
    config.input.label_column = "quality".to_string();

    assert!(matches!(
        ActivityAnalyzer::run(&config),
        Err(PipelineError::MissingLabel { ref column, .. }) if column == "quality"
    ));
}

#[test]
fn narrow_table_is_error() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("train.csv"), "a,b,c\n1,2,3\n").unwrap();
    fs::write(dir.path().join("test.csv"), "a,b,c\n1,2,3\n").unwrap();

    assert!(matches!(
        ActivityAnalyzer::run(&config(dir.path())),
        Err(PipelineError::TooFewColumns { cols: 3, metadata: 7, .. })
    ));
}

#[test]
fn missing_file_is_load_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        ActivityAnalyzer::run(&config(dir.path())),
        Err(PipelineError::Load(_))
    ));
}
