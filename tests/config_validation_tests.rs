//! Config Validation Tests
//!
//! Typo detection, range validation and round-tripping of `ReportConfig`,
//! exercised independently from the rest of the workflow.

use activity_forest::config::validation::{
    known_config_keys, suggest_correction, validate_suspicious_values, validate_unknown_keys,
};
use activity_forest::config::{ConfigError, NzvRule, ReportConfig};

// ============================================================================
// Typo Detection
// ============================================================================

#[test]
fn typo_in_filtering_key_warns_with_suggestion() {
    let toml_str = r#"
[filtering]
corelation_cutoff = 0.8
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1, "Expected exactly 1 warning");
    assert!(warnings[0].field.contains("corelation_cutoff"));
    assert_eq!(
        warnings[0].suggestion.as_deref(),
        Some("filtering.correlation_cutoff"),
        "Should suggest the correct spelling"
    );
}

#[test]
fn typo_in_forest_section_warns() {
    let toml_str = r#"
[forest]
mtyr = 8
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1);
    // "mtyr" is distance 2 from "mtry"
    assert_eq!(warnings[0].suggestion.as_deref(), Some("forest.mtry"));
}

#[test]
fn valid_config_produces_zero_warnings() {
    let toml_str = r##"
[run]
seed = 7

[input]
train_path = "train.csv"
test_path = "test.csv"
delimiter = ";"
na_tokens = ["NA", "#DIV/0!"]
label_column = "classe"
id_column = "problem_id"

[cleaning]
metadata_columns = 7
fill_value = 0.0

[filtering]
freq_cut = 19.0
unique_cut = 10.0
nzv_rule = "either"
correlation_cutoff = 0.9

[partition]
train_fraction = 0.75

[forest]
n_trees = 200
mtry = 8
min_node_size = 1
max_depth = 30
threads = 4

[cross_validation]
folds = 10
repeats = 3

[output]
dir = "plots"
confusion_plot = "cm.png"
correlation_plot = "corr.png"
cell_px = 12
"##;
    let warnings = validate_unknown_keys(toml_str);
    assert!(
        warnings.is_empty(),
        "Valid config should produce 0 warnings, got: {:?}",
        warnings.iter().map(|w| &w.field).collect::<Vec<_>>()
    );

    let config = ReportConfig::from_toml_str(toml_str).expect("valid config should parse");
    assert_eq!(config.run.seed, 7);
    assert_eq!(config.input.delimiter_byte(), b';');
    assert_eq!(config.filtering.nzv_rule, NzvRule::Either);
    assert_eq!(config.forest.max_depth, Some(30));
    assert_eq!(config.output.cell_px, 12);
}

#[test]
fn unknown_section_warns() {
    let toml_str = r#"
[boosting]
rounds = 42
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert!(!warnings.is_empty(), "Unknown section should produce at least 1 warning");
    assert!(warnings.iter().any(|w| w.field.contains("boosting")));
}

#[test]
fn multiple_typos_all_warned() {
    let toml_str = r#"
[forest]
n_tress = 100

[partition]
train_fracton = 0.7
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 2, "Expected 2 warnings for 2 typos, got {}", warnings.len());
}

#[test]
fn empty_toml_produces_zero_warnings() {
    assert!(validate_unknown_keys("").is_empty());
}

#[test]
fn known_keys_set_is_complete() {
    let config = ReportConfig::default();
    let toml_str = config.to_toml().expect("Default config should serialize");
    let warnings = validate_unknown_keys(&toml_str);
    assert!(
        warnings.is_empty(),
        "Default config serialization should produce 0 unknown-key warnings, got: {:?}",
        warnings.iter().map(|w| &w.field).collect::<Vec<_>>()
    );
}

#[test]
fn suggest_correction_returns_none_for_garbage() {
    let known = known_config_keys();
    assert!(suggest_correction("zzz_completely_invalid_xyz_12345", &known).is_none());
}

// ============================================================================
// Range Validation
// ============================================================================

fn validation_errors(config: &ReportConfig) -> Vec<String> {
    match config.validate() {
        Err(ConfigError::Validation(errors)) => errors,
        Err(other) => panic!("unexpected error kind: {other}"),
        Ok(()) => Vec::new(),
    }
}

#[test]
fn all_defaults_pass_validation() {
    let config = ReportConfig::default();
    assert!(config.validate().is_ok(), "Default config must always pass validation");
    assert!(validate_suspicious_values(&config).is_empty());
}

#[test]
fn correlation_cutoff_above_one_is_error() {
    let mut config = ReportConfig::default();
    config.filtering.correlation_cutoff = 1.5;
    assert!(validation_errors(&config).iter().any(|e| e.contains("correlation_cutoff")));
}

#[test]
fn train_fraction_bounds_are_exclusive() {
    for bad in [0.0, 1.0, -0.2, f64::NAN] {
        let mut config = ReportConfig::default();
        config.partition.train_fraction = bad;
        assert!(
            validation_errors(&config).iter().any(|e| e.contains("train_fraction")),
            "train_fraction {bad} should be rejected"
        );
    }
}

#[test]
fn single_fold_is_error() {
    let mut config = ReportConfig::default();
    config.cross_validation.folds = 1;
    assert!(validation_errors(&config).iter().any(|e| e.contains("cross_validation.folds")));
}

#[test]
fn non_finite_fill_value_is_error() {
    for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        let mut config = ReportConfig::default();
        config.cleaning.fill_value = bad;
        assert!(
            validation_errors(&config).iter().any(|e| e.contains("cleaning.fill_value")),
            "fill_value {bad} should be rejected"
        );
    }

    let result = ReportConfig::from_toml_str("[cleaning]\nfill_value = nan\n");
    assert!(matches!(result, Err(ConfigError::Validation(_))));
}

#[test]
fn multi_char_delimiter_is_error() {
    let mut config = ReportConfig::default();
    config.input.delimiter = "::".to_string();
    assert!(validation_errors(&config).iter().any(|e| e.contains("delimiter")));
}

#[test]
fn every_violation_is_reported() {
    let mut config = ReportConfig::default();
    config.forest.n_trees = 0;
    config.forest.mtry = 0;
    config.output.cell_px = 1;
    assert_eq!(validation_errors(&config).len(), 3);
}

#[test]
fn few_trees_is_warning_not_error() {
    let mut config = ReportConfig::default();
    config.forest.n_trees = 10;
    assert!(config.validate().is_ok());
    assert!(validate_suspicious_values(&config)
        .iter()
        .any(|w| w.field == "forest.n_trees"));
}

#[test]
fn from_toml_str_rejects_out_of_range_values() {
    let result = ReportConfig::from_toml_str("[partition]\ntrain_fraction = 1.5\n");
    assert!(matches!(result, Err(ConfigError::Validation(_))));
}

// ============================================================================
// Config Roundtrip Tests
// ============================================================================

#[test]
fn config_roundtrip_preserves_values() {
    let mut original = ReportConfig::default();
    original.run.seed = 99;
    original.filtering.correlation_cutoff = 0.75;
    original.forest.max_depth = Some(12);
    original.input.na_tokens = vec!["NA".to_string(), "".to_string()];

    let toml_str = original.to_toml().expect("Serialization should work");
    let roundtripped = ReportConfig::from_toml_str(&toml_str).expect("Deserialization should work");
    assert_eq!(roundtripped, original);
}

#[test]
fn partial_file_fills_defaults() {
    let config = ReportConfig::from_toml_str("[forest]\nn_trees = 100\n").expect("partial config parses");
    assert_eq!(config.forest.n_trees, 100);
    assert_eq!(config.forest.mtry, ReportConfig::default().forest.mtry);
    assert_eq!(config.cleaning, ReportConfig::default().cleaning);
}
