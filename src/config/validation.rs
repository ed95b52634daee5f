//! Config validation: unknown-key detection with Levenshtein suggestions
//! and suspicious-value warnings.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

use super::ReportConfig;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, ", did you mean '{s}'?")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for ReportConfig.
///
/// Maintained manually to match the struct hierarchy in report_config.rs.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [run]
        "run",
        "run.seed",
        // [input]
        "input",
        "input.train_path",
        "input.test_path",
        "input.delimiter",
        "input.na_tokens",
        "input.label_column",
        "input.id_column",
        // [cleaning]
        "cleaning",
        "cleaning.metadata_columns",
        "cleaning.fill_value",
        // [filtering]
        "filtering",
        "filtering.freq_cut",
        "filtering.unique_cut",
        "filtering.nzv_rule",
        "filtering.correlation_cutoff",
        // [partition]
        "partition",
        "partition.train_fraction",
        // [forest]
        "forest",
        "forest.n_trees",
        "forest.mtry",
        "forest.min_node_size",
        "forest.max_depth",
        "forest.threads",
        // [cross_validation]
        "cross_validation",
        "cross_validation.folds",
        "cross_validation.repeats",
        // [output]
        "output",
        "output.dir",
        "output.confusion_plot",
        "output.correlation_plot",
        "output.cell_px",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
///
/// Ties resolve to the lexicographically smallest key so output is stable.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|&k| (levenshtein(unknown, k), k))
        .filter(|(dist, _)| *dist <= 3)
        .min()
        .map(|(_, k)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys, it only warns.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are handled by serde later
    };

    let known = known_config_keys();
    let mut warnings = Vec::new();

    for key in walk_toml_keys(&value, "") {
        if !known.contains(key.as_str()) {
            let suggestion = suggest_correction(&key, &known);
            let message = format!("Unknown config key '{key}'");
            warnings.push(ValidationWarning {
                field: key,
                message,
                suggestion,
            });
        }
    }

    warnings
}

// ============================================================================
// Suspicious Values
// ============================================================================

/// Values that are legal but unlikely to be intended.
pub fn validate_suspicious_values(config: &ReportConfig) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let mut warn = |field: &str, message: String| {
        warnings.push(ValidationWarning {
            field: field.to_string(),
            message,
            suggestion: None,
        });
    };

    if config.forest.n_trees < 50 {
        warn(
            "forest.n_trees",
            format!("forest.n_trees = {} gives a noisy vote; 500 is the reference value", config.forest.n_trees),
        );
    }
    if config.filtering.correlation_cutoff < 0.5 {
        warn(
            "filtering.correlation_cutoff",
            format!(
                "filtering.correlation_cutoff = {:.2} will discard most sensor axes",
                config.filtering.correlation_cutoff
            ),
        );
    }
    if config.cleaning.metadata_columns == 0 {
        warn(
            "cleaning.metadata_columns",
            "cleaning.metadata_columns = 0 keeps row index and timestamps as predictors".to_string(),
        );
    }
    if config.cross_validation.folds > 20 {
        warn(
            "cross_validation.folds",
            format!("cross_validation.folds = {} leaves very small hold-out sets", config.cross_validation.folds),
        );
    }

    warnings
}
