//! Cleaning Stage
//!
//! Turns a raw string table into a numeric predictor matrix:
//! 1. Drop the leading metadata columns (row index, user, timestamps, window fields)
//! 2. Split off the label column and the row-id column by name
//! 3. Coerce every remaining cell to `f64`; NA tokens and parse failures are missing
//! 4. Replace every missing cell with the fill value (zero by default)
//!
//! The same function is applied to the training and the test table, so both
//! lose the same leading column positions and go through identical coercion.
//!
//! Zero-filling happens before variance and correlation filtering, which biases
//! those statistics for sparse columns. This is reproduced, not corrected; the
//! number of zero-filled cells is logged and carried in the [`CleaningReport`].

use tracing::{debug, info, warn};

use crate::config::{CleaningConfig, InputConfig};
use crate::types::{CleaningReport, FeatureMatrix, RawTable};

use super::PipelineError;

/// Outcome of coercing a single cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoercedCell {
    Value(f64),
    /// NA token, empty cell or non-finite number
    Missing,
    /// Text that is not a number (e.g. `#DIV/0!`)
    Unparseable,
}

/// Coerce one raw cell to a number.
pub fn coerce_cell(cell: &str, na_tokens: &[String]) -> CoercedCell {
    let s = cell.trim();
    if s.is_empty() || na_tokens.iter().any(|t| t == s) {
        return CoercedCell::Missing;
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => CoercedCell::Value(v),
        Ok(_) => CoercedCell::Missing,
        Err(_) => CoercedCell::Unparseable,
    }
}

/// A cleaned table: numeric predictors plus the split-off label and id columns.
#[derive(Debug, Clone)]
pub struct CleanedTable {
    pub features: FeatureMatrix,
    /// Raw label values, when the table carries the label column
    pub labels: Option<Vec<String>>,
    /// Raw id values, when the table carries the id column
    pub ids: Option<Vec<String>>,
    pub report: CleaningReport,
}

/// Remove the first `metadata_columns` columns.
///
/// The result always has exactly `raw.n_cols() - metadata_columns` columns.
pub fn drop_metadata_columns(
    raw: &RawTable,
    metadata_columns: usize,
    table: &str,
) -> Result<RawTable, PipelineError> {
    if raw.n_cols() <= metadata_columns {
        return Err(PipelineError::TooFewColumns {
            table: table.to_string(),
            cols: raw.n_cols(),
            metadata: metadata_columns,
        });
    }
    Ok(RawTable {
        headers: raw.headers[metadata_columns..].to_vec(),
        columns: raw.columns[metadata_columns..].to_vec(),
    })
}

/// Warn when the two tables disagree on what the dropped leading columns are.
///
/// Returns the positions whose header names differ.
pub fn check_metadata_alignment(train: &RawTable, test: &RawTable, metadata_columns: usize) -> Vec<usize> {
    let mismatched: Vec<usize> = (0..metadata_columns)
        .filter(|&j| train.headers.get(j) != test.headers.get(j))
        .collect();
    for &j in &mismatched {
        warn!(
            position = j,
            train = train.headers.get(j).map_or("<none>", String::as_str),
            test = test.headers.get(j).map_or("<none>", String::as_str),
            "Dropped metadata columns differ between training and test tables"
        );
    }
    mismatched
}

/// Cleaning stage bound to one configuration.
pub struct Cleaner<'a> {
    input: &'a InputConfig,
    cleaning: &'a CleaningConfig,
}

impl<'a> Cleaner<'a> {
    pub fn new(input: &'a InputConfig, cleaning: &'a CleaningConfig) -> Self {
        Self { input, cleaning }
    }

    /// Clean one table.
    ///
    /// `require_label` makes a missing label column an error (training table).
    pub fn clean(
        &self,
        raw: &RawTable,
        table: &str,
        require_label: bool,
    ) -> Result<CleanedTable, PipelineError> {
        let kept = drop_metadata_columns(raw, self.cleaning.metadata_columns, table)?;
        let dropped_columns = raw.headers[..self.cleaning.metadata_columns].to_vec();

        let label_idx = kept.column_index(&self.input.label_column);
        if require_label && label_idx.is_none() {
            return Err(PipelineError::MissingLabel {
                table: table.to_string(),
                column: self.input.label_column.clone(),
            });
        }
        let id_idx = kept.column_index(&self.input.id_column);

        let mut report = CleaningReport {
            dropped_columns,
            ..Default::default()
        };
        let mut names = Vec::with_capacity(kept.n_cols());
        let mut columns = Vec::with_capacity(kept.n_cols());

        for (j, (name, cells)) in kept.headers.iter().zip(&kept.columns).enumerate() {
            if Some(j) == label_idx || Some(j) == id_idx {
                continue;
            }
            let mut values = Vec::with_capacity(cells.len());
            let mut unparseable = 0usize;
            for cell in cells {
                match coerce_cell(cell, &self.input.na_tokens) {
                    CoercedCell::Value(v) => values.push(v),
                    CoercedCell::Missing => {
                        report.missing_filled += 1;
                        values.push(self.cleaning.fill_value);
                    }
                    CoercedCell::Unparseable => {
                        unparseable += 1;
                        values.push(self.cleaning.fill_value);
                    }
                }
            }
            if unparseable > 0 {
                debug!(table, column = %name, unparseable, "Coerced nominal column to numeric");
                report.coerced_columns.push(name.clone());
                report.unparseable_filled += unparseable;
            }
            names.push(name.clone());
            columns.push(values);
        }

        let features = FeatureMatrix::new(names, columns).ok_or_else(|| {
            PipelineError::InvalidInput(format!("{table}: columns have unequal lengths"))
        })?;

        if report.unparseable_filled > 0 {
            warn!(
                table,
                cells = report.unparseable_filled,
                columns = report.coerced_columns.len(),
                "Non-numeric cells replaced with {}",
                self.cleaning.fill_value
            );
        }
        info!(
            table,
            rows = features.n_rows(),
            predictors = features.n_cols(),
            missing_filled = report.missing_filled,
            "Cleaned table"
        );

        Ok(CleanedTable {
            features,
            labels: label_idx.map(|j| kept.columns[j].clone()),
            ids: id_idx.map(|j| kept.columns[j].clone()),
            report,
        })
    }
}
