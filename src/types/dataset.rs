//! Tabular data types: raw string tables, numeric predictor matrices, labels.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ============================================================================
// Raw Table (as read from disk)
// ============================================================================

/// A delimited file held column-major as raw string cells.
///
/// Every column has exactly `n_rows` cells; the loader rejects ragged rows.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    /// Header names in file order
    pub headers: Vec<String>,
    /// `columns[j][i]` = cell at row `i`, column `j`
    pub columns: Vec<Vec<String>>,
}

impl RawTable {
    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    pub fn n_cols(&self) -> usize {
        self.headers.len()
    }

    /// Position of a header by exact name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

// ============================================================================
// Feature Matrix
// ============================================================================

/// Named numeric predictor columns, column-major.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
    n_rows: usize,
}

/// A projection asked for a predictor the matrix does not carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingColumns(pub Vec<String>);

impl FeatureMatrix {
    /// Build a matrix from parallel name/column lists.
    ///
    /// Returns `None` when the lists disagree in length or the columns are ragged.
    pub fn new(names: Vec<String>, columns: Vec<Vec<f64>>) -> Option<Self> {
        if names.len() != columns.len() {
            return None;
        }
        let n_rows = columns.first().map_or(0, Vec::len);
        if columns.iter().any(|c| c.len() != n_rows) {
            return None;
        }
        Some(Self { names, columns, n_rows })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn column(&self, j: usize) -> &[f64] {
        &self.columns[j]
    }

    pub fn columns(&self) -> &[Vec<f64>] {
        &self.columns
    }

    #[inline]
    pub fn value(&self, row: usize, col: usize) -> f64 {
        self.columns[col][row]
    }

    /// Keep only the columns at `indices` (in the given order).
    pub fn select_columns(&self, indices: &[usize]) -> Self {
        Self {
            names: indices.iter().map(|&j| self.names[j].clone()).collect(),
            columns: indices.iter().map(|&j| self.columns[j].clone()).collect(),
            n_rows: self.n_rows,
        }
    }

    /// Keep only the rows at `rows` (in the given order, duplicates allowed).
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        Self {
            names: self.names.clone(),
            columns: self
                .columns
                .iter()
                .map(|col| rows.iter().map(|&i| col[i]).collect())
                .collect(),
            n_rows: rows.len(),
        }
    }

    /// Reorder/select columns to match `names` exactly.
    pub fn project(&self, names: &[String]) -> Result<Self, MissingColumns> {
        let mut indices = Vec::with_capacity(names.len());
        let mut missing = Vec::new();
        for name in names {
            match self.names.iter().position(|n| n == name) {
                Some(j) => indices.push(j),
                None => missing.push(name.clone()),
            }
        }
        if missing.is_empty() {
            Ok(self.select_columns(&indices))
        } else {
            Err(MissingColumns(missing))
        }
    }
}

// ============================================================================
// Labels
// ============================================================================

/// A nominal label column encoded as class codes over sorted class names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSet {
    classes: Vec<String>,
    codes: Vec<usize>,
}

impl LabelSet {
    /// Encode raw labels; classes are the sorted distinct values.
    pub fn encode(raw: &[String]) -> Self {
        let classes: Vec<String> = raw
            .iter()
            .map(|s| s.trim().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let codes = raw
            .iter()
            .map(|s| {
                let s = s.trim();
                // Every trimmed value was inserted above
                classes.iter().position(|c| c == s).unwrap_or(0)
            })
            .collect();
        Self { classes, codes }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn codes(&self) -> &[usize] {
        &self.codes
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn class_name(&self, code: usize) -> &str {
        &self.classes[code]
    }

    /// Row count per class code.
    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.classes.len()];
        for &c in &self.codes {
            counts[c] += 1;
        }
        counts
    }

    pub fn select_rows(&self, rows: &[usize]) -> Self {
        Self {
            classes: self.classes.clone(),
            codes: rows.iter().map(|&i| self.codes[i]).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix() -> FeatureMatrix {
        FeatureMatrix::new(
            vec!["a".into(), "b".into(), "c".into()],
            vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0], vec![7.0, 8.0, 9.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_ragged_columns_rejected() {
        let m = FeatureMatrix::new(vec!["a".into(), "b".into()], vec![vec![1.0], vec![1.0, 2.0]]);
        assert!(m.is_none());
    }

    #[test]
    fn test_project_reorders_by_name() {
        let m = matrix();
        let p = m.project(&["c".to_string(), "a".to_string()]).unwrap();
        assert_eq!(p.names(), &["c".to_string(), "a".to_string()]);
        assert_eq!(p.column(0), &[7.0, 8.0, 9.0]);
        assert_eq!(p.n_rows(), 3);
    }

    #[test]
    fn test_project_reports_missing() {
        let err = matrix().project(&["a".to_string(), "zz".to_string()]).unwrap_err();
        assert_eq!(err.0, vec!["zz".to_string()]);
    }

    #[test]
    fn test_select_rows_allows_duplicates() {
        let m = matrix().select_rows(&[2, 2, 0]);
        assert_eq!(m.n_rows(), 3);
        assert_eq!(m.column(1), &[6.0, 6.0, 4.0]);
    }

    #[test]
    fn test_label_encoding_sorted() {
        let raw: Vec<String> = ["C", "A", "B", "A"].iter().map(|s| s.to_string()).collect();
        let labels = LabelSet::encode(&raw);
        assert_eq!(labels.classes(), &["A".to_string(), "B".to_string(), "C".to_string()]);
        assert_eq!(labels.codes(), &[2, 0, 1, 0]);
        assert_eq!(labels.class_counts(), vec![2, 1, 1]);
    }
}
