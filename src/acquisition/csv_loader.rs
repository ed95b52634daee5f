//! Delimited-file loader
//!
//! Reads a header row plus data rows into a column-major [`RawTable`] of
//! untouched string cells. Type coercion happens later, in the cleaning
//! stage, so the loader never guesses types.
//!
//! The sensor exports carry a leading unnamed row-index column (header `""`)
//! and quoted text cells; both are handled by the `csv` crate.

use std::io::Read;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::types::RawTable;

/// Loader errors
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("CSV error in {name} at data row {row}: {source}")]
    Csv {
        name: String,
        row: usize,
        #[source]
        source: csv::Error,
    },

    #[error("{0} has no header row")]
    NoHeader(String),

    #[error("{0} has a header but no data rows")]
    NoRows(String),
}

/// Options for reading one delimited file.
#[derive(Debug, Clone, Copy)]
pub struct CsvOptions {
    pub delimiter: u8,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

/// Load a delimited file with a header row.
pub fn load_table(path: impl AsRef<Path>, options: CsvOptions) -> Result<RawTable, LoadError> {
    let path = path.as_ref();
    let reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(true)
        .from_path(path)
        .map_err(|source| LoadError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    let table = read_records(reader, &path.display().to_string())?;
    info!(
        path = %path.display(),
        rows = table.n_rows(),
        cols = table.n_cols(),
        "Loaded table"
    );
    Ok(table)
}

/// Load from any reader (used for in-memory data and tests).
pub fn load_from_reader<R: Read>(
    rdr: R,
    name: &str,
    options: CsvOptions,
) -> Result<RawTable, LoadError> {
    let reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(true)
        .from_reader(rdr);
    read_records(reader, name)
}

fn read_records<R: Read>(mut reader: csv::Reader<R>, name: &str) -> Result<RawTable, LoadError> {
    let headers: Vec<String> = reader
        .headers()
        .map_err(|source| LoadError::Csv {
            name: name.to_string(),
            row: 0,
            source,
        })?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.is_empty() || (headers.len() == 1 && headers[0].is_empty()) {
        return Err(LoadError::NoHeader(name.to_string()));
    }

    let mut columns: Vec<Vec<String>> = vec![Vec::new(); headers.len()];

    for (row_no, result) in reader.records().enumerate() {
        // Rows whose width differs from the header surface here as UnequalLengths
        let record = result.map_err(|source| LoadError::Csv {
            name: name.to_string(),
            row: row_no + 1,
            source,
        })?;
        for (col, value) in columns.iter_mut().zip(record.iter()) {
            col.push(value.to_string());
        }
    }

    let table = RawTable { headers, columns };
    if table.n_rows() == 0 {
        return Err(LoadError::NoRows(name.to_string()));
    }
    debug!(name, rows = table.n_rows(), "Parsed delimited records");
    Ok(table)
}
