//! Data acquisition module
//!
//! Handles ingestion of the delimited training and testing files.

pub mod csv_loader;

pub use csv_loader::{load_from_reader, load_table, CsvOptions, LoadError};
