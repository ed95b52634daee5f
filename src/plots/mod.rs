//! Diagnostic Plots
//!
//! PNG renderings of the validation confusion matrix and the retained-predictor
//! correlation matrix. Images carry no text; cell order follows the class and
//! predictor order printed in the report.

pub mod heatmap;

use std::path::PathBuf;

use thiserror::Error;

pub use heatmap::{render_confusion, render_correlation, save_confusion_plot, save_correlation_plot};

#[derive(Debug, Error)]
pub enum PlotError {
    #[error("nothing to plot: {0}")]
    Empty(&'static str),

    #[error("plot of {cells} cells at {cell_px}px exceeds the image size limit")]
    TooLarge { cells: usize, cell_px: u32 },

    #[error("failed to write plot {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}
