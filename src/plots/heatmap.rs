use std::path::Path;

use image::{Rgb, RgbImage};
use palette::{LinSrgb, Mix, Srgb};
use tracing::info;

use crate::ml_engine::{ConfusionMatrix, CorrelationMatrix};

use super::PlotError;

// ---------------------------------------------------------------------------
// Colour scales
// ---------------------------------------------------------------------------

const GRID: Rgb<u8> = Rgb([200, 200, 200]);

/// Largest side length, in pixels, of a rendered plot.
const MAX_SIDE_PX: u64 = 16_384;

fn linear(r: u8, g: u8, b: u8) -> LinSrgb {
    Srgb::new(r, g, b).into_format::<f32>().into_linear()
}

fn to_pixel(colour: LinSrgb) -> Rgb<u8> {
    let srgb: Srgb<u8> = Srgb::<f32>::from_linear(colour).into_format();
    Rgb([srgb.red, srgb.green, srgb.blue])
}

/// White at 0, deep blue at 1.
fn sequential(t: f64) -> Rgb<u8> {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    to_pixel(linear(255, 255, 255).mix(linear(8, 48, 107), t as f32))
}

/// Blue at −1, white at 0, red at +1.
fn diverging(r: f64) -> Rgb<u8> {
    let r = if r.is_finite() { r.clamp(-1.0, 1.0) } else { 0.0 };
    let white = linear(255, 255, 255);
    let end = if r < 0.0 { linear(33, 102, 172) } else { linear(178, 24, 43) };
    to_pixel(white.mix(end, r.abs() as f32))
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Square grid of `n × n` cells with 1-pixel separators.
fn render_grid(n: usize, cell_px: u32, colour: impl Fn(usize, usize) -> Rgb<u8>) -> Result<RgbImage, PlotError> {
    if n == 0 {
        return Err(PlotError::Empty("matrix has no cells"));
    }
    let stride = u64::from(cell_px) + 1;
    let side = n as u64 * stride + 1;
    if side > MAX_SIDE_PX {
        return Err(PlotError::TooLarge { cells: n, cell_px });
    }
    let side = side as u32;
    let stride = stride as u32;

    let mut img = RgbImage::from_pixel(side, side, GRID);
    for row in 0..n {
        for col in 0..n {
            let fill = colour(row, col);
            let (x0, y0) = (col as u32 * stride + 1, row as u32 * stride + 1);
            for y in y0..y0 + cell_px {
                for x in x0..x0 + cell_px {
                    img.put_pixel(x, y, fill);
                }
            }
        }
    }
    Ok(img)
}

/// Confusion heatmap: row = prediction, column = reference, shaded by the
/// cell's share of its reference column.
pub fn render_confusion(cm: &ConfusionMatrix, cell_px: u32) -> Result<RgbImage, PlotError> {
    let table = cm.table();
    let k = table.len();
    let col_totals: Vec<usize> = (0..k).map(|j| table.iter().map(|row| row[j]).sum()).collect();
    render_grid(k, cell_px, |row, col| {
        let total = col_totals[col];
        sequential(if total == 0 { 0.0 } else { table[row][col] as f64 / total as f64 })
    })
}

/// Correlation matrix of the retained predictors.
pub fn render_correlation(matrix: &CorrelationMatrix, cell_px: u32) -> Result<RgbImage, PlotError> {
    render_grid(matrix.len(), cell_px, |row, col| diverging(matrix.get(row, col)))
}

fn save(img: &RgbImage, path: &Path) -> Result<(), PlotError> {
    img.save(path).map_err(|source| PlotError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), width = img.width(), height = img.height(), "Plot written");
    Ok(())
}

pub fn save_confusion_plot(cm: &ConfusionMatrix, cell_px: u32, path: &Path) -> Result<(), PlotError> {
    save(&render_confusion(cm, cell_px)?, path)
}

pub fn save_correlation_plot(matrix: &CorrelationMatrix, cell_px: u32, path: &Path) -> Result<(), PlotError> {
    save(&render_correlation(matrix, cell_px)?, path)
}
