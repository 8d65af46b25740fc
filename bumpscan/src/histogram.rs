//! Named 2D histograms as stored by the acquisition software.
//!
//! The x axis runs over columns and the y axis over rows. Bin numbers in the
//! public 1-based accessors follow the store convention, everything else uses
//! 0-based `(row, col)` pixel coordinates.


use common::{Grid, GridShape};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Row-major efficiency map of one injection pattern.
pub type EfficiencyGrid = Grid<f64>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub bins: usize,
    pub low: f64,
    pub high: f64,
}

impl Axis {
    pub fn new(bins: usize, low: f64, high: f64) -> Self {
        Self { bins, low, high }
    }

    /// One unit-wide bin per pixel, starting at 0.
    pub fn pixels(bins: usize) -> Self {
        Self::new(bins, 0.0, bins as f64)
    }

    pub fn bin_width(&self) -> f64 {
        if self.bins == 0 {
            0.0
        } else {
            (self.high - self.low) / self.bins as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram2D {
    pub name: String,
    pub title: String,
    pub x_axis: Axis,
    pub y_axis: Axis,
    pub contents: Grid<f64>,
}

impl Histogram2D {
    /// Zero-filled histogram with the given binning.
    pub fn new(name: impl Into<String>, title: impl Into<String>, x_axis: Axis, y_axis: Axis) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            contents: Grid::new_default(y_axis.bins, x_axis.bins),
            x_axis,
            y_axis,
        }
    }

    /// Histogram with one bin per grid cell.
    pub fn from_grid<T: Copy + Into<f64>>(
        name: impl Into<String>,
        title: impl Into<String>,
        grid: &Grid<T>,
    ) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            x_axis: Axis::pixels(grid.cols()),
            y_axis: Axis::pixels(grid.rows()),
            contents: grid.map(|&value| value.into()),
        }
    }

    /// Same binning and zero contents under a new name.
    pub fn empty_like(&self, name: impl Into<String>, title: impl Into<String>) -> Self {
        Self::new(name, title, self.x_axis, self.y_axis)
    }

    /// Same binning and contents under a new name.
    pub fn clone_as(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    pub fn rows(&self) -> usize {
        self.contents.rows()
    }

    pub fn cols(&self) -> usize {
        self.contents.cols()
    }

    pub fn shape(&self) -> GridShape {
        self.contents.shape()
    }

    /// Content of bin `(x_bin, y_bin)`, both 1-based.
    ///
    /// # Panics
    /// Panics when either bin number is outside `1..=bins`.
    pub fn bin_content(&self, x_bin: usize, y_bin: usize) -> f64 {
        let (row, col) = self.bin_to_pixel(x_bin, y_bin);
        self.contents[(row, col)]
    }

    pub fn set_bin_content(&mut self, x_bin: usize, y_bin: usize, value: f64) {
        let (row, col) = self.bin_to_pixel(x_bin, y_bin);
        self.contents[(row, col)] = value;
    }

    fn bin_to_pixel(&self, x_bin: usize, y_bin: usize) -> (usize, usize) {
        assert!(
            (1..=self.x_axis.bins).contains(&x_bin) && (1..=self.y_axis.bins).contains(&y_bin),
            "bin ({x_bin}, {y_bin}) out of range for {}x{} bins",
            self.x_axis.bins,
            self.y_axis.bins
        );
        (y_bin - 1, x_bin - 1)
    }

    pub fn value(&self, row: usize, col: usize) -> f64 {
        self.contents[(row, col)]
    }

    pub fn set_value(&mut self, row: usize, col: usize, value: f64) {
        self.contents[(row, col)] = value;
    }

    pub fn nonzero_count(&self) -> usize {
        self.contents.count(|&value| value != 0.0)
    }

    /// Sum of all bin contents.
    pub fn integral(&self) -> f64 {
        self.contents.iter().sum()
    }

    pub fn to_efficiency_grid(&self) -> EfficiencyGrid {
        self.contents.clone()
    }

    /// Checks that the axes agree with the stored contents.
    pub fn validate(&self) -> Result<()> {
        if self.x_axis.bins != self.contents.cols() || self.y_axis.bins != self.contents.rows() {
            return Err(Error::InvalidHistogram {
                name: self.name.clone(),
                reason: format!(
                    "axes declare {}x{} bins but contents are {}",
                    self.y_axis.bins,
                    self.x_axis.bins,
                    self.contents.shape()
                ),
            });
        }
        for (label, axis) in [("x", &self.x_axis), ("y", &self.y_axis)] {
            if !(axis.low.is_finite() && axis.high.is_finite()) || axis.high < axis.low {
                return Err(Error::InvalidHistogram {
                    name: self.name.clone(),
                    reason: format!("{label} axis range [{}, {}] is invalid", axis.low, axis.high),
                });
            }
        }
        Ok(())
    }

    /// Fails with [`Error::DimensionMismatch`] naming `grid` when shapes differ.
    pub fn ensure_same_shape(&self, other: &Histogram2D, grid: &str) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(Error::DimensionMismatch {
                grid: grid.to_string(),
                expected: self.shape(),
                actual: other.shape(),
            });
        }
        Ok(())
    }
}
