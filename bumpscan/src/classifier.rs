//! Cross-talk classification of disconnected bump bonds.
//!
//! Each pixel is evaluated from three aligned efficiency maps:
//! self-injection (charge injected into the pixel itself), coupled injection
//! (charge injected into the neighbour, read through the bump) and uncoupled
//! injection (charge injected into the neighbour with the bump path excluded).
//! A pixel that answers to its own injection but not to either neighbour
//! pattern has lost its bump-bond connection.


use common::{Grid, GridShape};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::histogram::{EfficiencyGrid, Histogram2D};
use crate::store::Counts;
use crate::thresholds::Thresholds;

pub const CONFIRMED_HISTOGRAM: &str = "h_confirmed2D";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pixel {
    pub row: usize,
    pub col: usize,
}

impl Pixel {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum PixelClass {
    /// Self-injection response below the alive threshold.
    Dead,
    /// Has no neighbour in the injection pattern.
    EdgeExcluded,
    /// Disconnected bump bond.
    Confirmed,
    Unflagged,
}

/// Efficiencies of one pixel in the three injection patterns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelEfficiencies {
    pub self_eff: f64,
    pub coupled_eff: f64,
    pub uncoupled_eff: f64,
}

/// The three aligned efficiency maps of one chip.
#[derive(Debug, Clone, Copy)]
pub struct InjectionGrids<'a> {
    pub self_injection: &'a EfficiencyGrid,
    pub coupled_injection: &'a EfficiencyGrid,
    pub uncoupled_injection: &'a EfficiencyGrid,
}

impl<'a> InjectionGrids<'a> {
    pub fn new(
        self_injection: &'a EfficiencyGrid,
        coupled_injection: &'a EfficiencyGrid,
        uncoupled_injection: &'a EfficiencyGrid,
    ) -> Self {
        Self {
            self_injection,
            coupled_injection,
            uncoupled_injection,
        }
    }

    /// Shape shared by all three grids. Fails naming the first grid that differs.
    pub fn shape(&self) -> Result<GridShape> {
        let expected = self.self_injection.shape();
        for (grid, other) in [
            ("coupled_injection", self.coupled_injection),
            ("uncoupled_injection", self.uncoupled_injection),
        ] {
            if other.shape() != expected {
                return Err(Error::DimensionMismatch {
                    grid: grid.to_string(),
                    expected,
                    actual: other.shape(),
                });
            }
        }
        if expected.rows < 2 || expected.cols < 2 {
            return Err(Error::GridTooSmall { shape: expected });
        }
        Ok(expected)
    }

    fn efficiencies(&self, row: usize, col: usize) -> PixelEfficiencies {
        PixelEfficiencies {
            self_eff: self.self_injection[(row, col)],
            coupled_eff: self.coupled_injection[(row, col)],
            uncoupled_eff: self.uncoupled_injection[(row, col)],
        }
    }
}

/// Pixels of the first row with even column and of the last row with odd
/// column have no injection neighbour.
#[inline]
pub fn is_edge_excluded(pixel: Pixel, shape: GridShape) -> bool {
    (pixel.row == 0 && pixel.col % 2 == 0) || (pixel.row + 1 == shape.rows && pixel.col % 2 == 1)
}

/// Classifies a single pixel.
///
/// A pixel exactly at `alive_efficiency` is neither dead nor confirmable: the
/// dead cut is `<` while the confirmation cut is a strict `>`.
pub fn classify_pixel(
    pixel: Pixel,
    shape: GridShape,
    eff: PixelEfficiencies,
    thresholds: &Thresholds,
) -> PixelClass {
    if eff.self_eff < thresholds.alive_efficiency {
        return PixelClass::Dead;
    }
    if is_edge_excluded(pixel, shape) {
        return PixelClass::EdgeExcluded;
    }
    if eff.self_eff > thresholds.alive_efficiency
        && eff.coupled_eff < thresholds.coupled_efficiency
        && eff.uncoupled_eff < thresholds.uncoupled_efficiency
    {
        PixelClass::Confirmed
    } else {
        PixelClass::Unflagged
    }
}

#[derive(Default)]
struct RowOutcome {
    flags: Vec<u8>,
    dead: Vec<Pixel>,
    confirmed: Vec<Pixel>,
    edge_excluded: usize,
}

fn classify_row(
    inputs: &InjectionGrids<'_>,
    shape: GridShape,
    row: usize,
    thresholds: &Thresholds,
) -> RowOutcome {
    let mut outcome = RowOutcome {
        flags: Vec::with_capacity(shape.cols),
        ..RowOutcome::default()
    };

    for col in 0..shape.cols {
        let pixel = Pixel::new(row, col);
        let class = classify_pixel(pixel, shape, inputs.efficiencies(row, col), thresholds);
        match class {
            PixelClass::Dead => outcome.dead.push(pixel),
            PixelClass::EdgeExcluded => outcome.edge_excluded += 1,
            PixelClass::Confirmed => outcome.confirmed.push(pixel),
            PixelClass::Unflagged => {}
        }
        outcome.flags.push(u8::from(class == PixelClass::Confirmed));
    }

    outcome
}

/// Per-pixel confirmed flags with the dead and confirmed pixel lists in
/// row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    pub flags: Grid<u8>,
    pub dead: Vec<Pixel>,
    pub confirmed: Vec<Pixel>,
    pub edge_excluded: usize,
}

impl ClassificationResult {
    pub fn dead_count(&self) -> usize {
        self.dead.len()
    }

    pub fn confirmed_count(&self) -> usize {
        self.confirmed.len()
    }

    pub fn is_confirmed(&self, row: usize, col: usize) -> bool {
        self.flags[(row, col)] != 0
    }

    pub fn shape(&self) -> GridShape {
        self.flags.shape()
    }

    /// Result map as stored for `chip`.
    pub fn to_histogram(&self, chip: u32) -> Histogram2D {
        Histogram2D::from_grid(
            CONFIRMED_HISTOGRAM,
            format!("confirmed disconnected channels of chip {chip}"),
            &self.flags,
        )
    }

    pub fn summary(&self, thresholds: &Thresholds) -> Counts {
        Counts::from([
            ("rows".to_string(), self.flags.rows() as f64),
            ("cols".to_string(), self.flags.cols() as f64),
            ("dead".to_string(), self.dead_count() as f64),
            ("confirmed".to_string(), self.confirmed_count() as f64),
            ("edge_excluded".to_string(), self.edge_excluded as f64),
            ("alive_efficiency".to_string(), thresholds.alive_efficiency),
            ("coupled_efficiency".to_string(), thresholds.coupled_efficiency),
            ("uncoupled_efficiency".to_string(), thresholds.uncoupled_efficiency),
        ])
    }
}

/// Classifies every pixel of one chip.
///
/// Thresholds and grid shapes are checked before any pixel is evaluated.
/// Rows run in parallel; the result is identical to a sequential row-major scan.
pub fn classify(inputs: &InjectionGrids<'_>, thresholds: &Thresholds) -> Result<ClassificationResult> {
    thresholds.validate()?;
    let shape = inputs.shape()?;

    let rows: Vec<RowOutcome> = (0..shape.rows)
        .into_par_iter()
        .map(|row| classify_row(inputs, shape, row, thresholds))
        .collect();

    let mut flags = Vec::with_capacity(shape.cell_count());
    let mut dead = Vec::new();
    let mut confirmed = Vec::new();
    let mut edge_excluded = 0;
    for row in rows {
        flags.extend(row.flags);
        dead.extend(row.dead);
        confirmed.extend(row.confirmed);
        edge_excluded += row.edge_excluded;
    }

    Ok(ClassificationResult {
        flags: Grid::new(shape.rows, shape.cols, flags),
        dead,
        confirmed,
        edge_excluded,
    })
}
