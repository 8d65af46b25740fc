use std::fmt;
use std::ops::{Index, IndexMut};
use std::slice;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Row and column count of a [`Grid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridShape {
    pub rows: usize,
    pub cols: usize,
}

impl GridShape {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.rows * self.cols
    }
}

impl fmt::Display for GridShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("grid {shape} needs {} cells, got {actual}", .shape.cell_count())]
pub struct ShapeError {
    pub shape: GridShape,
    pub actual: usize,
}

/// Owned row-major 2D buffer addressed by `(row, col)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid<T> {
    cells: Vec<T>,
    rows: usize,
    cols: usize,
}

impl<T> Grid<T> {
    pub fn new(rows: usize, cols: usize, cells: Vec<T>) -> Self {
        assert_eq!(
            cells.len(),
            rows * cols,
            "cells length must equal rows * cols"
        );
        Self { cells, rows, cols }
    }

    pub fn try_new(rows: usize, cols: usize, cells: Vec<T>) -> Result<Self, ShapeError> {
        if cells.len() != rows * cols {
            return Err(ShapeError {
                shape: GridShape::new(rows, cols),
                actual: cells.len(),
            });
        }
        Ok(Self { cells, rows, cols })
    }

    /// Builds a grid by evaluating `f(row, col)` in row-major order.
    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut cells = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                cells.push(f(row, col));
            }
        }
        Self { cells, rows, cols }
    }

    /// Builds a grid from equally sized rows.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self, ShapeError> {
        let row_count = rows.len();
        let cols = rows.first().map_or(0, Vec::len);
        let cells: Vec<T> = rows.into_iter().flatten().collect();
        Self::try_new(row_count, cols, cells)
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> &T {
        debug_assert!(row < self.rows && col < self.cols);
        &self.cells[row * self.cols + col]
    }

    #[inline]
    pub fn get_mut(&mut self, row: usize, col: usize) -> &mut T {
        debug_assert!(row < self.rows && col < self.cols);
        &mut self.cells[row * self.cols + col]
    }

    #[inline]
    pub fn try_get(&self, row: usize, col: usize) -> Option<&T> {
        if row < self.rows && col < self.cols {
            Some(&self.cells[row * self.cols + col])
        } else {
            None
        }
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        *self.get_mut(row, col) = value;
    }

    /// Linear index of `(row, col)`.
    #[inline]
    pub fn index_of(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn shape(&self) -> GridShape {
        GridShape::new(self.rows, self.cols)
    }

    #[inline]
    pub fn same_shape<U>(&self, other: &Grid<U>) -> bool {
        self.rows == other.rows && self.cols == other.cols
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn row(&self, row: usize) -> &[T] {
        let start = row * self.cols;
        &self.cells[start..start + self.cols]
    }

    #[inline]
    pub fn row_mut(&mut self, row: usize) -> &mut [T] {
        let start = row * self.cols;
        &mut self.cells[start..start + self.cols]
    }

    /// Rows in ascending order. Yields nothing for a grid without columns.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[T]> {
        let rows = if self.cols == 0 { 0 } else { self.rows };
        self.cells.chunks(self.cols.max(1)).take(rows)
    }

    #[inline]
    pub fn cells(&self) -> &[T] {
        &self.cells
    }

    #[inline]
    pub fn cells_mut(&mut self) -> &mut [T] {
        &mut self.cells
    }

    #[inline]
    pub fn into_vec(self) -> Vec<T> {
        self.cells
    }

    #[inline]
    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.cells.iter()
    }

    #[inline]
    pub fn iter_mut(&mut self) -> slice::IterMut<'_, T> {
        self.cells.iter_mut()
    }

    /// Cells with their `(row, col)` coordinates in row-major order.
    pub fn indexed_iter(&self) -> impl Iterator<Item = (usize, usize, &T)> {
        let cols = self.cols.max(1);
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, value)| (i / cols, i % cols, value))
    }

    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> Grid<U> {
        Grid {
            cells: self.cells.iter().map(f).collect(),
            rows: self.rows,
            cols: self.cols,
        }
    }

    /// Combines two grids of equal shape cell by cell.
    pub fn zip_map<U, V>(
        &self,
        other: &Grid<U>,
        mut f: impl FnMut(&T, &U) -> V,
    ) -> Result<Grid<V>, ShapeError> {
        if !self.same_shape(other) {
            return Err(ShapeError {
                shape: self.shape(),
                actual: other.len(),
            });
        }
        Ok(Grid {
            cells: self
                .cells
                .iter()
                .zip(other.cells.iter())
                .map(|(a, b)| f(a, b))
                .collect(),
            rows: self.rows,
            cols: self.cols,
        })
    }

    pub fn count(&self, mut predicate: impl FnMut(&T) -> bool) -> usize {
        self.cells.iter().filter(|value| predicate(value)).count()
    }
}

impl<T: Default + Clone> Grid<T> {
    pub fn new_default(rows: usize, cols: usize) -> Self {
        Self {
            cells: vec![T::default(); rows * cols],
            rows,
            cols,
        }
    }
}

impl<T: Clone> Grid<T> {
    pub fn new_filled(rows: usize, cols: usize, value: T) -> Self {
        Self {
            cells: vec![value; rows * cols],
            rows,
            cols,
        }
    }

    #[inline]
    pub fn fill(&mut self, value: T) {
        self.cells.fill(value);
    }
}

impl<T> Index<(usize, usize)> for Grid<T> {
    type Output = T;

    #[inline]
    fn index(&self, (row, col): (usize, usize)) -> &Self::Output {
        &self.cells[row * self.cols + col]
    }
}

impl<T> IndexMut<(usize, usize)> for Grid<T> {
    #[inline]
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut Self::Output {
        &mut self.cells[row * self.cols + col]
    }
}

impl<T> Index<usize> for Grid<T> {
    type Output = T;

    #[inline]
    fn index(&self, idx: usize) -> &Self::Output {
        &self.cells[idx]
    }
}

impl<T> IndexMut<usize> for Grid<T> {
    #[inline]
    fn index_mut(&mut self, idx: usize) -> &mut Self::Output {
        &mut self.cells[idx]
    }
}

impl<'a, T> IntoIterator for &'a Grid<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.cells.iter()
    }
}

impl<T> From<Grid<T>> for Vec<T> {
    #[inline]
    fn from(grid: Grid<T>) -> Self {
        grid.cells
    }
}

#[derive(Serialize)]
struct GridReprRef<'a, T> {
    rows: usize,
    cols: usize,
    cells: &'a [T],
}

#[derive(Deserialize)]
struct GridRepr<T> {
    rows: usize,
    cols: usize,
    cells: Vec<T>,
}

impl<T: Serialize> Serialize for Grid<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        GridReprRef {
            rows: self.rows,
            cols: self.cols,
            cells: &self.cells,
        }
        .serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Grid<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = GridRepr::<T>::deserialize(deserializer)?;
        Grid::try_new(repr.rows, repr.cols, repr.cells).map_err(serde::de::Error::custom)
    }
}
