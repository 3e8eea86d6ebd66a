/**
 * RecGrid
 * Copyright (C) 2026 The RecGrid contributors
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <http://www.gnu.org/licenses/>.
 */

extern crate fnv;

use fnv::{FnvHashMap, FnvHashSet};

/// A single rating record, immutable once parsed.
#[derive(Clone, Debug, PartialEq)]
pub struct Rating {
    pub user: u32,
    pub item: u32,
    pub value: f64,
    pub timestamp: i64,
}

impl Rating {
    pub fn new(user: u32, item: u32, value: f64, timestamp: i64) -> Self {
        Rating { user, item, value, timestamp }
    }
}

/// Coordinate-form matrix entry (row, column, value).
pub type Triple = (u32, u32, f64);

pub type ItemSet = FnvHashSet<u32>;
pub type TitleMap = FnvHashMap<u32, String>;

pub fn new_item_set() -> ItemSet {
    FnvHashSet::with_capacity_and_hasher(10, Default::default())
}

/// Row-major dense matrix of f64 values, zero where unobserved. Dimensions
/// are fixed at construction time.
#[derive(Clone, Debug, PartialEq)]
pub struct DenseMatrix {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl DenseMatrix {

    pub fn zeros(rows: usize, cols: usize) -> Self {
        DenseMatrix { rows, cols, values: vec![0.0; rows * cols] }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.values[row * self.cols + col] = value;
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Iterates all cells as (row, col, value).
    pub fn cells<'a>(&'a self) -> impl Iterator<Item = (usize, usize, f64)> + 'a {
        let cols = self.cols;
        self.values
            .iter()
            .enumerate()
            .map(move |(idx, &value)| (idx / cols, idx % cols, value))
    }
}

#[cfg(test)]
mod tests {

    use super::DenseMatrix;

    #[test]
    fn dense_matrix_roundtrip() {
        let mut matrix = DenseMatrix::zeros(2, 3);

        assert_eq!(matrix.shape(), (2, 3));
        assert_eq!(matrix.get(1, 2), 0.0);

        matrix.set(1, 2, 4.5);
        matrix.set(0, 0, -1.0);

        assert_eq!(matrix.get(1, 2), 4.5);
        assert_eq!(matrix.get(0, 0), -1.0);
        assert_eq!(matrix.values().iter().filter(|&&v| v != 0.0).count(), 2);
    }

    #[test]
    fn cells_enumerates_row_major() {
        let mut matrix = DenseMatrix::zeros(2, 2);
        matrix.set(0, 1, 1.0);
        matrix.set(1, 0, 2.0);

        let cells: Vec<(usize, usize, f64)> = matrix.cells().collect();

        assert_eq!(cells[1], (0, 1, 1.0));
        assert_eq!(cells[2], (1, 0, 2.0));
    }
}
