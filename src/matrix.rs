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

use errors::PipelineError;
use types::{DenseMatrix, Rating, Triple};

/// Entries of the normalized T matrix below this value are zeroed before
/// factorization.
const T_SPARSITY_CUT: f64 = 0.2;

/// Floor below which T cells are not emitted as training triples.
const TRIPLE_FLOOR: f64 = 1e-2;

/// Labeling policy turning a rating matrix into the X/O/Y mask matrices.
/// Two incompatible definitions exist in the experiment lineage, so the
/// choice is the caller's.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MaskPolicy {
    /// X = 1 where rating >= threshold, Y = O - X.
    Binary { threshold: f64 },
    /// X = rating / 5, Y = (6 - rating) / 5 on observed cells.
    Proportional,
}

impl MaskPolicy {

    pub fn from_name(name: &str, threshold: f64) -> Option<Self> {
        match name {
            "binary" => Some(MaskPolicy::Binary { threshold }),
            "proportional" => Some(MaskPolicy::Proportional),
            _ => None,
        }
    }
}

/// The observed/positive (X), observed (O) and observed/negative (Y)
/// views of a rating matrix. Unobserved cells are zero in all three.
#[derive(Clone, Debug)]
pub struct Masks {
    pub x: DenseMatrix,
    pub o: DenseMatrix,
    pub y: DenseMatrix,
}

/// Places every rating at `(user, item)` in a matrix of the given shape.
/// Later records for the same cell overwrite earlier ones. An out-of-range
/// id is a `Shape` error: it signals a configuration/data mismatch that
/// would silently corrupt results if ignored.
pub fn build(ratings: &[Rating], shape: (usize, usize)) -> Result<DenseMatrix, PipelineError> {

    let mut matrix = DenseMatrix::zeros(shape.0, shape.1);

    for rating in ratings {
        let row = rating.user as usize;
        let col = rating.item as usize;

        if row >= shape.0 || col >= shape.1 {
            return Err(PipelineError::Shape {
                user: rating.user,
                item: rating.item,
                rows: shape.0,
                cols: shape.1,
            });
        }

        matrix.set(row, col, rating.value);
    }

    Ok(matrix)
}

/// Drops the timestamp, keeping (user, item, rating) coordinates.
pub fn triples(ratings: &[Rating]) -> Vec<Triple> {
    ratings
        .iter()
        .map(|rating| (rating.user, rating.item, rating.value))
        .collect()
}

/// Derives the X/O/Y masks from a rating matrix under the given policy.
pub fn build_masks(matrix: &DenseMatrix, policy: MaskPolicy) -> Masks {

    let (rows, cols) = matrix.shape();

    let mut x = DenseMatrix::zeros(rows, cols);
    let mut o = DenseMatrix::zeros(rows, cols);
    let mut y = DenseMatrix::zeros(rows, cols);

    for (row, col, value) in matrix.cells() {
        if value <= 0.0 {
            continue;
        }

        o.set(row, col, 1.0);

        match policy {
            MaskPolicy::Binary { threshold } => {
                if value >= threshold {
                    x.set(row, col, 1.0);
                } else {
                    y.set(row, col, 1.0);
                }
            }
            MaskPolicy::Proportional => {
                x.set(row, col, value / 5.0);
                y.set(row, col, (6.0 - value) / 5.0);
            }
        }
    }

    Masks { x, o, y }
}

/// Builds the implicit-feedback training target `T = [X|Y]`: horizontal
/// concatenation, min-max normalized over its observed cells, with entries
/// below the sparsity cut zeroed.
pub fn compute_t(x: &DenseMatrix, y: &DenseMatrix) -> Result<DenseMatrix, PipelineError> {

    let (rows, cols) = x.shape();
    assert_eq!((rows, cols), y.shape());

    let mut t = DenseMatrix::zeros(rows, cols * 2);

    for (row, col, value) in x.cells() {
        t.set(row, col, value);
    }
    for (row, col, value) in y.cells() {
        t.set(row, cols + col, value);
    }

    let mut min = ::std::f64::INFINITY;
    let mut max = ::std::f64::NEG_INFINITY;

    for &value in t.values() {
        if value > 0.0 {
            if value < min {
                min = value;
            }
            if value > max {
                max = value;
            }
        }
    }

    if !min.is_finite() {
        return Err(PipelineError::InsufficientData(
            "no observed cells to build T from".to_string(),
        ));
    }
    if max - min < 1e-12 {
        return Err(PipelineError::InsufficientData(
            "all observed T cells are equal, normalization is degenerate".to_string(),
        ));
    }

    let range = max - min;
    let mut normalized = DenseMatrix::zeros(rows, cols * 2);

    for (row, col, value) in t.cells() {
        if value > 0.0 {
            let scaled = (value - min) / range;
            if scaled >= T_SPARSITY_CUT {
                normalized.set(row, col, scaled);
            }
        }
    }

    Ok(normalized)
}

/// Extracts the coordinate triples of a derived matrix, skipping cells at
/// or below the floor.
pub fn to_triples(matrix: &DenseMatrix) -> Vec<Triple> {
    matrix
        .cells()
        .filter(|&(_, _, value)| value > TRIPLE_FLOOR)
        .map(|(row, col, value)| (row as u32, col as u32, value))
        .collect()
}

/// The left half of a completed `[X|Y]` prediction matrix, i.e. the
/// positive-class scores.
pub fn left_half(matrix: &DenseMatrix) -> DenseMatrix {

    let (rows, cols) = matrix.shape();
    let half = cols / 2;

    let mut left = DenseMatrix::zeros(rows, half);

    for row in 0..rows {
        for col in 0..half {
            left.set(row, col, matrix.get(row, col));
        }
    }

    left
}

#[cfg(test)]
mod tests {

    use super::{build, build_masks, compute_t, left_half, to_triples, MaskPolicy};
    use errors::PipelineError;
    use types::{DenseMatrix, Rating};

    #[test]
    fn build_places_ratings_and_keeps_last_write() {
        let ratings = vec![
            Rating::new(0, 1, 3.0, 0),
            Rating::new(1, 0, 4.0, 1),
            Rating::new(0, 1, 5.0, 2),
        ];

        let matrix = build(&ratings, (2, 2)).unwrap();

        assert_eq!(matrix.get(0, 1), 5.0);
        assert_eq!(matrix.get(1, 0), 4.0);
        assert_eq!(matrix.get(0, 0), 0.0);
    }

    #[test]
    fn out_of_range_id_is_a_shape_error() {
        let ratings = vec![Rating::new(2, 0, 1.0, 0)];

        match build(&ratings, (2, 2)) {
            Err(PipelineError::Shape { user, rows, .. }) => {
                assert_eq!(user, 2);
                assert_eq!(rows, 2);
            }
            other => panic!("expected shape error, got {:?}", other.is_ok()),
        }
    }

    #[test]
    fn binary_masks_partition_the_observed_cells() {
        let ratings = vec![
            Rating::new(0, 0, 5.0, 0),
            Rating::new(0, 1, 2.0, 0),
            Rating::new(1, 1, 3.0, 0),
        ];
        let matrix = build(&ratings, (2, 2)).unwrap();

        let masks = build_masks(&matrix, MaskPolicy::Binary { threshold: 3.0 });

        assert_eq!(masks.o.get(0, 0), 1.0);
        assert_eq!(masks.o.get(1, 0), 0.0);

        assert_eq!(masks.x.get(0, 0), 1.0);
        assert_eq!(masks.x.get(0, 1), 0.0);
        assert_eq!(masks.x.get(1, 1), 1.0);

        // O = X + Y holds exactly under the binary policy.
        for (row, col, observed) in masks.o.cells() {
            assert_eq!(observed, masks.x.get(row, col) + masks.y.get(row, col));
        }
    }

    #[test]
    fn proportional_masks_scale_with_the_rating() {
        let ratings = vec![Rating::new(0, 0, 4.0, 0), Rating::new(1, 1, 1.0, 0)];
        let matrix = build(&ratings, (2, 2)).unwrap();

        let masks = build_masks(&matrix, MaskPolicy::Proportional);

        assert!((masks.x.get(0, 0) - 0.8).abs() < 1e-12);
        assert!((masks.y.get(0, 0) - 0.4).abs() < 1e-12);
        assert!((masks.x.get(1, 1) - 0.2).abs() < 1e-12);
        assert!((masks.y.get(1, 1) - 1.0).abs() < 1e-12);

        // Unobserved cells stay zero in every mask.
        assert_eq!(masks.x.get(0, 1), 0.0);
        assert_eq!(masks.y.get(0, 1), 0.0);
        assert_eq!(masks.o.get(0, 1), 0.0);
    }

    #[test]
    fn compute_t_concatenates_and_normalizes() {
        let ratings = vec![
            Rating::new(0, 0, 5.0, 0),
            Rating::new(0, 1, 1.0, 0),
            Rating::new(1, 0, 2.0, 0),
        ];
        let matrix = build(&ratings, (2, 2)).unwrap();
        let masks = build_masks(&matrix, MaskPolicy::Proportional);

        let t = compute_t(&masks.x, &masks.y).unwrap();

        assert_eq!(t.shape(), (2, 4));
        // The largest observed entry normalizes to 1, X part of cell (0, 0).
        assert!((t.get(0, 0) - 1.0).abs() < 1e-12);
        // The smallest observed entry normalizes to 0 and is cut away.
        assert_eq!(t.get(0, 1), 0.0);
        // Unobserved cells stay zero.
        assert_eq!(t.get(1, 1), 0.0);
    }

    #[test]
    fn compute_t_rejects_degenerate_input() {
        let empty = DenseMatrix::zeros(2, 2);
        assert!(compute_t(&empty, &empty).is_err());

        let mut uniform = DenseMatrix::zeros(2, 2);
        uniform.set(0, 0, 0.6);
        uniform.set(1, 1, 0.6);
        let zeros = DenseMatrix::zeros(2, 2);
        assert!(compute_t(&uniform, &zeros).is_err());
    }

    #[test]
    fn triples_skip_cells_at_the_floor() {
        let mut matrix = DenseMatrix::zeros(2, 2);
        matrix.set(0, 0, 0.5);
        matrix.set(1, 1, 0.005);

        let triples = to_triples(&matrix);

        assert_eq!(triples, vec![(0, 0, 0.5)]);
    }

    #[test]
    fn left_half_takes_the_x_columns() {
        let mut matrix = DenseMatrix::zeros(1, 4);
        matrix.set(0, 0, 1.0);
        matrix.set(0, 3, 2.0);

        let left = left_half(&matrix);

        assert_eq!(left.shape(), (1, 2));
        assert_eq!(left.get(0, 0), 1.0);
        assert_eq!(left.get(0, 1), 0.0);
    }
}
