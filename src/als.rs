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

extern crate rand;
extern crate scoped_pool;

use std::sync::Mutex;
use std::time::Instant;

use rand::{Rng, SeedableRng, XorShiftRng};
use scoped_pool::Pool;

use errors::PipelineError;
use types::{DenseMatrix, Triple};
use utils;

/// One hyperparameter combination of the grid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Combination {
    pub rank: usize,
    pub lambda: f64,
    pub num_iters: usize,
}

/// A trained factorization: two low-rank factor matrices whose product
/// approximates the training matrix. Read-only once published.
#[derive(Clone, Debug)]
pub struct Model {
    rank: usize,
    user_factors: Vec<Vec<f64>>,
    item_factors: Vec<Vec<f64>>,
}

impl Model {

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn num_users(&self) -> usize {
        self.user_factors.len()
    }

    pub fn num_items(&self) -> usize {
        self.item_factors.len()
    }

    pub fn user_factors(&self) -> &[Vec<f64>] {
        &self.user_factors
    }

    pub fn item_factors(&self) -> &[Vec<f64>] {
        &self.item_factors
    }

    /// Predicted score for a (user, item) pair, `None` when either id is
    /// outside the trained dimensions.
    pub fn predict(&self, user: u32, item: u32) -> Option<f64> {

        let user_row = self.user_factors.get(user as usize)?;
        let item_row = self.item_factors.get(item as usize)?;

        Some(
            user_row
                .iter()
                .zip(item_row.iter())
                .map(|(u, v)| u * v)
                .sum(),
        )
    }

    /// The dense completed matrix `U * V^T`.
    pub fn completed(&self) -> DenseMatrix {

        let mut completed = DenseMatrix::zeros(self.num_users(), self.num_items());

        for (row, user_row) in self.user_factors.iter().enumerate() {
            for (col, item_row) in self.item_factors.iter().enumerate() {
                let score = user_row
                    .iter()
                    .zip(item_row.iter())
                    .map(|(u, v)| u * v)
                    .sum();
                completed.set(row, col, score);
            }
        }

        completed
    }
}

/// Trains a regularized alternating-least-squares factorization of the
/// given coordinate triples. The input is never mutated, and a fixed seed
/// yields identical factors across runs. Row solves run on the caller's
/// pool, which outlives the whole grid search.
///
/// An invalid rank, a non-positive-definite normal equation or diverging
/// factors are recoverable `Training` errors: the caller skips the
/// combination and continues the grid search.
pub fn train(
    triples: &[Triple],
    shape: (usize, usize),
    combination: &Combination,
    nonnegative: bool,
    seed: u64,
    pool: &Pool,
) -> Result<Model, PipelineError> {

    let (num_rows, num_cols) = shape;
    let rank = combination.rank;

    let fail = |reason: String| PipelineError::Training {
        rank: combination.rank,
        lambda: combination.lambda,
        num_iters: combination.num_iters,
        reason,
    };

    if rank == 0 || rank >= num_rows.min(num_cols) {
        return Err(fail(format!(
            "rank must satisfy 0 < rank < min({}, {})",
            num_rows, num_cols
        )));
    }
    if triples.is_empty() {
        return Err(PipelineError::InsufficientData(
            "no training observations".to_string(),
        ));
    }

    let mut by_row: Vec<Vec<(u32, f64)>> = vec![Vec::new(); num_rows];
    let mut by_col: Vec<Vec<(u32, f64)>> = vec![Vec::new(); num_cols];

    for &(row, col, value) in triples {
        if row as usize >= num_rows || col as usize >= num_cols {
            return Err(PipelineError::Shape {
                user: row,
                item: col,
                rows: num_rows,
                cols: num_cols,
            });
        }
        by_row[row as usize].push((col, value));
        by_col[col as usize].push((row, value));
    }

    let mut rng = seeded_rng(seed);

    let mut user_factors: Vec<Vec<f64>> = vec![vec![0.0; rank]; num_rows];
    let mut item_factors: Vec<Vec<f64>> = (0..num_cols)
        .map(|_| initial_factors(&mut rng, rank))
        .collect();

    let training_start = Instant::now();

    for _ in 0..combination.num_iters {
        user_factors = solve_side(
            &by_row,
            &item_factors,
            rank,
            combination.lambda,
            nonnegative,
            pool,
        ).map_err(&fail)?;

        item_factors = solve_side(
            &by_col,
            &user_factors,
            rank,
            combination.lambda,
            nonnegative,
            pool,
        ).map_err(&fail)?;
    }

    let finite = user_factors
        .iter()
        .chain(item_factors.iter())
        .all(|row| row.iter().all(|value| value.is_finite()));

    if !finite {
        return Err(fail("factors diverged to non-finite values".to_string()));
    }

    println!(
        "{} observations, {}ms training time",
        triples.len(),
        utils::to_millis(training_start.elapsed())
    );

    Ok(Model { rank, user_factors, item_factors })
}

fn seeded_rng(seed: u64) -> XorShiftRng {
    let low = seed as u32;
    let high = (seed >> 32) as u32;

    // XorShift must not be seeded with all zeros.
    XorShiftRng::from_seed([
        low | 1,
        high.wrapping_add(0x9E37_79B9),
        low ^ 0x85EB_CA6B,
        high | 1,
    ])
}

fn initial_factors<R: Rng>(rng: &mut R, rank: usize) -> Vec<f64> {
    (0..rank)
        .map(|_| rng.gen::<f64>() / (rank as f64).sqrt())
        .collect()
}

/// Re-solves every row of one side while the other side stays fixed. Rows
/// are independent, so each one is solved on the pool.
fn solve_side(
    observations: &[Vec<(u32, f64)>],
    fixed: &[Vec<f64>],
    rank: usize,
    lambda: f64,
    nonnegative: bool,
    pool: &Pool,
) -> Result<Vec<Vec<f64>>, String> {

    let slots: Vec<Mutex<Result<Vec<f64>, String>>> = observations
        .iter()
        .map(|_| Mutex::new(Ok(Vec::new())))
        .collect();

    pool.scoped(|scope| {
        for (idx, observed) in observations.iter().enumerate() {
            let slot = &slots[idx];

            scope.execute(move || {
                let solved = solve_row(observed, fixed, rank, lambda, nonnegative);
                *slot.lock().unwrap() = solved;
            });
        }
    });

    let mut solved_rows = Vec::with_capacity(observations.len());
    for slot in slots {
        solved_rows.push(slot.into_inner().unwrap()?);
    }

    Ok(solved_rows)
}

/// Normal equations for one row: `(F^T F + lambda * n * I) x = F^T r`,
/// solved with a Cholesky decomposition. Rows without observations keep a
/// zero factor vector.
fn solve_row(
    observed: &[(u32, f64)],
    fixed: &[Vec<f64>],
    rank: usize,
    lambda: f64,
    nonnegative: bool,
) -> Result<Vec<f64>, String> {

    if observed.is_empty() {
        return Ok(vec![0.0; rank]);
    }

    let mut a = vec![0.0; rank * rank];
    let mut b = vec![0.0; rank];

    for &(other, value) in observed {
        let factors = &fixed[other as usize];

        for i in 0..rank {
            let factor_i = factors[i];
            b[i] += value * factor_i;

            for j in 0..rank {
                a[i * rank + j] += factor_i * factors[j];
            }
        }
    }

    for i in 0..rank {
        a[i * rank + i] += lambda * observed.len() as f64;
    }

    let mut solution = solve_cholesky(&a, &b, rank)?;

    if nonnegative {
        for value in solution.iter_mut() {
            if *value < 0.0 {
                *value = 0.0;
            }
        }
    }

    Ok(solution)
}

/// Solves `A x = b` for symmetric positive definite `A` via `A = L L^T`.
fn solve_cholesky(a: &[f64], b: &[f64], n: usize) -> Result<Vec<f64>, String> {

    let mut l = vec![0.0; n * n];

    for i in 0..n {
        for j in 0..(i + 1) {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[i * n + k] * l[j * n + k];
            }

            if i == j {
                let diagonal = a[i * n + i] - sum;
                if diagonal <= 0.0 {
                    return Err("normal equation matrix is not positive definite".to_string());
                }
                l[i * n + j] = diagonal.sqrt();
            } else {
                l[i * n + j] = (a[i * n + j] - sum) / l[j * n + j];
            }
        }
    }

    // Forward substitution: L y = b
    let mut y = vec![0.0; n];
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[i * n + j] * y[j];
        }
        y[i] = (b[i] - sum) / l[i * n + i];
    }

    // Backward substitution: L^T x = y
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[j * n + i] * x[j];
        }
        x[i] = (y[i] - sum) / l[i * n + i];
    }

    Ok(x)
}
