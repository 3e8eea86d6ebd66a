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

/// Pipeline error types.
///
/// `Input`, `Parse` and `Shape` are fatal and abort the whole run.
/// `Training` and `InsufficientData` are recoverable: the grid search logs
/// them and moves on to the next hyperparameter combination.
#[derive(Debug, Fail)]
pub enum PipelineError {
    /// Missing, empty or otherwise unusable input file.
    #[fail(display = "input error: {}", _0)]
    Input(String),

    /// A record line with the wrong field count or an uncastable field.
    #[fail(display = "cannot parse line {}: {}", line, reason)]
    Parse { line: usize, reason: String },

    /// An id exceeds the configured matrix dimensions. Fatal, because
    /// ignoring it would silently corrupt every downstream result.
    #[fail(
        display = "id ({}, {}) exceeds the configured shape ({}, {})",
        user, item, rows, cols
    )]
    Shape { user: u32, item: u32, rows: usize, cols: usize },

    /// A single hyperparameter combination failed to train.
    #[fail(
        display = "training failed for rank = {}, lambda = {}, num_iters = {}: {}",
        rank, lambda, num_iters, reason
    )]
    Training { rank: usize, lambda: f64, num_iters: usize, reason: String },

    /// A partition is empty or lacks both label classes.
    #[fail(display = "insufficient data: {}", _0)]
    InsufficientData(String),
}

impl PipelineError {

    /// Whether this error terminates the run. Recoverable errors are logged
    /// and the grid search proceeds; there are no retries.
    pub fn is_fatal(&self) -> bool {
        match *self {
            PipelineError::Input(_)
            | PipelineError::Parse { .. }
            | PipelineError::Shape { .. } => true,
            PipelineError::Training { .. } | PipelineError::InsufficientData(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {

    use super::PipelineError;

    #[test]
    fn fatality_per_taxonomy() {
        assert!(PipelineError::Input("missing".to_string()).is_fatal());
        assert!(
            PipelineError::Parse { line: 3, reason: "bad field".to_string() }.is_fatal()
        );
        assert!(
            PipelineError::Shape { user: 9, item: 0, rows: 4, cols: 4 }.is_fatal()
        );

        let training = PipelineError::Training {
            rank: 8,
            lambda: 0.1,
            num_iters: 10,
            reason: "rank too large".to_string(),
        };
        assert!(!training.is_fatal());
        assert!(!PipelineError::InsufficientData("empty".to_string()).is_fatal());
    }

    #[test]
    fn display_names_the_offending_ids() {
        let err = PipelineError::Shape { user: 7, item: 11, rows: 5, cols: 5 };
        let message = format!("{}", err);

        assert!(message.contains("(7, 11)"));
        assert!(message.contains("(5, 5)"));
    }
}
