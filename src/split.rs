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
use types::Rating;

/// The three experiment partitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Partition {
    Train,
    Validation,
    Test,
}

/// Partition boundaries over the last digit of the timestamp. With the
/// default (6, 8), keys 0-5 are TRAIN, 6-7 VALIDATION and 8-9 TEST, giving
/// a 60/20/20 split on uniformly distributed timestamps.
///
/// Equal boundaries are accepted and make VALIDATION empty; the scorer then
/// reports `InsufficientData` rather than dividing by zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Boundaries {
    first: i64,
    second: i64,
}

impl Boundaries {

    pub fn new(first: u8, second: u8) -> Result<Self, PipelineError> {
        if first == 0 || first > second || second > 10 {
            return Err(PipelineError::Input(format!(
                "boundaries ({}, {}) must satisfy 0 < first <= second <= 10",
                first, second
            )));
        }

        Ok(Boundaries { first: first as i64, second: second as i64 })
    }

    pub fn first(&self) -> u8 {
        self.first as u8
    }

    pub fn second(&self) -> u8 {
        self.second as u8
    }

    /// Pure function of the record's timestamp; identical input always
    /// yields the identical partition.
    pub fn partition(&self, rating: &Rating) -> Partition {
        let key = rating.timestamp.rem_euclid(10);

        if key < self.first {
            Partition::Train
        } else if key < self.second {
            Partition::Validation
        } else {
            Partition::Test
        }
    }
}

impl Default for Boundaries {
    fn default() -> Self {
        Boundaries { first: 6, second: 8 }
    }
}

/// Splits ratings into (train, validation, test), preserving input order
/// within each partition.
pub fn split_ratings(
    ratings: &[Rating],
    boundaries: Boundaries,
) -> (Vec<Rating>, Vec<Rating>, Vec<Rating>) {

    let mut train = Vec::new();
    let mut validation = Vec::new();
    let mut test = Vec::new();

    for rating in ratings {
        match boundaries.partition(rating) {
            Partition::Train => train.push(rating.clone()),
            Partition::Validation => validation.push(rating.clone()),
            Partition::Test => test.push(rating.clone()),
        }
    }

    (train, validation, test)
}

#[cfg(test)]
mod tests {

    use super::{split_ratings, Boundaries, Partition};
    use types::Rating;

    fn rating_with_timestamp(timestamp: i64) -> Rating {
        Rating::new(0, 0, 3.0, timestamp)
    }

    #[test]
    fn default_boundaries_give_three_way_split() {
        let boundaries = Boundaries::default();

        assert_eq!(boundaries.partition(&rating_with_timestamp(15)), Partition::Train);
        assert_eq!(boundaries.partition(&rating_with_timestamp(26)), Partition::Validation);
        assert_eq!(boundaries.partition(&rating_with_timestamp(37)), Partition::Validation);
        assert_eq!(boundaries.partition(&rating_with_timestamp(48)), Partition::Test);
        assert_eq!(boundaries.partition(&rating_with_timestamp(59)), Partition::Test);
    }

    #[test]
    fn partition_is_deterministic() {
        let boundaries = Boundaries::new(6, 8).unwrap();
        let ratings: Vec<Rating> = (0..1000)
            .map(|idx| Rating::new(idx as u32, 0, 1.0, 978_300_000 + idx))
            .collect();

        let first = split_ratings(&ratings, boundaries);
        let second = split_ratings(&ratings, boundaries);

        assert_eq!(first.0, second.0);
        assert_eq!(first.1, second.1);
        assert_eq!(first.2, second.2);
        assert_eq!(first.0.len() + first.1.len() + first.2.len(), ratings.len());
    }

    #[test]
    fn equal_boundaries_empty_the_validation_partition() {
        let boundaries = Boundaries::new(8, 8).unwrap();
        let ratings: Vec<Rating> = (0..100).map(|ts| rating_with_timestamp(ts)).collect();

        let (train, validation, test) = split_ratings(&ratings, boundaries);

        assert_eq!(train.len(), 80);
        assert!(validation.is_empty());
        assert_eq!(test.len(), 20);
    }

    #[test]
    fn out_of_range_boundaries_are_rejected() {
        assert!(Boundaries::new(0, 8).is_err());
        assert!(Boundaries::new(8, 6).is_err());
        assert!(Boundaries::new(6, 11).is_err());
        assert!(Boundaries::new(6, 8).is_ok());
    }

    #[test]
    fn single_key_lands_everything_in_train() {
        let boundaries = Boundaries::default();
        let ratings: Vec<Rating> = (0..50)
            .map(|idx| Rating::new(idx, 0, 4.0, 5 + 10 * idx as i64))
            .collect();

        let (train, validation, test) = split_ratings(&ratings, boundaries);

        assert_eq!(train.len(), 50);
        assert!(validation.is_empty());
        assert!(test.is_empty());
    }

    #[test]
    fn negative_timestamps_partition_like_their_euclidean_remainder() {
        let boundaries = Boundaries::default();

        assert_eq!(boundaries.partition(&rating_with_timestamp(-3)), Partition::Validation);
        assert_eq!(boundaries.partition(&rating_with_timestamp(-10)), Partition::Train);
    }
}
