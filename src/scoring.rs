use als::Model;
use errors::PipelineError;
use matrix::Masks;
use types::{DenseMatrix, Rating};

/// Root mean squared error over every held-out pair the model can score.
pub fn rmse(model: &Model, holdout: &[Rating]) -> Result<f64, PipelineError> {

    let mut squared_error = 0.0;
    let mut count: u64 = 0;

    for rating in holdout {
        if let Some(predicted) = model.predict(rating.user, rating.item) {
            let difference = predicted - rating.value;
            squared_error += difference * difference;
            count += 1;
        }
    }

    if count == 0 {
        return Err(PipelineError::InsufficientData(
            "held-out set is empty, cannot compute RMSE".to_string(),
        ));
    }

    Ok((squared_error / count as f64).sqrt())
}

/// Mean rating over the concatenation of the given sets, the trivial
/// baseline predictor.
pub fn global_mean(sets: &[&[Rating]]) -> Option<f64> {

    let mut sum = 0.0;
    let mut count: u64 = 0;

    for set in sets {
        for rating in set.iter() {
            sum += rating.value;
            count += 1;
        }
    }

    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// RMSE of the constant global-mean predictor on a held-out set.
pub fn baseline_rmse(mean: f64, holdout: &[Rating]) -> Result<f64, PipelineError> {

    if holdout.is_empty() {
        return Err(PipelineError::InsufficientData(
            "held-out set is empty, cannot compute baseline RMSE".to_string(),
        ));
    }

    let squared_error: f64 = holdout
        .iter()
        .map(|rating| (mean - rating.value) * (mean - rating.value))
        .sum();

    Ok((squared_error / holdout.len() as f64).sqrt())
}

/// Area under the ROC curve via the Mann-Whitney rank statistic, with
/// tied scores resolved by rank averaging. Labels above 0.5 count as
/// positive. Requires at least one positive and one negative label.
pub fn auroc(labels: &[f64], scores: &[f64]) -> Result<f64, PipelineError> {

    assert_eq!(labels.len(), scores.len());

    let num_positive = labels.iter().filter(|&&label| label > 0.5).count();
    let num_negative = labels.len() - num_positive;

    if num_positive == 0 || num_negative == 0 {
        return Err(PipelineError::InsufficientData(format!(
            "AUROC needs both classes, found {} positives and {} negatives",
            num_positive, num_negative
        )));
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[a]
            .partial_cmp(&scores[b])
            .unwrap_or(::std::cmp::Ordering::Equal)
    });

    let mut ranks = vec![0.0; scores.len()];
    let mut idx = 0;

    while idx < order.len() {
        let mut tie_end = idx;
        while tie_end + 1 < order.len() && scores[order[tie_end + 1]] == scores[order[idx]] {
            tie_end += 1;
        }

        let average_rank = (idx + tie_end) as f64 / 2.0 + 1.0;
        for position in idx..(tie_end + 1) {
            ranks[order[position]] = average_rank;
        }

        idx = tie_end + 1;
    }

    let positive_rank_sum: f64 = labels
        .iter()
        .zip(ranks.iter())
        .filter(|&(&label, _)| label > 0.5)
        .map(|(_, &rank)| rank)
        .sum();

    let n_pos = num_positive as f64;
    let n_neg = num_negative as f64;

    Ok((positive_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}

/// AUROC of a dense prediction matrix against the held-out masks: scores
/// are min-max normalized, then labels (from X) and scores are restricted
/// to the cells flagged observed in O. Unobserved cells contribute nothing.
pub fn auroc_masked(predictions: &DenseMatrix, masks: &Masks) -> Result<f64, PipelineError> {

    assert_eq!(predictions.shape(), masks.o.shape());

    let normalized = normalize_scores(predictions);

    let mut labels = Vec::new();
    let mut scores = Vec::new();

    for (row, col, observed) in masks.o.cells() {
        if observed > 0.0 {
            labels.push(masks.x.get(row, col));
            scores.push(normalized.get(row, col));
        }
    }

    if labels.is_empty() {
        return Err(PipelineError::InsufficientData(
            "no observed cells in the held-out masks".to_string(),
        ));
    }

    auroc(&labels, &scores)
}

/// Min-max normalization over all cells. A zero range maps everything to
/// 0.5, the uninformative score.
pub fn normalize_scores(matrix: &DenseMatrix) -> DenseMatrix {

    let mut min = ::std::f64::INFINITY;
    let mut max = ::std::f64::NEG_INFINITY;

    for &value in matrix.values() {
        if value < min {
            min = value;
        }
        if value > max {
            max = value;
        }
    }

    let (rows, cols) = matrix.shape();
    let mut normalized = DenseMatrix::zeros(rows, cols);
    let range = max - min;

    for (row, col, value) in matrix.cells() {
        let scaled = if range > 0.0 { (value - min) / range } else { 0.5 };
        normalized.set(row, col, scaled);
    }

    normalized
}

#[cfg(test)]
mod tests {

    use scoped_pool::Pool;

    use super::{auroc, auroc_masked, baseline_rmse, global_mean, normalize_scores, rmse};
    use als::{train, Combination};
    use matrix::{build, build_masks, MaskPolicy};
    use types::{DenseMatrix, Rating};

    #[test]
    fn rmse_is_zero_for_exact_predictions() {
        // Rank-2 factorization of a fully observed 2x2 matrix fits it
        // almost exactly, so the RMSE on the same pairs is near zero.
        let pool = Pool::new(2);
        let triples = vec![(0, 0, 5.0), (0, 1, 1.0), (1, 0, 1.0), (1, 1, 5.0)];
        let combination = Combination { rank: 2, lambda: 0.001, num_iters: 100 };
        let model = train(&triples, (3, 3), &combination, false, 42, &pool).unwrap();

        let holdout: Vec<Rating> = triples
            .iter()
            .map(|&(user, item, value)| Rating::new(user, item, value, 0))
            .collect();

        let score = rmse(&model, &holdout).unwrap();

        assert!(score >= 0.0);
        assert!(score < 0.1, "rmse was {}", score);
    }

    #[test]
    fn rmse_of_empty_holdout_is_insufficient_data() {
        let pool = Pool::new(2);
        let combination = Combination { rank: 1, lambda: 0.1, num_iters: 5 };
        let model = train(&[(0, 0, 1.0)], (2, 2), &combination, false, 42, &pool).unwrap();

        assert!(rmse(&model, &[]).is_err());
    }

    #[test]
    fn perfect_ranking_scores_one() {
        let labels = vec![1.0, 1.0, 0.0, 0.0];
        let scores = vec![0.9, 0.8, 0.2, 0.1];

        assert!((auroc(&labels, &scores).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn inverted_ranking_scores_zero() {
        let labels = vec![0.0, 0.0, 1.0, 1.0];
        let scores = vec![0.9, 0.8, 0.2, 0.1];

        assert!(auroc(&labels, &scores).unwrap().abs() < 1e-12);
    }

    #[test]
    fn uninformative_scores_give_one_half() {
        let labels = vec![1.0, 0.0, 1.0, 0.0, 1.0];
        let scores = vec![0.5, 0.5, 0.5, 0.5, 0.5];

        assert!((auroc(&labels, &scores).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn auroc_stays_within_bounds_under_ties() {
        let labels = vec![1.0, 0.0, 1.0, 0.0, 0.0, 1.0];
        let scores = vec![0.7, 0.7, 0.4, 0.4, 0.1, 0.9];

        let score = auroc(&labels, &scores).unwrap();

        assert!(score >= 0.0 && score <= 1.0);
    }

    #[test]
    fn single_class_is_insufficient_data() {
        assert!(auroc(&[1.0, 1.0], &[0.4, 0.6]).is_err());
        assert!(auroc(&[0.0, 0.0], &[0.4, 0.6]).is_err());
        assert!(auroc(&[], &[]).is_err());
    }

    #[test]
    fn masked_auroc_ignores_unobserved_cells() {
        let holdout = vec![
            Rating::new(0, 0, 5.0, 0),
            Rating::new(0, 1, 1.0, 0),
            Rating::new(1, 0, 1.0, 0),
        ];
        let matrix = build(&holdout, (2, 2)).unwrap();
        let masks = build_masks(&matrix, MaskPolicy::Binary { threshold: 3.0 });

        // Predictions rank the positive cell highest; the unobserved cell
        // (1, 1) carries a huge score but must not influence the result.
        let mut predictions = DenseMatrix::zeros(2, 2);
        predictions.set(0, 0, 0.9);
        predictions.set(0, 1, 0.3);
        predictions.set(1, 0, 0.2);
        predictions.set(1, 1, 100.0);

        assert!((auroc_masked(&predictions, &masks).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn baseline_uses_the_global_mean() {
        let train_set = vec![Rating::new(0, 0, 4.0, 0), Rating::new(0, 1, 2.0, 0)];
        let validation_set = vec![Rating::new(1, 0, 3.0, 0)];

        let mean = global_mean(&[&train_set, &validation_set]).unwrap();
        assert!((mean - 3.0).abs() < 1e-12);

        let test_set = vec![Rating::new(1, 1, 5.0, 0), Rating::new(0, 1, 1.0, 0)];
        let baseline = baseline_rmse(mean, &test_set).unwrap();

        assert!((baseline - 2.0).abs() < 1e-12);
        assert!(global_mean(&[&[]]).is_none());
        assert!(baseline_rmse(mean, &[]).is_err());
    }

    #[test]
    fn zero_range_normalization_maps_to_one_half() {
        let matrix = DenseMatrix::zeros(2, 2);

        let normalized = normalize_scores(&matrix);

        assert!(normalized.values().iter().all(|&value| value == 0.5));
    }
}
