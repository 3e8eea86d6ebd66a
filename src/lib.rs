//! Grid-searched matrix factorization evaluation for MovieLens-style
//! rating data.
//!
//! The pipeline parses a ratings file, deterministically partitions it into
//! train/validation/test sets by the last digit of each timestamp, trains an
//! alternating-least-squares factorization per hyperparameter combination
//! and keeps the model with the best validation score (RMSE or AUROC),
//! reporting its held-out test score.

extern crate csv;
extern crate fnv;
extern crate rand;
extern crate scoped_pool;
extern crate serde;
extern crate serde_json;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate serde_derive;

use std::fs;
use std::path::PathBuf;

pub mod als;
pub mod cache;
pub mod errors;
pub mod io;
pub mod matrix;
pub mod recommend;
pub mod scoring;
pub mod split;
pub mod stats;
pub mod types;
pub mod utils;


use scoped_pool::Pool;

use als::{Combination, Model};
use errors::PipelineError;
use io::InputFormat;
use matrix::MaskPolicy;
use split::Boundaries;
use stats::DataStats;
use types::{ItemSet, Rating, Triple};

/// How trained models are scored against held-out data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScoringMode {
    /// Regression view: root mean squared error, lower is better.
    Rmse,
    /// Binary-relevance view: area under the ROC curve, higher is better.
    Auroc,
}

impl ScoringMode {

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "rmse" => Some(ScoringMode::Rmse),
            "auroc" => Some(ScoringMode::Auroc),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match *self {
            ScoringMode::Rmse => "rmse",
            ScoringMode::Auroc => "auroc",
        }
    }

    fn label(&self) -> &'static str {
        match *self {
            ScoringMode::Rmse => "RMSE",
            ScoringMode::Auroc => "AUROC",
        }
    }
}

/// The hyperparameter grid. Combinations are iterated ranks-outermost,
/// then lambdas, then iteration counts; that fixed order is what makes
/// tie-breaking ("first wins") reproducible.
#[derive(Clone, Debug)]
pub struct HyperGrid {
    pub ranks: Vec<usize>,
    pub lambdas: Vec<f64>,
    pub num_iters: Vec<usize>,
}

impl HyperGrid {

    pub fn default_rmse() -> Self {
        HyperGrid {
            ranks: vec![8, 12],
            lambdas: vec![0.1, 10.0],
            num_iters: vec![10, 20],
        }
    }

    pub fn default_auroc() -> Self {
        HyperGrid {
            ranks: vec![16, 25],
            lambdas: vec![0.1, 0.01],
            num_iters: vec![10, 20],
        }
    }

    pub fn combinations(&self) -> Vec<Combination> {

        let mut combinations =
            Vec::with_capacity(self.ranks.len() * self.lambdas.len() * self.num_iters.len());

        for &rank in &self.ranks {
            for &lambda in &self.lambdas {
                for &num_iters in &self.num_iters {
                    combinations.push(Combination { rank, lambda, num_iters });
                }
            }
        }

        combinations
    }
}

/// Everything a run needs, passed in explicitly. There is no process-wide
/// state.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub ratings_path: String,
    pub format: InputFormat,
    pub boundaries: Boundaries,
    /// Matrix dimensions; derived from the maximum ids when absent.
    pub shape: Option<(usize, usize)>,
    pub mode: ScoringMode,
    /// Labeling policy for the implicit-feedback training target.
    pub policy: MaskPolicy,
    /// Positive-class threshold for the held-out evaluation masks.
    pub eval_threshold: f64,
    pub grid: HyperGrid,
    pub nonnegative: bool,
    pub seed: u64,
    pub pool_size: usize,
    pub cache_dir: Option<String>,
}

impl PipelineConfig {

    pub fn new(ratings_path: &str, mode: ScoringMode) -> Self {
        PipelineConfig {
            ratings_path: ratings_path.to_string(),
            format: InputFormat::Dat,
            boundaries: Boundaries::default(),
            shape: None,
            mode,
            policy: MaskPolicy::Proportional,
            eval_threshold: 3.0,
            grid: match mode {
                ScoringMode::Rmse => HyperGrid::default_rmse(),
                ScoringMode::Auroc => HyperGrid::default_auroc(),
            },
            nonnegative: mode == ScoringMode::Auroc,
            seed: 42,
            pool_size: 1,
            cache_dir: None,
        }
    }
}

/// The winning grid point and its scores.
#[derive(Clone, Debug, Serialize)]
pub struct Selection {
    pub rank: usize,
    pub lambda: f64,
    pub num_iters: usize,
    pub validation_score: f64,
    pub test_score: Option<f64>,
    pub baseline_rmse: Option<f64>,
    pub improvement_pct: Option<f64>,
}

/// Serializable summary of a whole run.
#[derive(Clone, Debug, Serialize)]
pub struct Report {
    pub mode: String,
    pub num_ratings: u64,
    pub num_users: usize,
    pub num_items: usize,
    pub num_train: usize,
    pub num_validation: usize,
    pub num_test: usize,
    pub selection: Option<Selection>,
}

/// Result of a pipeline run: the report, the selected model (if any) and
/// the per-user sets of already-rated items for recommendation filtering.
pub struct RunOutcome {
    pub report: Report,
    pub model: Option<Model>,
    pub rated: Vec<ItemSet>,
}

/// Strict comparison rule of the model selector. A tie never replaces the
/// incumbent, so the first combination in grid order wins.
pub fn improves(candidate: f64, incumbent: Option<f64>, mode: ScoringMode) -> bool {
    match incumbent {
        None => true,
        Some(best) => match mode {
            ScoringMode::Rmse => candidate < best,
            ScoringMode::Auroc => candidate > best,
        },
    }
}

/// Runs the whole pipeline: parse, partition, build, grid search, select.
pub fn run(config: &PipelineConfig) -> Result<RunOutcome, PipelineError> {

    let ratings = io::load_ratings(&config.ratings_path, config.format)?;
    let data_stats = DataStats::from_ratings(&ratings);

    println!(
        "Got {} ratings from {} users on {} items.",
        data_stats.num_ratings(),
        data_stats.num_users(),
        data_stats.num_items(),
    );

    let shape = config.shape.unwrap_or_else(|| data_stats.shape());
    check_shape(&ratings, shape)?;

    let (train_set, validation, test) = split::split_ratings(&ratings, config.boundaries);

    println!(
        "Training: {}, validation: {}, test: {}",
        train_set.len(),
        validation.len(),
        test.len(),
    );

    // One pool for the entire grid search; its workers only exit on
    // shutdown.
    let pool = Pool::new(config.pool_size.max(1));

    let search_result = match config.mode {
        ScoringMode::Rmse => {
            rmse_grid_search(config, &train_set, &validation, &test, shape, &pool)
        }
        ScoringMode::Auroc => {
            auroc_grid_search(config, &train_set, &validation, &test, shape, &pool)
        }
    };

    pool.shutdown();
    let selected = search_result?;

    let (selection, model) = match selected {
        Some((selection, model)) => (Some(selection), Some(model)),
        None => (None, None),
    };

    if let Some(ref selection) = selection {
        match selection.test_score {
            Some(test_score) => println!(
                "The best model was trained with rank = {}, lambda = {}, and num_iters = {}, \
                 and its {} on the test set is {}.",
                selection.rank,
                selection.lambda,
                selection.num_iters,
                config.mode.label(),
                test_score,
            ),
            None => println!(
                "The best model was trained with rank = {}, lambda = {}, and num_iters = {}; \
                 no test score is available.",
                selection.rank, selection.lambda, selection.num_iters,
            ),
        }

        if let Some(improvement) = selection.improvement_pct {
            println!("The best model improves the baseline by {:.2}%.", improvement);
        }
    }

    let mut rated: Vec<ItemSet> = (0..shape.0).map(|_| types::new_item_set()).collect();
    for rating in &ratings {
        rated[rating.user as usize].insert(rating.item);
    }

    let report = Report {
        mode: config.mode.name().to_string(),
        num_ratings: data_stats.num_ratings(),
        num_users: data_stats.num_users(),
        num_items: data_stats.num_items(),
        num_train: train_set.len(),
        num_validation: validation.len(),
        num_test: test.len(),
        selection,
    };

    Ok(RunOutcome { report, model, rated })
}

fn check_shape(ratings: &[Rating], shape: (usize, usize)) -> Result<(), PipelineError> {

    for rating in ratings {
        if rating.user as usize >= shape.0 || rating.item as usize >= shape.1 {
            return Err(PipelineError::Shape {
                user: rating.user,
                item: rating.item,
                rows: shape.0,
                cols: shape.1,
            });
        }
    }

    Ok(())
}

/// RMSE-mode grid search: train on the raw rating triples, select by
/// validation RMSE, report the test RMSE and the improvement over the
/// global-mean baseline.
fn rmse_grid_search(
    config: &PipelineConfig,
    train_set: &[Rating],
    validation: &[Rating],
    test: &[Rating],
    shape: (usize, usize),
    pool: &Pool,
) -> Result<Option<(Selection, Model)>, PipelineError> {

    let train_triples = matrix::triples(train_set);
    let mut best: Option<(Combination, f64, Model)> = None;

    for combination in config.grid.combinations() {

        let model = match als::train(
            &train_triples,
            shape,
            &combination,
            config.nonnegative,
            config.seed,
            pool,
        ) {
            Ok(model) => model,
            Err(ref error) if !error.is_fatal() => {
                println!(
                    "Skipping rank = {}, lambda = {}, num_iters = {}: {}",
                    combination.rank, combination.lambda, combination.num_iters, error,
                );
                continue;
            }
            Err(error) => return Err(error),
        };

        let validation_score = match scoring::rmse(&model, validation) {
            Ok(score) => score,
            Err(ref error) if !error.is_fatal() => {
                println!(
                    "Skipping rank = {}, lambda = {}, num_iters = {}: {}",
                    combination.rank, combination.lambda, combination.num_iters, error,
                );
                continue;
            }
            Err(error) => return Err(error),
        };

        println!(
            "RMSE (validation) = {} for the model trained with rank = {}, lambda = {}, \
             and num_iters = {}.",
            validation_score, combination.rank, combination.lambda, combination.num_iters,
        );

        if improves(validation_score, best.as_ref().map(|b| b.1), ScoringMode::Rmse) {
            best = Some((combination, validation_score, model));
        }
    }

    let (combination, validation_score, model) = match best {
        Some(best) => best,
        None => {
            println!("No model selected.");
            return Ok(None);
        }
    };

    let test_score = scoring::rmse(&model, test).ok();

    let baseline = match (scoring::global_mean(&[train_set, validation]), test_score) {
        (Some(mean), Some(_)) => scoring::baseline_rmse(mean, test).ok(),
        _ => None,
    };

    let improvement_pct = match (baseline, test_score) {
        (Some(baseline), Some(test_score)) if baseline > 0.0 => {
            Some((baseline - test_score) / baseline * 100.0)
        }
        _ => None,
    };

    let selection = Selection {
        rank: combination.rank,
        lambda: combination.lambda,
        num_iters: combination.num_iters,
        validation_score,
        test_score,
        baseline_rmse: baseline,
        improvement_pct,
    };

    Ok(Some((selection, model)))
}

/// AUROC-mode grid search: train on the derived `T = [X|Y]` target, select
/// by validation AUROC against binary held-out masks, report the test
/// AUROC.
fn auroc_grid_search(
    config: &PipelineConfig,
    train_set: &[Rating],
    validation: &[Rating],
    test: &[Rating],
    shape: (usize, usize),
    pool: &Pool,
) -> Result<Option<(Selection, Model)>, PipelineError> {

    let t_triples = match build_t_triples(config, train_set, shape) {
        Ok(triples) => triples,
        Err(ref error) if !error.is_fatal() => {
            println!("Cannot build the training target: {}", error);
            println!("No model selected.");
            return Ok(None);
        }
        Err(error) => return Err(error),
    };

    let eval_policy = MaskPolicy::Binary { threshold: config.eval_threshold };
    let validation_masks = matrix::build_masks(&matrix::build(validation, shape)?, eval_policy);
    let test_masks = matrix::build_masks(&matrix::build(test, shape)?, eval_policy);

    let t_shape = (shape.0, shape.1 * 2);
    let mut best: Option<(Combination, f64, Model)> = None;

    for combination in config.grid.combinations() {

        let model = match als::train(
            &t_triples,
            t_shape,
            &combination,
            config.nonnegative,
            config.seed,
            pool,
        ) {
            Ok(model) => model,
            Err(ref error) if !error.is_fatal() => {
                println!(
                    "Skipping rank = {}, lambda = {}, num_iters = {}: {}",
                    combination.rank, combination.lambda, combination.num_iters, error,
                );
                continue;
            }
            Err(error) => return Err(error),
        };

        let predictions = matrix::left_half(&model.completed());

        let validation_score = match scoring::auroc_masked(&predictions, &validation_masks) {
            Ok(score) => score,
            Err(ref error) if !error.is_fatal() => {
                println!(
                    "Skipping rank = {}, lambda = {}, num_iters = {}: {}",
                    combination.rank, combination.lambda, combination.num_iters, error,
                );
                continue;
            }
            Err(error) => return Err(error),
        };

        println!(
            "AUROC (validation) = {} for the model trained with rank = {}, lambda = {}, \
             and num_iters = {}.",
            validation_score, combination.rank, combination.lambda, combination.num_iters,
        );

        if improves(validation_score, best.as_ref().map(|b| b.1), ScoringMode::Auroc) {
            best = Some((combination, validation_score, model));
        }
    }

    let (combination, validation_score, model) = match best {
        Some(best) => best,
        None => {
            println!("No model selected.");
            return Ok(None);
        }
    };

    let test_score =
        scoring::auroc_masked(&matrix::left_half(&model.completed()), &test_masks).ok();

    let selection = Selection {
        rank: combination.rank,
        lambda: combination.lambda,
        num_iters: combination.num_iters,
        validation_score,
        test_score,
        baseline_rmse: None,
        improvement_pct: None,
    };

    Ok(Some((selection, model)))
}

/// Builds (or reloads) the T-matrix triples for AUROC-mode training,
/// consulting the content-addressed cache when a cache directory is
/// configured.
fn build_t_triples(
    config: &PipelineConfig,
    train_set: &[Rating],
    shape: (usize, usize),
) -> Result<Vec<Triple>, PipelineError> {

    let cache_slot = match config.cache_dir {
        Some(ref dir) => {
            let source = fs::read(&config.ratings_path).map_err(|e| {
                PipelineError::Input(format!("cannot read {}: {}", config.ratings_path, e))
            })?;
            let key = cache::t_cache_key(&source, config.boundaries, config.policy, shape);
            Some((PathBuf::from(dir), key))
        }
        None => None,
    };

    if let Some((ref dir, key)) = cache_slot {
        if let Some(triples) = cache::load_triples(dir, key) {
            println!("Using cached training target ({} triples).", triples.len());
            return Ok(triples);
        }
    }

    let train_matrix = matrix::build(train_set, shape)?;
    let masks = matrix::build_masks(&train_matrix, config.policy);
    let t = matrix::compute_t(&masks.x, &masks.y)?;
    let triples = matrix::to_triples(&t);

    if let Some((ref dir, key)) = cache_slot {
        if let Err(error) = cache::store_triples(dir, key, &triples) {
            eprintln!("Cannot write the cache entry: {}", error);
        }
    }

    Ok(triples)
}
