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

extern crate failure;
extern crate getopts;
extern crate num_cpus;
extern crate recgrid;

use std::env;
use std::process;

use getopts::Options;

use recgrid::io::{self, InputFormat};
use recgrid::matrix::MaskPolicy;
use recgrid::recommend;
use recgrid::split::Boundaries;
use recgrid::{run, PipelineConfig, RunOutcome, ScoringMode};

fn main() {

    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("r", "ratings", "Ratings file name (required). Each line holds one \
        user::item::rating::timestamp record; the MovieLens-100K tab-separated layout is \
        supported via --format tsv.", "PATH");
    opts.optopt("m", "movies", "Movie metadata file name (optional, item::title lines). Used to \
        print titles next to recommendations.", "PATH");
    opts.optopt("f", "format", "Input format, 'dat' or 'tsv' (optional, defaults to dat).",
        "FORMAT");
    opts.optopt("s", "scoring", "Scoring mode, 'rmse' or 'auroc' (optional, defaults to rmse).",
        "MODE");
    opts.optopt("p", "policy", "Mask policy for the AUROC training target, 'binary' or \
        'proportional' (optional, defaults to proportional).", "POLICY");
    opts.optopt("t", "threshold", "Positive-class rating threshold (optional, defaults to 3).",
        "FLOAT");
    opts.optopt("b", "boundaries", "Partition boundaries over the last timestamp digit, \
        e.g. '6,8' (optional, defaults to 6,8).", "B1,B2");
    opts.optopt("e", "seed", "Seed for the factor initialization (optional, defaults to 42).",
        "NUMBER");
    opts.optopt("c", "cache-dir", "Directory for the content-addressed cache of the derived \
        training target (optional, disabled by default).", "PATH");
    opts.optopt("o", "outputfile", "Output file name for the JSON report (optional, the report \
        is written to stdout by default).", "PATH");
    opts.optopt("u", "recommend-for", "User id to print recommendations for after the \
        evaluation (optional).", "USER");
    opts.optopt("n", "num-recommendations", "Number of recommendations to print per user \
        (optional, defaults to 50).", "NUMBER");
    opts.optflag("h", "help", "Print this help menu");

    let matches = match opts.parse(&args[1..]) {
        Ok(matches) => matches,
        Err(failure) => {
            let hint = failure.to_string();
            return print_usage_and_exit(&program, opts, Some(&hint))
        },
    };

    if matches.opt_present("h") {
        return print_usage_and_exit(&program, opts, None);
    }

    if !matches.opt_present("r") {
        return print_usage_and_exit(
            &program,
            opts,
            Some("Please specify a ratings file via --ratings."),
        );
    }

    let ratings_path = matches.opt_str("r").unwrap();
    let movies_path = matches.opt_str("m");
    let output_path = matches.opt_str("o");
    let cache_dir = matches.opt_str("c");

    let format = match InputFormat::from_name(&matches.opt_str("f").unwrap_or("dat".to_string())) {
        Some(format) => format,
        None => return print_usage_and_exit(&program, opts, Some("Unknown input format.")),
    };

    let mode = match ScoringMode::from_name(&matches.opt_str("s").unwrap_or("rmse".to_string())) {
        Some(mode) => mode,
        None => return print_usage_and_exit(&program, opts, Some("Unknown scoring mode.")),
    };

    let threshold: f64 = match matches.opt_get_default("t", 3.0) {
        Ok(threshold) => threshold,
        Err(failure) => {
            let hint = format!("Problem with option 't': {}", failure.to_string());
            return print_usage_and_exit(&program, opts, Some(&hint))
        },
    };

    let policy = match matches.opt_str("p") {
        Some(name) => match MaskPolicy::from_name(&name, threshold) {
            Some(policy) => policy,
            None => return print_usage_and_exit(&program, opts, Some("Unknown mask policy.")),
        },
        None => MaskPolicy::Proportional,
    };

    let boundaries = match parse_boundaries(matches.opt_str("b")) {
        Ok(boundaries) => boundaries,
        Err(hint) => return print_usage_and_exit(&program, opts, Some(&hint)),
    };

    let seed: u64 = match matches.opt_get_default("e", 42) {
        Ok(seed) => seed,
        Err(failure) => {
            let hint = format!("Problem with option 'e': {}", failure.to_string());
            return print_usage_and_exit(&program, opts, Some(&hint))
        },
    };

    let recommend_for: Option<u32> = match matches.opt_get("u") {
        Ok(user) => user,
        Err(failure) => {
            let hint = format!("Problem with option 'u': {}", failure.to_string());
            return print_usage_and_exit(&program, opts, Some(&hint))
        },
    };

    let num_recommendations: usize = match matches.opt_get_default("n", 50) {
        Ok(n) => n,
        Err(failure) => {
            let hint = format!("Problem with option 'n': {}", failure.to_string());
            return print_usage_and_exit(&program, opts, Some(&hint))
        },
    };

    let mut config = PipelineConfig::new(&ratings_path, mode);
    config.format = format;
    config.boundaries = boundaries;
    config.policy = policy;
    config.eval_threshold = threshold;
    config.seed = seed;
    config.pool_size = num_cpus::get();
    config.cache_dir = cache_dir;

    if let Err(error) = evaluate(
        &config,
        movies_path,
        output_path,
        recommend_for,
        num_recommendations,
    ) {
        eprintln!("Error: {}", error);
        process::exit(1);
    }
}

fn print_usage_and_exit(
    program: &str,
    opts: Options,
    hint: Option<&str>
) {

    if let Some(hint) = hint {
        eprintln!("\n{}\n", hint);
    }

    let brief = format!("Usage: {} [options]", program);
    eprint!("{}", opts.usage(&brief));
}

fn parse_boundaries(option: Option<String>) -> Result<Boundaries, String> {

    let raw = match option {
        Some(raw) => raw,
        None => return Ok(Boundaries::default()),
    };

    let parts: Vec<&str> = raw.split(',').collect();
    if parts.len() != 2 {
        return Err(format!("Cannot parse boundaries '{}', expected 'B1,B2'.", raw));
    }

    let first: u8 = parts[0].trim().parse()
        .map_err(|_| format!("Cannot parse boundary '{}'.", parts[0]))?;
    let second: u8 = parts[1].trim().parse()
        .map_err(|_| format!("Cannot parse boundary '{}'.", parts[1]))?;

    Boundaries::new(first, second).map_err(|error| error.to_string())
}

fn evaluate(
    config: &PipelineConfig,
    movies_path: Option<String>,
    output_path: Option<String>,
    recommend_for: Option<u32>,
    num_recommendations: usize,
) -> Result<(), failure::Error> {

    println!("Evaluating {} with {} scoring.", config.ratings_path, config.mode.name());

    let RunOutcome { report, model, rated } = run(config)?;

    println!("Writing the evaluation report...");
    io::write_json(&report, output_path)?;

    if let (Some(model), Some(user)) = (model, recommend_for) {

        if user as usize >= rated.len() {
            eprintln!("Cannot recommend for unknown user {}.", user);
            return Ok(());
        }

        let titles = match movies_path {
            Some(path) => Some(io::load_movies(&path)?),
            None => None,
        };

        let recommendations =
            recommend::top_n(&model, user, &rated[user as usize], num_recommendations);

        println!("Top {} recommendations for user {}:", recommendations.len(), user);

        for scored in &recommendations {
            let title = titles
                .as_ref()
                .and_then(|titles| titles.get(&scored.item))
                .map(|title| title.as_str())
                .unwrap_or("");
            println!("\t{}\t{:.4}\t{}", scored.item, scored.score, title);
        }
    }

    Ok(())
}
