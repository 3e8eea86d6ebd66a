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

extern crate csv;
extern crate serde;
extern crate serde_json;

use std::fs::File;
use std::io;
use std::io::prelude::*;
use std::io::{stdout, BufReader};
use std::path::Path;

use errors::PipelineError;
use types::{Rating, TitleMap};

/// Delimiter of the MovieLens `.dat` files. Two bytes, so these files are
/// split by hand instead of going through the csv crate.
pub const DAT_DELIMITER: &str = "::";

/// Supported input encodings for the ratings file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputFormat {
    /// `user::item::rating::timestamp` lines.
    Dat,
    /// Tab-separated `user item rating timestamp` lines, no header.
    Tsv,
}

impl InputFormat {

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "dat" => Some(InputFormat::Dat),
            "tsv" => Some(InputFormat::Tsv),
            _ => None,
        }
    }
}

fn parse_field<T: ::std::str::FromStr>(
    field: &str,
    what: &str,
    line: usize,
) -> Result<T, PipelineError> {
    field.trim().parse().map_err(|_| PipelineError::Parse {
        line,
        reason: format!("cannot cast '{}' to {}", field, what),
    })
}

/// Parses one `user::item::rating::timestamp` line.
pub fn parse_rating(line: &str, line_no: usize) -> Result<Rating, PipelineError> {

    let fields: Vec<&str> = line.trim().split(DAT_DELIMITER).collect();

    if fields.len() != 4 {
        return Err(PipelineError::Parse {
            line: line_no,
            reason: format!("expected 4 fields, found {}", fields.len()),
        });
    }

    Ok(Rating {
        user: parse_field(fields[0], "user id", line_no)?,
        item: parse_field(fields[1], "item id", line_no)?,
        value: parse_field(fields[2], "rating", line_no)?,
        timestamp: parse_field(fields[3], "timestamp", line_no)?,
    })
}

/// Parses one `item::title[::genres]` metadata line.
pub fn parse_movie(line: &str, line_no: usize) -> Result<(u32, String), PipelineError> {

    let fields: Vec<&str> = line.trim().split(DAT_DELIMITER).collect();

    if fields.len() < 2 {
        return Err(PipelineError::Parse {
            line: line_no,
            reason: format!("expected at least 2 fields, found {}", fields.len()),
        });
    }

    let item = parse_field(fields[0], "item id", line_no)?;

    Ok((item, fields[1].to_string()))
}

/// Loads the whole ratings file into memory, dropping records with a
/// non-positive rating. A missing file, a malformed line or an empty result
/// aborts the run: no partial experiment is ever produced.
pub fn load_ratings(path: &str, format: InputFormat) -> Result<Vec<Rating>, PipelineError> {

    if !Path::new(path).is_file() {
        return Err(PipelineError::Input(format!("file {} does not exist", path)));
    }

    let ratings = match format {
        InputFormat::Dat => load_ratings_dat(path)?,
        InputFormat::Tsv => load_ratings_tsv(path)?,
    };

    if ratings.is_empty() {
        return Err(PipelineError::Input("no ratings provided".to_string()));
    }

    Ok(ratings)
}

fn load_ratings_dat(path: &str) -> Result<Vec<Rating>, PipelineError> {

    let file = File::open(path)
        .map_err(|e| PipelineError::Input(format!("cannot open {}: {}", path, e)))?;

    let mut ratings = Vec::new();

    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line
            .map_err(|e| PipelineError::Input(format!("cannot read {}: {}", path, e)))?;

        if line.trim().is_empty() {
            continue;
        }

        let rating = parse_rating(&line, idx + 1)?;
        if rating.value > 0.0 {
            ratings.push(rating);
        }
    }

    Ok(ratings)
}

fn load_ratings_tsv(path: &str) -> Result<Vec<Rating>, PipelineError> {

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b'\t')
        .from_path(path)
        .map_err(|e| PipelineError::Input(format!("cannot open {}: {}", path, e)))?;

    let mut ratings = Vec::new();

    for (idx, record) in reader.deserialize().enumerate() {
        let (user, item, value, timestamp): (u32, u32, f64, i64) =
            record.map_err(|e| PipelineError::Parse {
                line: idx + 1,
                reason: e.to_string(),
            })?;

        if value > 0.0 {
            ratings.push(Rating { user, item, value, timestamp });
        }
    }

    Ok(ratings)
}

/// Loads the movie metadata file into an id -> title map.
pub fn load_movies(path: &str) -> Result<TitleMap, PipelineError> {

    if !Path::new(path).is_file() {
        return Err(PipelineError::Input(format!("file {} does not exist", path)));
    }

    let file = File::open(path)
        .map_err(|e| PipelineError::Input(format!("cannot open {}: {}", path, e)))?;

    let mut titles = TitleMap::default();

    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line
            .map_err(|e| PipelineError::Input(format!("cannot read {}: {}", path, e)))?;

        if line.trim().is_empty() {
            continue;
        }

        let (item, title) = parse_movie(&line, idx + 1)?;
        titles.insert(item, title);
    }

    Ok(titles)
}

/// Writes a value as JSON. If a path is supplied, we write to a file at the
/// specified path, otherwise, we output to stdout.
pub fn write_json<T: serde::Serialize>(value: &T, path: Option<String>) -> io::Result<()> {

    let mut out: Box<Write> = match path {
        Some(path) => Box::new(File::create(&Path::new(&path))?),
        _ => Box::new(stdout()),
    };

    let as_json = serde_json::to_string_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    write!(out, "{}\n", as_json)?;

    Ok(())
}
