/**
 * SimReco
 * Copyright (C) 2018 Sebastian Schelter
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

use std::io;

use thiserror::Error;

use crate::index::Orientation;
use crate::types::{ItemId, UserId};

/// Failures while loading data, building the model or reading it back from disk. All of these
/// are fatal for startup: no recommendations are served from a partially loaded context.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Malformed interaction data{}: {reason}", describe_line(.line))]
    DataFormat { line: Option<u64>, reason: String },

    #[error("Position ({row}, {col}) lies outside of a {num_rows}x{num_cols} matrix")]
    IndexOutOfBounds { row: usize, col: usize, num_rows: usize, num_cols: usize },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("The {orientation:?} index was fitted to matrix generation {index:016x}, \
        but the loaded matrix has generation {matrix:016x}")]
    GenerationMismatch { orientation: Orientation, index: u64, matrix: u64 },

    #[error("Expected an index over {expected:?}, found one over {actual:?}")]
    WrongOrientation { expected: Orientation, actual: Orientation },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

fn describe_line(line: &Option<u64>) -> String {
    match line {
        Some(line) => format!(" (line {})", line),
        None => String::new(),
    }
}

impl Error {
    pub fn data_format<S: Into<String>>(line: Option<u64>, reason: S) -> Self {
        Error::DataFormat { line, reason: reason.into() }
    }
}

/// Why a single query produced no recommendations. An `Ok` with an empty list means the
/// identifier is known but there is simply nothing to recommend.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Item {0} is not part of the interaction data")]
    UnknownItem(ItemId),

    #[error("User {0} is not part of the interaction data")]
    UnknownUser(UserId),

    #[error("Number of recommendations must be between 1 and {max}, got {requested}")]
    InvalidCount { requested: usize, max: usize },

    #[error("Similarity index failure: {0}")]
    Index(#[from] Error),
}
