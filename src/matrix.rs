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

use std::fmt;
use std::hash::Hasher;

use fnv::FnvHasher;
use log::warn;
use serde_derive::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{DenseVector, Position, SparseVector};

/// How to combine several ratings for the same (user, item) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Add up all ratings of the pair.
    Sum,
    /// The rating that comes last in the input wins.
    Overwrite,
}

impl Default for DuplicatePolicy {
    fn default() -> Self {
        DuplicatePolicy::Sum
    }
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DuplicatePolicy::Sum => write!(f, "sum"),
            DuplicatePolicy::Overwrite => write!(f, "overwrite"),
        }
    }
}

impl std::str::FromStr for DuplicatePolicy {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "sum" => Ok(DuplicatePolicy::Sum),
            "overwrite" => Ok(DuplicatePolicy::Overwrite),
            _ => Err(Error::InvalidConfig(
                format!("unknown duplicate policy '{}', expected 'sum' or 'overwrite'", name))),
        }
    }
}

/// Immutable sparse matrix in compressed row format. Column indices are sorted within a row and
/// no explicit zeros are stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionMatrix {
    num_rows: usize,
    num_cols: usize,
    indptr: Vec<usize>,
    indices: Vec<Position>,
    values: Vec<f64>,
}

impl InteractionMatrix {

    /// Builds a `num_rows x num_cols` matrix from (row, column, value) triplets.
    pub fn from_triplets<I>(
        num_rows: usize,
        num_cols: usize,
        triplets: I,
        policy: DuplicatePolicy,
    ) -> Result<Self>
        where I: IntoIterator<Item=(Position, Position, f64)> {

        let mut rows: Vec<Vec<(Position, f64)>> = vec![Vec::new(); num_rows];

        for (row, col, value) in triplets {
            if row as usize >= num_rows || col as usize >= num_cols {
                return Err(Error::IndexOutOfBounds {
                    row: row as usize,
                    col: col as usize,
                    num_rows,
                    num_cols,
                });
            }
            rows[row as usize].push((col, value));
        }

        let mut num_collisions: u64 = 0;

        let mut indptr = Vec::with_capacity(num_rows + 1);
        let mut indices = Vec::new();
        let mut values = Vec::new();
        indptr.push(0);

        for (row, mut entries) in rows.into_iter().enumerate() {
            // Stable, so the input order of colliding entries is preserved for `Overwrite`
            entries.sort_by_key(|&(col, _)| col);

            let mut position = 0;
            while position < entries.len() {
                let (col, mut value) = entries[position];
                position += 1;

                while position < entries.len() && entries[position].0 == col {
                    value = match policy {
                        DuplicatePolicy::Sum => value + entries[position].1,
                        DuplicatePolicy::Overwrite => entries[position].1,
                    };
                    num_collisions += 1;
                    position += 1;
                }

                if !value.is_finite() {
                    return Err(Error::data_format(None, format!(
                        "rating of user position {} for item position {} is not finite ({}), \
                        check for overflowing duplicates", row, col, value)));
                }

                if value != 0.0 {
                    indices.push(col);
                    values.push(value);
                }
            }

            indptr.push(indices.len());
        }

        if num_collisions > 0 {
            warn!("{} interactions repeated an existing (user, item) pair, combined via {:?}",
                num_collisions, policy);
        }

        Ok(InteractionMatrix { num_rows, num_cols, indptr, indices, values })
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_cols(&self) -> usize {
        self.num_cols
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Copy of the given row, or `None` if it lies outside of the matrix.
    pub fn row(&self, row: Position) -> Option<SparseVector> {
        let row = row as usize;
        if row >= self.num_rows {
            return None;
        }

        let (start, end) = (self.indptr[row], self.indptr[row + 1]);
        Some(SparseVector {
            indices: self.indices[start..end].to_vec(),
            values: self.values[start..end].to_vec(),
        })
    }

    /// Copy of the given column, laid out as a row vector of width `num_rows`.
    pub fn column(&self, col: Position) -> Option<SparseVector> {
        if col as usize >= self.num_cols {
            return None;
        }

        let mut column = SparseVector::default();
        for row in 0..self.num_rows {
            let (start, end) = (self.indptr[row], self.indptr[row + 1]);
            if let Ok(offset) = self.indices[start..end].binary_search(&col) {
                column.indices.push(row as Position);
                column.values.push(self.values[start + offset]);
            }
        }

        Some(column)
    }

    pub fn rows(&self) -> impl Iterator<Item=SparseVector> + '_ {
        (0..self.num_rows as Position).filter_map(move |row| self.row(row))
    }

    pub fn transpose(&self) -> InteractionMatrix {
        let mut counts = vec![0_usize; self.num_cols + 1];
        for col in self.indices.iter() {
            counts[*col as usize + 1] += 1;
        }
        for col in 0..self.num_cols {
            counts[col + 1] += counts[col];
        }

        let indptr = counts.clone();
        let mut next = counts;
        let mut indices = vec![0; self.nnz()];
        let mut values = vec![0.0; self.nnz()];

        // Rows are visited in ascending order, so the rows of the transpose come out sorted
        for row in 0..self.num_rows {
            for offset in self.indptr[row]..self.indptr[row + 1] {
                let col = self.indices[offset] as usize;
                let target = next[col];
                indices[target] = row as Position;
                values[target] = self.values[offset];
                next[col] += 1;
            }
        }

        InteractionMatrix {
            num_rows: self.num_cols,
            num_cols: self.num_rows,
            indptr,
            indices,
            values,
        }
    }

    /// Column-wise sum of the selected rows as a dense vector of width `num_cols`. Rows outside
    /// of the matrix are skipped.
    pub fn sum_rows(&self, rows: &[Position]) -> DenseVector {
        let mut sums = vec![0.0; self.num_cols];

        for row in rows.iter().map(|row| *row as usize).filter(|row| *row < self.num_rows) {
            for offset in self.indptr[row]..self.indptr[row + 1] {
                sums[self.indices[offset] as usize] += self.values[offset];
            }
        }

        sums
    }

    /// Deterministic fingerprint of shape and contents. Matrices built from the same data and
    /// the same identifier registry share a generation, in any process.
    pub fn generation(&self) -> u64 {
        let mut hasher = FnvHasher::default();

        hasher.write_u64(self.num_rows as u64);
        hasher.write_u64(self.num_cols as u64);
        for pointer in self.indptr.iter() {
            hasher.write_u64(*pointer as u64);
        }
        for index in self.indices.iter() {
            hasher.write_u32(*index);
        }
        for value in self.values.iter() {
            hasher.write_u64(value.to_bits());
        }

        hasher.finish()
    }
}
