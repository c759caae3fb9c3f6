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

use std::collections::BinaryHeap;

use serde_derive::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::matrix::InteractionMatrix;
use crate::types::{Neighbor, Position, RankedNeighbor, SparseVector};

/// What the rows of an index stand for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    /// One row per user, fitted to the user x item matrix.
    Users,
    /// One row per item, fitted to the transposed matrix.
    Items,
}

/// Exact nearest-neighbour search under cosine distance. We compare the query against every
/// indexed row ("brute force"), which is fine for the data sizes we target.
///
/// The index keeps its own copy of the rows it was fitted to, and remembers the generation of
/// the user x item matrix they came from. Callers that hand in query vectors from a matrix must
/// make sure it is the same generation, see [`SimilarityIndex::check_generation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityIndex {
    orientation: Orientation,
    generation: u64,
    rows: InteractionMatrix,
    // per row: largest absolute value, and the norm of the row divided by it
    scales: Vec<f64>,
    norms: Vec<f64>,
}

impl SimilarityIndex {

    /// Indexes the users of `user_item_matrix`.
    pub fn fit_users(user_item_matrix: &InteractionMatrix) -> Self {
        SimilarityIndex::fit(
            user_item_matrix.clone(),
            Orientation::Users,
            user_item_matrix.generation(),
        )
    }

    /// Indexes the items of `user_item_matrix`, i.e. the rows of its transpose.
    pub fn fit_items(user_item_matrix: &InteractionMatrix) -> Self {
        SimilarityIndex::fit(
            user_item_matrix.transpose(),
            Orientation::Items,
            user_item_matrix.generation(),
        )
    }

    fn fit(rows: InteractionMatrix, orientation: Orientation, generation: u64) -> Self {
        let (scales, norms) = rows.rows()
            .map(|row| {
                let scale = row.max_abs();
                (scale, if scale == 0.0 { 0.0 } else { row.scaled_norm(scale) })
            })
            .unzip();
        SimilarityIndex { orientation, generation, rows, scales, norms }
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.rows.num_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.num_rows() == 0
    }

    /// Width of the vectors this index compares.
    pub fn dimensions(&self) -> usize {
        self.rows.num_cols()
    }

    /// Fails fast if this index was fitted to another generation of the user x item matrix.
    pub fn check_generation(&self, user_item_matrix: &InteractionMatrix) -> Result<()> {
        let matrix_generation = user_item_matrix.generation();

        if self.generation != matrix_generation {
            return Err(Error::GenerationMismatch {
                orientation: self.orientation,
                index: self.generation,
                matrix: matrix_generation,
            });
        }

        Ok(())
    }

    pub fn check_orientation(&self, expected: Orientation) -> Result<()> {
        if self.orientation != expected {
            return Err(Error::WrongOrientation { expected, actual: self.orientation });
        }
        Ok(())
    }

    /// The `k` indexed rows closest to `query`, by ascending cosine distance, ties broken by the
    /// lower row. Returns `min(k, len())` neighbours. If the query is itself an indexed row, it
    /// will typically come back first with distance zero; dropping it is up to the caller.
    pub fn kneighbors(&self, query: &SparseVector, k: usize) -> Result<Vec<Neighbor>> {

        if let Some(last) = query.indices.last() {
            if *last as usize >= self.dimensions() {
                return Err(Error::DimensionMismatch {
                    expected: self.dimensions(),
                    actual: *last as usize + 1,
                });
            }
        }

        let k = k.min(self.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_scale = query.max_abs();
        let query_norm = if query_scale == 0.0 { 0.0 } else { query.scaled_norm(query_scale) };
        let mut heap: BinaryHeap<RankedNeighbor> = BinaryHeap::with_capacity(k);

        for (row_index, row) in self.rows.rows().enumerate() {
            let neighbor = Neighbor {
                distance: cosine_distance(
                    (query, query_scale, query_norm),
                    (&row, self.scales[row_index], self.norms[row_index]),
                ),
                row: row_index as Position,
            };

            let candidate = RankedNeighbor(neighbor);
            if heap.len() < k {
                heap.push(candidate);
            } else if let Some(mut worst) = heap.peek_mut() {
                if candidate < *worst {
                    *worst = candidate;
                }
            }
        }

        Ok(heap.into_sorted_vec().into_iter().map(|ranked| ranked.0).collect())
    }
}

/// `1 - cos(a, b)`, clamped to `[0, 2]`. Each side comes with its largest absolute value and its
/// norm after dividing by that value, so the arithmetic stays in `[-nnz, nnz]` whatever the
/// magnitude of the ratings. A zero vector on either side is treated as having similarity zero to
/// everything, as is a similarity that is not a number.
fn cosine_distance(
    (a, scale_a, norm_a): (&SparseVector, f64, f64),
    (b, scale_b, norm_b): (&SparseVector, f64, f64),
) -> f64 {
    if scale_a == 0.0 || scale_b == 0.0 || norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }

    let similarity = a.scaled_dot(scale_a, b, scale_b) / (norm_a * norm_b);
    if !similarity.is_finite() {
        return 1.0;
    }

    (1.0 - similarity).max(0.0).min(2.0)
}
