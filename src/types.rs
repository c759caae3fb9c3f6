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

use std::cmp::Ordering;

use serde_derive::{Deserialize, Serialize};

/// Externally assigned user identifier (`visitorid` in the input data).
pub type UserId = u64;
/// Externally assigned item identifier (`itemid` in the input data).
pub type ItemId = u64;

/// Dense zero-based position of a user or item inside the interaction matrix.
pub type Position = u32;

pub type DenseVector = Vec<f64>;

/// A single observed interaction. Field names follow the column names of the input file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    #[serde(rename = "visitorid")]
    pub user: UserId,
    #[serde(rename = "itemid")]
    pub item: ItemId,
    pub rating: f64,
}

impl Interaction {
    pub fn new(user: UserId, item: ItemId, rating: f64) -> Self {
        Interaction { user, item, rating }
    }
}

/// Owned sparse row, column indices are strictly increasing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    pub indices: Vec<Position>,
    pub values: Vec<f64>,
}

impl SparseVector {

    pub fn from_pairs(mut pairs: Vec<(Position, f64)>) -> Self {
        pairs.sort_by_key(|&(index, _)| index);
        pairs.dedup_by(|later, earlier| {
            if later.0 == earlier.0 {
                earlier.1 += later.1;
                true
            } else {
                false
            }
        });

        let (indices, values) = pairs.into_iter().filter(|&(_, value)| value != 0.0).unzip();
        SparseVector { indices, values }
    }

    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item=(Position, f64)> + '_ {
        self.indices.iter().cloned().zip(self.values.iter().cloned())
    }

    /// Largest absolute value, zero for an empty vector.
    pub fn max_abs(&self) -> f64 {
        self.values.iter().fold(0.0, |max: f64, value| max.max(value.abs()))
    }

    pub fn norm(&self) -> f64 {
        let scale = self.max_abs();
        if scale == 0.0 {
            return 0.0;
        }
        scale * self.scaled_norm(scale)
    }

    /// Norm of `self / scale`. With `scale = max_abs()` every squared term is at most one, so the
    /// sum cannot overflow for finite values.
    pub fn scaled_norm(&self, scale: f64) -> f64 {
        self.values.iter().map(|value| (value / scale).powi(2)).sum::<f64>().sqrt()
    }

    pub fn dot(&self, other: &SparseVector) -> f64 {
        self.scaled_dot(1.0, other, 1.0)
    }

    /// Dot product of `self / scale` and `other / other_scale`, via a merge over both sorted
    /// index lists.
    pub fn scaled_dot(&self, scale: f64, other: &SparseVector, other_scale: f64) -> f64 {
        let (mut a, mut b) = (0, 0);
        let mut sum = 0.0;

        while a < self.indices.len() && b < other.indices.len() {
            match self.indices[a].cmp(&other.indices[b]) {
                Ordering::Less => a += 1,
                Ordering::Greater => b += 1,
                Ordering::Equal => {
                    sum += (self.values[a] / scale) * (other.values[b] / other_scale);
                    a += 1;
                    b += 1;
                }
            }
        }

        sum
    }

    pub fn contains(&self, index: Position) -> bool {
        self.indices.binary_search(&index).is_ok()
    }
}

/// Result entry of a nearest-neighbour query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub distance: f64,
    pub row: Position,
}

/// Ascending distance, lower row first on ties. Distances are never NaN, we still fall back to
/// the row order if one sneaks in so that the ordering stays total.
pub fn cmp_neighbors(a: &Neighbor, b: &Neighbor) -> Ordering {
    a.distance.partial_cmp(&b.distance)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.row.cmp(&b.row))
}

/// Wrapper so that a max-heap keeps the k *closest* neighbours, the worst one sits on top.
#[derive(Debug, PartialEq)]
pub struct RankedNeighbor(pub Neighbor);

impl Eq for RankedNeighbor {}

impl Ord for RankedNeighbor {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_neighbors(&self.0, &other.0)
    }
}

impl PartialOrd for RankedNeighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Aggregated relevance of an item column, used to find the top-n items for a user.
#[derive(PartialEq, Debug)]
pub struct ScoredItem {
    pub item: Position,
    pub score: f64,
}

/// Ordering for our max-heap: the top of the heap is the *weakest* candidate, i.e. lowest score,
/// and among equal scores the higher position.
fn cmp_reverse(a: &ScoredItem, b: &ScoredItem) -> Ordering {
    b.score.partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.item.cmp(&b.item))
}

impl Eq for ScoredItem {}

impl Ord for ScoredItem {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_reverse(self, other)
    }
}

impl PartialOrd for ScoredItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(cmp_reverse(self, other))
    }
}


#[cfg(test)]
mod tests {

    use std::collections::BinaryHeap;
    use super::*;

    #[test]
    fn sparse_vector_from_pairs_sorts_and_merges() {
        let vector = SparseVector::from_pairs(vec![(4, 1.0), (1, 2.0), (4, 0.5), (2, 0.0)]);

        assert_eq!(vector.indices, vec![1, 4]);
        assert_eq!(vector.values, vec![2.0, 1.5]);
        assert!(vector.contains(4));
        assert!(!vector.contains(2));
    }

    #[test]
    fn dot_and_norm() {
        let a = SparseVector::from_pairs(vec![(0, 1.0), (2, 2.0), (5, 3.0)]);
        let b = SparseVector::from_pairs(vec![(2, 4.0), (3, 1.0), (5, 1.0)]);

        assert_eq!(a.dot(&b), 11.0);
        assert_eq!(b.dot(&a), 11.0);
        assert!((a.norm() - 14.0_f64.sqrt()).abs() < 1e-12);
        assert_eq!(SparseVector::default().norm(), 0.0);
    }

    #[test]
    fn norm_of_huge_values_stays_finite() {
        let vector = SparseVector::from_pairs(vec![(0, 3e200), (1, 4e200)]);

        assert!((vector.norm() / 5e200 - 1.0).abs() < 1e-12);
        assert_eq!(vector.max_abs(), 4e200);
        assert!((vector.scaled_norm(4e200) - 1.25).abs() < 1e-12);
        assert!((vector.scaled_dot(4e200, &vector, 4e200) - 1.5625).abs() < 1e-12);
        assert_eq!(SparseVector::default().norm(), 0.0);
    }

    #[test]
    fn scored_item_heap_keeps_top_k_with_low_position_on_ties() {
        const K: usize = 3;

        let items = vec![
            ScoredItem { item: 7, score: 1.0 },
            ScoredItem { item: 2, score: 3.0 },
            ScoredItem { item: 5, score: 1.0 },
            ScoredItem { item: 1, score: 0.5 },
            ScoredItem { item: 3, score: 1.0 },
        ];

        let mut heap = BinaryHeap::with_capacity(K);
        for scored_item in items {
            if heap.len() < K {
                heap.push(scored_item);
            } else if let Some(mut top) = heap.peek_mut() {
                if scored_item < *top {
                    *top = scored_item;
                }
            }
        }

        let top_k: Vec<Position> = heap.into_sorted_vec().into_iter().map(|s| s.item).collect();
        assert_eq!(top_k, vec![2, 3, 5]);
    }

    #[test]
    fn neighbors_order_by_distance_then_row() {
        let mut neighbors = vec![
            Neighbor { distance: 0.5, row: 3 },
            Neighbor { distance: 0.0, row: 2 },
            Neighbor { distance: 0.5, row: 1 },
        ];
        neighbors.sort_by(cmp_neighbors);

        let rows: Vec<Position> = neighbors.iter().map(|n| n.row).collect();
        assert_eq!(rows, vec![2, 1, 3]);
    }
}
