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

use log::debug;
use scoped_pool::Pool;

use crate::context::RecommenderContext;
use crate::error::QueryError;
use crate::types::{ItemId, Neighbor, Position, ScoredItem, SparseVector, UserId};

pub const DEFAULT_NUM_RECOMMENDATIONS: usize = 5;
pub const MAX_RECOMMENDATIONS: usize = 1000;

pub type QueryResult = Result<Vec<ItemId>, QueryError>;

/// Up to `n` other items whose interaction vectors are closest to the one of `item`, most similar
/// first. Unknown items and invalid counts yield an empty list.
pub fn recommend_similar_items(context: &RecommenderContext, item: ItemId, n: usize) -> Vec<ItemId> {
    try_recommend_similar_items(context, item, n).unwrap_or_else(|cause| {
        debug!("No similar items for item {}: {}", item, cause);
        Vec::new()
    })
}

/// Up to `n` items the user has not interacted with yet, ranked by how much their nearest
/// neighbours interacted with them. Unknown users and invalid counts yield an empty list.
pub fn recommend_for_user(context: &RecommenderContext, user: UserId, n: usize) -> Vec<ItemId> {
    try_recommend_for_user(context, user, n).unwrap_or_else(|cause| {
        debug!("No recommendations for user {}: {}", user, cause);
        Vec::new()
    })
}

/// Same as [`recommend_similar_items`], but tells why there is no answer. An `Ok` with an empty
/// list means the item is known, there is just nothing similar to it.
pub fn try_recommend_similar_items(
    context: &RecommenderContext,
    item: ItemId,
    n: usize,
) -> QueryResult {
    validate_count(n)?;

    let item_index = context.dictionary().item_index(item)
        .ok_or(QueryError::UnknownItem(item))?;

    let similar = similar_items_at(context, item_index, n)?;
    Ok(to_item_ids(context, &similar))
}

/// Same as [`recommend_for_user`], but tells why there is no answer.
pub fn try_recommend_for_user(
    context: &RecommenderContext,
    user: UserId,
    n: usize,
) -> QueryResult {
    validate_count(n)?;

    let user_index = context.dictionary().user_index(user)
        .ok_or(QueryError::UnknownUser(user))?;

    let recommended = recommended_items_at(context, user_index, n)?;
    Ok(to_item_ids(context, &recommended))
}

pub fn validate_count(n: usize) -> Result<(), QueryError> {
    if n == 0 || n > MAX_RECOMMENDATIONS {
        return Err(QueryError::InvalidCount { requested: n, max: MAX_RECOMMENDATIONS });
    }
    Ok(())
}

fn similar_items_at(
    context: &RecommenderContext,
    item_index: Position,
    n: usize,
) -> Result<Vec<Position>, QueryError> {

    let index = context.item_index()?;

    // The column of the item across all users is a row of the item index
    let item_vector = context.matrix().column(item_index).unwrap_or_default();
    let neighbors = index.kneighbors(&item_vector, n + 1)?;

    Ok(without_self(&neighbors, item_index, n))
}

fn recommended_items_at(
    context: &RecommenderContext,
    user_index: Position,
    n: usize,
) -> Result<Vec<Position>, QueryError> {

    let index = context.user_index()?;

    let user_vector = context.matrix().row(user_index).unwrap_or_default();
    let neighbors = index.kneighbors(&user_vector, n + 1)?;
    let similar_users = without_self(&neighbors, user_index, n);

    let scores = context.matrix().sum_rows(&similar_users);

    Ok(top_unseen_items(&scores, &user_vector, n))
}

/// The queried row usually comes back first, but an exact duplicate with a lower row can tie
/// with it at distance zero, so we look for it instead of blindly dropping the head.
fn without_self(neighbors: &[Neighbor], own_row: Position, n: usize) -> Vec<Position> {
    neighbors.iter()
        .map(|neighbor| neighbor.row)
        .filter(|row| *row != own_row)
        .take(n)
        .collect()
}

/// The `n` highest scoring items with a positive score that are not part of `history`, best
/// first, lower positions first among equal scores.
fn top_unseen_items(scores: &[f64], history: &SparseVector, n: usize) -> Vec<Position> {
    let mut heap = BinaryHeap::with_capacity(n);

    for (item, score) in scores.iter().enumerate() {
        let item = item as Position;

        if score.is_nan() || *score <= 0.0 || history.contains(item) {
            continue;
        }

        let scored_item = ScoredItem { item, score: *score };

        if heap.len() < n {
            heap.push(scored_item);
        } else if let Some(mut top) = heap.peek_mut() {
            if scored_item < *top {
                *top = scored_item;
            }
        }
    }

    heap.into_sorted_vec().into_iter().map(|scored_item| scored_item.item).collect()
}

fn to_item_ids(context: &RecommenderContext, positions: &[Position]) -> Vec<ItemId> {
    positions.iter()
        .filter_map(|position| context.dictionary().item_id(*position))
        .collect()
}

/// Similar items for every item of the context, in position order. The work is spread over a
/// thread pool with `pool_size` threads; the context is only read.
pub fn similar_items_for_all_items(
    context: &RecommenderContext,
    n: usize,
    pool_size: usize,
) -> Result<Vec<(ItemId, Vec<ItemId>)>, QueryError> {

    validate_count(n)?;
    context.item_index()?;

    let items = context.dictionary().items().ids();
    let similar = in_parallel(items.len(), pool_size, |item_index| {
        similar_items_at(context, item_index, n)
            .map(|positions| to_item_ids(context, &positions))
            .unwrap_or_default()
    });

    Ok(items.iter().cloned().zip(similar).collect())
}

/// Recommendations for every user of the context, in position order.
pub fn recommend_for_all_users(
    context: &RecommenderContext,
    n: usize,
    pool_size: usize,
) -> Result<Vec<(UserId, Vec<ItemId>)>, QueryError> {

    validate_count(n)?;
    context.user_index()?;

    let users = context.dictionary().users().ids();
    let recommended = in_parallel(users.len(), pool_size, |user_index| {
        recommended_items_at(context, user_index, n)
            .map(|positions| to_item_ids(context, &positions))
            .unwrap_or_default()
    });

    Ok(users.iter().cloned().zip(recommended).collect())
}

/// Runs `query` for every position in `0..count`, each pool job handling one contiguous chunk of
/// the output.
fn in_parallel<F>(count: usize, pool_size: usize, query: F) -> Vec<Vec<ItemId>>
    where F: Fn(Position) -> Vec<ItemId> + Sync {

    let mut results: Vec<Vec<ItemId>> = vec![Vec::new(); count];
    if count == 0 {
        return results;
    }

    let pool_size = pool_size.max(1);
    let chunk_size = (count + pool_size - 1) / pool_size;
    let pool = Pool::new(pool_size);

    pool.scoped(|scope| {
        for (chunk_index, chunk) in results.chunks_mut(chunk_size).enumerate() {
            let query = &query;
            scope.execute(move || {
                let offset = chunk_index * chunk_size;
                for (position, result) in chunk.iter_mut().enumerate() {
                    *result = query((offset + position) as Position);
                }
            });
        }
    });

    pool.shutdown();

    results
}
