/*
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

//! Collaborative filtering via exact nearest-neighbour search over a sparse user x item matrix.
//!
//! Interactions are mapped to dense positions by a [`dictionary::DataDictionary`], collected in
//! an [`matrix::InteractionMatrix`] and indexed twice: once with users as rows, once with items
//! as rows. A [`context::RecommenderContext`] bundles all of these and answers the two queries in
//! [`recommend`].

pub mod config;
pub mod context;
pub mod dictionary;
pub mod error;
pub mod index;
pub mod io;
pub mod matrix;
pub mod persist;
pub mod recommend;
pub mod types;

mod usage_tests;

pub use crate::context::{ContextHandle, RecommenderContext};
pub use crate::error::{Error, QueryError, Result};
pub use crate::recommend::{recommend_for_user, recommend_similar_items};
pub use crate::types::{Interaction, ItemId, UserId};
