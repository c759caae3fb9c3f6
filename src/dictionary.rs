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

use std::convert::TryFrom;

use fnv::FnvHashMap;
use serde_derive::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Interaction, ItemId, Position, UserId};

/// Bijection between externally assigned identifiers and the dense positions `0..len()`.
/// Positions are handed out in first-seen order and never change once assigned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u64>", into = "Vec<u64>")]
pub struct IdMapping {
    positions: FnvHashMap<u64, Position>,
    ids: Vec<u64>,
}

impl IdMapping {

    pub fn with_capacity(capacity: usize) -> Self {
        IdMapping {
            positions: FnvHashMap::with_capacity_and_hasher(capacity, Default::default()),
            ids: Vec::with_capacity(capacity),
        }
    }

    /// Returns the position of `id`, registering it first if we have not seen it before. Fails
    /// once every `Position` is taken.
    pub fn register(&mut self, id: u64) -> Result<Position> {
        if let Some(position) = self.positions.get(&id) {
            return Ok(*position);
        }

        let position = next_position(self.ids.len())?;
        self.positions.insert(id, position);
        self.ids.push(id);
        Ok(position)
    }

    pub fn position(&self, id: u64) -> Option<Position> {
        self.positions.get(&id).cloned()
    }

    pub fn id(&self, position: Position) -> Option<u64> {
        self.ids.get(position as usize).cloned()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.positions.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Identifiers in position order.
    pub fn ids(&self) -> &[u64] {
        &self.ids
    }
}

impl TryFrom<Vec<u64>> for IdMapping {
    type Error = String;

    fn try_from(ids: Vec<u64>) -> std::result::Result<Self, Self::Error> {
        let mut mapping = IdMapping::with_capacity(ids.len());
        for id in ids {
            if mapping.contains(id) {
                return Err(format!("identifier {} is registered twice", id));
            }
            mapping.register(id).map_err(|failure| failure.to_string())?;
        }
        Ok(mapping)
    }
}

/// The position handed to the identifier registered after `len` others.
fn next_position(len: usize) -> Result<Position> {
    Position::try_from(len).map_err(|_| Error::data_format(None, format!(
        "more than {} distinct identifiers, positions are exhausted", Position::MAX as u64 + 1)))
}

impl From<IdMapping> for Vec<u64> {
    fn from(mapping: IdMapping) -> Self {
        mapping.ids
    }
}

/// Maps user and item identifiers to consecutive matrix positions and keeps some basic
/// statistics of the data they were derived from. Persisted next to the similarity indices, so
/// that a rebuild from updated data can keep every previously assigned position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataDictionary {
    users: IdMapping,
    items: IdMapping,
    num_interactions: u64,
}

impl DataDictionary {

    /// Derives fresh mappings from the interactions. Fails if there are none.
    pub fn from_interactions<'a, I>(interactions: I) -> Result<Self>
        where I: IntoIterator<Item=&'a Interaction> {

        DataDictionary::default().extended_with(interactions)
    }

    /// Keeps all positions of `self` and appends identifiers that were not registered yet.
    /// Identifiers that no longer show up in the data keep their (now empty) positions.
    pub fn extended_with<'a, I>(mut self, interactions: I) -> Result<Self>
        where I: IntoIterator<Item=&'a Interaction> {

        self.num_interactions = 0;

        for interaction in interactions {
            self.users.register(interaction.user)?;
            self.items.register(interaction.item)?;
            self.num_interactions += 1;
        }

        if self.num_interactions == 0 {
            return Err(Error::data_format(None, "no interactions found"));
        }

        Ok(self)
    }

    pub fn num_users(&self) -> usize {
        self.users.len()
    }

    pub fn num_items(&self) -> usize {
        self.items.len()
    }

    pub fn num_interactions(&self) -> u64 {
        self.num_interactions
    }

    pub fn user_index(&self, user: UserId) -> Option<Position> {
        self.users.position(user)
    }

    pub fn item_index(&self, item: ItemId) -> Option<Position> {
        self.items.position(item)
    }

    pub fn user_id(&self, user_index: Position) -> Option<UserId> {
        self.users.id(user_index)
    }

    pub fn item_id(&self, item_index: Position) -> Option<ItemId> {
        self.items.id(item_index)
    }

    pub fn users(&self) -> &IdMapping {
        &self.users
    }

    pub fn items(&self) -> &IdMapping {
        &self.items
    }
}
