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

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use log::info;
use serde_derive::{Deserialize, Serialize};

use crate::dictionary::DataDictionary;
use crate::error::Result;
use crate::index::{Orientation, SimilarityIndex};
use crate::matrix::DuplicatePolicy;

pub const ITEM_INDEX_FILE: &str = "item_similarity.json";
pub const USER_INDEX_FILE: &str = "user_similarity.json";
pub const REGISTRY_FILE: &str = "registry.json";

/// Contents of `registry.json`: the identifier positions, and how duplicate ratings were combined
/// for the matrix the indices were fitted to. Loading the same CSV under another policy yields
/// another matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registry {
    pub duplicate_policy: DuplicatePolicy,
    pub dictionary: DataDictionary,
}

/// Everything the offline training step writes to a model directory.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub registry: Registry,
    pub item_index: SimilarityIndex,
    pub user_index: SimilarityIndex,
}

fn write_json<T: serde::Serialize>(value: &T, path: &Path) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut out, value)?;
    out.flush()?;
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

pub fn save_index<P: AsRef<Path>>(index: &SimilarityIndex, path: P) -> Result<()> {
    write_json(index, path.as_ref())
}

/// Loads an index and makes sure it indexes what the caller expects.
pub fn load_index<P: AsRef<Path>>(path: P, orientation: Orientation) -> Result<SimilarityIndex> {
    let index: SimilarityIndex = read_json(path.as_ref())?;
    index.check_orientation(orientation)?;
    Ok(index)
}

pub fn save_registry<P: AsRef<Path>>(registry: &Registry, path: P) -> Result<()> {
    write_json(registry, path.as_ref())
}

pub fn load_registry<P: AsRef<Path>>(path: P) -> Result<Registry> {
    read_json(path.as_ref())
}

/// Writes registry and both indices into `dir`, creating it if necessary.
pub fn save_model<P: AsRef<Path>>(model: &Model, dir: P) -> Result<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    save_registry(&model.registry, dir.join(REGISTRY_FILE))?;
    save_index(&model.item_index, dir.join(ITEM_INDEX_FILE))?;
    save_index(&model.user_index, dir.join(USER_INDEX_FILE))?;

    info!("Model saved to {}", dir.display());

    Ok(())
}

pub fn load_model<P: AsRef<Path>>(dir: P) -> Result<Model> {
    let dir = dir.as_ref();

    let registry = load_registry(dir.join(REGISTRY_FILE))?;
    let item_index = load_index(dir.join(ITEM_INDEX_FILE), Orientation::Items)?;
    let user_index = load_index(dir.join(USER_INDEX_FILE), Orientation::Users)?;

    info!(
        "Loaded model from {} with {} users and {} items, duplicates combined via {}",
        dir.display(),
        registry.dictionary.num_users(),
        registry.dictionary.num_items(),
        registry.duplicate_policy,
    );

    Ok(Model { registry, item_index, user_index })
}
