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

use std::path::Path;
use std::sync::{Arc, RwLock};

use log::info;

use crate::dictionary::DataDictionary;
use crate::error::{Error, Result};
use crate::index::{Orientation, SimilarityIndex};
use crate::io;
use crate::matrix::{DuplicatePolicy, InteractionMatrix};
use crate::persist::{self, Model, Registry};
use crate::types::Interaction;

/// Everything a recommendation query needs: identifier mappings, the user x item matrix and both
/// similarity indices, guaranteed to belong to the same matrix generation. Never mutated after
/// construction; a reload builds a new context and swaps it in via [`ContextHandle`].
#[derive(Debug)]
pub struct RecommenderContext {
    dictionary: DataDictionary,
    matrix: InteractionMatrix,
    duplicate_policy: DuplicatePolicy,
    generation: u64,
    item_index: SimilarityIndex,
    user_index: SimilarityIndex,
}

impl RecommenderContext {

    /// Derives fresh identifier mappings from `interactions` and fits both indices.
    pub fn build(interactions: &[Interaction], policy: DuplicatePolicy) -> Result<Self> {
        let dictionary = DataDictionary::from_interactions(interactions)?;
        RecommenderContext::fit(dictionary, interactions, policy)
    }

    /// Like [`RecommenderContext::build`], but keeps every position assigned by `registry` so
    /// that positions handed out earlier stay valid.
    pub fn rebuild(
        registry: DataDictionary,
        interactions: &[Interaction],
        policy: DuplicatePolicy,
    ) -> Result<Self> {
        let dictionary = registry.extended_with(interactions)?;
        RecommenderContext::fit(dictionary, interactions, policy)
    }

    fn fit(
        dictionary: DataDictionary,
        interactions: &[Interaction],
        policy: DuplicatePolicy,
    ) -> Result<Self> {
        let matrix = build_matrix(&dictionary, interactions, policy)?;

        info!("Fitting similarity indices for {} users and {} items", matrix.num_rows(),
            matrix.num_cols());

        let item_index = SimilarityIndex::fit_items(&matrix);
        let user_index = SimilarityIndex::fit_users(&matrix);

        RecommenderContext::from_parts(dictionary, matrix, policy, item_index, user_index)
    }

    /// Assembles a context from separately built or loaded parts, failing if the indices were not
    /// fitted to this exact matrix. `duplicate_policy` is the one `matrix` was built with.
    pub fn from_parts(
        dictionary: DataDictionary,
        matrix: InteractionMatrix,
        duplicate_policy: DuplicatePolicy,
        item_index: SimilarityIndex,
        user_index: SimilarityIndex,
    ) -> Result<Self> {

        if matrix.num_rows() != dictionary.num_users() {
            return Err(Error::DimensionMismatch {
                expected: dictionary.num_users(),
                actual: matrix.num_rows(),
            });
        }
        if matrix.num_cols() != dictionary.num_items() {
            return Err(Error::DimensionMismatch {
                expected: dictionary.num_items(),
                actual: matrix.num_cols(),
            });
        }

        item_index.check_orientation(Orientation::Items)?;
        user_index.check_orientation(Orientation::Users)?;
        item_index.check_generation(&matrix)?;
        user_index.check_generation(&matrix)?;

        let generation = matrix.generation();

        Ok(RecommenderContext {
            dictionary,
            matrix,
            duplicate_policy,
            generation,
            item_index,
            user_index,
        })
    }

    /// Startup path: reads the interactions, rebuilds the matrix with the persisted registry and
    /// attaches the persisted indices. Fails if the data changed since the model was trained, or
    /// if `policy` differs from the duplicate policy the model was trained with.
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(
        interactions_path: P,
        model_dir: Q,
        delimiter: u8,
        policy: DuplicatePolicy,
    ) -> Result<Self> {
        let interactions = io::read_interactions(interactions_path, delimiter)?;
        let Model { registry, item_index, user_index } = persist::load_model(model_dir)?;

        if registry.duplicate_policy != policy {
            return Err(Error::InvalidConfig(format!(
                "the model was trained with duplicate policy '{}', but '{}' was requested",
                registry.duplicate_policy, policy)));
        }

        let dictionary = registry.dictionary.extended_with(&interactions)?;
        let matrix = build_matrix(&dictionary, &interactions, policy)?;

        RecommenderContext::from_parts(dictionary, matrix, policy, item_index, user_index)
    }

    /// Persists registry and indices, the matrix is rebuilt from the interactions on load.
    pub fn save<P: AsRef<Path>>(&self, model_dir: P) -> Result<()> {
        let model = Model {
            registry: Registry {
                duplicate_policy: self.duplicate_policy,
                dictionary: self.dictionary.clone(),
            },
            item_index: self.item_index.clone(),
            user_index: self.user_index.clone(),
        };
        persist::save_model(&model, model_dir)
    }

    pub fn dictionary(&self) -> &DataDictionary {
        &self.dictionary
    }

    pub fn matrix(&self) -> &InteractionMatrix {
        &self.matrix
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        self.duplicate_policy
    }

    /// The item index, provided it still matches the matrix of this context.
    pub fn item_index(&self) -> Result<&SimilarityIndex> {
        self.checked(&self.item_index)
    }

    /// The user index, provided it still matches the matrix of this context.
    pub fn user_index(&self) -> Result<&SimilarityIndex> {
        self.checked(&self.user_index)
    }

    fn checked<'a>(&self, index: &'a SimilarityIndex) -> Result<&'a SimilarityIndex> {
        if index.generation() != self.generation {
            return Err(Error::GenerationMismatch {
                orientation: index.orientation(),
                index: index.generation(),
                matrix: self.generation,
            });
        }
        Ok(index)
    }
}

/// Maps the interactions to matrix positions and builds the `#users x #items` matrix.
pub fn build_matrix(
    dictionary: &DataDictionary,
    interactions: &[Interaction],
    policy: DuplicatePolicy,
) -> Result<InteractionMatrix> {

    let mut triplets = Vec::with_capacity(interactions.len());
    for interaction in interactions {
        let user = dictionary.user_index(interaction.user)
            .ok_or_else(|| Error::data_format(None, format!("unregistered user {}", interaction.user)))?;
        let item = dictionary.item_index(interaction.item)
            .ok_or_else(|| Error::data_format(None, format!("unregistered item {}", interaction.item)))?;
        triplets.push((user, item, interaction.rating));
    }

    let matrix = InteractionMatrix::from_triplets(
        dictionary.num_users(),
        dictionary.num_items(),
        triplets,
        policy,
    )?;

    info!("Built a {}x{} interaction matrix with {} non-zero entries", matrix.num_rows(),
        matrix.num_cols(), matrix.nnz());

    Ok(matrix)
}

/// Shared entry point for concurrent readers. Queries grab the current context once and keep
/// using it; `reload` replaces the whole context at once, so a reader never sees the matrix of
/// one generation next to the index of another.
#[derive(Debug)]
pub struct ContextHandle {
    current: RwLock<Arc<RecommenderContext>>,
}

impl ContextHandle {

    pub fn new(context: RecommenderContext) -> Self {
        ContextHandle { current: RwLock::new(Arc::new(context)) }
    }

    pub fn current(&self) -> Arc<RecommenderContext> {
        // The lock only ever guards a pointer swap, a poisoned lock still holds a valid context
        let guard = self.current.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    /// Installs `context` and returns the one it replaced.
    pub fn reload(&self, context: RecommenderContext) -> Arc<RecommenderContext> {
        let replacement = Arc::new(context);
        let mut guard = self.current.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *guard, replacement)
    }
}


#[cfg(test)]
mod tests {

    use std::thread;

    use super::*;

    fn interactions() -> Vec<Interaction> {
        vec![
            Interaction::new(1, 10, 1.0),
            Interaction::new(2, 10, 1.0),
            Interaction::new(2, 20, 1.0),
            Interaction::new(3, 20, 1.0),
        ]
    }

    #[test]
    fn build_wires_everything_together() {
        let context = RecommenderContext::build(&interactions(), DuplicatePolicy::Sum).unwrap();

        assert_eq!(context.matrix().num_rows(), 3);
        assert_eq!(context.matrix().num_cols(), 2);
        assert_eq!(context.generation(), context.matrix().generation());
        assert_eq!(context.item_index().unwrap().len(), 2);
        assert_eq!(context.user_index().unwrap().len(), 3);
    }

    #[test]
    fn indices_of_another_generation_are_refused() {
        let context = RecommenderContext::build(&interactions(), DuplicatePolicy::Sum).unwrap();

        let mut changed = interactions();
        changed.push(Interaction::new(3, 10, 5.0));
        let other = RecommenderContext::build(&changed, DuplicatePolicy::Sum).unwrap();

        let result = RecommenderContext::from_parts(
            context.dictionary().clone(),
            context.matrix().clone(),
            context.duplicate_policy(),
            other.item_index().unwrap().clone(),
            context.user_index().unwrap().clone(),
        );

        match result {
            Err(Error::GenerationMismatch { orientation: Orientation::Items, .. }) => {},
            other => panic!("expected a generation mismatch, got {:?}", other),
        }
    }

    #[test]
    fn save_and_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("interactions.csv");
        std::fs::write(&data, "visitorid,itemid,rating\n1,10,1\n2,10,1\n2,20,1\n3,20,1\n").unwrap();

        let built = RecommenderContext::build(
            &io::read_interactions(&data, b',').unwrap(), DuplicatePolicy::Sum).unwrap();
        built.save(dir.path().join("models")).unwrap();

        let loaded = RecommenderContext::load(
            &data, dir.path().join("models"), b',', DuplicatePolicy::Sum).unwrap();

        assert_eq!(loaded.generation(), built.generation());
        assert_eq!(loaded.dictionary(), built.dictionary());
    }

    #[test]
    fn stale_model_prevents_startup() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("interactions.csv");
        std::fs::write(&data, "visitorid,itemid,rating\n1,10,1\n2,20,1\n").unwrap();

        let built = RecommenderContext::build(
            &io::read_interactions(&data, b',').unwrap(), DuplicatePolicy::Sum).unwrap();
        built.save(dir.path().join("models")).unwrap();

        std::fs::write(&data, "visitorid,itemid,rating\n1,10,1\n2,20,1\n4,20,1\n").unwrap();

        match RecommenderContext::load(&data, dir.path().join("models"), b',', DuplicatePolicy::Sum) {
            Err(Error::GenerationMismatch { .. }) => {},
            other => panic!("expected a generation mismatch, got {:?}", other),
        }
    }

    #[test]
    fn model_trained_with_another_duplicate_policy_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("interactions.csv");
        std::fs::write(&data, "visitorid,itemid,rating\n1,10,1\n1,10,1\n2,10,3\n2,20,1\n").unwrap();

        let built = RecommenderContext::build(
            &io::read_interactions(&data, b',').unwrap(), DuplicatePolicy::Sum).unwrap();
        built.save(dir.path().join("models")).unwrap();

        match RecommenderContext::load(
                &data, dir.path().join("models"), b',', DuplicatePolicy::Overwrite) {
            Err(Error::InvalidConfig(message)) => {
                assert!(message.contains("'sum'"));
                assert!(message.contains("'overwrite'"));
            },
            other => panic!("expected a configuration error, got {:?}", other),
        }

        let loaded = RecommenderContext::load(
            &data, dir.path().join("models"), b',', DuplicatePolicy::Sum).unwrap();
        assert_eq!(loaded.duplicate_policy(), DuplicatePolicy::Sum);
        assert_eq!(loaded.generation(), built.generation());
    }

    #[test]
    fn rebuild_keeps_positions_of_known_identifiers() {
        let context = RecommenderContext::build(&interactions(), DuplicatePolicy::Sum).unwrap();

        let updated = vec![
            Interaction::new(3, 20, 1.0),
            Interaction::new(4, 30, 1.0),
        ];
        let rebuilt = RecommenderContext::rebuild(
            context.dictionary().clone(), &updated, DuplicatePolicy::Sum).unwrap();

        assert_eq!(rebuilt.dictionary().user_index(3), context.dictionary().user_index(3));
        assert_eq!(rebuilt.dictionary().item_index(20), context.dictionary().item_index(20));
        assert_eq!(rebuilt.dictionary().user_index(4), Some(3));
        assert_eq!(rebuilt.matrix().num_rows(), 4);
        // user 1 no longer has interactions, but keeps its (now empty) row
        assert!(rebuilt.matrix().row(0).unwrap().is_empty());
    }

    #[test]
    fn reload_swaps_the_whole_context() {
        let handle = Arc::new(ContextHandle::new(
            RecommenderContext::build(&interactions(), DuplicatePolicy::Sum).unwrap()));

        let before = handle.current();

        let mut more = interactions();
        more.push(Interaction::new(4, 30, 1.0));
        let replaced = handle.reload(RecommenderContext::build(&more, DuplicatePolicy::Sum).unwrap());

        assert_eq!(replaced.generation(), before.generation());

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let handle = Arc::clone(&handle);
                thread::spawn(move || {
                    let context = handle.current();
                    assert_eq!(context.user_index().unwrap().generation(), context.generation());
                    context.dictionary().num_users()
                })
            })
            .collect();

        for reader in readers {
            assert_eq!(reader.join().unwrap(), 4);
        }
    }
}
