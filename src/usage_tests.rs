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

#[cfg(test)]
mod tests {

    use std::collections::BTreeSet;

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use crate::context::RecommenderContext;
    use crate::matrix::DuplicatePolicy;
    use crate::recommend;
    use crate::types::{Interaction, ItemId, UserId};

    #[test]
    fn programmatic_usage() {

        /* Our input data comprises of observed interactions between users and items, each with a
           rating. The identifiers are arbitrary, non-contiguous integers. */
        let interactions = vec![
            Interaction::new(1, 10, 1.0),
            Interaction::new(2, 10, 1.0),
            Interaction::new(2, 20, 1.0),
            Interaction::new(3, 20, 1.0),
        ];

        /* Internally, we map the identifiers to consecutive positions, build a sparse user x item
           matrix and fit one nearest-neighbour index over its users and one over its items. The
           context bundles all of this, and is never modified afterwards. */
        let context = RecommenderContext::build(&interactions, DuplicatePolicy::Sum).unwrap();

        println!(
            "Found {} interactions between {} users and {} items.",
            context.dictionary().num_interactions(),
            context.dictionary().num_users(),
            context.dictionary().num_items(),
        );

        /* User 1 only saw item 10, their nearest neighbour user 2 also saw item 20. */
        assert_eq!(recommend::recommend_for_user(&context, 1, 1), vec![20]);

        /* Items are similar if the same users interacted with them. */
        assert_eq!(recommend::recommend_similar_items(&context, 10, 5), vec![20]);

        /* Unknown identifiers simply produce no recommendations. */
        assert!(recommend::recommend_for_user(&context, 42, 5).is_empty());
    }

    #[test]
    fn recommendations_survive_a_reload_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("interactions.csv");
        let models = dir.path().join("models");

        let mut rng = StdRng::seed_from_u64(7);
        let interactions = random_interactions(&mut rng, 40, 25, 300);

        let mut csv = String::from("visitorid,itemid,rating\n");
        for interaction in &interactions {
            csv.push_str(&format!("{},{},{}\n", interaction.user, interaction.item, interaction.rating));
        }
        std::fs::write(&data, csv).unwrap();

        let built = RecommenderContext::build(&interactions, DuplicatePolicy::Sum).unwrap();
        built.save(&models).unwrap();
        let loaded = RecommenderContext::load(&data, &models, b',', DuplicatePolicy::Sum).unwrap();

        for user in built.dictionary().users().ids() {
            assert_eq!(
                recommend::recommend_for_user(&loaded, *user, 5),
                recommend::recommend_for_user(&built, *user, 5),
            );
        }
        for item in built.dictionary().items().ids() {
            assert_eq!(
                recommend::recommend_similar_items(&loaded, *item, 5),
                recommend::recommend_similar_items(&built, *item, 5),
            );
        }
    }

    #[test]
    fn properties_hold_on_random_data() {
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..10 {
            let interactions = random_interactions(&mut rng, 30, 20, 150);
            let context = RecommenderContext::build(&interactions, DuplicatePolicy::Sum).unwrap();
            let num_items = context.dictionary().num_items();

            for item in context.dictionary().items().ids() {
                for n in &[1, 3, 50] {
                    let similar = recommend::recommend_similar_items(&context, *item, *n);

                    assert!(!similar.contains(item));
                    assert_eq!(similar.len(), (*n).min(num_items - 1));
                    assert!(no_duplicates(&similar));
                    assert_eq!(similar, recommend::recommend_similar_items(&context, *item, *n));
                }
            }

            for user in context.dictionary().users().ids() {
                let position = context.dictionary().user_index(*user).unwrap();
                let history = context.matrix().row(position).unwrap();

                for n in &[1, 5, 50] {
                    let recommended = recommend::recommend_for_user(&context, *user, *n);

                    // ratings are positive, so every item one of the n nearest other users
                    // interacted with, and this user did not, is a candidate
                    let neighbors = context.user_index().unwrap()
                        .kneighbors(&history, *n + 1).unwrap();
                    let candidates: BTreeSet<_> = neighbors.iter()
                        .filter(|neighbor| neighbor.row != position)
                        .take(*n)
                        .flat_map(|neighbor| context.matrix().row(neighbor.row).unwrap().indices)
                        .filter(|item_position| !history.contains(*item_position))
                        .collect();

                    assert_eq!(recommended.len(), (*n).min(candidates.len()));
                    assert!(no_duplicates(&recommended));
                    for item in &recommended {
                        let item_position = context.dictionary().item_index(*item).unwrap();
                        assert!(!history.contains(item_position));
                    }
                    assert_eq!(recommended, recommend::recommend_for_user(&context, *user, *n));
                }
            }

            assert!(recommend::recommend_for_user(&context, 1_000_000, 5).is_empty());
            assert!(recommend::recommend_similar_items(&context, 1_000_000, 5).is_empty());
        }
    }

    fn random_interactions(
        rng: &mut StdRng,
        num_users: u64,
        num_items: u64,
        num_interactions: usize,
    ) -> Vec<Interaction> {
        (0..num_interactions)
            .map(|_| {
                // Sparse, non-contiguous identifiers
                let user: UserId = rng.gen_range(0..num_users) * 7 + 3;
                let item: ItemId = rng.gen_range(0..num_items) * 1000 + 11;
                let rating = rng.gen_range(1..4) as f64;
                Interaction::new(user, item, rating)
            })
            .collect()
    }

    fn no_duplicates(items: &[ItemId]) -> bool {
        let mut sorted = items.to_vec();
        sorted.sort();
        sorted.dedup();
        sorted.len() == items.len()
    }
}
