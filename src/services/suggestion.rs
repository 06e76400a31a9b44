// src/services/suggestion.rs
use crate::models::{Category, Outfit, OutfitSuggestion, WardrobeItem};
use chrono::Utc;
use log::debug;
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::{BTreeSet, HashSet};
use uuid::Uuid;

/// Outfits rated at or above this feed the suggestion pool (1-5 scale).
pub const MIN_RATING: u8 = 4;

/// Outcome of one generation pass. InsufficientData and Exhausted are
/// ordinary results the caller branches on, not errors.
#[derive(Debug)]
pub enum SuggestionOutcome {
    Suggested {
        suggestion: OutfitSuggestion,
        items: Vec<WardrobeItem>,
    },
    InsufficientData {
        message: String,
    },
    Exhausted,
}

/// The identity of a combination: its item ids as an ordered set, so display
/// order never affects uniqueness checks.
pub fn combination_key(item_ids: &[Uuid]) -> BTreeSet<Uuid> {
    item_ids.iter().copied().collect()
}

/// Propose a shirt/pants/shoes combination the user has not worn or seen
/// this session, drawn from items appearing in highly-rated outfits.
///
/// Pure aside from the rng draw. The session exclusion set is caller-owned:
/// it is read here and the caller records the returned combination back into
/// it, which also keeps the one-in-flight-per-session constraint on the
/// caller's side.
pub fn generate_suggestion(
    outfits: &[Outfit],
    items: &[WardrobeItem],
    exclude: &HashSet<BTreeSet<Uuid>>,
    rng: &mut impl Rng,
) -> SuggestionOutcome {
    debug!(
        "Generating suggestion from {} outfits and {} items",
        outfits.len(),
        items.len()
    );

    let highly_rated: Vec<&Outfit> = outfits
        .iter()
        .filter(|outfit| outfit.rating.is_some_and(|rating| rating >= MIN_RATING))
        .collect();

    if highly_rated.is_empty() {
        return SuggestionOutcome::InsufficientData {
            message: "You need at least one outfit rated 4 or 5 stars to get suggestions. \
                      Add more outfits to your wardrobe and rate them!"
                .to_string(),
        };
    }

    let rated_item_ids: HashSet<Uuid> = highly_rated
        .iter()
        .flat_map(|outfit| outfit.item_ids.iter().copied())
        .collect();

    let rated_items: Vec<&WardrobeItem> = items
        .iter()
        .filter(|item| rated_item_ids.contains(&item.id))
        .collect();

    let shirts: Vec<&WardrobeItem> = slot(&rated_items, Category::Shirt);
    let pants: Vec<&WardrobeItem> = slot(&rated_items, Category::Pants);
    let shoes: Vec<&WardrobeItem> = slot(&rated_items, Category::Shoes);

    debug!(
        "Slot buckets - shirts: {}, pants: {}, shoes: {}",
        shirts.len(),
        pants.len(),
        shoes.len()
    );

    let mut missing = Vec::new();
    if shirts.is_empty() {
        missing.push("shirts");
    }
    if pants.is_empty() {
        missing.push("pants");
    }
    if shoes.is_empty() {
        missing.push("shoes");
    }
    if !missing.is_empty() {
        return SuggestionOutcome::InsufficientData {
            message: format!(
                "You need at least one {} from highly-rated outfits. \
                 Add more outfits with these items and rate them 4 or 5 stars!",
                missing.join(", ")
            ),
        };
    }

    // Every past outfit's item set, rated or not. A triple wholly contained
    // in any single one of these has already been worn together.
    let existing: Vec<HashSet<Uuid>> = outfits
        .iter()
        .map(|outfit| outfit.item_ids.iter().copied().collect())
        .collect();

    let mut survivors: Vec<(&WardrobeItem, &WardrobeItem, &WardrobeItem)> = Vec::new();
    for &shirt in &shirts {
        for &pant in &pants {
            for &shoe in &shoes {
                let combination = combination_key(&[shirt.id, pant.id, shoe.id]);

                let exists_in_wardrobe = existing
                    .iter()
                    .any(|outfit_ids| combination.iter().all(|id| outfit_ids.contains(id)));
                let already_suggested = exclude.contains(&combination);

                if !exists_in_wardrobe && !already_suggested {
                    survivors.push((shirt, pant, shoe));
                }
            }
        }
    }

    debug!("Found {} possible new combinations", survivors.len());

    let Some((shirt, pant, shoe)) = survivors.choose(rng) else {
        return SuggestionOutcome::Exhausted;
    };

    let suggestion = OutfitSuggestion {
        id: Uuid::new_v4(),
        item_ids: vec![shirt.id, pant.id, shoe.id],
        shirt_id: shirt.id,
        pants_id: pant.id,
        shoes_id: shoe.id,
        created_at: Utc::now(),
    };

    SuggestionOutcome::Suggested {
        suggestion,
        items: vec![(*shirt).clone(), (*pant).clone(), (*shoe).clone()],
    }
}

fn slot<'a>(items: &[&'a WardrobeItem], category: Category) -> Vec<&'a WardrobeItem> {
    items
        .iter()
        .filter(|item| item.category == category)
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn item(category: Category) -> WardrobeItem {
        WardrobeItem {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            category,
            description: String::new(),
            dominant_colors: Vec::new(),
            detected_labels: Vec::new(),
            image: String::new(),
            outfit_references: Vec::new(),
            created_at: Utc::now(),
        }
    }

    fn outfit(item_ids: &[Uuid], rating: Option<u8>) -> Outfit {
        Outfit {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            image: String::new(),
            item_ids: item_ids.to_vec(),
            rating,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn no_highly_rated_outfits_is_insufficient_data() {
        let shirt = item(Category::Shirt);
        let outfits = vec![outfit(&[shirt.id], Some(3)), outfit(&[shirt.id], None)];
        let mut rng = StdRng::seed_from_u64(1);

        let outcome = generate_suggestion(&outfits, &[shirt], &HashSet::new(), &mut rng);
        assert!(matches!(outcome, SuggestionOutcome::InsufficientData { .. }));
    }

    #[test]
    fn missing_slot_is_named_in_the_message() {
        let shirt = item(Category::Shirt);
        let pants = item(Category::Pants);
        let outfits = vec![outfit(&[shirt.id, pants.id], Some(5))];
        let mut rng = StdRng::seed_from_u64(1);

        let outcome =
            generate_suggestion(&outfits, &[shirt, pants], &HashSet::new(), &mut rng);
        match outcome {
            SuggestionOutcome::InsufficientData { message } => {
                assert!(message.contains("shoes"));
                assert!(!message.contains("shirts"));
            }
            other => panic!("expected InsufficientData, got {:?}", other),
        }
    }

    #[test]
    fn never_repeats_an_existing_or_excluded_combination() {
        let shirt_a = item(Category::Shirt);
        let shirt_b = item(Category::Shirt);
        let pants = item(Category::Pants);
        let shoes = item(Category::Shoes);

        // The worn outfit covers (shirt_a, pants, shoes); the session has
        // already seen (shirt_b, pants, shoes). Nothing is left.
        let outfits = vec![outfit(&[shirt_a.id, pants.id, shoes.id], Some(5))];
        let mut exclude = HashSet::new();
        exclude.insert(combination_key(&[shirt_b.id, pants.id, shoes.id]));

        // shirt_b only becomes eligible through a rated outfit of its own.
        let outfits = [
            outfits,
            vec![outfit(&[shirt_b.id, pants.id], Some(4))],
        ]
        .concat();

        let items = vec![shirt_a, shirt_b, pants, shoes];
        let mut rng = StdRng::seed_from_u64(7);

        let outcome = generate_suggestion(&outfits, &items, &exclude, &mut rng);
        assert!(matches!(outcome, SuggestionOutcome::Exhausted));
    }

    #[test]
    fn triple_contained_in_a_larger_past_outfit_is_excluded() {
        let shirt = item(Category::Shirt);
        let pants = item(Category::Pants);
        let shoes = item(Category::Shoes);
        let jacket = item(Category::Jacket);

        let outfits = vec![outfit(
            &[shirt.id, pants.id, shoes.id, jacket.id],
            Some(5),
        )];
        let items = vec![shirt, pants, shoes, jacket];
        let mut rng = StdRng::seed_from_u64(3);

        let outcome = generate_suggestion(&outfits, &items, &HashSet::new(), &mut rng);
        assert!(matches!(outcome, SuggestionOutcome::Exhausted));
    }

    #[test]
    fn feeding_results_back_exhausts_after_exactly_the_uncovered_count() {
        let shirts = [item(Category::Shirt), item(Category::Shirt)];
        let pants = [item(Category::Pants), item(Category::Pants)];
        let shoes = [item(Category::Shoes)];

        let worn = outfit(&[shirts[0].id, pants[0].id, shoes[0].id], Some(5));
        let outfits = vec![worn];
        let items: Vec<WardrobeItem> = shirts
            .iter()
            .chain(pants.iter())
            .chain(shoes.iter())
            .cloned()
            .collect();

        // 2 shirts x 2 pants x 1 shoes = 4 combinations, 1 already worn.
        let mut exclude = HashSet::new();
        let mut generated = 0;
        let mut rng = StdRng::seed_from_u64(42);

        loop {
            match generate_suggestion(&outfits, &items, &exclude, &mut rng) {
                SuggestionOutcome::Suggested { suggestion, .. } => {
                    let key = combination_key(&suggestion.item_ids);
                    assert!(exclude.insert(key), "combination repeated within session");
                    generated += 1;
                    assert!(generated <= 3, "generated more than the uncovered count");
                }
                SuggestionOutcome::Exhausted => break,
                other => panic!("unexpected outcome {:?}", other),
            }
        }

        assert_eq!(generated, 3);
    }

    #[test]
    fn suggested_items_match_the_slot_order() {
        let shirt = item(Category::Shirt);
        let pants = item(Category::Pants);
        let shoes = item(Category::Shoes);
        // Eligibility comes from two rated outfits that never combined all
        // three items at once.
        let outfits = vec![
            outfit(&[shirt.id, pants.id], Some(4)),
            outfit(&[shoes.id], Some(5)),
        ];
        let items = vec![shirt.clone(), pants.clone(), shoes.clone()];
        let mut rng = StdRng::seed_from_u64(11);

        match generate_suggestion(&outfits, &items, &HashSet::new(), &mut rng) {
            SuggestionOutcome::Suggested { suggestion, items } => {
                assert_eq!(suggestion.shirt_id, shirt.id);
                assert_eq!(suggestion.pants_id, pants.id);
                assert_eq!(suggestion.shoes_id, shoes.id);
                assert_eq!(suggestion.item_ids, vec![shirt.id, pants.id, shoes.id]);
                assert_eq!(items[0].id, shirt.id);
            }
            other => panic!("expected a suggestion, got {:?}", other),
        }
    }
}
