// src/services/matching.rs
use crate::models::WardrobeItem;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Minimum score for a wardrobe item to be offered as a possible duplicate.
pub const SIMILARITY_THRESHOLD: f32 = 0.7;

const COLOR_WEIGHT: f32 = 0.4;
const LABEL_WEIGHT: f32 = 0.4;
const DESCRIPTION_WEIGHT: f32 = 0.2;

/// Score how likely two items are the same physical garment, 0.0 to 1.0.
///
/// Categories must match exactly; anything else is an immediate 0. The rest
/// is a weighted blend of color, label and description-word overlap, where a
/// signal only counts when both sides have data for it (the weights are
/// renormalized over the signals actually present). No signal present means
/// 0: better to create a spurious new item than to merge on no evidence.
pub fn similarity(a: &WardrobeItem, b: &WardrobeItem) -> f32 {
    if a.category != b.category {
        return 0.0;
    }

    let mut score = 0.0;
    let mut total_weight = 0.0;

    if !a.dominant_colors.is_empty() && !b.dominant_colors.is_empty() {
        score += overlap_score(&a.dominant_colors, &b.dominant_colors) * COLOR_WEIGHT;
        total_weight += COLOR_WEIGHT;
    }

    if !a.detected_labels.is_empty() && !b.detected_labels.is_empty() {
        score += overlap_score(&a.detected_labels, &b.detected_labels) * LABEL_WEIGHT;
        total_weight += LABEL_WEIGHT;
    }

    let a_words = description_words(&a.description);
    let b_words = description_words(&b.description);
    if !a_words.is_empty() && !b_words.is_empty() {
        let matched = a_words.intersection(&b_words).count() as f32;
        let total = a_words.len().max(b_words.len()) as f32;
        score += (matched / total) * DESCRIPTION_WEIGHT;
        total_weight += DESCRIPTION_WEIGHT;
    }

    if total_weight > 0.0 {
        score / total_weight
    } else {
        0.0
    }
}

/// Rank wardrobe items that score at or above the threshold against a newly
/// detected item, best first. Ties keep their input order; the caller shows
/// this list to the user, who makes the merge-or-create call.
pub fn find_similar<'a>(
    new_item: &WardrobeItem,
    candidates: &'a [WardrobeItem],
    threshold: f32,
) -> Vec<(&'a WardrobeItem, f32)> {
    let mut similar: Vec<(&WardrobeItem, f32)> = candidates
        .iter()
        .map(|candidate| (candidate, similarity(new_item, candidate)))
        .filter(|(_, score)| *score >= threshold)
        .collect();

    similar.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    similar
}

/// Distinct shared entries over the larger of the two list lengths.
fn overlap_score(a: &[String], b: &[String]) -> f32 {
    let b_set: HashSet<&str> = b.iter().map(String::as_str).collect();
    let matched: HashSet<&str> = a
        .iter()
        .map(String::as_str)
        .filter(|entry| b_set.contains(entry))
        .collect();

    matched.len() as f32 / a.len().max(b.len()) as f32
}

fn description_words(description: &str) -> HashSet<String> {
    description
        .split_whitespace()
        .map(|word| word.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use chrono::Utc;
    use uuid::Uuid;

    fn item(category: Category, colors: &[&str], labels: &[&str], description: &str) -> WardrobeItem {
        WardrobeItem {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            category,
            description: description.to_string(),
            dominant_colors: colors.iter().map(|c| c.to_string()).collect(),
            detected_labels: labels.iter().map(|l| l.to_string()).collect(),
            image: String::new(),
            outfit_references: Vec::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn category_mismatch_is_zero_regardless_of_overlap() {
        let a = item(Category::Shirt, &["#FF0000"], &["cotton"], "Red shirt");
        let b = item(Category::Pants, &["#FF0000"], &["cotton"], "Red shirt");
        assert_eq!(similarity(&a, &b), 0.0);
    }

    #[test]
    fn identical_items_score_one() {
        let a = item(
            Category::Shirt,
            &["#FF0000", "#FFFFFF"],
            &["cotton", "polo"],
            "Red polo shirt",
        );
        assert!((similarity(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn no_signal_with_matching_category_is_zero() {
        let a = item(Category::Shoes, &[], &[], "");
        let b = item(Category::Shoes, &[], &[], "");
        assert_eq!(similarity(&a, &b), 0.0);
    }

    #[test]
    fn absent_signals_renormalize_weights() {
        // Only colors present on both sides: full color overlap must score
        // 1.0, not 0.4.
        let a = item(Category::Jacket, &["#102030"], &[], "");
        let b = item(Category::Jacket, &["#102030"], &[], "");
        assert!((similarity(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn partial_color_overlap_uses_larger_list_length() {
        let a = item(Category::Shirt, &["#FF0000", "#00FF00", "#0000FF"], &[], "");
        let b = item(Category::Shirt, &["#FF0000"], &[], "");
        assert!((similarity(&a, &b) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn find_similar_gates_on_threshold_inclusively() {
        let new_item = item(
            Category::Shirt,
            &["#FF0000", "#00FF00", "#0000FF", "#111111", "#222222"],
            &[],
            "",
        );
        // 5/5 colors shared -> 1.0; 3/5 -> 0.6.
        let exact = item(
            Category::Shirt,
            &["#FF0000", "#00FF00", "#0000FF", "#111111", "#222222"],
            &[],
            "",
        );
        let weak = item(Category::Shirt, &["#FF0000", "#00FF00", "#0000FF", "#333333", "#444444"], &[], "");

        let candidates = [weak.clone(), exact];
        let ranked = find_similar(&new_item, &candidates, 0.7);
        assert_eq!(ranked.len(), 1);
        assert!((ranked[0].1 - 1.0).abs() < 1e-6);

        // A candidate scoring exactly the threshold is included.
        let boundary = similarity(&new_item, &weak);
        let ranked = find_similar(&new_item, std::slice::from_ref(&weak), boundary);
        assert_eq!(ranked.len(), 1);
    }

    #[test]
    fn ranking_is_descending_with_stable_ties() {
        let new_item = item(Category::Shoes, &["#AAAAAA", "#BBBBBB"], &[], "");
        let half_first = item(Category::Shoes, &["#AAAAAA", "#CCCCCC"], &[], "");
        let full = item(Category::Shoes, &["#AAAAAA", "#BBBBBB"], &[], "");
        let half_second = item(Category::Shoes, &["#BBBBBB", "#DDDDDD"], &[], "");

        let first_id = half_first.id;
        let second_id = half_second.id;
        let candidates = vec![half_first, full, half_second];

        let ranked = find_similar(&new_item, &candidates, 0.0);
        assert!((ranked[0].1 - 1.0).abs() < 1e-6);
        assert_eq!(ranked[1].0.id, first_id);
        assert_eq!(ranked[2].0.id, second_id);
    }
}
