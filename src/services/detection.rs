// src/services/detection.rs
use crate::geometry::overlap_ratio;
use crate::models::{BoundingBox, Category, DetectedItem};
use log::debug;
use serde_json::Value;

/// Two detections of the same category overlapping more than this are the
/// same garment seen twice.
const OVERLAP_THRESHOLD: f32 = 0.5;

/// Confidence assigned to items derived from labels alone, without a
/// localized object behind them.
const LABEL_FALLBACK_CONFIDENCE: f32 = 0.5;

/// At most this many dominant colors are kept per photo.
const MAX_COLORS: usize = 5;

struct CategoryKeywords {
    category: Category,
    classification: &'static [&'static str],
    relevance: &'static [&'static str],
}

/// Single source of truth for categorization. Both the object path and the
/// label-only fallback read this table, so the two cannot drift. Matching is
/// substring containment over lower-cased text; precedence is table order.
const CATEGORY_KEYWORDS: &[CategoryKeywords] = &[
    CategoryKeywords {
        category: Category::Shirt,
        classification: &[
            "shirt",
            "top",
            "t-shirt",
            "tshirt",
            "blouse",
            "sweater",
            "hoodie",
            "sweatshirt",
            "jersey",
            "polo",
        ],
        relevance: &["shirt", "top", "sleeve", "collar", "cotton", "fabric"],
    },
    CategoryKeywords {
        category: Category::Pants,
        classification: &[
            "pants", "trousers", "jeans", "shorts", "skirt", "leggings", "bottom",
        ],
        relevance: &["pants", "trousers", "jeans", "denim", "leg", "waist"],
    },
    CategoryKeywords {
        category: Category::Shoes,
        classification: &[
            "shoe", "shoes", "footwear", "sneaker", "boot", "sandal", "heel",
        ],
        relevance: &["shoe", "footwear", "sole", "lace", "leather"],
    },
    CategoryKeywords {
        category: Category::Dress,
        classification: &["dress", "gown", "frock"],
        relevance: &["dress", "gown", "formal", "elegant"],
    },
    CategoryKeywords {
        category: Category::Jacket,
        classification: &["jacket", "coat", "blazer", "cardigan", "outerwear"],
        relevance: &["jacket", "coat", "outer", "sleeve", "zipper"],
    },
    CategoryKeywords {
        category: Category::Accessory,
        classification: &[
            "hat",
            "cap",
            "bag",
            "purse",
            "belt",
            "scarf",
            "glasses",
            "sunglasses",
            "watch",
            "jewelry",
        ],
        relevance: &["accessory", "fashion", "style"],
    },
    CategoryKeywords {
        category: Category::Other,
        classification: &[],
        relevance: &["clothing", "apparel", "wear"],
    },
];

/// Turn one decoded vision response into a deduplicated list of detected
/// clothing items. Missing or malformed fields degrade to empty; this never
/// fails.
pub fn parse_response(response: &Value) -> Vec<DetectedItem> {
    let colors = extract_colors(response);
    let labels = extract_labels(response);

    let mut detected: Vec<DetectedItem> = Vec::new();

    if let Some(objects) = response["localizedObjectAnnotations"].as_array() {
        for obj in objects {
            let Some(name) = obj["name"].as_str() else {
                continue;
            };
            let name = name.to_lowercase();
            let confidence = obj["score"].as_f64().unwrap_or(0.0) as f32;

            let Some(category) = categorize(&name) else {
                // Not clothing.
                continue;
            };

            let item = DetectedItem {
                category,
                labels: find_related_labels(&name, &labels),
                colors: colors.clone(),
                bounding_box: extract_bounding_box(obj),
                confidence,
            };

            if is_duplicate(&item, &detected) {
                debug!("Skipping duplicate detection: {}", name);
                continue;
            }
            detected.push(item);
        }
    }

    // No objects survived categorization: fall back to the labels alone.
    if detected.is_empty() && !labels.is_empty() {
        let categories = categorize_from_labels(&labels);
        if categories.is_empty() {
            detected.push(DetectedItem {
                category: Category::Other,
                labels: labels.clone(),
                colors: colors.clone(),
                bounding_box: None,
                confidence: LABEL_FALLBACK_CONFIDENCE,
            });
        } else {
            for category in categories {
                detected.push(DetectedItem {
                    category,
                    labels: labels
                        .iter()
                        .filter(|label| is_relevant_label(label, category))
                        .cloned()
                        .collect(),
                    colors: colors.clone(),
                    bounding_box: None,
                    confidence: LABEL_FALLBACK_CONFIDENCE,
                });
            }
        }
    }

    debug!("Detected {} unique clothing items", detected.len());
    detected
}

/// Map an object or label name to a clothing category, first table entry
/// with a matching classification keyword wins. None means "not clothing".
pub fn categorize(name: &str) -> Option<Category> {
    CATEGORY_KEYWORDS
        .iter()
        .find(|entry| entry.classification.iter().any(|kw| name.contains(kw)))
        .map(|entry| entry.category)
}

fn categorize_from_labels(labels: &[String]) -> Vec<Category> {
    let mut categories = Vec::new();
    for label in labels {
        if let Some(category) = categorize(label) {
            if !categories.contains(&category) {
                categories.push(category);
            }
        }
    }
    categories
}

fn is_relevant_label(label: &str, category: Category) -> bool {
    CATEGORY_KEYWORDS
        .iter()
        .find(|entry| entry.category == category)
        .map(|entry| entry.relevance.iter().any(|kw| label.contains(kw)))
        .unwrap_or(false)
}

/// A candidate duplicates an already-accepted item when they share a
/// category and their boxes overlap past the threshold. Items without a box
/// cannot be compared and are never treated as duplicates.
fn is_duplicate(new_item: &DetectedItem, accepted: &[DetectedItem]) -> bool {
    let Some(new_box) = &new_item.bounding_box else {
        return false;
    };

    accepted.iter().any(|existing| {
        existing.category == new_item.category
            && existing
                .bounding_box
                .as_ref()
                .is_some_and(|existing_box| overlap_ratio(new_box, existing_box) > OVERLAP_THRESHOLD)
    })
}

fn extract_colors(response: &Value) -> Vec<String> {
    response["imagePropertiesAnnotation"]["dominantColors"]["colors"]
        .as_array()
        .map(|colors| {
            colors
                .iter()
                .take(MAX_COLORS)
                .map(|entry| {
                    let color = &entry["color"];
                    let r = color["red"].as_u64().unwrap_or(0).min(255);
                    let g = color["green"].as_u64().unwrap_or(0).min(255);
                    let b = color["blue"].as_u64().unwrap_or(0).min(255);
                    format!("#{:02X}{:02X}{:02X}", r, g, b)
                })
                .collect()
        })
        .unwrap_or_default()
}

fn extract_labels(response: &Value) -> Vec<String> {
    response["labelAnnotations"]
        .as_array()
        .map(|labels| {
            labels
                .iter()
                .filter_map(|label| label["description"].as_str())
                .map(|description| description.to_lowercase())
                .collect()
        })
        .unwrap_or_default()
}

/// Bounding box from the polygon's vertex extrema, clamped to [0,1].
/// Degenerate polygons (fewer than 4 vertices) yield no box rather than an
/// error; downstream treats "no box" as incomparable.
fn extract_bounding_box(obj: &Value) -> Option<BoundingBox> {
    let vertices = obj["boundingPoly"]["normalizedVertices"].as_array()?;
    if vertices.len() < 4 {
        return None;
    }

    let mut left = 1.0f32;
    let mut top = 1.0f32;
    let mut right = 0.0f32;
    let mut bottom = 0.0f32;

    for vertex in vertices {
        let x = (vertex["x"].as_f64().unwrap_or(0.0) as f32).clamp(0.0, 1.0);
        let y = (vertex["y"].as_f64().unwrap_or(0.0) as f32).clamp(0.0, 1.0);
        left = left.min(x);
        top = top.min(y);
        right = right.max(x);
        bottom = bottom.max(y);
    }

    Some(BoundingBox::new(left, top, right, bottom))
}

/// Labels that share at least one whitespace token with the object name;
/// falls back to the first five labels when nothing matches.
fn find_related_labels(object_name: &str, all_labels: &[String]) -> Vec<String> {
    let keywords: Vec<&str> = object_name.split_whitespace().collect();

    let related: Vec<String> = all_labels
        .iter()
        .filter(|label| keywords.iter().any(|kw| label.contains(kw)))
        .cloned()
        .collect();

    if related.is_empty() {
        all_labels.iter().take(5).cloned().collect()
    } else {
        related
    }
}

/// Human-readable description for a new wardrobe item: dominant color name,
/// first non-generic label, category noun. Degrades to whatever parts exist.
pub fn generate_description(category: Category, colors: &[String], labels: &[String]) -> String {
    let color_descriptor = colors.first().map(|hex| color_name(hex)).unwrap_or("");

    let generic = ["sleeve", "clothing", "apparel", "wear", "fashion", "style"];
    let descriptive_label = labels
        .iter()
        .find(|label| {
            !label.contains(category.as_str())
                && !generic.iter().any(|term| label.contains(term))
                && label.len() > 3
        })
        .map(String::as_str)
        .unwrap_or("");

    let description = match (color_descriptor.is_empty(), descriptive_label.is_empty()) {
        (false, false) => format!(
            "{} {} {}",
            color_descriptor,
            descriptive_label,
            category.as_str()
        ),
        (false, true) => format!("{} {}", color_descriptor, category.as_str()),
        (true, false) => format!("{} {}", descriptive_label, category.as_str()),
        (true, true) => category.as_str().to_string(),
    };

    capitalize(description.trim())
}

/// Coarse hex-to-name mapping, dominant color only. Unparseable or
/// in-between colors map to the empty string and drop out of descriptions.
fn color_name(hex: &str) -> &'static str {
    let hex = hex.trim_start_matches('#');
    if hex.len() < 6 {
        return "";
    }

    let Ok(r) = u16::from_str_radix(&hex[0..2], 16) else {
        return "";
    };
    let Ok(g) = u16::from_str_radix(&hex[2..4], 16) else {
        return "";
    };
    let Ok(b) = u16::from_str_radix(&hex[4..6], 16) else {
        return "";
    };

    match (r, g, b) {
        (r, g, b) if r > 200 && g > 200 && b > 200 => "white",
        (r, g, b) if r < 50 && g < 50 && b < 50 => "black",
        (r, g, b) if r > 150 && g < 100 && b < 100 => "red",
        (r, g, b) if r < 100 && g > 150 && b < 100 => "green",
        (r, g, b) if r < 100 && g < 100 && b > 150 => "blue",
        (r, g, b) if r > 150 && g > 150 && b < 100 => "yellow",
        (r, g, b) if r > 150 && g < 100 && b > 150 => "purple",
        (r, g, b) if r > 200 && g > 100 && b < 100 => "orange",
        (r, g, b) if r > 100 && g > 100 && b > 100 => "gray",
        (r, g, b) if r > 100 && g > 50 && b < 50 => "brown",
        _ => "",
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
