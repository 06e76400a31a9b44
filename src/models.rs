// src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Clothing categories the detector can assign. Shirt, Pants and Shoes are
/// the three mandatory slots of a suggested outfit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Shirt,
    Pants,
    Shoes,
    Dress,
    Jacket,
    Accessory,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Shirt => "shirt",
            Category::Pants => "pants",
            Category::Shoes => "shoes",
            Category::Dress => "dress",
            Category::Jacket => "jacket",
            Category::Accessory => "accessory",
            Category::Other => "other",
        }
    }
}

/// Axis-aligned box in normalized [0,1] image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl BoundingBox {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn area(&self) -> f32 {
        let width = self.right - self.left;
        let height = self.bottom - self.top;
        if width <= 0.0 || height <= 0.0 {
            return 0.0;
        }
        width * height
    }
}

/// One clothing item found in a photo. Transient: lives only between the
/// vision call and the user's confirmation, never persisted as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedItem {
    pub category: Category,
    pub labels: Vec<String>,
    pub colors: Vec<String>,
    pub bounding_box: Option<BoundingBox>,
    pub confidence: f32,
}

/// A persisted garment. `id` is immutable once assigned; `outfit_references`
/// grows monotonically and never holds duplicates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WardrobeItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category: Category,
    pub description: String,
    pub dominant_colors: Vec<String>,
    pub detected_labels: Vec<String>,
    /// Base64 JPEG thumbnail, cropped to the detection box.
    pub image: String,
    pub outfit_references: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// One photographed outfit. `item_ids` keeps display order but is treated as
/// a set for combination-uniqueness purposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outfit {
    pub id: Uuid,
    pub user_id: Uuid,
    pub image: String,
    pub item_ids: Vec<Uuid>,
    pub rating: Option<u8>,
    pub created_at: DateTime<Utc>,
}

/// A proposed combination, ephemeral until the user accepts it as an Outfit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutfitSuggestion {
    pub id: Uuid,
    pub item_ids: Vec<Uuid>,
    pub shirt_id: Uuid,
    pub pants_id: Uuid,
    pub shoes_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A parsed upload parked in the store between detection and the user's
/// duplicate-or-new confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingDetection {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Base64 of the (possibly downscaled) outfit photo.
    pub image: String,
    pub candidates: Vec<CandidateItem>,
    pub created_at: DateTime<Utc>,
}

/// One detected item enriched with everything needed to persist it should
/// the user decide it is new.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateItem {
    pub category: Category,
    pub labels: Vec<String>,
    pub colors: Vec<String>,
    pub bounding_box: Option<BoundingBox>,
    pub confidence: f32,
    pub description: String,
    /// Base64 JPEG crop of this item out of the outfit photo.
    pub thumbnail: String,
}

impl CandidateItem {
    pub fn from_detected(detected: DetectedItem, description: String, thumbnail: String) -> Self {
        Self {
            category: detected.category,
            labels: detected.labels,
            colors: detected.colors,
            bounding_box: detected.bounding_box,
            confidence: detected.confidence,
            description,
            thumbnail,
        }
    }
}
