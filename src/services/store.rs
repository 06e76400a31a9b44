// src/services/store.rs
use crate::errors::WardrobeError;
use crate::models::{Outfit, PendingDetection, WardrobeItem};
use async_trait::async_trait;
use log::debug;
use redis::{AsyncCommands, Client};
use std::collections::{BTreeSet, HashSet};
use uuid::Uuid;

/// Parked detections expire if never confirmed.
const PENDING_TTL_SECS: usize = 3600;
/// Suggestion-session exclusion sets live for a day at most.
const SESSION_TTL_SECS: usize = 86400;

/// Narrow persistence contract the rest of the service depends on. Wardrobe
/// data is durable; pending detections and session exclusion sets expire.
#[async_trait]
pub trait WardrobeStore: Send + Sync {
    async fn save_item(&self, item: &WardrobeItem) -> Result<(), WardrobeError>;
    async fn get_item(&self, item_id: &Uuid) -> Result<WardrobeItem, WardrobeError>;
    async fn items_for_user(&self, user_id: &Uuid) -> Result<Vec<WardrobeItem>, WardrobeError>;
    async fn update_item_description(
        &self,
        item_id: &Uuid,
        description: &str,
    ) -> Result<(), WardrobeError>;
    /// Append an outfit id to an item's reference list; already-present ids
    /// are left alone so the list never holds duplicates.
    async fn add_outfit_reference(
        &self,
        item_id: &Uuid,
        outfit_id: &Uuid,
    ) -> Result<(), WardrobeError>;

    async fn save_outfit(&self, outfit: &Outfit) -> Result<(), WardrobeError>;
    async fn get_outfit(&self, outfit_id: &Uuid) -> Result<Outfit, WardrobeError>;
    async fn outfits_for_user(&self, user_id: &Uuid) -> Result<Vec<Outfit>, WardrobeError>;
    async fn update_outfit_rating(
        &self,
        outfit_id: &Uuid,
        rating: u8,
    ) -> Result<(), WardrobeError>;

    async fn store_pending_detection(
        &self,
        pending: &PendingDetection,
    ) -> Result<(), WardrobeError>;
    async fn get_pending_detection(
        &self,
        pending_id: &Uuid,
    ) -> Result<PendingDetection, WardrobeError>;

    async fn suggested_combinations(
        &self,
        session_id: &Uuid,
    ) -> Result<HashSet<BTreeSet<Uuid>>, WardrobeError>;
    async fn record_suggested_combination(
        &self,
        session_id: &Uuid,
        combination: &BTreeSet<Uuid>,
    ) -> Result<(), WardrobeError>;
}

pub struct RedisWardrobeStore {
    client: Client,
}

impl RedisWardrobeStore {
    pub async fn new(redis_url: &str) -> Result<Self, WardrobeError> {
        let client = Client::open(redis_url).map_err(|e| WardrobeError::Store(e.to_string()))?;

        // Test connection
        let mut conn = client
            .get_async_connection()
            .await
            .map_err(|e| WardrobeError::Store(e.to_string()))?;

        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| WardrobeError::Store(e.to_string()))?;

        Ok(Self { client })
    }

    async fn connection(&self) -> Result<redis::aio::Connection, WardrobeError> {
        self.client
            .get_async_connection()
            .await
            .map_err(|e| WardrobeError::Store(e.to_string()))
    }
}

#[async_trait]
impl WardrobeStore for RedisWardrobeStore {
    async fn save_item(&self, item: &WardrobeItem) -> Result<(), WardrobeError> {
        let mut conn = self.connection().await?;

        let key = format!("item:{}", item.id);
        let value = serde_json::to_string(item)
            .map_err(|e| WardrobeError::Serialization(e.to_string()))?;

        conn.set::<_, _, ()>(&key, value)
            .await
            .map_err(|e| WardrobeError::Store(e.to_string()))?;

        let index_key = format!("user:{}:items", item.user_id);
        conn.sadd::<_, _, ()>(&index_key, item.id.to_string())
            .await
            .map_err(|e| WardrobeError::Store(e.to_string()))?;

        Ok(())
    }

    async fn get_item(&self, item_id: &Uuid) -> Result<WardrobeItem, WardrobeError> {
        let mut conn = self.connection().await?;

        let key = format!("item:{}", item_id);
        let value: String = conn
            .get(&key)
            .await
            .map_err(|e| WardrobeError::Store(format!("Item not found: {}", e)))?;

        serde_json::from_str(&value).map_err(|e| WardrobeError::Serialization(e.to_string()))
    }

    async fn items_for_user(&self, user_id: &Uuid) -> Result<Vec<WardrobeItem>, WardrobeError> {
        let mut conn = self.connection().await?;

        let index_key = format!("user:{}:items", user_id);
        let ids: Vec<String> = conn
            .smembers(&index_key)
            .await
            .map_err(|e| WardrobeError::Store(e.to_string()))?;

        let mut items = Vec::with_capacity(ids.len());
        for id in ids {
            let value: Option<String> = conn
                .get(format!("item:{}", id))
                .await
                .map_err(|e| WardrobeError::Store(e.to_string()))?;
            if let Some(value) = value {
                let item: WardrobeItem = serde_json::from_str(&value)
                    .map_err(|e| WardrobeError::Serialization(e.to_string()))?;
                items.push(item);
            }
        }

        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        debug!("Loaded {} wardrobe items for user {}", items.len(), user_id);
        Ok(items)
    }

    async fn update_item_description(
        &self,
        item_id: &Uuid,
        description: &str,
    ) -> Result<(), WardrobeError> {
        let mut item = self.get_item(item_id).await?;
        item.description = description.to_string();
        self.save_item(&item).await
    }

    async fn add_outfit_reference(
        &self,
        item_id: &Uuid,
        outfit_id: &Uuid,
    ) -> Result<(), WardrobeError> {
        let mut item = self.get_item(item_id).await?;
        if !item.outfit_references.contains(outfit_id) {
            item.outfit_references.push(*outfit_id);
            self.save_item(&item).await?;
        }
        Ok(())
    }

    async fn save_outfit(&self, outfit: &Outfit) -> Result<(), WardrobeError> {
        let mut conn = self.connection().await?;

        let key = format!("outfit:{}", outfit.id);
        let value = serde_json::to_string(outfit)
            .map_err(|e| WardrobeError::Serialization(e.to_string()))?;

        conn.set::<_, _, ()>(&key, value)
            .await
            .map_err(|e| WardrobeError::Store(e.to_string()))?;

        let index_key = format!("user:{}:outfits", outfit.user_id);
        conn.sadd::<_, _, ()>(&index_key, outfit.id.to_string())
            .await
            .map_err(|e| WardrobeError::Store(e.to_string()))?;

        Ok(())
    }

    async fn get_outfit(&self, outfit_id: &Uuid) -> Result<Outfit, WardrobeError> {
        let mut conn = self.connection().await?;

        let key = format!("outfit:{}", outfit_id);
        let value: String = conn
            .get(&key)
            .await
            .map_err(|e| WardrobeError::Store(format!("Outfit not found: {}", e)))?;

        serde_json::from_str(&value).map_err(|e| WardrobeError::Serialization(e.to_string()))
    }

    async fn outfits_for_user(&self, user_id: &Uuid) -> Result<Vec<Outfit>, WardrobeError> {
        let mut conn = self.connection().await?;

        let index_key = format!("user:{}:outfits", user_id);
        let ids: Vec<String> = conn
            .smembers(&index_key)
            .await
            .map_err(|e| WardrobeError::Store(e.to_string()))?;

        let mut outfits = Vec::with_capacity(ids.len());
        for id in ids {
            let value: Option<String> = conn
                .get(format!("outfit:{}", id))
                .await
                .map_err(|e| WardrobeError::Store(e.to_string()))?;
            if let Some(value) = value {
                let outfit: Outfit = serde_json::from_str(&value)
                    .map_err(|e| WardrobeError::Serialization(e.to_string()))?;
                outfits.push(outfit);
            }
        }

        outfits.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(outfits)
    }

    async fn update_outfit_rating(
        &self,
        outfit_id: &Uuid,
        rating: u8,
    ) -> Result<(), WardrobeError> {
        let mut outfit = self.get_outfit(outfit_id).await?;
        outfit.rating = Some(rating);
        self.save_outfit(&outfit).await
    }

    async fn store_pending_detection(
        &self,
        pending: &PendingDetection,
    ) -> Result<(), WardrobeError> {
        let mut conn = self.connection().await?;

        let key = format!("pending:{}", pending.id);
        let value = serde_json::to_string(pending)
            .map_err(|e| WardrobeError::Serialization(e.to_string()))?;

        conn.set_ex::<_, _, ()>(&key, value, PENDING_TTL_SECS)
            .await
            .map_err(|e| WardrobeError::Store(e.to_string()))?;

        Ok(())
    }

    async fn get_pending_detection(
        &self,
        pending_id: &Uuid,
    ) -> Result<PendingDetection, WardrobeError> {
        let mut conn = self.connection().await?;

        let key = format!("pending:{}", pending_id);
        let value: String = conn
            .get(&key)
            .await
            .map_err(|e| WardrobeError::Store(format!("Pending detection not found: {}", e)))?;

        serde_json::from_str(&value).map_err(|e| WardrobeError::Serialization(e.to_string()))
    }

    async fn suggested_combinations(
        &self,
        session_id: &Uuid,
    ) -> Result<HashSet<BTreeSet<Uuid>>, WardrobeError> {
        let mut conn = self.connection().await?;

        let key = format!("session:{}:suggested", session_id);
        let members: Vec<String> = conn
            .smembers(&key)
            .await
            .map_err(|e| WardrobeError::Store(e.to_string()))?;

        Ok(members
            .iter()
            .filter_map(|member| serde_json::from_str::<BTreeSet<Uuid>>(member).ok())
            .collect())
    }

    async fn record_suggested_combination(
        &self,
        session_id: &Uuid,
        combination: &BTreeSet<Uuid>,
    ) -> Result<(), WardrobeError> {
        let mut conn = self.connection().await?;

        let key = format!("session:{}:suggested", session_id);
        let member = serde_json::to_string(combination)
            .map_err(|e| WardrobeError::Serialization(e.to_string()))?;

        conn.sadd::<_, _, ()>(&key, member)
            .await
            .map_err(|e| WardrobeError::Store(e.to_string()))?;
        conn.expire::<_, ()>(&key, SESSION_TTL_SECS)
            .await
            .map_err(|e| WardrobeError::Store(e.to_string()))?;

        Ok(())
    }
}
