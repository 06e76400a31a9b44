// src/services/vision.rs
use crate::errors::WardrobeError;
use crate::models::DetectedItem;
use crate::services::detection;
use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use log::{debug, warn};
use reqwest::Client;
use serde_json::json;

const VISION_API_URL: &str = "https://vision.googleapis.com/v1/images:annotate";
const MAX_RESULTS: u32 = 20;

/// Client for the vision backend. Owns request construction and transport;
/// payload interpretation lives in the detection parser.
pub struct VisionClient {
    api_key: String,
    client: Client,
}

impl VisionClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: Client::new(),
        }
    }

    /// Annotate one photo and parse the response into clothing items.
    /// Transport failures surface as errors; a response we cannot make sense
    /// of is logged and yields an empty list, the same as a photo with
    /// nothing in it.
    pub async fn detect_clothing(&self, image_data: Bytes) -> Result<Vec<DetectedItem>, WardrobeError> {
        let base64_image = general_purpose::STANDARD.encode(&image_data);

        let request_body = json!({
            "requests": [{
                "image": { "content": base64_image },
                "features": [
                    { "type": "LABEL_DETECTION", "maxResults": MAX_RESULTS },
                    { "type": "OBJECT_LOCALIZATION", "maxResults": MAX_RESULTS },
                    { "type": "IMAGE_PROPERTIES", "maxResults": 10 }
                ]
            }]
        });

        let response = self
            .client
            .post(format!("{}?key={}", VISION_API_URL, self.api_key))
            .json(&request_body)
            .send()
            .await
            .map_err(|e| WardrobeError::Vision(format!("Vision request failed: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(WardrobeError::Vision(format!(
                "Vision API error: {}",
                error_text
            )));
        }

        let result: serde_json::Value = response
            .json()
            .await
            .map_err(|e| WardrobeError::Vision(format!("Failed to parse vision response: {}", e)))?;

        let Some(first) = result["responses"].as_array().and_then(|r| r.first()) else {
            warn!("Vision response carried no annotation payload");
            return Ok(Vec::new());
        };

        let items = detection::parse_response(first);
        debug!("Vision backend returned {} clothing items", items.len());
        Ok(items)
    }
}
