// src/errors.rs
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WardrobeError {
    #[error("Store error: {0}")]
    Store(String),

    #[error("Vision service error: {0}")]
    Vision(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl ResponseError for WardrobeError {
    fn error_response(&self) -> HttpResponse {
        match self {
            WardrobeError::Store(_) => HttpResponse::InternalServerError().json(
                serde_json::json!({
                    "error": "Database error",
                    "message": self.to_string()
                }),
            ),
            WardrobeError::Vision(_) => HttpResponse::ServiceUnavailable().json(
                serde_json::json!({
                    "error": "Vision service error",
                    "message": self.to_string()
                }),
            ),
            WardrobeError::ImageProcessing(_) => {
                HttpResponse::BadRequest().json(serde_json::json!({
                    "error": "Image processing error",
                    "message": self.to_string()
                }))
            }
            WardrobeError::Serialization(_) => {
                HttpResponse::InternalServerError().json(serde_json::json!({
                    "error": "Data processing error",
                    "message": self.to_string()
                }))
            }
            WardrobeError::Validation(_) => HttpResponse::BadRequest().json(
                serde_json::json!({
                    "error": "Validation error",
                    "message": self.to_string()
                }),
            ),
        }
    }
}
