// src/main.rs
use actix_web::{App, HttpResponse, HttpServer, middleware, web};
use anyhow::Context;
use log::info;
use std::sync::Arc;

mod errors;
mod geometry;
mod handlers;
mod models;
mod services;

use crate::handlers::{
    accept_suggestion, confirm_outfit, detect_outfit, list_outfits, list_wardrobe, rate_outfit,
    suggest_outfit,
};
use crate::services::{ImageProcessor, RedisWardrobeStore, VisionClient, WardrobeStore};

#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn WardrobeStore>,
    vision_client: Arc<VisionClient>,
    image_processor: Arc<ImageProcessor>,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting fitcheck service...");

    let redis_url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    let vision_api_key =
        std::env::var("VISION_API_KEY").context("VISION_API_KEY must be set")?;
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    let store: Arc<dyn WardrobeStore> = Arc::new(
        RedisWardrobeStore::new(&redis_url)
            .await
            .context("Failed to connect to redis")?,
    );
    let vision_client = Arc::new(VisionClient::new(vision_api_key));
    let image_processor = Arc::new(ImageProcessor::new());

    let app_state = AppState {
        store,
        vision_client,
        image_processor,
    };

    info!("Starting HTTP server on {}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(middleware::Logger::default())
            .service(
                web::scope("/api/v1")
                    .route(
                        "/users/{user_id}/detections",
                        web::post().to(detect_outfit),
                    )
                    .route("/users/{user_id}/outfits", web::post().to(confirm_outfit))
                    .route("/users/{user_id}/outfits", web::get().to(list_outfits))
                    .route("/users/{user_id}/wardrobe", web::get().to(list_wardrobe))
                    .route(
                        "/users/{user_id}/outfits/{outfit_id}/rating",
                        web::post().to(rate_outfit),
                    )
                    .route(
                        "/users/{user_id}/suggestions",
                        web::post().to(suggest_outfit),
                    )
                    .route(
                        "/users/{user_id}/suggestions/accept",
                        web::post().to(accept_suggestion),
                    ),
            )
            .route("/health", web::get().to(health_check))
    })
    .bind(bind_addr)?
    .run()
    .await?;

    Ok(())
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "fitcheck",
        "version": "0.1.0"
    }))
}
