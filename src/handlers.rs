// src/handlers.rs
use crate::{
    AppState,
    errors::WardrobeError,
    models::*,
    services::{matching, suggestion},
};
use actix_multipart::Multipart;
use actix_web::{Error, HttpResponse, web};
use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use chrono::Utc;
use futures_util::TryStreamExt;
use log::info;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct ConfirmOutfitRequest {
    pub pending_id: Uuid,
    pub rating: Option<u8>,
    pub selections: Vec<ItemSelection>,
}

/// One decision from the duplicate-confirmation step: either attach the
/// candidate to an existing wardrobe item, or create a new one (with an
/// optional renamed description either way).
#[derive(Deserialize)]
pub struct ItemSelection {
    pub index: usize,
    pub existing_item_id: Option<Uuid>,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct RatingRequest {
    pub rating: u8,
}

#[derive(Deserialize)]
pub struct SuggestionRequest {
    pub session_id: Uuid,
}

#[derive(Deserialize)]
pub struct AcceptSuggestionRequest {
    pub item_ids: Vec<Uuid>,
    pub rating: Option<u8>,
}

/// Upload an outfit photo, run detection, and park the parsed candidates
/// for confirmation. Each candidate ships with its ranked possible
/// duplicates; an empty candidate list means nothing was detected.
pub async fn detect_outfit(
    path: web::Path<Uuid>,
    mut payload: Multipart,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let user_id = path.into_inner();

    let mut image_data = Vec::new();
    while let Some(mut field) = payload.try_next().await? {
        while let Some(chunk) = field.try_next().await? {
            image_data.extend_from_slice(&chunk);
        }
    }

    if image_data.is_empty() {
        return Err(WardrobeError::Validation("No photo provided".to_string()).into());
    }

    data.image_processor
        .validate_image(&image_data)
        .map_err(actix_web::error::ErrorBadRequest)?;

    let photo = data
        .image_processor
        .downscale(&image_data, 2048)
        .map_err(actix_web::error::ErrorInternalServerError)?;

    let detected = data
        .vision_client
        .detect_clothing(Bytes::from(photo.clone()))
        .await?;

    if detected.is_empty() {
        info!("No clothing detected for user {}", user_id);
        return Ok(HttpResponse::Ok().json(serde_json::json!({
            "pending_id": null,
            "candidates": []
        })));
    }

    let wardrobe = data.store.items_for_user(&user_id).await?;

    let mut candidates = Vec::new();
    let mut candidate_views = Vec::new();
    for item in detected {
        let description = crate::services::detection::generate_description(
            item.category,
            &item.colors,
            &item.labels,
        );
        let thumbnail = data
            .image_processor
            .crop_region(&photo, item.bounding_box.as_ref());

        // Probe item used only for ranking against the wardrobe.
        let probe = WardrobeItem {
            id: Uuid::nil(),
            user_id,
            category: item.category,
            description: description.clone(),
            dominant_colors: item.colors.clone(),
            detected_labels: item.labels.clone(),
            image: String::new(),
            outfit_references: Vec::new(),
            created_at: Utc::now(),
        };
        let matches: Vec<serde_json::Value> =
            matching::find_similar(&probe, &wardrobe, matching::SIMILARITY_THRESHOLD)
                .into_iter()
                .map(|(existing, score)| {
                    serde_json::json!({ "item": existing, "score": score })
                })
                .collect();

        let candidate = CandidateItem::from_detected(
            item,
            description,
            general_purpose::STANDARD.encode(&thumbnail),
        );
        candidate_views.push(serde_json::json!({
            "candidate": &candidate,
            "matches": matches
        }));
        candidates.push(candidate);
    }

    let pending = PendingDetection {
        id: Uuid::new_v4(),
        user_id,
        image: general_purpose::STANDARD.encode(&photo),
        candidates,
        created_at: Utc::now(),
    };
    data.store.store_pending_detection(&pending).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "pending_id": pending.id,
        "candidates": candidate_views
    })))
}

/// Resolve a pending detection into a persisted outfit: attach candidates to
/// existing items or create new ones, then record the outfit itself.
pub async fn confirm_outfit(
    path: web::Path<Uuid>,
    body: web::Json<ConfirmOutfitRequest>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let user_id = path.into_inner();
    let request = body.into_inner();

    if let Some(rating) = request.rating {
        validate_rating(rating)?;
    }
    if request.selections.is_empty() {
        return Err(WardrobeError::Validation("No items selected".to_string()).into());
    }

    let pending = data
        .store
        .get_pending_detection(&request.pending_id)
        .await
        .map_err(actix_web::error::ErrorNotFound)?;

    if pending.user_id != user_id {
        return Err(actix_web::error::ErrorNotFound(WardrobeError::Validation(
            "Pending detection does not belong to this user".to_string(),
        )));
    }

    let outfit_id = Uuid::new_v4();
    let mut item_ids = Vec::with_capacity(request.selections.len());

    for selection in &request.selections {
        let candidate = pending.candidates.get(selection.index).ok_or_else(|| {
            WardrobeError::Validation(format!("No detection candidate {}", selection.index))
        })?;

        match selection.existing_item_id {
            Some(existing_id) => {
                data.store
                    .add_outfit_reference(&existing_id, &outfit_id)
                    .await
                    .map_err(actix_web::error::ErrorNotFound)?;
                if let Some(description) = &selection.description {
                    data.store
                        .update_item_description(&existing_id, description)
                        .await?;
                }
                item_ids.push(existing_id);
            }
            None => {
                let item = WardrobeItem {
                    id: Uuid::new_v4(),
                    user_id,
                    category: candidate.category,
                    description: selection
                        .description
                        .clone()
                        .unwrap_or_else(|| candidate.description.clone()),
                    dominant_colors: candidate.colors.clone(),
                    detected_labels: candidate.labels.clone(),
                    image: candidate.thumbnail.clone(),
                    outfit_references: vec![outfit_id],
                    created_at: Utc::now(),
                };
                data.store.save_item(&item).await?;
                item_ids.push(item.id);
            }
        }
    }

    let outfit = Outfit {
        id: outfit_id,
        user_id,
        image: pending.image,
        item_ids,
        rating: request.rating,
        created_at: Utc::now(),
    };
    data.store.save_outfit(&outfit).await?;

    info!("Created outfit {} for user {}", outfit.id, user_id);
    Ok(HttpResponse::Ok().json(&outfit))
}

pub async fn list_wardrobe(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let user_id = path.into_inner();
    let items = data.store.items_for_user(&user_id).await?;
    Ok(HttpResponse::Ok().json(&items))
}

pub async fn list_outfits(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let user_id = path.into_inner();
    let outfits = data.store.outfits_for_user(&user_id).await?;
    Ok(HttpResponse::Ok().json(&outfits))
}

pub async fn rate_outfit(
    path: web::Path<(Uuid, Uuid)>,
    body: web::Json<RatingRequest>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let (user_id, outfit_id) = path.into_inner();
    validate_rating(body.rating)?;

    let outfit = data
        .store
        .get_outfit(&outfit_id)
        .await
        .map_err(actix_web::error::ErrorNotFound)?;
    if outfit.user_id != user_id {
        return Err(actix_web::error::ErrorNotFound(WardrobeError::Validation(
            "Outfit does not belong to this user".to_string(),
        )));
    }

    data.store.update_outfit_rating(&outfit_id, body.rating).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "outfit_id": outfit_id,
        "rating": body.rating
    })))
}

/// Generate a suggestion for one browsing session. The chosen combination is
/// recorded against the session so regenerating never repeats it.
pub async fn suggest_outfit(
    path: web::Path<Uuid>,
    body: web::Json<SuggestionRequest>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let user_id = path.into_inner();
    let session_id = body.session_id;

    let outfits = data.store.outfits_for_user(&user_id).await?;
    let items = data.store.items_for_user(&user_id).await?;
    let exclude = data.store.suggested_combinations(&session_id).await?;

    let outcome =
        suggestion::generate_suggestion(&outfits, &items, &exclude, &mut rand::thread_rng());

    match outcome {
        suggestion::SuggestionOutcome::Suggested { suggestion, items } => {
            data.store
                .record_suggested_combination(
                    &session_id,
                    &suggestion::combination_key(&suggestion.item_ids),
                )
                .await?;

            let preview = render_preview(&data, &items);

            Ok(HttpResponse::Ok().json(serde_json::json!({
                "outcome": "suggested",
                "suggestion": suggestion,
                "items": items,
                "preview": preview
            })))
        }
        suggestion::SuggestionOutcome::InsufficientData { message } => {
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "outcome": "insufficient_data",
                "message": message
            })))
        }
        suggestion::SuggestionOutcome::Exhausted => {
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "outcome": "exhausted"
            })))
        }
    }
}

/// Persist an accepted suggestion as a real outfit, with the composite
/// preview standing in for a photo.
pub async fn accept_suggestion(
    path: web::Path<Uuid>,
    body: web::Json<AcceptSuggestionRequest>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let user_id = path.into_inner();
    let request = body.into_inner();

    if let Some(rating) = request.rating {
        validate_rating(rating)?;
    }
    if request.item_ids.is_empty() {
        return Err(WardrobeError::Validation("No items in suggestion".to_string()).into());
    }

    let mut items = Vec::with_capacity(request.item_ids.len());
    for item_id in &request.item_ids {
        let item = data
            .store
            .get_item(item_id)
            .await
            .map_err(actix_web::error::ErrorNotFound)?;
        if item.user_id != user_id {
            return Err(actix_web::error::ErrorNotFound(WardrobeError::Validation(
                "Item does not belong to this user".to_string(),
            )));
        }
        items.push(item);
    }

    let outfit = Outfit {
        id: Uuid::new_v4(),
        user_id,
        image: render_preview(&data, &items).unwrap_or_default(),
        item_ids: request.item_ids,
        rating: request.rating,
        created_at: Utc::now(),
    };
    data.store.save_outfit(&outfit).await?;

    for item_id in &outfit.item_ids {
        data.store.add_outfit_reference(item_id, &outfit.id).await?;
    }

    info!("Accepted suggestion as outfit {} for user {}", outfit.id, user_id);
    Ok(HttpResponse::Ok().json(&outfit))
}

/// Composite preview of the given items as base64 PNG; None when no item
/// image decodes.
fn render_preview(data: &web::Data<AppState>, items: &[WardrobeItem]) -> Option<String> {
    let images: Vec<Vec<u8>> = items
        .iter()
        .map(|item| {
            general_purpose::STANDARD
                .decode(&item.image)
                .unwrap_or_default()
        })
        .collect();

    data.image_processor
        .composite_preview(&images)
        .map(|png| general_purpose::STANDARD.encode(png))
}

fn validate_rating(rating: u8) -> Result<(), WardrobeError> {
    if !(1..=5).contains(&rating) {
        return Err(WardrobeError::Validation(
            "Rating must be between 1 and 5".to_string(),
        ));
    }
    Ok(())
}
