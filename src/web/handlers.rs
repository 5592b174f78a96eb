// API handlers for the web server

use super::{
    AppState,
    error::ApiError,
    extract_request_data::extract_listing_form,
    models::*,
};
use crate::image_intake::store_image;
use crate::models::{Listing, ListingFilters, ListingId};
use crate::query::query;
use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

// --- GET /products?search=&city=&currency= ---
// Lists listings matching the filters, newest first
pub async fn list_listings(
    State(state): State<AppState>,
    Query(filters): Query<ListingFilters>,
) -> Json<Vec<Listing>> {
    let store = state.store.read().await;
    if store.is_empty() {
        return Json(Vec::new());
    }
    let listings = query(store.all(), &filters);

    debug!(
        "Listing query {:?} matched {} of {} listings",
        filters,
        listings.len(),
        store.len()
    );

    Json(listings)
}

// --- GET /products/{id} ---
pub async fn get_listing(
    State(state): State<AppState>,
    Path(id): Path<ListingId>,
) -> Result<Json<Listing>, ApiError> {
    let store = state.store.read().await;
    store
        .get(id)
        .cloned()
        .map(Json)
        .ok_or(ApiError::ListingNotFound(id))
}

// --- POST /products (multipart) ---
// Validates the text fields, stores the optional image, then records the listing.
// If the image is refused nothing is created.
pub async fn create_listing(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Listing>), ApiError> {
    let request_id = Uuid::new_v4();

    let (form, image) = extract_listing_form(multipart, state.uploads.max_size_bytes).await?;
    let new_listing = form.validate()?;

    info!(
        "Create listing request: name={:?}, has_image={}, request_id={}",
        new_listing.name,
        image.is_some(),
        request_id
    );

    let image_path = match image {
        Some(upload) => {
            let stored = store_image(
                &state.uploads,
                &upload.bytes,
                upload.content_type.as_deref(),
                upload.file_name.as_deref(),
            )
            .await?;
            debug!(
                "Image {} written to {} for request_id={}",
                stored.file_name,
                stored.fs_path.display(),
                request_id
            );
            Some(stored.public_path)
        }
        None => None,
    };

    // The lock is taken only after the file is on disk, so slow writes never block readers
    let listing = state.store.write().await.create(new_listing, image_path);

    info!(
        "Created listing {} for request_id={}",
        listing.id, request_id
    );

    Ok((StatusCode::CREATED, Json(listing)))
}

// --- DELETE /products/{id} ---
// Removes the listing. Its image file, if any, stays in the upload directory.
pub async fn delete_listing(
    State(state): State<AppState>,
    Path(id): Path<ListingId>,
) -> Result<Json<DeleteListingResponse>, ApiError> {
    debug!("Delete listing request: id={}", id);

    let removed = state.store.write().await.delete(id)?;

    if let Some(image_path) = &removed.image_path {
        info!(
            "Listing {} deleted; its image {} is left in place",
            id, image_path
        );
    }

    Ok(Json(DeleteListingResponse {
        message: "Listing deleted".to_string(),
        id,
    }))
}

// --- GET /health ---
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let listings = state.store.read().await.len();

    Json(HealthResponse {
        status: "OK".to_string(),
        timestamp: Utc::now(),
        listings,
    })
}
