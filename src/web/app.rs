use super::{AppState, handlers};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::get,
};
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing::Level;

pub fn create_app(state: AppState) -> Router {
    let uploads = ServeDir::new(&state.uploads.upload_dir);
    let uploads_prefix = state.uploads.public_prefix.clone();
    let body_limit = state.max_request_body_bytes();

    // Configure the router with all API endpoints
    Router::new()
        // Listing collection and single-listing endpoints
        .route(
            "/products",
            get(handlers::list_listings).post(handlers::create_listing),
        )
        .route(
            "/products/{id}",
            get(handlers::get_listing).delete(handlers::delete_listing),
        )
        .route("/health", get(handlers::health))
        // Uploaded images, served from the path returned at creation time
        .nest_service(&uploads_prefix, uploads)
        // Limit request bodies; the image limit itself is enforced by the intake
        .layer(DefaultBodyLimit::max(body_limit))
        // The storefront is served from a different origin
        .layer(CorsLayer::permissive())
        // Add tracing for HTTP requests and responses
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::new().level(Level::INFO)))
        .with_state(state)
}
