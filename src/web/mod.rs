// Web server module
// Exposes the listing store and image intake over HTTP

mod app;
mod error;
mod extract_request_data;
mod handlers;
mod listeners;
mod models;

pub use app::create_app;
pub use listeners::create_listener;

use crate::image_intake::UploadConfig;
use crate::listing_store::ListingStore;
use std::sync::Arc;
use tokio::sync::RwLock;

// The counter and the collection live behind this one lock: creates and deletes
// take it for writing, reads share it.
pub type SharedListingStore = Arc<RwLock<ListingStore>>;

/// State handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: SharedListingStore,
    pub uploads: Arc<UploadConfig>,
}

impl AppState {
    pub fn new(store: ListingStore, uploads: UploadConfig) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
            uploads: Arc::new(uploads),
        }
    }

    // Room for the text fields on top of the image itself, so an oversized image
    // reaches the intake and is refused with a proper error instead of a cut connection.
    pub fn max_request_body_bytes(&self) -> usize {
        self.uploads.max_size_bytes.saturating_mul(2)
    }
}
