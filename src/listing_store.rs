// Owns every listing currently held by the process, together with id allocation.
// The store itself is not synchronized; the web layer wraps it in a single RwLock
// so the counter and the map always change together.

use crate::models::{Listing, ListingId, NewListing};
use chrono::Utc;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    ListingNotFound(ListingId),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::ListingNotFound(id) => write!(f, "Listing with ID {} not found", id),
        }
    }
}

impl std::error::Error for StoreError {}

pub struct ListingStore {
    // Next id to hand out. Only ever incremented, so deleted ids are never reused.
    next_id: ListingId,
    listings: HashMap<ListingId, Listing>,
}

impl Default for ListingStore {
    fn default() -> Self {
        Self {
            next_id: 1,
            listings: HashMap::new(),
        }
    }
}

impl ListingStore {
    /// Stores a new listing, assigning it the next id and the current time.
    pub fn create(&mut self, fields: NewListing, image_path: Option<String>) -> Listing {
        let id = self.next_id;
        self.next_id += 1;

        let listing = Listing {
            id,
            name: fields.name,
            price: fields.price,
            currency: fields.currency,
            city: fields.city,
            description: fields.description,
            contact_link: fields.contact_link,
            image_path,
            created_at: Utc::now(),
        };

        self.listings.insert(id, listing.clone());
        tracing::info!("Stored listing {} ({} total)", id, self.listings.len());
        listing
    }

    pub fn get(&self, id: ListingId) -> Option<&Listing> {
        self.listings.get(&id)
    }

    /// Removes a listing permanently and hands it back to the caller.
    /// Deleting an id that is not present, including one deleted earlier, is an error.
    pub fn delete(&mut self, id: ListingId) -> Result<Listing, StoreError> {
        match self.listings.remove(&id) {
            Some(listing) => {
                tracing::info!("Removed listing {}", id);
                Ok(listing)
            }
            None => Err(StoreError::ListingNotFound(id)),
        }
    }

    // Iteration order is unspecified; ordering belongs to the query engine.
    pub fn all(&self) -> impl Iterator<Item = &Listing> {
        self.listings.values()
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }
}
