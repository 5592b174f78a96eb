// Core data structures shared by the listing store, the query engine and the web layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type ListingId = u64;

/// A single seller-submitted item.
///
/// Field names on the wire follow the contract the storefront already speaks:
/// the contact link travels as `facebookLink` and the image path as `imageUrl`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: ListingId,
    pub name: String,
    pub price: f64,
    pub currency: String,
    pub city: String,
    pub description: String,
    #[serde(rename = "facebookLink")]
    pub contact_link: String,
    // Public path of the stored image, e.g. `/uploads/1700000000000-42.png`.
    // `None` when no image was submitted; placeholders are a client concern.
    #[serde(rename = "imageUrl")]
    pub image_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Validated fields for a listing that does not exist yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewListing {
    pub name: String,
    pub price: f64,
    pub currency: String,
    pub city: String,
    pub description: String,
    pub contact_link: String,
}

/// Optional filters applied by the query engine. All present filters must match.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ListingFilters {
    // Case-insensitive substring of the listing name
    pub search: Option<String>,
    // Case-insensitive substring of the city
    pub city: Option<String>,
    // Exact, case-sensitive currency token
    pub currency: Option<String>,
}
