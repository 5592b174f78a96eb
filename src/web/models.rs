// API-specific data models for the web server

use super::error::ApiError;
use crate::models::{ListingId, NewListing};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of `GET /health`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub listings: usize,
}

/// Body of a successful `DELETE /products/{id}`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DeleteListingResponse {
    pub message: String,
    pub id: ListingId,
}

/// The `image` part of a create request, as the client declared it.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub file_name: Option<String>,
}

/// Raw text fields of a create request before validation.
#[derive(Debug, Clone, Default)]
pub struct ListingForm {
    pub name: Option<String>,
    pub price: Option<String>,
    pub currency: Option<String>,
    pub city: Option<String>,
    pub description: Option<String>,
    pub facebook_link: Option<String>,
}

fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Validation(format!("Missing required field '{}'", field)))
}

fn optional(value: Option<String>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}

impl ListingForm {
    /// Turns the submitted fields into a listing the store can accept.
    pub fn validate(self) -> Result<NewListing, ApiError> {
        let name = required(self.name, "name")?;
        let price_text = required(self.price, "price")?;
        let currency = required(self.currency, "currency")?;
        let city = required(self.city, "city")?;

        let price: f64 = price_text.parse().map_err(|_| {
            ApiError::Validation(format!("Field 'price' is not a number: '{}'", price_text))
        })?;
        if !price.is_finite() || price < 0.0 {
            return Err(ApiError::Validation(format!(
                "Field 'price' must be a non-negative number, got '{}'",
                price_text
            )));
        }

        Ok(NewListing {
            name,
            // "-0" parses to negative zero; store it as plain zero
            price: if price == 0.0 { 0.0 } else { price },
            currency,
            city,
            description: optional(self.description),
            contact_link: optional(self.facebook_link),
        })
    }
}
