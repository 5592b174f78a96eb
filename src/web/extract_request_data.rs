use axum::extract::Multipart;
use axum::extract::multipart::Field;
use tracing::{debug, warn};

use super::error::ApiError;
use super::models::{ImageUpload, ListingForm};
use crate::image_intake::UploadError;

const IMAGE_FIELD: &str = "image";

/// Splits a create request into its text fields and the optional image part.
///
/// The image is buffered in memory but never beyond `max_image_bytes`; once a
/// part grows past the limit the request is refused without reading the rest.
pub async fn extract_listing_form(
    mut multipart: Multipart,
    max_image_bytes: usize,
) -> Result<(ListingForm, Option<ImageUpload>), ApiError> {
    let mut form = ListingForm::default();
    let mut image: Option<ImageUpload> = None;
    let mut ignored_fields = 0;

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or("unnamed").to_string();

        if field_name == IMAGE_FIELD {
            if image.is_some() {
                warn!("Multiple '{}' fields found in multipart request, using the last one", IMAGE_FIELD);
            }
            image = read_image_field(field, max_image_bytes).await?;
            continue;
        }

        let slot = match field_name.as_str() {
            "name" => &mut form.name,
            "price" => &mut form.price,
            "currency" => &mut form.currency,
            "city" => &mut form.city,
            "description" => &mut form.description,
            "facebookLink" => &mut form.facebook_link,
            _ => {
                debug!("Ignoring multipart field: {}", field_name);
                ignored_fields += 1;
                continue;
            }
        };
        *slot = Some(field.text().await?);
    }

    if ignored_fields > 0 {
        debug!("Ignored {} unknown fields in multipart request", ignored_fields);
    }

    Ok((form, image))
}

// Browsers send an empty, nameless file part when no file was chosen; that counts
// as "no image" rather than an invalid one.
async fn read_image_field(
    mut field: Field<'_>,
    max_image_bytes: usize,
) -> Result<Option<ImageUpload>, ApiError> {
    let content_type = field.content_type().map(str::to_string);
    let file_name = field
        .file_name()
        .map(str::to_string)
        .filter(|name| !name.is_empty());
    debug!(
        "Received image part: file_name={:?}, content_type={:?}",
        file_name, content_type
    );

    let mut bytes = Vec::new();
    while let Some(chunk) = field.chunk().await? {
        if bytes.len() + chunk.len() > max_image_bytes {
            return Err(UploadError::TooLarge {
                size: bytes.len() + chunk.len(),
                limit: max_image_bytes,
            }
            .into());
        }
        bytes.extend_from_slice(&chunk);
    }

    if bytes.is_empty() && file_name.is_none() {
        debug!("Image part is empty and unnamed, treating as absent");
        return Ok(None);
    }

    Ok(Some(ImageUpload {
        bytes,
        content_type,
        file_name,
    }))
}
