//! Request extractors.

use axum::{
    extract::{FromRequestParts, Multipart},
    http::request::Parts,
};
use buddy_common::AppError;
use buddy_core::ImageUpload;
use buddy_db::entities::user;

/// Authenticated user extractor.
///
/// The user is placed in the request extensions by the auth middleware.
#[derive(Debug, Clone)]
pub struct AuthUser(pub user::Model);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<user::Model>()
            .cloned()
            .map(AuthUser)
            .ok_or(AppError::Unauthorized)
    }
}

/// Text fields and at most one image read from a multipart body.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: Vec<(String, String)>,
    pub image: Option<ImageUpload>,
}

impl MultipartForm {
    /// Read every part. The part named `image_field` is kept as the image,
    /// all others are read as text.
    pub async fn read(mut multipart: Multipart, image_field: &str) -> Result<Self, AppError> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
        {
            let name = field.name().unwrap_or("").to_string();

            if name == image_field {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?
                    .to_vec();
                if !data.is_empty() {
                    form.image = Some(ImageUpload {
                        filename,
                        content_type,
                        data,
                    });
                }
            } else {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                form.fields.push((name, text));
            }
        }

        Ok(form)
    }

    /// Value of a text field, if sent.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }
}
