//! Request extractors.

use axum::{
    Form, Json,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
};
use lectern_core::item::{FileSlot, ItemFields, ItemFiles};
use lectern_core::storage::UploadFile;
use lectern_shared::AppError;

use crate::error::ApiError;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Item text fields and files from a create or edit request.
///
/// Accepts `multipart/form-data` (text parts plus `thumbnail` and `audioFile`
/// file parts), a JSON object, or a urlencoded form. The latter two carry no
/// files. A request without a body yields an empty form.
#[derive(Debug, Default)]
pub struct ItemForm {
    /// Text fields.
    pub fields: ItemFields,
    /// Attached files.
    pub files: ItemFiles,
}

impl<S> FromRequest<S> for ItemForm
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::Validation(e.body_text()))?;
            return Self::from_multipart(multipart).await;
        }

        if content_type.starts_with("application/json") {
            let Json(fields) = Json::<ItemFields>::from_request(req, state)
                .await
                .map_err(|e| AppError::Validation(e.body_text()))?;
            return Ok(Self::text_only(fields));
        }

        if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(fields) = Form::<ItemFields>::from_request(req, state)
                .await
                .map_err(|e| AppError::Validation(e.body_text()))?;
            return Ok(Self::text_only(fields));
        }

        if content_type.is_empty() {
            return Ok(Self::default());
        }

        Err(AppError::Validation(format!("unsupported content type '{content_type}'")).into())
    }
}

impl ItemForm {
    fn text_only(fields: ItemFields) -> Self {
        Self {
            fields,
            files: ItemFiles::default(),
        }
    }

    /// Collect text and file parts. Unknown parts are ignored and empty file
    /// inputs count as absent.
    async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read multipart: {e}")))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            if let Some(slot) = FileSlot::from_field_name(&name) {
                let file_name = field.file_name().map(str::to_string).unwrap_or_default();
                let content_type = field
                    .content_type()
                    .map_or_else(|| DEFAULT_CONTENT_TYPE.to_string(), str::to_string);
                let content = field.bytes().await.map_err(|e| {
                    AppError::Validation(format!("Failed to read file data: {e}"))
                })?;

                if file_name.is_empty() && content.is_empty() {
                    continue;
                }
                let file_name = if file_name.is_empty() {
                    slot.field_name().to_string()
                } else {
                    file_name
                };
                form.files
                    .set(slot, UploadFile::new(file_name, content_type, content));
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read field '{name}': {e}")))?;
                form.fields.set(&name, value);
            }
        }

        Ok(form)
    }
}
