//! Image upload route handler.
//!
//! Accepts either a multipart form with a `file` field or a JSON body
//! carrying a base64 `data:` URL. Either way the image is optimized and
//! stored under a generated unique name; the response is its public URL.

use axum::{
    Json, Router,
    extract::{FromRequest, Multipart, Request, State},
    http::header::CONTENT_TYPE,
    routing::post,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::ApiError;
use crate::middleware::RequireAuth;
use crate::services::image::{DataUrl, OptimizeOptions, OutputFormat, optimize};
use crate::state::AppState;
use crate::storage::{PutOptions, unique_image_name};

/// Build the upload router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/upload", post(upload))
}

/// JSON upload body.
#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    /// Base64 `data:` URL of the image.
    pub image: String,
    /// Client-side filename; informational only, stored names are generated.
    #[serde(default)]
    pub filename: Option<String>,
}

/// Upload response.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
}

/// Optimize and store one image.
#[instrument(skip_all)]
pub async fn upload(
    RequireAuth(_): RequireAuth,
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<UploadResponse>, ApiError> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    let (bytes, mime_type) = if is_multipart {
        read_multipart(request, &state).await?
    } else {
        read_json(request, &state).await?
    };

    // PNG sources keep their transparency; everything else goes lossy.
    let format = if mime_type.as_deref() == Some("image/png") {
        OutputFormat::Png
    } else {
        OutputFormat::Jpeg
    };
    let optimized = optimize(
        &bytes,
        &OptimizeOptions {
            format,
            ..OptimizeOptions::default()
        },
    )?;

    let name = unique_image_name(optimized.format.extension());
    let url = state
        .blob_store()
        .put(
            &name,
            optimized.bytes,
            &PutOptions::content_type(optimized.format.content_type()),
        )
        .await?;

    tracing::info!(name = %name, width = optimized.width, height = optimized.height, "image uploaded");
    Ok(Json(UploadResponse { url }))
}

/// Pull the `file` field out of a multipart request.
async fn read_multipart(
    request: Request,
    state: &AppState,
) -> Result<(Vec<u8>, Option<String>), ApiError> {
    let mut multipart = Multipart::from_request(request, state)
        .await
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(e.to_string()))?
    {
        if field.name() == Some("file") {
            let mime_type = field.content_type().map(ToString::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::Validation(e.to_string()))?;
            return Ok((bytes.to_vec(), mime_type));
        }
    }

    Err(ApiError::Validation("no file provided".to_string()))
}

/// Decode the `data:` URL from a JSON request.
async fn read_json(
    request: Request,
    state: &AppState,
) -> Result<(Vec<u8>, Option<String>), ApiError> {
    let Json(body) = Json::<UploadRequest>::from_request(request, state)
        .await
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    if let Some(filename) = &body.filename {
        tracing::debug!(filename = %filename, "upload via data URL");
    }

    let data = DataUrl::parse(&body.image)?;
    Ok((data.bytes, Some(data.mime_type)))
}
