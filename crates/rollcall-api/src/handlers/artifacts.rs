use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use rollcall_storage::{artifact_key, content_type_for, ArtifactKind};
use std::sync::Arc;

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

/// Download a stored QR image or screenshot
#[utoipa::path(
    get,
    path = "/api/download/{kind}/{filename}",
    tag = "artifacts",
    params(
        ("kind" = String, Path, description = "`qr` or `screenshot`"),
        ("filename" = String, Path, description = "Artifact filename")
    ),
    responses(
        (status = 200, description = "Artifact bytes", content_type = "image/png"),
        (status = 400, description = "Unknown kind or invalid filename", body = ErrorResponse),
        (status = 404, description = "Artifact not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state))]
pub async fn download_artifact(
    State(state): State<Arc<AppState>>,
    Path((kind, filename)): Path<(String, String)>,
) -> Result<impl IntoResponse, HttpAppError> {
    let kind: ArtifactKind = kind.parse()?;
    let key = artifact_key(kind, &filename)?;

    let data = state.storage.download(&key).await?;
    tracing::debug!(storage_key = %key, size_bytes = data.len(), "Serving artifact");

    Ok((
        [
            (header::CONTENT_TYPE, content_type_for(&filename).to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{}\"", filename),
            ),
            (
                header::CACHE_CONTROL,
                "public, max-age=31536000, immutable".to_string(),
            ),
        ],
        data,
    ))
}
