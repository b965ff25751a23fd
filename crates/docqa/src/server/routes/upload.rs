//! Document upload endpoint

use axum::{
    extract::{Multipart, State},
    Json,
};

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::UploadResponse;

/// Message returned for every successful upload
pub const UPLOAD_MESSAGE: &str = "File uploaded and text extracted successfully :)";

/// POST /upload - multipart field `file`
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::MissingInput(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| Error::MissingInput(format!("Failed to read '{}': {}", filename, e)))?;

        let outcome = state.pipeline().ingest_upload(&filename, &data).await?;
        tracing::info!(
            "Upload of '{}' done (new corpus: {})",
            outcome.document().filename,
            outcome.built()
        );
        return Ok(Json(UploadResponse::new(UPLOAD_MESSAGE)));
    }

    Err(Error::MissingInput("No file provided".to_string()))
}
