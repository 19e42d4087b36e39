use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Serialize;

use crate::cache::{LocalFileStorage, compute_hash, get_extension_from_mime_type};
use crate::image_processing;

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
struct UploadResponse {
    url: String,
    key: String,
}

fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(ErrorResponse { error: message.to_string() })).into_response()
}

/// Stores an uploaded source image and answers with the URL to pass to the
/// transform, inpaint and upscale tools.
pub async fn handle_image_upload(
    State(storage): State<Arc<LocalFileStorage>>,
    mut multipart: Multipart,
) -> Response {
    let mut upload = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("file") => {
                let file_name = field.file_name().unwrap_or("").to_string();
                match field.bytes().await {
                    Ok(data) => upload = Some((file_name, data)),
                    Err(err) => {
                        return json_error(
                            StatusCode::BAD_REQUEST,
                            &format!("failed to read file: {err}"),
                        );
                    }
                }
                break;
            }
            Ok(Some(_)) => continue,
            Ok(None) => break,
            Err(err) => {
                return json_error(
                    StatusCode::BAD_REQUEST,
                    &format!("failed to read form: {err}"),
                );
            }
        }
    }

    let Some((file_name, bytes)) = upload else {
        return json_error(StatusCode::BAD_REQUEST, "missing file field");
    };
    if bytes.is_empty() {
        return json_error(StatusCode::BAD_REQUEST, "uploaded file is empty");
    }
    let Some(mime_type) = image_processing::detect_mime_type(bytes.as_ref()) else {
        return json_error(StatusCode::BAD_REQUEST, "unsupported file type");
    };

    let ext = get_extension_from_mime_type(mime_type);
    let timestamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let hash = compute_hash(format!("upload:{timestamp}:{file_name}:{}", bytes.len()));
    let key = LocalFileStorage::get_upload_key(&hash, ext);
    if let Err(err) = storage.put(&key, bytes.as_ref()).await {
        tracing::error!("saving upload failed: {err}");
        return json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("failed to save file: {err}"),
        );
    }

    let url = storage.get_public_url(&key);
    tracing::info!(%key, size = bytes.len(), "stored upload");
    (StatusCode::OK, Json(UploadResponse { url, key })).into_response()
}
