use image::DynamicImage;
use rmcp::ErrorData as McpError;

use crate::{image_processing, tools::validate_http_url};

/// Downloads a source image and normalizes it to RGB/RGBA before upload.
pub async fn fetch_source_image(raw_url: &str) -> Result<DynamicImage, McpError> {
    let validated_url = validate_http_url(raw_url)?;
    let response = reqwest::get(validated_url.as_str()).await.map_err(|err| {
        McpError::internal_error(
            "fetch image failed",
            Some(serde_json::Value::String(err.to_string())),
        )
    })?;
    let status = response.status();
    if !status.is_success() {
        return Err(McpError::internal_error(
            "fetch image failed",
            Some(serde_json::Value::String(format!("HTTP {status}"))),
        ));
    }
    let mime_from_header = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.split(';').next().unwrap_or(value).trim().to_string());
    let bytes = response.bytes().await.map_err(|err| {
        McpError::internal_error(
            "read image bytes failed",
            Some(serde_json::Value::String(err.to_string())),
        )
    })?;

    let image = image_processing::load_image(bytes.as_ref(), mime_from_header.as_deref())
        .map_err(|err| {
            McpError::invalid_params(
                "source is not a supported image",
                Some(serde_json::Value::String(err.to_string())),
            )
        })?;
    tracing::debug!(
        url = %validated_url,
        width = image.width(),
        height = image.height(),
        "fetched source image"
    );
    Ok(image_processing::normalize_color(image))
}
