//! Turns API response bodies into decoded images.
//!
//! The API answers either with the image bytes themselves (`Accept: image/*`)
//! or with a JSON envelope holding base64 encoded artifacts.

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{GenerationError, Result};
use crate::image_processing;
use crate::models::RasterImage;

const BASE64_ENGINE: base64::engine::GeneralPurpose = base64::engine::GeneralPurpose::new(
    &base64::alphabet::STANDARD,
    base64::engine::GeneralPurposeConfig::new()
        .with_decode_padding_mode(base64::engine::DecodePaddingMode::Indifferent),
);

/// What to do with an artifact whose payload is missing or unreadable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DecodePolicy {
    /// Skip it and keep the rest of the batch.
    #[default]
    Lenient,
    /// Fail the whole response.
    Strict,
}

impl FromStr for DecodePolicy {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(DecodePolicy::Lenient),
            "strict" => Ok(DecodePolicy::Strict),
            other => Err(format!("unknown decode policy: {other}")),
        }
    }
}

impl fmt::Display for DecodePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodePolicy::Lenient => f.write_str("lenient"),
            DecodePolicy::Strict => f.write_str("strict"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ArtifactsEnvelope {
    #[serde(default)]
    artifacts: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct RawArtifact {
    base64: Option<String>,
    seed: Option<u64>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

/// Decodes a response body, picking the JSON or raw path from the content
/// type, or from the body's magic bytes when the header says nothing useful.
pub fn decode_body(
    body: &[u8],
    content_type: Option<&str>,
    policy: DecodePolicy,
) -> Result<Vec<RasterImage>> {
    let mime = content_type
        .map(|value| value.split(';').next().unwrap_or(value).trim().to_ascii_lowercase());
    match mime.as_deref() {
        Some(mime) if mime.contains("json") => decode_artifacts(body, policy),
        Some(mime) if mime.starts_with("image/") => Ok(vec![decode_raw(body, Some(mime))?]),
        _ if image_processing::detect_mime_type(body).is_some() => {
            Ok(vec![decode_raw(body, None)?])
        }
        _ => decode_artifacts(body, policy),
    }
}

pub fn decode_raw(body: &[u8], mime: Option<&str>) -> Result<RasterImage> {
    let image = image_processing::load_image(body, mime)
        .map_err(|err| GenerationError::Decode(err.to_string()))?;
    Ok(RasterImage::new(image))
}

/// Decodes every artifact of a JSON envelope, in the order the server sent them.
pub fn decode_artifacts(body: &[u8], policy: DecodePolicy) -> Result<Vec<RasterImage>> {
    let envelope: ArtifactsEnvelope = serde_json::from_slice(body)?;
    let mut images = Vec::with_capacity(envelope.artifacts.len());

    for (index, entry) in envelope.artifacts.into_iter().enumerate() {
        match decode_artifact(entry) {
            Ok(image) => images.push(image),
            Err(err) => match policy {
                DecodePolicy::Strict => {
                    return Err(GenerationError::Decode(format!("artifact {index}: {err}")));
                }
                DecodePolicy::Lenient => {
                    tracing::warn!("skipping artifact {index}: {err}");
                }
            },
        }
    }

    Ok(images)
}

fn decode_artifact(entry: Value) -> std::result::Result<RasterImage, String> {
    let artifact: RawArtifact = serde_json::from_value(entry).map_err(|err| err.to_string())?;
    let encoded = artifact
        .base64
        .filter(|value| !value.is_empty())
        .ok_or_else(|| "missing base64 payload".to_string())?;
    let bytes = BASE64_ENGINE
        .decode(encoded.trim())
        .map_err(|err| format!("invalid base64: {err}"))?;
    let image = image_processing::load_image(&bytes, None).map_err(|err| err.to_string())?;
    Ok(RasterImage {
        image,
        seed: artifact.seed,
        finish_reason: artifact.finish_reason,
    })
}
