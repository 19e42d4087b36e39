pub mod generate_image;
pub mod inpaint_image;
pub mod list_history;
pub mod list_styles;
pub mod source_image;
pub mod transform_image;
pub mod upscale_image;
pub mod url_validation;

use base64::Engine;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use crate::{
    cache::LocalFileStorage,
    error::GenerationError,
    models::GenerationResult,
    render::{self, PublishedImage},
};

#[derive(Serialize)]
pub struct ToolResponse {
    pub images: Vec<PublishedImage>,
    pub prompt: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_variants: Vec<VariantError>,
    pub text: String,
}

#[derive(Serialize)]
pub struct VariantError {
    pub index: usize,
    pub message: String,
}

pub use generate_image::{GenerateImageRequest, generate_image};
pub use inpaint_image::{InpaintImageRequest, inpaint_image};
pub use list_history::list_history;
pub use list_styles::list_styles;
pub use transform_image::{TransformImageRequest, transform_image};
pub use upscale_image::{UpscaleImageRequest, upscale_image};
pub use url_validation::validate_http_url;

pub(crate) fn generation_error(context: &'static str, err: GenerationError) -> McpError {
    let detail = Some(serde_json::Value::String(err.to_string()));
    if err.is_invalid_input() {
        McpError::invalid_params(context, detail)
    } else {
        McpError::internal_error(context, detail)
    }
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<String, McpError> {
    serde_json::to_string(value).map_err(|err| {
        McpError::internal_error(
            "serialize tool response failed",
            Some(serde_json::Value::String(err.to_string())),
        )
    })
}

/// Publishes the images of a result to the cache and describes them. When the
/// cache cannot be written the PNGs are returned inline instead.
pub(crate) async fn render_tool_result(
    storage: &LocalFileStorage,
    result: GenerationResult,
    text: &str,
) -> Result<CallToolResult, McpError> {
    let failed_variants: Vec<VariantError> = result
        .failures
        .iter()
        .map(|failure| VariantError {
            index: failure.index,
            message: failure.error.to_string(),
        })
        .collect();

    match render::publish_result(storage, &result).await {
        Ok(images) => {
            let response = ToolResponse {
                images,
                prompt: result.enhanced_prompt,
                failed_variants,
                text: text.to_string(),
            };
            Ok(CallToolResult::success(vec![Content::text(to_json(&response)?)]))
        }
        Err(err) => {
            tracing::warn!("publishing results failed, returning inline images: {err}");
            let encoded = render::encode_result(&result).map_err(|err| {
                McpError::internal_error(
                    "encode image failed",
                    Some(serde_json::Value::String(err.to_string())),
                )
            })?;
            let response = ToolResponse {
                images: Vec::new(),
                prompt: result.enhanced_prompt,
                failed_variants,
                text: text.to_string(),
            };
            let mut contents: Vec<Content> = encoded
                .into_iter()
                .map(|(_, png)| {
                    let base64_image = base64::engine::general_purpose::STANDARD.encode(png);
                    Content::image(base64_image, "image/png")
                })
                .collect();
            contents.push(Content::text(to_json(&response)?));
            Ok(CallToolResult::success(contents))
        }
    }
}
