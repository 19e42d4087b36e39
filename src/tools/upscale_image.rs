use rmcp::{
    ErrorData as McpError,
    handler::server::wrapper::Parameters,
    model::CallToolResult,
    schemars::JsonSchema,
};
use serde::Deserialize;

use crate::{
    cache::LocalFileStorage,
    models::UpscaleTarget,
    studio::Studio,
    tools::{generation_error, render_tool_result, source_image::fetch_source_image},
};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpscaleImageRequest {
    #[schemars(description = "URL of the image to upscale")]
    pub image_url: String,
    #[schemars(description = "Target width in pixels; do not combine with height")]
    pub width: Option<u32>,
    #[schemars(description = "Target height in pixels; do not combine with width")]
    pub height: Option<u32>,
}

impl UpscaleImageRequest {
    pub fn target(&self) -> Result<UpscaleTarget, McpError> {
        UpscaleTarget::from_sides(self.width, self.height)
            .map_err(|err| generation_error("invalid upscale request", err))
    }
}

pub async fn upscale_image(
    studio: &Studio,
    storage: &LocalFileStorage,
    Parameters(request): Parameters<UpscaleImageRequest>,
) -> Result<CallToolResult, McpError> {
    let target = request.target()?;
    let image = fetch_source_image(&request.image_url).await?;
    let result = studio
        .upscale(&image, target)
        .await
        .map_err(|err| generation_error("upscale image failed", err))?;
    let (width, height) = result
        .images
        .first()
        .map(|image| image.dimensions())
        .unwrap_or_default();
    let text = format!("Upscaled to {width}x{height}.");
    render_tool_result(storage, result, &text).await
}
