use rmcp::{
    ErrorData as McpError,
    handler::server::wrapper::Parameters,
    model::CallToolResult,
    schemars::JsonSchema,
};
use serde::Deserialize;

use crate::{
    cache::LocalFileStorage,
    config::DEFAULT_STRENGTH,
    models::GenerationRequest,
    studio::Studio,
    tools::{generation_error, render_tool_result, source_image::fetch_source_image},
};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TransformImageRequest {
    #[schemars(description = "URL of the source image")]
    pub image_url: String,
    #[schemars(description = "How the image should change")]
    pub prompt: String,
    pub negative_prompt: Option<String>,
    #[schemars(description = "Style preset name, see list_styles")]
    pub style: Option<String>,
    #[schemars(description = "Influence of the source image, 0-1. Default 0.8")]
    pub strength: Option<f32>,
    #[schemars(description = "Number of images, 1-10. Default 1")]
    pub samples: Option<u32>,
    pub seed: Option<u64>,
    pub steps: Option<u32>,
    pub cfg_scale: Option<f32>,
}

impl TransformImageRequest {
    pub fn to_generation_request(&self) -> Result<GenerationRequest, McpError> {
        let mut builder = GenerationRequest::builder(self.prompt.clone())
            .strength(self.strength.unwrap_or(DEFAULT_STRENGTH))
            .sample_count(self.samples.unwrap_or(1))
            .quality_boost(false);
        if let Some(style) = &self.style {
            builder = builder.style(style.clone());
        }
        if let Some(negative_prompt) = &self.negative_prompt {
            builder = builder.negative_prompt(negative_prompt.clone());
        }
        if let Some(seed) = self.seed {
            builder = builder.seed(seed);
        }
        if let Some(steps) = self.steps {
            builder = builder.steps(steps);
        }
        if let Some(cfg_scale) = self.cfg_scale {
            builder = builder.cfg_scale(cfg_scale);
        }
        builder
            .build()
            .map_err(|err| generation_error("invalid transform request", err))
    }
}

pub async fn transform_image(
    studio: &Studio,
    storage: &LocalFileStorage,
    Parameters(request): Parameters<TransformImageRequest>,
) -> Result<CallToolResult, McpError> {
    let generation = request.to_generation_request()?;
    let init = fetch_source_image(&request.image_url).await?;
    let result = studio
        .transform(generation, &init)
        .await
        .map_err(|err| generation_error("transform image failed", err))?;
    let text = format!("Transformed into {} image(s).", result.images.len());
    render_tool_result(storage, result, &text).await
}
