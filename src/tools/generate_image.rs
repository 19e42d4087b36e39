use rmcp::{
    ErrorData as McpError,
    handler::server::wrapper::Parameters,
    model::CallToolResult,
    schemars::JsonSchema,
};
use serde::Deserialize;

use crate::{
    cache::LocalFileStorage,
    models::{Dimensions, GenerationRequest},
    studio::Studio,
    tools::{generation_error, render_tool_result},
};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GenerateImageRequest {
    #[schemars(description = "Description of the image")]
    pub prompt: String,
    #[schemars(description = "Things that should not appear in the image")]
    pub negative_prompt: Option<String>,
    #[schemars(description = "Style preset name, see list_styles. Default None")]
    pub style: Option<String>,
    #[schemars(description = "Aspect ratio label or token: 1:1, 9:16, 16:9, 21:9. Default 1:1")]
    pub aspect_ratio: Option<String>,
    #[schemars(description = "Output width in pixels; requires height")]
    pub width: Option<u32>,
    #[schemars(description = "Output height in pixels; requires width")]
    pub height: Option<u32>,
    #[schemars(description = "Number of variants to generate, 1-10. Default 1")]
    pub num_variants: Option<u32>,
    pub seed: Option<u64>,
    #[schemars(description = "Sampling steps, engine endpoint only")]
    pub steps: Option<u32>,
    #[schemars(description = "Prompt adherence, engine endpoint only")]
    pub cfg_scale: Option<f32>,
    #[schemars(description = "Append quality keywords to the prompt. Default true")]
    pub quality_boost: Option<bool>,
}

impl GenerateImageRequest {
    fn dimensions(&self) -> Result<Dimensions, McpError> {
        match (self.width, self.height) {
            (Some(width), Some(height)) => Ok(Dimensions::Size { width, height }),
            (None, None) => Ok(Dimensions::aspect_ratio(
                self.aspect_ratio.as_deref().unwrap_or("1:1"),
            )),
            _ => Err(McpError::invalid_params(
                "width and height must be given together",
                None,
            )),
        }
    }

    pub fn into_generation_request(self) -> Result<GenerationRequest, McpError> {
        let mut builder = GenerationRequest::builder(self.prompt.clone())
            .dimensions(self.dimensions()?)
            .sample_count(self.num_variants.unwrap_or(1))
            .quality_boost(self.quality_boost.unwrap_or(true));
        if let Some(style) = self.style {
            builder = builder.style(style);
        }
        if let Some(negative_prompt) = self.negative_prompt {
            builder = builder.negative_prompt(negative_prompt);
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
            .map_err(|err| generation_error("invalid generation request", err))
    }
}

pub async fn generate_image(
    studio: &Studio,
    storage: &LocalFileStorage,
    Parameters(request): Parameters<GenerateImageRequest>,
) -> Result<CallToolResult, McpError> {
    let request = request.into_generation_request()?;
    tracing::info!(
        style = %request.style,
        dimensions = %request.dimensions,
        variants = request.sample_count,
        "generate_image"
    );
    let result = studio
        .generate(request)
        .await
        .map_err(|err| generation_error("generate image failed", err))?;
    let text = format!("Generated {} image(s).", result.images.len());
    render_tool_result(storage, result, &text).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> GenerateImageRequest {
        GenerateImageRequest {
            prompt: "a red fox".into(),
            negative_prompt: None,
            style: Some("Photorealistic".into()),
            aspect_ratio: Some("Landscape (16:9)".into()),
            width: None,
            height: None,
            num_variants: Some(2),
            seed: None,
            steps: None,
            cfg_scale: None,
            quality_boost: None,
        }
    }

    #[test]
    fn maps_label_to_aspect_ratio_token() {
        let request = request().into_generation_request().unwrap();
        assert_eq!(request.dimensions, Dimensions::AspectRatio("16:9".into()));
        assert_eq!(request.sample_count, 2);
        assert_eq!(request.style, "Photorealistic");
    }

    #[test]
    fn explicit_size_wins_over_aspect_ratio() {
        let mut raw = request();
        raw.width = Some(1024);
        raw.height = Some(1024);
        let request = raw.into_generation_request().unwrap();
        assert_eq!(request.dimensions, Dimensions::Size { width: 1024, height: 1024 });
    }

    #[test]
    fn half_a_size_is_rejected() {
        let mut raw = request();
        raw.width = Some(512);
        assert!(raw.into_generation_request().is_err());
    }
}
