use rmcp::{
    ErrorData as McpError,
    handler::server::wrapper::Parameters,
    model::CallToolResult,
    schemars::JsonSchema,
};
use image::{DynamicImage, GenericImageView};
use serde::Deserialize;

use crate::{
    cache::LocalFileStorage,
    models::GenerationRequest,
    studio::Studio,
    tools::{generation_error, render_tool_result, source_image::fetch_source_image},
};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct InpaintImageRequest {
    #[schemars(description = "URL of the image to edit")]
    pub image_url: String,
    #[schemars(description = "URL of the mask; white areas are regenerated")]
    pub mask_url: String,
    #[schemars(description = "What to paint into the masked area")]
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub style: Option<String>,
    pub samples: Option<u32>,
    pub seed: Option<u64>,
    pub steps: Option<u32>,
    pub cfg_scale: Option<f32>,
}

impl InpaintImageRequest {
    pub fn to_generation_request(&self) -> Result<GenerationRequest, McpError> {
        let mut builder = GenerationRequest::builder(self.prompt.clone())
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
            .map_err(|err| generation_error("invalid inpaint request", err))
    }
}

fn ensure_same_dimensions(init: &DynamicImage, mask: &DynamicImage) -> Result<(), McpError> {
    if init.dimensions() == mask.dimensions() {
        return Ok(());
    }
    Err(McpError::invalid_params(
        "mask must have the same dimensions as the image",
        Some(serde_json::Value::String(format!(
            "image {}x{}, mask {}x{}",
            init.width(),
            init.height(),
            mask.width(),
            mask.height()
        ))),
    ))
}

pub async fn inpaint_image(
    studio: &Studio,
    storage: &LocalFileStorage,
    Parameters(request): Parameters<InpaintImageRequest>,
) -> Result<CallToolResult, McpError> {
    let generation = request.to_generation_request()?;
    let (init, mask) = tokio::try_join!(
        fetch_source_image(&request.image_url),
        fetch_source_image(&request.mask_url),
    )?;
    ensure_same_dimensions(&init, &mask)?;

    let result = studio
        .inpaint(generation, &init, &mask)
        .await
        .map_err(|err| generation_error("inpaint image failed", err))?;
    let text = format!("Inpainted {} image(s).", result.images.len());
    render_tool_result(storage, result, &text).await
}

#[cfg(test)]
mod tests {
    use image::RgbImage;
    use rmcp::model::ErrorCode;

    use super::*;

    fn blank(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::new(width, height))
    }

    #[test]
    fn maps_without_quality_boost_or_strength() {
        let request = InpaintImageRequest {
            image_url: "http://localhost/a.png".into(),
            mask_url: "http://localhost/m.png".into(),
            prompt: "a hat".into(),
            negative_prompt: Some("blur".into()),
            style: Some("Sketch".into()),
            samples: Some(2),
            seed: None,
            steps: None,
            cfg_scale: None,
        };
        let generation = request.to_generation_request().unwrap();
        assert!(!generation.quality_boost);
        assert_eq!(generation.strength, None);
        assert_eq!(generation.style, "Sketch");
        assert_eq!(generation.negative_prompt(), Some("blur"));
        assert_eq!(generation.sample_count, 2);
    }

    #[test]
    fn mask_must_match_image_size() {
        assert!(ensure_same_dimensions(&blank(8, 6), &blank(8, 6)).is_ok());
        let err = ensure_same_dimensions(&blank(8, 6), &blank(6, 8)).unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    }
}
