use std::fmt;

use chrono::{DateTime, Utc};
use image::{DynamicImage, GenericImageView};
use serde::Serialize;

use crate::config::{self, DEFAULT_CFG_SCALE, DEFAULT_STEPS, MAX_SAMPLES, MAX_SEED, NO_STYLE};
use crate::error::{GenerationError, Result};
use crate::image_processing;

/// Output size: explicit pixels for the engine endpoints, or an aspect-ratio
/// token for the stable-image endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimensions {
    Size { width: u32, height: u32 },
    AspectRatio(String),
}

impl Dimensions {
    /// Resolves a display label or token; unknown values fall back to `1:1`.
    pub fn aspect_ratio(value: &str) -> Self {
        let token = config::find_aspect_ratio(value)
            .map(|ratio| ratio.token)
            .unwrap_or("1:1");
        Dimensions::AspectRatio(token.to_string())
    }

    /// Pixel size for a display label or token, `1024x1024` when unknown.
    pub fn size_for(value: &str) -> Self {
        let (width, height) = config::find_aspect_ratio(value)
            .map(|ratio| (ratio.width, ratio.height))
            .unwrap_or((1024, 1024));
        Dimensions::Size { width, height }
    }
}

impl Default for Dimensions {
    fn default() -> Self {
        Dimensions::AspectRatio("1:1".to_string())
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimensions::Size { width, height } => write!(f, "{width}x{height}"),
            Dimensions::AspectRatio(token) => write!(f, "{token}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    Generate,
    Transform,
    Inpaint,
    Upscale,
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GenerationMode::Generate => "generate",
            GenerationMode::Transform => "transform",
            GenerationMode::Inpaint => "inpaint",
            GenerationMode::Upscale => "upscale",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub style: String,
    pub dimensions: Dimensions,
    pub sample_count: u32,
    /// How far image-conditioned modes may drift from the source, 0..=1.
    pub strength: Option<f32>,
    pub seed: Option<u64>,
    pub steps: u32,
    pub cfg_scale: f32,
    pub quality_boost: bool,
}

impl GenerationRequest {
    pub fn builder(prompt: impl Into<String>) -> GenerationRequestBuilder {
        GenerationRequestBuilder::new(prompt)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_count == 0 || self.sample_count > MAX_SAMPLES {
            return Err(GenerationError::InvalidRequest(format!(
                "sample count must be between 1 and {MAX_SAMPLES}, got {}",
                self.sample_count
            )));
        }
        // Variant i is sent with seed + i, so the last one must stay in range.
        if let Some(seed) = self.seed {
            let last = seed.checked_add(u64::from(self.sample_count - 1));
            if last.is_none_or(|last| last > MAX_SEED) {
                return Err(GenerationError::InvalidRequest(format!(
                    "seed {seed} with {} samples exceeds the maximum seed {MAX_SEED}",
                    self.sample_count
                )));
            }
        }
        if let Some(strength) = self.strength {
            if !(0.0..=1.0).contains(&strength) {
                return Err(GenerationError::InvalidRequest(format!(
                    "strength must be within [0, 1], got {strength}"
                )));
            }
        }
        if let Dimensions::Size { width, height } = self.dimensions {
            if width == 0 || height == 0 {
                return Err(GenerationError::InvalidRequest(
                    "width and height must be non-zero".into(),
                ));
            }
        }
        Ok(())
    }

    /// Negative prompt with surrounding whitespace removed, `None` when blank.
    pub fn negative_prompt(&self) -> Option<&str> {
        self.negative_prompt
            .as_deref()
            .map(str::trim)
            .filter(|neg| !neg.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct GenerationRequestBuilder {
    request: GenerationRequest,
}

impl GenerationRequestBuilder {
    fn new(prompt: impl Into<String>) -> Self {
        Self {
            request: GenerationRequest {
                prompt: prompt.into(),
                negative_prompt: None,
                style: NO_STYLE.to_string(),
                dimensions: Dimensions::default(),
                sample_count: 1,
                strength: None,
                seed: None,
                steps: DEFAULT_STEPS,
                cfg_scale: DEFAULT_CFG_SCALE,
                quality_boost: true,
            },
        }
    }

    pub fn negative_prompt(mut self, negative_prompt: impl Into<String>) -> Self {
        self.request.negative_prompt = Some(negative_prompt.into());
        self
    }

    pub fn style(mut self, style: impl Into<String>) -> Self {
        self.request.style = style.into();
        self
    }

    pub fn dimensions(mut self, dimensions: Dimensions) -> Self {
        self.request.dimensions = dimensions;
        self
    }

    pub fn size(self, width: u32, height: u32) -> Self {
        self.dimensions(Dimensions::Size { width, height })
    }

    pub fn aspect_ratio(self, value: &str) -> Self {
        self.dimensions(Dimensions::aspect_ratio(value))
    }

    pub fn sample_count(mut self, count: u32) -> Self {
        self.request.sample_count = count;
        self
    }

    pub fn strength(mut self, strength: f32) -> Self {
        self.request.strength = Some(strength);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.request.seed = Some(seed);
        self
    }

    pub fn steps(mut self, steps: u32) -> Self {
        self.request.steps = steps;
        self
    }

    pub fn cfg_scale(mut self, cfg_scale: f32) -> Self {
        self.request.cfg_scale = cfg_scale;
        self
    }

    pub fn quality_boost(mut self, enabled: bool) -> Self {
        self.request.quality_boost = enabled;
        self
    }

    pub fn build(self) -> Result<GenerationRequest> {
        self.request.validate()?;
        Ok(self.request)
    }
}

/// One decoded image returned by the API.
#[derive(Debug, Clone)]
pub struct RasterImage {
    pub image: DynamicImage,
    pub seed: Option<u64>,
    pub finish_reason: Option<String>,
}

impl RasterImage {
    pub fn new(image: DynamicImage) -> Self {
        Self {
            image,
            seed: None,
            finish_reason: None,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn to_png(&self) -> Result<Vec<u8>> {
        image_processing::encode_png(&self.image)
            .map_err(|err| GenerationError::Image(err.to_string()))
    }
}

/// A variant of a fan-out batch that did not produce images.
#[derive(Debug)]
pub struct VariantFailure {
    pub index: usize,
    pub error: GenerationError,
}

#[derive(Debug)]
pub struct GenerationResult {
    pub mode: GenerationMode,
    pub images: Vec<RasterImage>,
    pub request: GenerationRequest,
    pub enhanced_prompt: String,
    pub failures: Vec<VariantFailure>,
    pub created_at: DateTime<Utc>,
}

/// Target size for the upscale endpoint, which accepts at most one side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UpscaleTarget {
    #[default]
    Native,
    Width(u32),
    Height(u32),
}

impl UpscaleTarget {
    pub fn from_sides(width: Option<u32>, height: Option<u32>) -> Result<Self> {
        match (width, height) {
            (Some(_), Some(_)) => Err(GenerationError::InvalidRequest(
                "upscale accepts either width or height, not both".into(),
            )),
            (Some(width), None) => Ok(UpscaleTarget::Width(width)),
            (None, Some(height)) => Ok(UpscaleTarget::Height(height)),
            (None, None) => Ok(UpscaleTarget::Native),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let request = GenerationRequest::builder("a red fox").build().unwrap();
        assert_eq!(request.style, "None");
        assert_eq!(request.sample_count, 1);
        assert_eq!(request.steps, 30);
        assert!(request.quality_boost);
        assert_eq!(request.dimensions, Dimensions::AspectRatio("1:1".into()));
    }

    #[test]
    fn rejects_zero_samples_and_out_of_range_strength() {
        let err = GenerationRequest::builder("x").sample_count(0).build().unwrap_err();
        assert!(err.is_invalid_input());
        let err = GenerationRequest::builder("x").strength(1.5).build().unwrap_err();
        assert!(err.to_string().contains("strength"));
        assert!(GenerationRequest::builder("x").strength(0.0).build().is_ok());
    }

    #[test]
    fn seed_range_covers_every_variant() {
        let max = u64::from(u32::MAX);
        assert!(GenerationRequest::builder("x").seed(max).build().is_ok());
        assert!(GenerationRequest::builder("x").seed(max - 2).sample_count(3).build().is_ok());

        let err = GenerationRequest::builder("x")
            .seed(max - 1)
            .sample_count(3)
            .build()
            .unwrap_err();
        assert!(err.is_invalid_input());
        assert!(GenerationRequest::builder("x").seed(max + 1).build().is_err());
        assert!(GenerationRequest::builder("x").seed(u64::MAX).sample_count(2).build().is_err());
    }

    #[test]
    fn unknown_aspect_ratio_falls_back_to_square() {
        assert_eq!(
            Dimensions::aspect_ratio("Panorama"),
            Dimensions::AspectRatio("1:1".into())
        );
        assert_eq!(
            Dimensions::aspect_ratio("Wide (21:9)"),
            Dimensions::AspectRatio("21:9".into())
        );
        assert_eq!(
            Dimensions::size_for("16:9"),
            Dimensions::Size { width: 1344, height: 768 }
        );
    }

    #[test]
    fn blank_negative_prompt_is_ignored() {
        let request = GenerationRequest::builder("x").negative_prompt("  ").build().unwrap();
        assert_eq!(request.negative_prompt(), None);
    }

    #[test]
    fn raster_image_encodes_as_png() {
        let raster = RasterImage::new(DynamicImage::new_rgb8(5, 3));
        let bytes = raster.to_png().unwrap();
        assert!(bytes.starts_with(&[0x89, b'P', b'N', b'G']));
        assert_eq!(image::load_from_memory(&bytes).unwrap().dimensions(), (5, 3));
    }

    #[test]
    fn upscale_target_rejects_both_sides() {
        assert!(UpscaleTarget::from_sides(Some(2048), Some(2048)).is_err());
        assert_eq!(
            UpscaleTarget::from_sides(None, Some(2048)).unwrap(),
            UpscaleTarget::Height(2048)
        );
    }
}
