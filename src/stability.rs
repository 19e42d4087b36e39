use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use image::DynamicImage;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinSet};

use crate::config::{DEFAULT_STRENGTH, StabilityConfig};
use crate::decode::{self, DecodePolicy};
use crate::error::{GenerationError, Result};
use crate::image_processing;
use crate::models::{Dimensions, GenerationRequest, RasterImage, UpscaleTarget, VariantFailure};

const ACCEPT_JSON: &str = "application/json";
const ACCEPT_IMAGE: &str = "image/*";
const STABLE_IMAGE_CORE_PATH: &str = "/v2beta/stable-image/generate/core";

#[derive(Debug, Serialize)]
struct TextPrompt<'a> {
    text: &'a str,
    weight: f32,
}

#[derive(Debug, Serialize)]
struct TextToImageBody<'a> {
    text_prompts: Vec<TextPrompt<'a>>,
    cfg_scale: f32,
    width: u32,
    height: u32,
    samples: u32,
    steps: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
}

/// Images from a fan-out batch, in request order, plus the variants that failed.
#[derive(Debug, Default)]
pub struct Batch {
    pub images: Vec<RasterImage>,
    pub failures: Vec<VariantFailure>,
}

/// Client for the Stability AI REST API.
#[derive(Debug, Clone)]
pub struct StabilityClient {
    http: Client,
    config: Arc<StabilityConfig>,
}

impl StabilityClient {
    pub fn new(config: StabilityConfig) -> Result<Self> {
        let http = Client::builder().build()?;
        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &StabilityConfig {
        &self.config
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key().is_ok()
    }

    fn api_key(&self) -> Result<&str> {
        self.config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(GenerationError::MissingApiKey)
    }

    fn engine_url(&self, engine: &str, operation: &str) -> String {
        format!(
            "{}/v1/generation/{engine}/{operation}",
            self.config.api_host
        )
    }

    fn post(&self, url: &str, api_key: &str, accept: &str, timeout: Duration) -> RequestBuilder {
        self.http
            .post(url)
            .bearer_auth(api_key)
            .header(ACCEPT, accept)
            .timeout(timeout)
    }

    /// Generates `request.sample_count` variants of `prompt`, one API call per
    /// variant, at most `max_concurrency` in flight.
    pub async fn generate(&self, prompt: &str, request: &GenerationRequest) -> Result<Batch> {
        self.api_key()?;
        request.validate()?;

        let total = request.sample_count as usize;
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut join_set = JoinSet::new();
        let mut task_index = HashMap::with_capacity(total);

        for index in 0..total {
            let client = self.clone();
            let semaphore = semaphore.clone();
            let prompt = prompt.to_string();
            let mut variant = request.clone();
            variant.seed = request.seed.map(|seed| seed + index as u64);
            let handle = join_set.spawn(async move {
                match semaphore.acquire_owned().await {
                    Ok(_permit) => client.generate_one(&prompt, &variant).await,
                    Err(_) => Err(GenerationError::Image("worker pool closed".into())),
                }
            });
            task_index.insert(handle.id(), index);
        }

        let slots = join_in_order(join_set, &task_index, total).await;

        let mut batch = Batch::default();
        for (index, slot) in slots.into_iter().enumerate() {
            match slot {
                Ok(images) => batch.images.extend(images),
                Err(error) => {
                    tracing::warn!("variant {index} failed: {error}");
                    batch.failures.push(VariantFailure { index, error });
                }
            }
        }
        Ok(batch)
    }

    /// One text-to-image call. Pixel sizes go to the engine endpoint, aspect
    /// ratio tokens to the stable-image endpoint.
    pub async fn generate_one(
        &self,
        prompt: &str,
        request: &GenerationRequest,
    ) -> Result<Vec<RasterImage>> {
        let api_key = self.api_key()?;
        let negative = request.negative_prompt();
        let timeout = self.config.generate_timeout;

        let builder = match &request.dimensions {
            Dimensions::Size { width, height } => {
                let mut text_prompts = vec![TextPrompt { text: prompt, weight: 1.0 }];
                if let Some(negative) = negative {
                    text_prompts.push(TextPrompt { text: negative, weight: -1.0 });
                }
                let body = TextToImageBody {
                    text_prompts,
                    cfg_scale: request.cfg_scale,
                    width: *width,
                    height: *height,
                    samples: 1,
                    steps: request.steps,
                    seed: request.seed,
                };
                let url = self.engine_url(&self.config.engine_id, "text-to-image");
                tracing::debug!(%url, width, height, "text-to-image request");
                self.post(&url, api_key, ACCEPT_JSON, timeout).json(&body)
            }
            Dimensions::AspectRatio(token) => {
                let mut form = Form::new()
                    .text("prompt", prompt.to_string())
                    .text("aspect_ratio", token.clone())
                    .text("output_format", "png");
                if let Some(negative) = negative {
                    form = form.text("negative_prompt", negative.to_string());
                }
                if let Some(seed) = request.seed {
                    form = form.text("seed", seed.to_string());
                }
                let url = format!("{}{STABLE_IMAGE_CORE_PATH}", self.config.api_host);
                tracing::debug!(%url, aspect_ratio = %token, "stable-image core request");
                self.post(&url, api_key, ACCEPT_IMAGE, timeout).multipart(form)
            }
        };

        let response = builder.send().await?;
        read_images(response, self.config.decode_policy).await
    }

    /// Image-to-image generation guided by `init`.
    pub async fn transform(
        &self,
        prompt: &str,
        request: &GenerationRequest,
        init: &DynamicImage,
    ) -> Result<Vec<RasterImage>> {
        let api_key = self.api_key()?;
        request.validate()?;

        let strength = request.strength.unwrap_or(DEFAULT_STRENGTH);
        let form = conditioned_form(prompt, request)
            .part("init_image", png_part(init, "init.png")?)
            .text("init_image_mode", "IMAGE_STRENGTH")
            .text("image_strength", strength.to_string());

        let url = self.engine_url(&self.config.engine_id, "image-to-image");
        tracing::debug!(%url, strength, samples = request.sample_count, "image-to-image request");
        let response = self
            .post(&url, api_key, ACCEPT_JSON, self.config.generate_timeout)
            .multipart(form)
            .send()
            .await?;
        read_images(response, self.config.decode_policy).await
    }

    /// Regenerates the regions of `init` that are white in `mask`.
    pub async fn inpaint(
        &self,
        prompt: &str,
        request: &GenerationRequest,
        init: &DynamicImage,
        mask: &DynamicImage,
    ) -> Result<Vec<RasterImage>> {
        let api_key = self.api_key()?;
        request.validate()?;

        let form = conditioned_form(prompt, request)
            .part("init_image", png_part(init, "init.png")?)
            .part("mask_image", png_part(mask, "mask.png")?)
            .text("mask_source", "MASK_IMAGE_WHITE");

        let url = self.engine_url(&self.config.engine_id, "image-to-image/masking");
        tracing::debug!(%url, samples = request.sample_count, "masking request");
        let response = self
            .post(&url, api_key, ACCEPT_JSON, self.config.generate_timeout)
            .multipart(form)
            .send()
            .await?;
        read_images(response, self.config.decode_policy).await
    }

    pub async fn upscale(
        &self,
        image: &DynamicImage,
        target: UpscaleTarget,
    ) -> Result<RasterImage> {
        let api_key = self.api_key()?;

        let mut form = Form::new().part("image", png_part(image, "image.png")?);
        form = match target {
            UpscaleTarget::Native => form,
            UpscaleTarget::Width(width) => form.text("width", width.to_string()),
            UpscaleTarget::Height(height) => form.text("height", height.to_string()),
        };

        let url = self.engine_url(&self.config.upscale_engine_id, "image-to-image/upscale");
        tracing::debug!(%url, ?target, "upscale request");
        let response = self
            .post(&url, api_key, ACCEPT_JSON, self.config.upscale_timeout)
            .multipart(form)
            .send()
            .await?;
        read_images(response, self.config.decode_policy)
            .await?
            .into_iter()
            .next()
            .ok_or(GenerationError::EmptyResponse)
    }
}

/// Collects task results into request order. A task that panicked or was
/// cancelled yields an error in its own slot.
async fn join_in_order<T: 'static>(
    mut join_set: JoinSet<Result<T>>,
    task_index: &HashMap<Id, usize>,
    total: usize,
) -> Vec<Result<T>> {
    let mut slots: Vec<Option<Result<T>>> = std::iter::repeat_with(|| None).take(total).collect();
    while let Some(joined) = join_set.join_next_with_id().await {
        let (id, result) = match joined {
            Ok((id, result)) => (id, result),
            Err(err) => {
                let error = GenerationError::Image(format!("generation task failed: {err}"));
                (err.id(), Err(error))
            }
        };
        if let Some(slot) = task_index.get(&id).and_then(|&index| slots.get_mut(index)) {
            *slot = Some(result);
        }
    }
    slots
        .into_iter()
        .map(|slot| {
            slot.unwrap_or_else(|| {
                Err(GenerationError::Image("generation task missing result".into()))
            })
        })
        .collect()
}

/// Text fields shared by the image-conditioned engine endpoints.
fn conditioned_form(prompt: &str, request: &GenerationRequest) -> Form {
    let mut form = Form::new()
        .text("text_prompts[0][text]", prompt.to_string())
        .text("text_prompts[0][weight]", "1");
    if let Some(negative) = request.negative_prompt() {
        form = form
            .text("text_prompts[1][text]", negative.to_string())
            .text("text_prompts[1][weight]", "-1");
    }
    form = form
        .text("cfg_scale", request.cfg_scale.to_string())
        .text("samples", request.sample_count.to_string())
        .text("steps", request.steps.to_string());
    if let Some(seed) = request.seed {
        form = form.text("seed", seed.to_string());
    }
    form
}

fn png_part(image: &DynamicImage, file_name: &'static str) -> Result<Part> {
    let bytes = image_processing::encode_png(image)
        .map_err(|err| GenerationError::Image(err.to_string()))?;
    Ok(Part::bytes(bytes).file_name(file_name).mime_str("image/png")?)
}

async fn assert_ok_response(response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(status, %body, "Stability AI request rejected");
    Err(GenerationError::Api { status, body })
}

async fn read_images(response: Response, policy: DecodePolicy) -> Result<Vec<RasterImage>> {
    let response = assert_ok_response(response).await?;
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let body = response.bytes().await?;
    let images = decode::decode_body(&body, content_type.as_deref(), policy)?;
    tracing::debug!(count = images.len(), "decoded response images");
    Ok(images)
}
