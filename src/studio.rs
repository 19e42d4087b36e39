use std::sync::Arc;

use chrono::Utc;
use image::DynamicImage;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::models::{
    GenerationMode, GenerationRequest, GenerationResult, RasterImage, UpscaleTarget,
    VariantFailure,
};
use crate::prompt::enhance_prompt;
use crate::session::{HistoryEntry, SessionContext, SessionSnapshot};
use crate::stability::StabilityClient;

/// Runs user actions against the API and records successful ones in the
/// session. The session lock is only held while recording.
#[derive(Debug, Clone)]
pub struct Studio {
    client: StabilityClient,
    session: Arc<Mutex<SessionContext>>,
}

impl Studio {
    pub fn new(client: StabilityClient) -> Self {
        Self {
            client,
            session: Arc::new(Mutex::new(SessionContext::default())),
        }
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::from(&*self.session.lock().await)
    }

    /// Text-to-image. Variants that fail are reported in the result; the call
    /// only fails when no variant succeeded.
    pub async fn generate(&self, request: GenerationRequest) -> Result<GenerationResult> {
        let enhanced = enhance_prompt(&request.prompt, &request.style, request.quality_boost);
        let mut batch = self.client.generate(&enhanced, &request).await?;
        if batch.images.is_empty() && !batch.failures.is_empty() {
            return Err(batch.failures.remove(0).error);
        }
        self.finish(GenerationMode::Generate, request, enhanced, batch.images, batch.failures)
            .await
    }

    pub async fn transform(
        &self,
        request: GenerationRequest,
        init: &DynamicImage,
    ) -> Result<GenerationResult> {
        let enhanced = enhance_prompt(&request.prompt, &request.style, request.quality_boost);
        let images = self.client.transform(&enhanced, &request, init).await?;
        self.finish(GenerationMode::Transform, request, enhanced, images, Vec::new())
            .await
    }

    pub async fn inpaint(
        &self,
        request: GenerationRequest,
        init: &DynamicImage,
        mask: &DynamicImage,
    ) -> Result<GenerationResult> {
        let enhanced = enhance_prompt(&request.prompt, &request.style, request.quality_boost);
        let images = self.client.inpaint(&enhanced, &request, init, mask).await?;
        self.finish(GenerationMode::Inpaint, request, enhanced, images, Vec::new())
            .await
    }

    pub async fn upscale(
        &self,
        image: &DynamicImage,
        target: UpscaleTarget,
    ) -> Result<GenerationResult> {
        let upscaled = self.client.upscale(image, target).await?;
        let request = GenerationRequest::builder("upscale").quality_boost(false).build()?;
        self.finish(
            GenerationMode::Upscale,
            request,
            String::new(),
            vec![upscaled],
            Vec::new(),
        )
        .await
    }

    async fn finish(
        &self,
        mode: GenerationMode,
        request: GenerationRequest,
        enhanced_prompt: String,
        images: Vec<RasterImage>,
        failures: Vec<VariantFailure>,
    ) -> Result<GenerationResult> {
        let created_at = Utc::now();
        let entry = HistoryEntry {
            prompt: request.prompt.clone(),
            style: request.style.clone(),
            mode,
            created_at,
            image_count: images.len(),
        };
        self.session
            .lock()
            .await
            .record(entry, self.client.config().cost_per_image);
        tracing::info!(
            %mode,
            images = images.len(),
            failures = failures.len(),
            "generation finished"
        );

        Ok(GenerationResult {
            mode,
            images,
            request,
            enhanced_prompt,
            failures,
            created_at,
        })
    }
}
