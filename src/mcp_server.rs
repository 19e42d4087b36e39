use std::sync::Arc;

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};

use crate::cache::LocalFileStorage;
use crate::stability::StabilityClient;
use crate::studio::Studio;
use crate::tools::{
    GenerateImageRequest, InpaintImageRequest, TransformImageRequest, UpscaleImageRequest,
};

/// One instance per MCP session, so each session gets its own history.
#[derive(Clone)]
pub struct ImageStudioServer {
    tool_router: ToolRouter<Self>,
    studio: Studio,
    storage: Arc<LocalFileStorage>,
}

impl ImageStudioServer {
    pub fn new(client: StabilityClient, storage: Arc<LocalFileStorage>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            studio: Studio::new(client),
            storage,
        }
    }
}

#[tool_router]
impl ImageStudioServer {
    #[tool(
        description = "Generate images from a text prompt with an optional style preset and aspect ratio. Generation can take up to a minute per image; show results with ![](url)"
    )]
    async fn generate_image(
        &self,
        Parameters(request): Parameters<GenerateImageRequest>,
    ) -> Result<CallToolResult, McpError> {
        crate::tools::generate_image(&self.studio, &self.storage, Parameters(request)).await
    }

    #[tool(description = "Transform an existing image (by URL) guided by a prompt and strength")]
    async fn transform_image(
        &self,
        Parameters(request): Parameters<TransformImageRequest>,
    ) -> Result<CallToolResult, McpError> {
        crate::tools::transform_image(&self.studio, &self.storage, Parameters(request)).await
    }

    #[tool(description = "Repaint the white areas of a mask image over a source image")]
    async fn inpaint_image(
        &self,
        Parameters(request): Parameters<InpaintImageRequest>,
    ) -> Result<CallToolResult, McpError> {
        crate::tools::inpaint_image(&self.studio, &self.storage, Parameters(request)).await
    }

    #[tool(description = "Upscale an image (by URL); may take up to 90 seconds")]
    async fn upscale_image(
        &self,
        Parameters(request): Parameters<UpscaleImageRequest>,
    ) -> Result<CallToolResult, McpError> {
        crate::tools::upscale_image(&self.studio, &self.storage, Parameters(request)).await
    }

    #[tool(
        description = "List the 20 most recent generations of this session and the cumulative cost"
    )]
    async fn list_history(&self) -> Result<CallToolResult, McpError> {
        crate::tools::list_history(&self.studio).await
    }

    #[tool(description = "List available style presets and aspect ratios")]
    async fn list_styles(&self) -> Result<CallToolResult, McpError> {
        crate::tools::list_styles()
    }
}

#[tool_handler]
impl ServerHandler for ImageStudioServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
