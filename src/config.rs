use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::decode::DecodePolicy;

pub const DEFAULT_API_HOST: &str = "https://api.stability.ai";
pub const DEFAULT_ENGINE_ID: &str = "stable-diffusion-xl-1024-v1-0";
pub const DEFAULT_UPSCALE_ENGINE_ID: &str = "esrgan-v1-x2plus";
pub const COST_PER_IMAGE: f64 = 0.04;

pub const DEFAULT_GENERATE_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_UPSCALE_TIMEOUT: Duration = Duration::from_secs(90);

pub const DEFAULT_STEPS: u32 = 30;
pub const DEFAULT_CFG_SCALE: f32 = 7.0;
pub const DEFAULT_STRENGTH: f32 = 0.8;
pub const MAX_SAMPLES: u32 = 10;
pub const MAX_SEED: u64 = u32::MAX as u64;

pub const NO_STYLE: &str = "None";
pub const QUALITY_BOOST: &str = "high quality, detailed, professional, sharp focus";

/// Style name to prompt suffix, in display order.
pub const STYLE_PRESETS: &[(&str, &str)] = &[
    (NO_STYLE, ""),
    (
        "Photorealistic",
        "ultra-realistic, high-definition, professional photography, sharp details",
    ),
    (
        "Digital Art",
        "digital painting, concept art, detailed illustration, vibrant colors",
    ),
    (
        "Cartoon Style",
        "cartoon, animated style, colorful and fun, playful",
    ),
    (
        "Oil Painting",
        "classical oil painting, artistic brushstrokes, textured canvas",
    ),
    (
        "Sketch",
        "pencil sketch, hand-drawn, artistic lines, monochrome",
    ),
    (
        "Vintage",
        "vintage style, retro aesthetic, aged look, nostalgic",
    ),
    (
        "Cyberpunk",
        "neon lights, futuristic, cyberpunk aesthetic, dark atmosphere",
    ),
    (
        "Minimalist",
        "clean, simple, minimalist design, elegant simplicity",
    ),
];

pub struct AspectRatio {
    pub label: &'static str,
    pub token: &'static str,
    pub width: u32,
    pub height: u32,
}

// Pixel sizes are the SDXL engine's accepted dimensions for each ratio.
pub const ASPECT_RATIOS: &[AspectRatio] = &[
    AspectRatio { label: "Square (1:1)", token: "1:1", width: 1024, height: 1024 },
    AspectRatio { label: "Portrait (9:16)", token: "9:16", width: 768, height: 1344 },
    AspectRatio { label: "Landscape (16:9)", token: "16:9", width: 1344, height: 768 },
    AspectRatio { label: "Wide (21:9)", token: "21:9", width: 1536, height: 640 },
];

pub fn style_suffix(style: &str) -> Option<&'static str> {
    STYLE_PRESETS
        .iter()
        .find(|(name, _)| *name == style)
        .map(|(_, suffix)| *suffix)
}

/// Looks up an aspect ratio by display label or by API token.
pub fn find_aspect_ratio(value: &str) -> Option<&'static AspectRatio> {
    let value = value.trim();
    ASPECT_RATIOS
        .iter()
        .find(|ratio| ratio.label == value || ratio.token == value)
}

/// Settings for the Stability AI client.
#[derive(Debug, Clone)]
pub struct StabilityConfig {
    pub api_key: Option<String>,
    pub api_host: String,
    pub engine_id: String,
    pub upscale_engine_id: String,
    pub decode_policy: DecodePolicy,
    pub max_concurrency: usize,
    pub cost_per_image: f64,
    /// Per-request timeout for generate, transform and inpaint calls.
    pub generate_timeout: Duration,
    pub upscale_timeout: Duration,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_host: DEFAULT_API_HOST.to_string(),
            engine_id: DEFAULT_ENGINE_ID.to_string(),
            upscale_engine_id: DEFAULT_UPSCALE_ENGINE_ID.to_string(),
            decode_policy: DecodePolicy::default(),
            max_concurrency: default_concurrency(),
            cost_per_image: COST_PER_IMAGE,
            generate_timeout: DEFAULT_GENERATE_TIMEOUT,
            upscale_timeout: DEFAULT_UPSCALE_TIMEOUT,
        }
    }
}

impl StabilityConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.api_key = non_empty_var("STABILITY_API_KEY");
        if let Some(host) = non_empty_var("STABILITY_API_HOST") {
            config.api_host = host.trim_end_matches('/').to_string();
        }
        if let Some(policy) = non_empty_var("STABILITY_DECODE_POLICY") {
            match policy.parse() {
                Ok(policy) => config.decode_policy = policy,
                Err(err) => tracing::warn!("ignoring STABILITY_DECODE_POLICY: {err}"),
            }
        }
        if let Some(limit) =
            non_empty_var("STABILITY_MAX_CONCURRENCY").and_then(|value| parse_concurrency(&value))
        {
            config.max_concurrency = limit;
        }
        config
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_api_host(mut self, api_host: impl Into<String>) -> Self {
        self.api_host = api_host.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_decode_policy(mut self, policy: DecodePolicy) -> Self {
        self.decode_policy = policy;
        self
    }

    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = limit.max(1);
        self
    }

    pub fn with_timeouts(mut self, generate: Duration, upscale: Duration) -> Self {
        self.generate_timeout = generate;
        self.upscale_timeout = upscale;
        self
    }
}

fn parse_concurrency(value: &str) -> Option<usize> {
    match value.trim().parse::<usize>() {
        Ok(limit) => Some(limit.max(1)),
        Err(err) => {
            tracing::warn!("ignoring STABILITY_MAX_CONCURRENCY={value:?}: {err}");
            None
        }
    }
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Settings for the HTTP server hosting the MCP endpoint and the result cache.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub bind_address: String,
    pub secret_key: Option<String>,
    pub cache_dir: PathBuf,
    pub cache_base_url: String,
}

impl ServerSettings {
    pub fn from_env() -> Self {
        let port = env::var("MCP_PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3000);
        let bind_address = format!("0.0.0.0:{}", port);
        let cache_base_url = resolve_cache_base_url(&bind_address);
        Self {
            secret_key: non_empty_var("SECRET_KEY"),
            cache_dir: resolve_cache_dir(),
            cache_base_url,
            bind_address,
        }
    }

    pub fn mcp_path(&self) -> String {
        self.prefixed("mcp")
    }

    pub fn upload_path(&self) -> String {
        self.prefixed("upload")
    }

    fn prefixed(&self, path: &str) -> String {
        match self.secret_key.as_deref() {
            Some(value) => format!("/{value}/{path}"),
            None => format!("/{path}"),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn resolve_cache_dir() -> PathBuf {
    if let Some(dir) = non_empty_var("CACHE_DIR") {
        return PathBuf::from(dir);
    }
    let mut base = dirs::cache_dir().unwrap_or_else(|| PathBuf::from("."));
    base.push("image-gen-rmcp");
    base
}

fn resolve_cache_base_url(bind_address: &str) -> String {
    if let Some(cache_url) = non_empty_var("CACHE_URL") {
        return format!("{}/cache", normalize_base_url(&cache_url));
    }
    let raw_domain = non_empty_var("DOMAIN").unwrap_or_else(|| bind_address.to_string());
    format!("{}/cache", normalize_base_url(&raw_domain))
}

/// Adds a scheme when missing and collapses doubled schemes such as
/// `http://https://host`.
pub fn normalize_base_url(raw: &str) -> String {
    let mut rest = raw.trim().trim_end_matches('/');
    let mut scheme = None;
    loop {
        if let Some(stripped) = rest.strip_prefix("https://") {
            scheme = Some("https");
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix("http://") {
            scheme = Some("http");
            rest = stripped;
        } else {
            break;
        }
    }
    format!("{}://{}", scheme.unwrap_or("http"), rest)
}
