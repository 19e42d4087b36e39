pub mod cache;
pub mod config;
pub mod decode;
pub mod error;
pub mod image_processing;
pub mod mcp_server;
pub mod models;
pub mod prompt;
pub mod render;
pub mod session;
pub mod stability;
pub mod studio;
pub mod tools;
pub mod web_pages;

pub use config::StabilityConfig;
pub use decode::DecodePolicy;
pub use error::{GenerationError, Result};
pub use models::{Dimensions, GenerationMode, GenerationRequest, GenerationResult, RasterImage};
pub use stability::StabilityClient;
pub use studio::Studio;
