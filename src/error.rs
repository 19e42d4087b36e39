use thiserror::Error;

pub type Result<T> = std::result::Result<T, GenerationError>;

/// Errors raised while talking to the image generation API.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Stability AI API key not configured")]
    MissingApiKey,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("API returned no image")]
    EmptyResponse,

    #[error("image processing failed: {0}")]
    Image(String),
}

impl GenerationError {
    /// Errors caused by the caller's input rather than the remote side.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, GenerationError::InvalidRequest(_))
    }
}

impl From<image::ImageError> for GenerationError {
    fn from(err: image::ImageError) -> Self {
        GenerationError::Image(err.to_string())
    }
}

impl From<serde_json::Error> for GenerationError {
    fn from(err: serde_json::Error) -> Self {
        GenerationError::Decode(err.to_string())
    }
}
