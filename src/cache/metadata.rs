use serde::{Deserialize, Serialize};

/// Written next to a published result set as `meta.json`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResultSetMetadata {
    pub mode: String,
    pub prompt: String,
    pub enhanced_prompt: String,
    pub style: String,
    pub files: Vec<String>,
    pub failed_variants: Vec<usize>,
    pub created_at: String,
}
