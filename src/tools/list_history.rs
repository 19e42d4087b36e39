use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};

use crate::{studio::Studio, tools::to_json};

pub async fn list_history(studio: &Studio) -> Result<CallToolResult, McpError> {
    let snapshot = studio.snapshot().await;
    Ok(CallToolResult::success(vec![Content::text(to_json(&snapshot)?)]))
}
