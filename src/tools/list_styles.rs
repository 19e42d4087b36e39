use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use crate::{
    config::{ASPECT_RATIOS, STYLE_PRESETS},
    tools::to_json,
};

#[derive(Serialize)]
struct StyleInfo {
    name: &'static str,
    suffix: &'static str,
}

#[derive(Serialize)]
struct AspectRatioInfo {
    label: &'static str,
    token: &'static str,
    width: u32,
    height: u32,
}

#[derive(Serialize)]
struct Catalog {
    styles: Vec<StyleInfo>,
    aspect_ratios: Vec<AspectRatioInfo>,
}

pub fn list_styles() -> Result<CallToolResult, McpError> {
    let catalog = Catalog {
        styles: STYLE_PRESETS
            .iter()
            .map(|&(name, suffix)| StyleInfo { name, suffix })
            .collect(),
        aspect_ratios: ASPECT_RATIOS
            .iter()
            .map(|ratio| AspectRatioInfo {
                label: ratio.label,
                token: ratio.token,
                width: ratio.width,
                height: ratio.height,
            })
            .collect(),
    };
    Ok(CallToolResult::success(vec![Content::text(to_json(&catalog)?)]))
}
