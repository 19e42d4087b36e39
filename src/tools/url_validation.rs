use rmcp::ErrorData as McpError;
use serde_json::Value;
use url::Url;

pub fn validate_http_url(raw: &str) -> Result<Url, McpError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(McpError::invalid_params("image url must not be empty", None));
    }
    let parsed = Url::parse(trimmed).map_err(|err| {
        McpError::invalid_params("invalid image url", Some(Value::String(err.to_string())))
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(McpError::invalid_params(
            "only http and https image urls are supported",
            Some(Value::String(format!("scheme: {scheme}"))),
        )),
    }
}
