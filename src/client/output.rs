//! Markdown extraction and persistence for crawl results

use serde_json::Value;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Keys that wrap the markdown inside a result payload, in lookup order
const MARKDOWN_KEYS: &[&str] = &["result", "markdown", "raw_markdown"];

/// Pulls the markdown text out of a crawl result payload
///
/// Payloads may nest the markdown under `result` (possibly more than once)
/// or under `markdown` / `raw_markdown`. A string is returned as-is; any
/// other structured value is rendered as pretty-printed JSON.
///
/// # Examples
///
/// ```
/// use crawl_relay::client::extract_markdown;
/// use serde_json::json;
///
/// let payload = json!({"result": {"markdown": "# Hello"}});
/// assert_eq!(extract_markdown(&payload), "# Hello");
/// ```
pub fn extract_markdown(payload: &Value) -> String {
    match payload {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        Value::Object(map) => MARKDOWN_KEYS
            .iter()
            .find_map(|key| map.get(*key).filter(|inner| !inner.is_null()))
            .map(extract_markdown)
            .unwrap_or_else(|| to_pretty_json(payload)),
        other => to_pretty_json(other),
    }
}

fn to_pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Writes `markdown` to `output_path`, replacing any existing content
pub fn write_markdown(output_path: &Path, markdown: &str) -> std::io::Result<()> {
    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;
    file.flush()
}
