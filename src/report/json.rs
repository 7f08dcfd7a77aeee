//! JSON output for command results.
//!
//! Keys are camelCase; error bodies carry the error class and message.

use serde::Serialize;
use serde_json::json;

use crate::error::BackupError;

pub fn render<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| json!({ "error": "SerializeFailure", "message": e.to_string() }).to_string())
}

pub fn render_error(err: &BackupError) -> String {
    let body = json!({
        "error": err.kind(),
        "message": err.to_string(),
    });
    serde_json::to_string_pretty(&body).unwrap_or_else(|_| body.to_string())
}
