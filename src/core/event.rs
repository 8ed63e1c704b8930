use std::{
    fs,
    io::{self, Read},
    path::Path,
};

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;

use super::types::ErrorResponse;

/// Reads the invocation event from `path`, or from stdin when absent.
pub fn read_event(path: Option<&Path>) -> Result<Value> {
    let raw = match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read event file {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read event from stdin")?;
            buffer
        }
    };
    parse_event(&raw)
}

pub fn parse_event(raw: &str) -> Result<Value> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(raw).context("event is not valid JSON")
}

pub fn render_response<T: Serialize>(response: &T) -> Result<String> {
    serde_json::to_string(response).context("Failed to serialize response")
}

/// `{"error": "..."}` for a failed invocation, with the full context chain.
pub fn render_error(err: &anyhow::Error) -> String {
    let body = ErrorResponse {
        error: format!("{err:#}"),
    };
    serde_json::to_string(&body).unwrap_or_else(|_| String::from("{\"error\":\"unknown error\"}"))
}
