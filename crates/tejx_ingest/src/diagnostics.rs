//! Error extraction from the compiler's raw result buffer.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::warn;

static STRUCTURED_ERROR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\{"error":true,.*\}"#).expect("valid regex"));
static LINE_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)line\s+(\d+)").expect("valid regex"));
static LINE_COLONS: Lazy<Regex> = Lazy::new(|| Regex::new(r":(\d+):").expect("valid regex"));
static LEADING_COMPILE_ERROR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^WASM_COMPILE_ERROR:\s*").expect("valid regex"));
static LEADING_ERROR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^Error:\s*").expect("valid regex"));

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    error: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    full_error: Option<String>,
    #[serde(default)]
    line: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticSource {
    /// A `{"error":true,...}` JSON payload.
    Structured,
    /// Free text matching a known error prefix.
    Heuristic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub source: DiagnosticSource,
    pub message: String,
}

/// Returns the single-line diagnostic carried by `buffer`, or `None` when the
/// buffer is not an error report.
pub fn extract_error(buffer: &[u8]) -> Option<String> {
    diagnose(buffer).map(|diagnostic| diagnostic.message)
}

/// A structured payload wins. Otherwise free text that looks like an error is
/// accepted, with a line number pulled from `line N` or `:N:` when present.
pub fn diagnose(buffer: &[u8]) -> Option<Diagnostic> {
    let text = String::from_utf8_lossy(buffer);
    let text = text.trim();
    if let Some(message) = structured_error(text) {
        return Some(Diagnostic {
            source: DiagnosticSource::Structured,
            message,
        });
    }
    heuristic_error(text).map(|message| Diagnostic {
        source: DiagnosticSource::Heuristic,
        message,
    })
}

fn structured_error(text: &str) -> Option<String> {
    let found = STRUCTURED_ERROR.find(text)?;
    let payload: ErrorPayload = match serde_json::from_str(found.as_str()) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(%err, "unparseable error payload");
            return None;
        }
    };
    if !payload.error {
        return None;
    }
    let message = payload
        .full_error
        .filter(|msg| !msg.is_empty())
        .or(payload.message)
        .unwrap_or_default();
    match payload.line.as_ref().and_then(line_number) {
        Some(line) => Some(with_line_prefix(line, &message)),
        None => Some(message),
    }
}

// A line of 0, false, or "" is treated as absent.
fn line_number(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Number(number) if number.as_f64() != Some(0.0) => {
            Some(number.to_string())
        }
        serde_json::Value::String(text) if !text.is_empty() => Some(text.clone()),
        _ => None,
    }
}

fn heuristic_error(text: &str) -> Option<String> {
    let looks_like_error = text.contains("WASM_COMPILE_ERROR")
        || text.contains("Compilation Error")
        || text.starts_with("Error:");
    if !looks_like_error {
        return None;
    }
    let line = LINE_WORD
        .captures(text)
        .or_else(|| LINE_COLONS.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|line| line.as_str().to_string());
    let Some(line) = line else {
        return Some(text.to_string());
    };
    if text.starts_with(&format!("[Line {line}]")) {
        return Some(text.to_string());
    }
    let stripped = LEADING_COMPILE_ERROR.replace(text, "");
    let stripped = LEADING_ERROR.replace(&stripped, "");
    Some(with_line_prefix(line, &stripped))
}

fn with_line_prefix(line: impl std::fmt::Display, message: &str) -> String {
    format!("[Line {line}] {message}")
}
