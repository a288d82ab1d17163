//! Credential sanitization for logs and client-visible errors.
//!
//! Every value that crosses a trust boundary (log sink, tool error, audit
//! entry) goes through [`sanitize`] or [`sanitize_args`] first.
//!
//! # Rules (in precedence order)
//!
//! 1. Depth guard: past [`MAX_DEPTH`] the value becomes [`MAX_DEPTH_SENTINEL`].
//! 2. Null, booleans and numbers pass through.
//! 3. Secret-shaped strings become [`REDACTED_STRING`].
//! 4. Arrays are sanitized element-wise.
//! 5. Object leaves under a sensitive key become [`REDACTED`]; containers
//!    under a sensitive key are walked, not blanket-redacted.
//!
//! Sanitization is lossy and one-way. Short secrets under innocuous keys are
//! a known false negative; long benign tokens (commit hashes) are accepted
//! false positives.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

/// Replacement for leaf values under a sensitive key.
pub const REDACTED: &str = "[REDACTED]";

/// Replacement for strings that look like a secret on their own.
pub const REDACTED_STRING: &str = "[REDACTED_STRING]";

/// Replacement used by [`sanitize_args`] for long opaque strings.
pub const REDACTED_ARG: &str = "[REDACTED_ARG]";

/// Returned in place of any value nested deeper than [`MAX_DEPTH`].
pub const MAX_DEPTH_SENTINEL: &str = "[MAX_DEPTH_EXCEEDED]";

/// Maximum recursion depth. The root value is depth 0.
pub const MAX_DEPTH: usize = 10;

/// Strings longer than this with no whitespace and only base64url
/// characters are treated as probable secrets.
const OPAQUE_TOKEN_MIN_LEN: usize = 50;

/// Free-form log arguments longer than this with no whitespace are redacted.
const ARG_TOKEN_MIN_LEN: usize = 20;

/// Key fragments that mark a field as sensitive. Keys are lowercased and
/// stripped of `_`, `-`, `.` and spaces before matching.
const SENSITIVE_KEY_FRAGMENTS: &[&str] = &[
    "apikey",
    "password",
    "passwd",
    "token",
    "secret",
    "credential",
    "auth",
    "bearer",
];

/// Header names matched verbatim (case-insensitive).
const SENSITIVE_HEADER_NAMES: &[&str] = &["x-api-key", "x-n8n-api-key", "authorization"];

/// Secret shapes, checked in order.
const SECRET_PATTERN_SOURCES: &[&str] = &[
    // OpenAI / Anthropic style keys
    r"^sk-[A-Za-z0-9_\-]{20,}$",
    // Stripe keys
    r"^(?:sk|pk|rk)_(?:live|test)_[A-Za-z0-9]{16,}$",
    // JWT: three base64url segments
    r"^[A-Za-z0-9_\-]{10,}\.[A-Za-z0-9_\-]{10,}\.[A-Za-z0-9_\-]{10,}$",
    // AWS access key id
    r"^(?:AKIA|ASIA)[0-9A-Z]{16}$",
    // GitHub tokens
    r"^gh[pousr]_[A-Za-z0-9]{36,}$",
    // Slack tokens
    r"^xox[abposr]-[A-Za-z0-9\-]{10,}$",
    // Google API keys
    r"^AIza[0-9A-Za-z_\-]{35}$",
    // Generic long base64
    r"^[A-Za-z0-9+/]{40,}={0,2}$",
];

static SECRET_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    SECRET_PATTERN_SOURCES
        .iter()
        .filter_map(|source| Regex::new(source).ok())
        .collect()
});

static LONG_ALNUM_RUN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9]{20,}").ok());

static BEARER_VALUE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\bbearer\s+\S+").ok());

/// Sanitize an arbitrary JSON value. Never fails, never mutates the input.
pub fn sanitize(value: &Value) -> Value {
    sanitize_at(value, 0)
}

fn sanitize_at(value: &Value, depth: usize) -> Value {
    if depth > MAX_DEPTH {
        return Value::String(MAX_DEPTH_SENTINEL.to_string());
    }

    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) => value.clone(),
        Value::String(s) => {
            if looks_like_secret(s) {
                Value::String(REDACTED_STRING.to_string())
            } else {
                value.clone()
            }
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| sanitize_at(item, depth + 1))
                .collect(),
        ),
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, child) in map {
                let cleaned = match child {
                    Value::Object(_) | Value::Array(_) => sanitize_at(child, depth + 1),
                    // Null carries nothing worth hiding.
                    Value::Null => Value::Null,
                    _ if is_sensitive_key(key) => Value::String(REDACTED.to_string()),
                    _ => sanitize_at(child, depth + 1),
                };
                out.insert(key.clone(), cleaned);
            }
            Value::Object(out)
        }
    }
}

/// Sanitize a heterogeneous list of log arguments.
///
/// More aggressive than [`sanitize`]: any string longer than 20 characters
/// without whitespace becomes [`REDACTED_ARG`], whatever its shape.
pub fn sanitize_args(args: &[Value]) -> Vec<Value> {
    args.iter()
        .map(|arg| match arg {
            Value::String(s) if s.chars().count() > ARG_TOKEN_MIN_LEN && !has_whitespace(s) => {
                Value::String(REDACTED_ARG.to_string())
            }
            other => sanitize(other),
        })
        .collect()
}

/// Best-effort scrub of a free-form message (error text, not structured data).
///
/// Bearer credentials and long alphanumeric runs are replaced. This is a
/// second layer over structured sanitization, not a replacement for it.
pub fn sanitize_message(message: &str) -> String {
    let mut out = message.to_string();
    if let Some(re) = BEARER_VALUE.as_ref() {
        out = re.replace_all(&out, "Bearer [REDACTED]").into_owned();
    }
    if let Some(re) = LONG_ALNUM_RUN.as_ref() {
        out = re.replace_all(&out, REDACTED).into_owned();
    }
    out
}

/// Check whether an object key names a credential-bearing field.
pub fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_lowercase();
    if SENSITIVE_HEADER_NAMES.contains(&lower.as_str()) {
        return true;
    }
    let normalized: String = lower
        .chars()
        .filter(|c| !matches!(c, '_' | '-' | '.' | ' '))
        .collect();
    SENSITIVE_KEY_FRAGMENTS
        .iter()
        .any(|fragment| normalized.contains(fragment))
}

/// Check whether a bare string looks like a credential.
pub fn looks_like_secret(s: &str) -> bool {
    if SECRET_PATTERNS.iter().any(|re| re.is_match(s)) {
        return true;
    }
    s.len() > OPAQUE_TOKEN_MIN_LEN && s.chars().all(is_base64url_char)
}

fn is_base64url_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '=')
}

fn has_whitespace(s: &str) -> bool {
    s.chars().any(char::is_whitespace)
}
