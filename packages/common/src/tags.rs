//! Codec for the free-text list fields (tags, skills, tech stack, wanted skills).
//!
//! Lists are stored as JSON arrays. Older rows may hold a JSON-encoded string
//! (`"[\"rust\",\"wasm\"]"`) or a plain comma-separated string; [`from_json`]
//! reads all three shapes so every read site sees a clean `Vec<String>`.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const MAX_ITEMS: usize = 20;
pub const MAX_ITEM_CHARS: usize = 40;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TagError {
    #[error("At most {max} entries are allowed", max = MAX_ITEMS)]
    TooMany,
    #[error("Entry '{0}' exceeds {max} characters", max = MAX_ITEM_CHARS)]
    TooLong(String),
}

/// A list as accepted from clients: either a JSON array or a comma-separated string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(untagged)]
pub enum TagInput {
    List(Vec<String>),
    Text(String),
}

impl TagInput {
    pub fn normalize(self) -> Result<Vec<String>, TagError> {
        match self {
            TagInput::List(items) => normalize(items),
            TagInput::Text(text) => normalize(text.split(',')),
        }
    }
}

impl Default for TagInput {
    fn default() -> Self {
        TagInput::List(Vec::new())
    }
}

/// Trim entries, drop empty ones and case-insensitive duplicates (first spelling wins).
pub fn normalize<I, S>(items: I) -> Result<Vec<String>, TagError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in items {
        let item = item.as_ref().trim();
        if item.is_empty() {
            continue;
        }
        if item.chars().count() > MAX_ITEM_CHARS {
            return Err(TagError::TooLong(item.to_string()));
        }
        if seen.insert(item.to_lowercase()) {
            out.push(item.to_string());
        }
    }
    if out.len() > MAX_ITEMS {
        return Err(TagError::TooMany);
    }
    Ok(out)
}

pub fn to_json(items: &[String]) -> Value {
    Value::Array(items.iter().cloned().map(Value::String).collect())
}

/// Read a stored list, tolerating legacy string encodings.
pub fn from_json(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(inner @ Value::Array(_)) => from_json(&inner),
            _ => s
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        },
        _ => Vec::new(),
    }
}
