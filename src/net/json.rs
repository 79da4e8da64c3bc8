//! JSON extraction utilities for API-backed sources.
//!
//! Helpers for pulling values out of the nested payloads anime backends
//! return, using dot notation instead of hand-rolled traversal.
//!
//! # Examples
//!
//! ```rust
//! use hakken::net::json;
//! use serde_json::json;
//!
//! let data = json!({
//!     "anime": {
//!         "title": { "english": "Cowboy Bebop" },
//!         "episodes": [
//!             {"number": 1, "title": "Asteroid Blues"},
//!             {"number": 2, "title": "Stray Dog Strut"}
//!         ]
//!     }
//! });
//!
//! let title = json::extract_str(&data, "anime.title.english").unwrap();
//! assert_eq!(title, "Cowboy Bebop");
//! assert_eq!(json::extract_array(&data, "anime.episodes").len(), 2);
//! ```

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Extracts a value from nested JSON using a dot-separated path.
///
/// Returns `None` when any segment of the path is missing.
pub fn extract_path(json: &Value, path: &str) -> Option<Value> {
    let mut current = json;

    for key in path.split('.') {
        current = current.get(key)?;
    }

    Some(current.clone())
}

/// Extracts and deserializes a value from a nested JSON path.
///
/// # Errors
///
/// * [`Error::Parse`](crate::Error::Parse) - if the path does not exist
/// * [`Error::Json`](crate::Error::Json) - if deserialization fails
///
/// # Examples
///
/// ```rust
/// use hakken::net::json;
/// use serde_json::json;
///
/// let data = json!({"anime": {"id": 1535, "averageScore": 86}});
///
/// let id: u32 = json::extract_as(&data, "anime.id").unwrap();
/// assert_eq!(id, 1535);
/// ```
pub fn extract_as<T>(json: &Value, path: &str) -> crate::Result<T>
where
    T: DeserializeOwned,
{
    extract_path(json, path)
        .ok_or_else(|| crate::Error::parse(format!("path not found: {}", path)))
        .and_then(|v| serde_json::from_value(v).map_err(Into::into))
}

/// Extracts a string from a nested JSON path.
pub fn extract_str(json: &Value, path: &str) -> Option<String> {
    extract_path(json, path).and_then(|v| v.as_str().map(String::from))
}

/// Extracts an array from a nested JSON path.
///
/// Returns an empty vector when the path is missing or does not point to an
/// array.
pub fn extract_array(json: &Value, path: &str) -> Vec<Value> {
    extract_path(json, path)
        .and_then(|v| v.as_array().cloned())
        .unwrap_or_default()
}
