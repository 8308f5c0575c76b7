//! Codec for JSON-string-encoded list fields.
//!
//! List-valued fields (`modelsJson`, `toolsJson`, `conversationIdsJson`,
//! `imagesJson`) travel as JSON-encoded strings rather than native
//! arrays, keeping the wire schema flat and table-agnostic. This module
//! is the single round-trip point for those fields.
//!
//! Contract: an empty list encodes to `"[]"`, never null; decoding
//! malformed input yields an empty list and a logged warning, never an
//! error.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encodes a list into its wire string form.
pub fn encode_list<T: Serialize>(items: &[T]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

/// Decodes a wire string back into a list.
///
/// Empty or malformed input decodes to an empty list; the malformed case
/// is logged so genuine data loss stays visible.
pub fn decode_list<T: DeserializeOwned>(raw: &str) -> Vec<T> {
    if raw.is_empty() {
        return Vec::new();
    }
    match serde_json::from_str(raw) {
        Ok(items) => items,
        Err(err) => {
            tracing::warn!(input = raw, error = %err, "dropping malformed list field");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list_encodes_to_brackets() {
        let encoded = encode_list::<String>(&[]);
        assert_eq!(encoded, "[]");
    }

    #[test]
    fn roundtrip() {
        let models = vec!["gpt-4o".to_string(), "o3".to_string()];
        let encoded = encode_list(&models);
        let decoded: Vec<String> = decode_list(&encoded);
        assert_eq!(decoded, models);
    }

    #[test]
    fn malformed_input_decodes_to_empty() {
        let decoded: Vec<String> = decode_list("not json");
        assert!(decoded.is_empty());

        let decoded: Vec<String> = decode_list("{\"a\":1}");
        assert!(decoded.is_empty());
    }

    #[test]
    fn empty_string_decodes_to_empty() {
        let decoded: Vec<String> = decode_list("");
        assert!(decoded.is_empty());
    }
}
