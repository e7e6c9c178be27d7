//! Embedding image payloads into template documents
//!
//! Decorative images travel inside the template JSON as base64, keyed by the
//! node id under `embeddedImages`. Long payloads are split into fixed-width
//! chunks so the bundled document stays friendly to line-oriented tooling;
//! the template loader joins them back in order.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{Map, Value};
use thiserror::Error;

/// Chunk width used when none is given
pub const DEFAULT_CHUNK_WIDTH: usize = 50_000;

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("invalid template JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("template document must be a JSON object")]
    NotAnObject,

    #[error("`embeddedImages` must be a JSON object")]
    InvalidEmbeddedImages,

    #[error("chunk width must be positive")]
    ZeroChunkWidth,
}

/// Standard base64 with padding
pub fn encode_image(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Split `payload` into pieces of at most `width` characters
pub fn chunk_payload(payload: &str, width: usize) -> Result<Vec<String>, BundleError> {
    if width == 0 {
        return Err(BundleError::ZeroChunkWidth);
    }
    let chars: Vec<char> = payload.chars().collect();
    Ok(chars
        .chunks(width)
        .map(|chunk| chunk.iter().collect())
        .collect())
}

/// Store `payload` under `embeddedImages[node_id]`.
///
/// A payload that fits in one chunk is stored as a plain string, otherwise
/// as an array of chunks. Any existing entry for the node is replaced.
pub fn embed_payload(
    template: &mut Value,
    node_id: &str,
    payload: &str,
    width: usize,
) -> Result<(), BundleError> {
    let mut chunks = chunk_payload(payload, width)?;
    let document = template.as_object_mut().ok_or(BundleError::NotAnObject)?;
    let embedded = document
        .entry("embeddedImages")
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or(BundleError::InvalidEmbeddedImages)?;

    let value = if chunks.len() <= 1 {
        Value::String(chunks.pop().unwrap_or_default())
    } else {
        Value::Array(chunks.into_iter().map(Value::String).collect())
    };
    embedded.insert(node_id.to_string(), value);
    Ok(())
}

/// Encode `bytes` and embed them into a template document, returning the
/// updated document pretty-printed
pub fn embed_image(
    template_json: &str,
    node_id: &str,
    bytes: &[u8],
    width: usize,
) -> Result<String, BundleError> {
    let mut template: Value = serde_json::from_str(template_json)?;
    embed_payload(&mut template, node_id, &encode_image(bytes), width)?;
    Ok(serde_json::to_string_pretty(&template)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use crate::template::{EmbeddedPayload, TemplateData};
    use pretty_assertions::assert_eq;

    const TEMPLATE: &str = r#"{
        "id": "t1", "name": "One", "width": 100, "height": 100,
        "slideWidth": 100, "slideHeight": 100, "slides": 1,
        "nodeTree": { "type": "FRAME", "name": "root" }
    }"#;

    #[test]
    fn test_chunk_payload() {
        assert_eq!(chunk_payload("abcdefg", 3).unwrap(), vec!["abc", "def", "g"]);
        assert_eq!(chunk_payload("abc", 3).unwrap(), vec!["abc"]);
        assert!(chunk_payload("", 3).unwrap().is_empty());
        assert!(matches!(
            chunk_payload("abc", 0),
            Err(BundleError::ZeroChunkWidth)
        ));
    }

    #[test]
    fn test_small_payload_stays_inline() {
        let mut template: Value = serde_json::from_str(TEMPLATE).unwrap();
        embed_payload(&mut template, "1:2", "aGVsbG8=", 100).unwrap();
        assert_eq!(template["embeddedImages"]["1:2"], Value::String("aGVsbG8=".into()));
    }

    #[test]
    fn test_embedded_image_decodes_after_load() {
        let bytes: Vec<u8> = (0u8..=200).collect();
        let json = embed_image(TEMPLATE, "9:1", &bytes, 16).unwrap();

        let template: TemplateData = serde_json::from_str(&json).unwrap();
        let payload = template.embedded_image("9:1").unwrap();
        assert!(matches!(payload, EmbeddedPayload::Chunked(parts) if parts.len() > 1));
        assert_eq!(codec::decode(&payload.joined()).unwrap(), bytes);
    }

    #[test]
    fn test_replaces_existing_entry() {
        let mut template: Value = serde_json::from_str(TEMPLATE).unwrap();
        embed_payload(&mut template, "n", "AAAA", 10).unwrap();
        embed_payload(&mut template, "n", "BBBB", 10).unwrap();
        assert_eq!(template["embeddedImages"]["n"], Value::String("BBBB".into()));
    }

    #[test]
    fn test_rejects_non_object_documents() {
        let mut array = serde_json::json!([]);
        assert!(matches!(
            embed_payload(&mut array, "n", "AAAA", 10),
            Err(BundleError::NotAnObject)
        ));

        let mut bad = serde_json::json!({ "embeddedImages": "nope" });
        assert!(matches!(
            embed_payload(&mut bad, "n", "AAAA", 10),
            Err(BundleError::InvalidEmbeddedImages)
        ));
    }
}
