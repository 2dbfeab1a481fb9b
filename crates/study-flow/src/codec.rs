//! Unicode-safe transport encoding: JSON → UTF-8 bytes → standard Base64.
//!
//! Base64 is applied to the UTF-8 bytes of the JSON text, never to the text
//! itself, so accented, CJK and astral-plane characters survive intact.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Serialize;
use study_core::{ErrorInfo, StudyError};

use crate::payload::StudyPayload;

fn codec_error(code: &str, message: &str, err: impl ToString) -> StudyError {
    StudyError::Codec(ErrorInfo::new(code, message).with_hint(err.to_string()))
}

/// Serializes `value` to compact JSON and Base64-encodes its UTF-8 bytes.
pub fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<String, StudyError> {
    let json = serde_json::to_string(value)
        .map_err(|err| codec_error("codec-json-encode", "failed to serialize payload", err))?;
    Ok(BASE64.encode(json.as_bytes()))
}

/// Inverse of [`encode_json`].
pub fn decode_json<T: DeserializeOwned>(encoded: &str) -> Result<T, StudyError> {
    let bytes = BASE64
        .decode(encoded.trim())
        .map_err(|err| codec_error("codec-base64", "payload is not valid base64", err))?;
    let text = String::from_utf8(bytes)
        .map_err(|err| codec_error("codec-utf8", "payload bytes are not UTF-8", err))?;
    serde_json::from_str(&text)
        .map_err(|err| codec_error("codec-json-decode", "payload is not valid JSON", err))
}

/// [`encode_json`] for the wire record.
pub fn encode_payload(payload: &StudyPayload) -> Result<String, StudyError> {
    encode_json(payload)
}

/// [`decode_json`] for the wire record.
pub fn decode_payload(encoded: &str) -> Result<StudyPayload, StudyError> {
    decode_json(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn ascii_payload_matches_reference_encoding() {
        // btoa(JSON.stringify({pid: "P001", value: 42}))
        let encoded = encode_json(&json!({"pid": "P001", "value": 42})).unwrap();
        assert_eq!(encoded, "eyJwaWQiOiJQMDAxIiwidmFsdWUiOjQyfQ==");
    }

    #[test]
    fn multibyte_text_is_encoded_from_utf8_bytes() {
        let encoded = encode_json("é").unwrap();
        // "\"é\"" is the bytes 22 C3 A9 22.
        assert_eq!(encoded, "IsOpIg==");
        let back: String = decode_json(&encoded).unwrap();
        assert_eq!(back, "é");
    }

    #[test]
    fn garbage_is_rejected_with_codec_errors() {
        assert_eq!(decode_json::<Value>("***").unwrap_err().code(), "codec-base64");
        let not_utf8 = BASE64.encode([0xff, 0xfe]);
        assert_eq!(decode_json::<Value>(&not_utf8).unwrap_err().code(), "codec-utf8");
        let not_json = BASE64.encode("{nope");
        assert_eq!(
            decode_json::<Value>(&not_json).unwrap_err().code(),
            "codec-json-decode"
        );
    }
}
