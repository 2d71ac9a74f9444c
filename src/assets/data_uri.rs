//! Inline `data:<mime>;base64,<payload>` images.

use base64::Engine;

/// A decoded data URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Decode a `data:<mime>;base64,<payload>` string.
///
/// Returns `None` for anything that does not match the pattern exactly
/// (missing mime type, non-base64 encoding, bad payload). Whitespace inside
/// the payload is ignored.
///
/// ```
/// use cartel::assets::decode_data_uri;
///
/// let uri = decode_data_uri("data:text/plain;base64,SGVsbG8=").unwrap();
/// assert_eq!(uri.mime, "text/plain");
/// assert_eq!(uri.bytes, b"Hello");
/// assert!(decode_data_uri("data:text/plain,Hello").is_none());
/// ```
pub fn decode_data_uri(uri: &str) -> Option<DataUri> {
    let rest = uri.trim().strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime = header.strip_suffix(";base64")?;
    if mime.is_empty() || mime.contains(';') || !mime.contains('/') {
        return None;
    }
    let payload: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    if payload.is_empty() {
        return None;
    }
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.as_bytes())
        .ok()?;
    Some(DataUri {
        mime: mime.to_ascii_lowercase(),
        bytes,
    })
}

/// Encode bytes as a base64 data URI.
pub fn encode_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_png_header() {
        let uri = decode_data_uri("data:image/png;base64,iVBORw0KGgo=").unwrap();
        assert_eq!(uri.mime, "image/png");
        assert_eq!(&uri.bytes[1..4], b"PNG");
    }

    #[test]
    fn test_payload_whitespace_ignored() {
        let uri = decode_data_uri("data:text/plain;base64,SGVs\nbG8=").unwrap();
        assert_eq!(uri.bytes, b"Hello");
    }

    #[test]
    fn test_malformed_inputs() {
        for bad in [
            "",
            "SGVsbG8=",
            "https://example.com/a.png",
            "data:;base64,SGVsbG8=",
            "data:image/png,SGVsbG8=",
            "data:image/png;base64",
            "data:image/png;base64,",
            "data:image/png;base64,@@@not-base64@@@",
            "data:image/png;charset=utf-8;base64,SGVsbG8=",
            "data:png;base64,SGVsbG8=",
        ] {
            assert!(decode_data_uri(bad).is_none(), "accepted: {:?}", bad);
        }
    }

    #[test]
    fn test_encode_decode() {
        let encoded = encode_data_uri("image/jpeg", &[1, 2, 3, 250]);
        assert!(encoded.starts_with("data:image/jpeg;base64,"));
        assert_eq!(decode_data_uri(&encoded).unwrap().bytes, vec![1, 2, 3, 250]);
    }
}
