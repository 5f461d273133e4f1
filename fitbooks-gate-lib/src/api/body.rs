use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Body;
use serde_json::Value;
use tracing::debug;

use super::response::ApiError;

/// Collect at most `max_bytes` of `body` and parse it as JSON.
///
/// Oversized bodies fail with [`ApiError::PayloadTooLarge`]; empty, blank or
/// unparsable ones with [`ApiError::InvalidJson`].
pub async fn read_json_body<B>(body: B, max_bytes: usize) -> Result<Value, ApiError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let collected = match Limited::new(body, max_bytes).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            return Err(ApiError::PayloadTooLarge);
        }
        Err(e) => {
            debug!(error = %e, "Failed to read request body");
            return Err(ApiError::InvalidJson);
        }
    };

    if collected.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::InvalidJson);
    }

    serde_json::from_slice(&collected).map_err(|_| ApiError::InvalidJson)
}

/// Trimmed string field truncated to `max_chars` characters.
///
/// `None` when the field is absent, not a string, or blank.
pub fn optional_string(value: &Value, field: &str, max_chars: usize) -> Option<String> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.chars().take(max_chars).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::Full;
    use serde_json::json;

    #[tokio::test]
    async fn parses_valid_json() {
        let body = Full::new(Bytes::from_static(br#"{"message":"hi"}"#));
        let value = read_json_body(body, 64).await;
        assert_eq!(value, Ok(json!({"message": "hi"})));
    }

    #[tokio::test]
    async fn rejects_oversized_body() {
        let body = Full::new(Bytes::from(vec![b' '; 65]));
        assert_eq!(
            read_json_body(body, 64).await,
            Err(ApiError::PayloadTooLarge)
        );
    }

    #[tokio::test]
    async fn rejects_blank_and_malformed_bodies() {
        let blank = Full::new(Bytes::from_static(b"  \n "));
        assert_eq!(read_json_body(blank, 64).await, Err(ApiError::InvalidJson));

        let malformed = Full::new(Bytes::from_static(b"{\"message\":"));
        assert_eq!(
            read_json_body(malformed, 64).await,
            Err(ApiError::InvalidJson)
        );
    }

    #[test]
    fn optional_string_trims_and_truncates() {
        let value = json!({"name": "  Ada Lovelace  ", "blank": "   ", "count": 3});
        assert_eq!(optional_string(&value, "name", 3), Some("Ada".to_string()));
        assert_eq!(
            optional_string(&value, "name", 80),
            Some("Ada Lovelace".to_string())
        );
        assert_eq!(optional_string(&value, "blank", 80), None);
        assert_eq!(optional_string(&value, "count", 80), None);
        assert_eq!(optional_string(&value, "missing", 80), None);
    }
}
