//! The backend's JSON envelope and the lenient body parser.
//!
//! Every endpoint answers `{"success": bool, "message"?: string, "data"?: any}`.
//! Some endpoints occasionally print PHP warnings before the JSON; the parser
//! recovers the trailing object in that case and logs a warning so the
//! offending endpoint can be fixed.

use crate::error::{
    http_error, response_error, server_error, Error, HttpErrorKind, ResponseErrorKind,
};
use log::*;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

/// Parse a response body as JSON, recovering a trailing `{...}` object when
/// the body starts with non-JSON noise.
pub fn parse_lenient(body: &str) -> Result<Value, Error> {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => Ok(value),
        Err(parse_err) => match extract_trailing_object(body) {
            Some((skipped, value)) => {
                warn!(
                    "Recovered JSON from a response with {skipped} bytes of leading noise; \
                     the endpoint is emitting non-JSON output"
                );
                Ok(value)
            }
            None => Err(response_error(
                ResponseErrorKind::Malformed,
                &format!("response body is not JSON: {parse_err}"),
            )),
        },
    }
}

/// Find the longest suffix of `body` that is a complete JSON object. Returns the
/// number of bytes skipped and the parsed object.
pub fn extract_trailing_object(body: &str) -> Option<(usize, Value)> {
    let trimmed = body.trim_end();
    let start = matching_open_brace(trimmed.as_bytes())?;

    serde_json::from_str::<Value>(&trimmed[start..])
        .ok()
        .filter(Value::is_object)
        .map(|value| (start, value))
}

/// Offset of the `{` that balances the final `}`, ignoring braces inside string
/// literals. One pass from the end.
fn matching_open_brace(bytes: &[u8]) -> Option<usize> {
    if bytes.last() != Some(&b'}') {
        return None;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    for i in (0..bytes.len()).rev() {
        match bytes[i] {
            b'"' if !is_escaped(bytes, i) => in_string = !in_string,
            _ if in_string => {}
            b'}' => depth += 1,
            b'{' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// True when the byte at `i` follows an odd run of backslashes.
fn is_escaped(bytes: &[u8], i: usize) -> bool {
    bytes[..i].iter().rev().take_while(|&&b| b == b'\\').count() % 2 == 1
}

/// Decode the envelope and return its `data`, if any.
pub fn decode_envelope(status: StatusCode, body: &str) -> Result<Option<Value>, Error> {
    let value = match parse_lenient(body) {
        Ok(value) => value,
        // A non-JSON error page says more through its status than its body.
        Err(_) if !status.is_success() => {
            return Err(http_error(
                HttpErrorKind::Status(status.as_u16()),
                &format!("backend answered {status}"),
            ))
        }
        Err(e) => return Err(e),
    };

    let envelope: ApiResponse<Value> = serde_json::from_value(value).map_err(|e| {
        response_error(
            ResponseErrorKind::Malformed,
            &format!("unexpected envelope shape: {e}"),
        )
    })?;

    if !envelope.success {
        debug!(
            "Backend reported failure ({status}): {}",
            envelope.message.as_deref().unwrap_or("<no message>")
        );
        return Err(server_error(envelope.message));
    }

    Ok(envelope.data.filter(|data| !data.is_null()))
}

/// Decode the envelope and deserialize its `data` into `T`.
pub fn decode_data<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<T, Error> {
    let data = decode_envelope(status, body)?.ok_or_else(|| {
        response_error(
            ResponseErrorKind::MissingData,
            "successful response without data",
        )
    })?;

    serde_json::from_value(data).map_err(|e| {
        response_error(
            ResponseErrorKind::Malformed,
            &format!("data does not match the expected shape: {e}"),
        )
    })
}
