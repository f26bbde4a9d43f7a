//! Access token payload decoding
//!
//! Only the payload segment of a `header.payload.signature` token is read.
//! The signature is never verified here: the backend owns that. All the
//! client needs is the `exp` claim so it knows when to refresh.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde_json::Value;

/// Decode the payload segment of a JWT-style token into JSON.
///
/// Returns `None` for empty tokens, tokens with fewer than two segments,
/// payloads that are not base64, and payloads that are not JSON.
pub fn decode_payload(token: &str) -> Option<Value> {
    if token.is_empty() {
        return None;
    }

    let mut segments = token.split('.');
    let _header = segments.next()?;
    let payload = segments.next()?;

    let standard: String = payload
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    let padding = (4 - standard.len() % 4) % 4;
    let padded = format!("{standard}{}", "=".repeat(padding));

    let bytes = STANDARD.decode(padded).ok()?;
    let text = String::from_utf8(bytes).ok()?;
    serde_json::from_str(&text).ok()
}

/// Read the `exp` claim of an access token as epoch milliseconds.
///
/// Decoding problems never surface as errors; an undecodable token simply
/// has an unknown expiry.
pub fn decode_expiry(token: &str) -> Option<i64> {
    let exp = decode_payload(token)?.get("exp")?.clone();

    if let Some(seconds) = exp.as_i64() {
        return seconds.checked_mul(1000);
    }

    // Fractional `exp` values are legal JSON numbers
    let seconds = exp.as_f64()?;
    let millis = seconds * 1000.0;
    millis.is_finite().then(|| millis.round() as i64)
}
