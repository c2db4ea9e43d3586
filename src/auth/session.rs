//! `Set-Cookie` / `Cookie` header framing for the session cookie.
//!
//! The structured value (`v=..;k=..`) contains `;` and `=`, so it travels
//! base64 encoded to stay a single cookie-octet string.

use axum::http::{
    header::{InvalidHeaderValue, COOKIE},
    HeaderMap, HeaderValue,
};
use base64ct::{Base64, Encoding};
use std::time::Duration;

use super::cookie::COOKIE_NAME;

/// Build the `HttpOnly` cookie carrying an encoded session value.
pub(super) fn session_cookie(
    value: &str,
    ttl: Option<Duration>,
    secure: bool,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let wrapped = Base64::encode_string(value.as_bytes());
    let mut cookie = format!("{COOKIE_NAME}={wrapped}; Path=/; HttpOnly; SameSite=Lax");
    if let Some(ttl) = ttl {
        cookie.push_str(&format!("; Max-Age={}", ttl.as_secs()));
    }
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(super) fn clear_session_cookie(secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{COOKIE_NAME}=deleted; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Collect every `CockpitAuth` pair from the request's `Cookie` headers that
/// unwraps to text, in header order.
///
/// Browsers send one pair per matching path, so more than one may appear.
pub(super) fn extract_session_values(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .filter(|(name, _)| name.trim() == COOKIE_NAME)
        .filter_map(|(_, wrapped)| Base64::decode_vec(wrapped.trim()).ok())
        .filter_map(|bytes| String::from_utf8(bytes).ok())
        .collect()
}
