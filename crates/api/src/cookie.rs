//! The `jwt-token` cookie.

use axum::http::HeaderMap;
use axum::http::header::COOKIE;
use chrono::{DateTime, Utc};

use gatekeeper_auth::TOKEN_COOKIE;

const COOKIE_DATE_LAYOUT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// The token from the request's cookies, if present and non-empty.
pub fn read_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == TOKEN_COOKIE)
        .map(|(_, value)| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value carrying a fresh token. Readable from scripts.
pub fn session_cookie(token: &str, expires: DateTime<Utc>) -> String {
    format!(
        "{TOKEN_COOKIE}={token}; Path=/; Expires={}",
        expires.format(COOKIE_DATE_LAYOUT)
    )
}

/// `Set-Cookie` value that makes the browser drop the token.
pub fn cleared_cookie() -> String {
    format!("{TOKEN_COOKIE}=; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT")
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn token_is_found_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark; jwt-token=abc.def.123"));
        assert_eq!(read_token(&headers).as_deref(), Some("abc.def.123"));
    }

    #[test]
    fn empty_or_missing_token_is_none() {
        let mut headers = HeaderMap::new();
        assert!(read_token(&headers).is_none());
        headers.append(COOKIE, HeaderValue::from_static("jwt-token="));
        assert!(read_token(&headers).is_none());
    }

    #[test]
    fn session_cookie_has_path_and_expiry() {
        let at = Utc.with_ymd_and_hms(2026, 5, 15, 12, 0, 0).unwrap();
        assert_eq!(
            session_cookie("t", at),
            "jwt-token=t; Path=/; Expires=Fri, 15 May 2026 12:00:00 GMT"
        );
        assert!(!session_cookie("t", at).contains("HttpOnly"));
        assert!(cleared_cookie().contains("Max-Age=0"));
    }
}
