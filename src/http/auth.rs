//! Bearer-token extraction and constant-time validation.

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use subtle::ConstantTimeEq;

/// Extracts the bearer token from the `Authorization` header.
///
/// Anything that is not exactly `Bearer <token>` (case-insensitive scheme)
/// yields the empty token, which never matches a configured one.
pub fn bearer_token(headers: &HeaderMap) -> &str {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return "";
    };
    let Ok(value) = value.to_str() else {
        return "";
    };

    let parts: Vec<&str> = value.split(' ').collect();
    if parts.len() != 2 || !parts[0].eq_ignore_ascii_case("bearer") {
        return "";
    }
    parts[1]
}

/// Compares a supplied token against the configured one in constant time,
/// so response timing does not leak how much of a guess was correct.
pub fn token_matches(supplied: &str, expected: &str) -> bool {
    supplied.as_bytes().ct_eq(expected.as_bytes()).into()
}
