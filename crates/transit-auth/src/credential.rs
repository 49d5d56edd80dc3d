//! Credential and locale extraction from incoming requests

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use chrono_tz::Tz;

/// Custom header carrying the raw token
pub const TOKEN_HEADER: &str = "token";
/// Query and route parameter name carrying the raw token
pub const TOKEN_PARAM: &str = "token";
/// Optional header naming the caller's IANA timezone
pub const TIMEZONE_HEADER: &str = "timezone";

const BEARER_PREFIX: &str = "Bearer ";

/// Timezone supplied by the caller for this request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTimezone(pub Tz);

/// Find the presented credential
///
/// Sources are checked in a fixed order: the `token` header, the `token`
/// query parameter, the `token` route parameter, then an
/// `Authorization: Bearer` header. The first non-empty value wins.
pub fn extract_credential(
    headers: &HeaderMap,
    query: Option<&str>,
    route_token: Option<&str>,
) -> Option<String> {
    header_str(headers, TOKEN_HEADER)
        .map(str::to_string)
        .or_else(|| query.and_then(query_token))
        .or_else(|| non_empty(route_token).map(str::to_string))
        .or_else(|| bearer_token(headers).map(str::to_string))
}

/// Parse the optional timezone header; unknown zones are ignored
pub fn request_timezone(headers: &HeaderMap) -> Option<RequestTimezone> {
    header_str(headers, TIMEZONE_HEADER)
        .and_then(|name| name.parse::<Tz>().ok())
        .map(RequestTimezone)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    non_empty(headers.get(name).and_then(|h| h.to_str().ok()))
}

fn query_token(query: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == TOKEN_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(AUTHORIZATION)?.to_str().ok()?;
    non_empty(header.strip_prefix(BEARER_PREFIX))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
