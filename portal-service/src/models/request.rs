use axum::http::{header, request::Parts, HeaderMap, Uri};
use axum_extra::extract::cookie::CookieJar;

/// Per-request facts the gate and the identity adapter work from.
///
/// Built once at the edge and passed explicitly; nothing downstream reads
/// ambient session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Path component only, no query string.
    pub path: String,
    /// Absolute URL as the client requested it.
    pub url: String,
    /// Raw session token from the session cookie or a bearer header.
    pub session_token: Option<String>,
}

impl RequestContext {
    pub fn new(path: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            url: url.into(),
            session_token: None,
        }
    }

    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    /// Build the context from request parts. `public_url` supplies scheme and
    /// authority, since the server usually sits behind a proxy.
    pub fn from_parts(parts: &Parts, public_url: &str, session_cookie: &str) -> Self {
        Self {
            path: parts.uri.path().to_string(),
            url: absolute_url(public_url, &parts.uri),
            session_token: session_token(&parts.headers, session_cookie),
        }
    }
}

fn absolute_url(public_url: &str, uri: &Uri) -> String {
    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    format!("{}{}", public_url.trim_end_matches('/'), path_and_query)
}

/// The session cookie wins over an `Authorization: Bearer` header.
fn session_token(headers: &HeaderMap, session_cookie: &str) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(session_cookie) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| token.to_string())
}
