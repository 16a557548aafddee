use std::{collections::BTreeMap, time::Duration};

use axum::{
    extract::{Path, Query},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, time::sleep};
use tracing::debug;

pub const SESSION_COOKIE: &str = "served_by=mock-server; Path=/";

/// PNG signature prefix followed by bytes that are not valid UTF-8.
pub const LOGO_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0xff, 0x00];

/// What the server saw, sent back as the response body.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Echo {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    /// Header names are lowercase.
    pub headers: BTreeMap<String, String>,
    pub cookies: BTreeMap<String, String>,
    pub body: String,
}

#[derive(Deserialize)]
pub struct SlowParams {
    #[serde(default)]
    pub ms: u64,
}

pub fn app() -> Router {
    Router::new()
        .route("/status/{code}", get(status).post(status))
        .route("/slow", get(slow))
        .route("/logo.png", get(logo))
        .fallback(echo)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: String) -> impl IntoResponse {
    debug!(%method, %uri, "echoing request");
    let cookies = headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .map(parse_cookie_header)
        .unwrap_or_default();
    let headers = headers
        .iter()
        .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
        .collect();
    let echo = Echo {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers,
        cookies,
        body,
    };
    ([(header::SET_COOKIE, SESSION_COOKIE)], Json(echo))
}

async fn status(Path(code): Path<u16>) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST)
}

async fn slow(Query(params): Query<SlowParams>) -> &'static str {
    sleep(Duration::from_millis(params.ms)).await;
    "done"
}

async fn logo() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "image/png")], LOGO_BYTES)
}

/// Split a `Cookie` request header into name/value pairs.
pub fn parse_cookie_header(raw: &str) -> BTreeMap<String, String> {
    raw.split(';')
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_header_splits_pairs() {
        let cookies = parse_cookie_header("sid=abc; theme=dark");
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies["sid"], "abc");
        assert_eq!(cookies["theme"], "dark");
    }

    #[test]
    fn cookie_header_skips_malformed_pairs() {
        let cookies = parse_cookie_header("sid=abc; garbage; ;lang=en");
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies["lang"], "en");
    }

    #[test]
    fn echo_roundtrips_through_json() {
        let echo = Echo {
            method: "POST".to_string(),
            path: "/form".to_string(),
            query: Some("a=1".to_string()),
            headers: BTreeMap::new(),
            cookies: BTreeMap::new(),
            body: "x=1".to_string(),
        };
        let json = serde_json::to_string(&echo).unwrap();
        let back: Echo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, echo);
    }

    #[test]
    fn slow_params_default_to_zero() {
        let params: SlowParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.ms, 0);
    }
}
