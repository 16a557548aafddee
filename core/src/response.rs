//! Snapshot of a transport's state after one request.
//!
//! # Design
//! `Response` is plain owned data, filled in by the transport's `response()`
//! and never touched again by the builder. Header names keep the case the
//! transport reported; lookups are case-insensitive. The body is kept as raw
//! bytes since compressed or binary payloads are ordinary responses.

use std::borrow::Cow;

use serde::de::DeserializeOwned;

use crate::config::Cookies;
use crate::error::Error;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// Cookies set by the server, by name.
    pub cookies: Cookies,
    /// Raw `Set-Cookie` header lines in arrival order.
    pub set_cookie_headers: Vec<String>,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First header value whose name matches `name` ignoring ASCII case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Body as UTF-8, with invalid sequences replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}
