//! Parsed request target.
//!
//! Only the pieces the transport needs survive parsing: scheme, host,
//! optional explicit port, path and query. Everything else (userinfo,
//! fragment) is dropped.

use url::Url;

use crate::error::Error;
use crate::transport::Endpoint;

/// A URL with a guaranteed non-empty host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetUrl {
    scheme: String,
    host: String,
    port: Option<u16>,
    path: String,
    query: Option<String>,
}

impl TargetUrl {
    /// Parse `input`, rejecting anything without a host.
    pub fn parse(input: &str) -> Result<Self, Error> {
        let url = Url::parse(input).map_err(|e| Error::InvalidUrl(format!("{input} ({e})")))?;
        let host = match url.host_str() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => return Err(Error::InvalidUrl(format!("{input} has no host"))),
        };
        Ok(Self {
            scheme: url.scheme().to_string(),
            host,
            port: url.port(),
            path: url.path().to_string(),
            query: url.query().map(str::to_string),
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// The port written in the URL, if any.
    ///
    /// A port equal to the scheme's well-known default is normalized away
    /// during parsing, which is harmless since `resolved_port` restores it.
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn is_tls(&self) -> bool {
        matches!(self.scheme.as_str(), "https" | "wss")
    }

    /// Explicit port, else 443 for TLS schemes and 80 for everything else.
    pub fn resolved_port(&self) -> u16 {
        match self.port {
            Some(port) => port,
            None if self.is_tls() => 443,
            None => 80,
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint {
            host: self.host.clone(),
            port: self.resolved_port(),
            tls: self.is_tls(),
        }
    }

    /// Path plus query, as sent on the request line.
    pub fn request_uri(&self) -> String {
        request_uri(&self.path, self.query.as_deref())
    }
}

/// Join `path` and `query`: an empty path becomes `/`, and `?query` is
/// appended only when the query is non-empty.
pub fn request_uri(path: &str, query: Option<&str>) -> String {
    let path = if path.is_empty() { "/" } else { path };
    match query {
        Some(query) if !query.is_empty() => format!("{path}?{query}"),
        _ => path.to_string(),
    }
}
