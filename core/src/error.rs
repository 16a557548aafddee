//! Error types for the request builder.
//!
//! # Design
//! Transport failures are never translated: whatever the transport reports is
//! carried to the caller inside `Error::Transport` untouched. The builder adds
//! its own variants only for misuse it can detect before any I/O happens
//! (missing or malformed URL, frame I/O without an upgrade, reuse after the
//! single allowed execution).

use std::fmt;

/// Errors returned by `HttpClient` and `Response`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The URL could not be parsed into a non-empty host, or no URL was set
    /// before `execute`/`upgrade`.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// Failure reported by the transport client.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// `push`/`recv` was called without a successful `upgrade`.
    #[error("websocket connection has not been upgraded")]
    NotUpgraded,

    /// `execute` or `upgrade` was called a second time on the same builder.
    #[error("request builder has already been used")]
    AlreadyUsed,

    /// The response body (or a defaults profile) is not the expected JSON.
    #[error("json decoding failed: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Broad category of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Connect,
    Timeout,
    Tls,
    /// The connection was closed by the peer or by a prior `close`.
    Closed,
    Protocol,
    Io,
}

impl TransportErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportErrorKind::Connect => "connect",
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Tls => "tls",
            TransportErrorKind::Closed => "closed",
            TransportErrorKind::Protocol => "protocol",
            TransportErrorKind::Io => "io",
        }
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error produced by a `Transport` implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("transport {kind} error: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Connect, message)
    }
}
