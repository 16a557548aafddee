//! Collaborator contract for the code that actually talks to the network.
//!
//! # Design
//! The core crate performs no I/O. A `Connector` creates one `Transport` per
//! request, bound to a single endpoint; the builder pushes configuration into
//! it and asks it to run exactly one request or one WebSocket upgrade. DNS,
//! TCP, TLS, HTTP parsing, multipart encoding and WebSocket framing all live
//! behind these traits.
//!
//! Configuration calls are infallible: a transport records what it is given
//! and reports problems when it performs I/O.

use std::time::Duration;

use crate::config::{ClientSettings, Cookies, DataAttachment, FileAttachment, Headers};
use crate::error::TransportError;
use crate::frame::Frame;
use crate::response::Response;

/// Where a transport connects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub tls: bool,
}

/// A single-use HTTP/WebSocket client bound to one `Endpoint`.
pub trait Transport {
    fn set_settings(&mut self, settings: &ClientSettings);

    fn set_headers(&mut self, headers: &Headers);

    fn set_cookies(&mut self, cookies: &Cookies);

    /// Register a multipart file part. Parts keep registration order.
    fn add_file(&mut self, file: &FileAttachment);

    /// Register a multipart in-memory part. Parts keep registration order.
    fn add_data(&mut self, data: &DataAttachment);

    fn set_method(&mut self, method: &str);

    fn set_body(&mut self, body: &str);

    /// Perform one request for `uri` (path and query) and keep the result
    /// for `response`.
    fn execute(&mut self, uri: &str) -> Result<(), TransportError>;

    /// State captured by the last successful `execute`.
    fn response(&self) -> Response;

    fn close(&mut self);

    /// Request a WebSocket upgrade for `uri`. `Ok(false)` means the server
    /// refused the upgrade.
    fn upgrade(&mut self, uri: &str) -> Result<bool, TransportError>;

    fn push(&mut self, frame: &Frame) -> Result<bool, TransportError>;

    fn recv(&mut self, timeout: Duration) -> Result<Frame, TransportError>;
}

/// Factory for transports.
pub trait Connector {
    type Transport: Transport;

    fn connect(&self, endpoint: &Endpoint) -> Self::Transport;
}

impl<F, T> Connector for F
where
    F: Fn(&Endpoint) -> T,
    T: Transport,
{
    type Transport = T;

    fn connect(&self, endpoint: &Endpoint) -> T {
        self(endpoint)
    }
}
