//! Fluent HTTP/WebSocket request builder over a pluggable transport.
//!
//! # Overview
//! `HttpClient` accumulates a URL, method, headers, body, cookies, multipart
//! parts and transport settings, then hands all of it to a `Transport` for
//! exactly one request or one WebSocket upgrade. The crate itself never
//! touches the network (host-does-IO pattern): connecting, TLS, HTTP parsing
//! and WebSocket framing belong to whoever implements `Transport`.
//!
//! # Design
//! - `Connector` creates a fresh `Transport` per execution, bound to the
//!   host, port and TLS flag derived from the URL.
//! - Transport errors are passed through untouched inside `Error::Transport`.
//! - A builder is single-use; reuse after `execute`/`upgrade` is rejected.
//! - `Response` is an owned snapshot, decodable with `Response::json`.

pub mod client;
pub mod config;
pub mod error;
pub mod frame;
pub mod response;
pub mod target;
pub mod transport;

pub use client::HttpClient;
pub use config::{Body, ClientDefaults, ClientSettings, Cookies, DataAttachment, FileAttachment, Headers};
pub use error::{Error, TransportError, TransportErrorKind};
pub use frame::{Frame, Opcode};
pub use response::Response;
pub use target::TargetUrl;
pub use transport::{Connector, Endpoint, Transport};
