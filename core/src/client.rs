//! Fluent request builder over a pluggable transport.
//!
//! # Design
//! `HttpClient` only accumulates configuration. On `execute` or `upgrade` it
//! asks its `Connector` for a fresh `Transport`, replays the configuration
//! into it in a fixed order (settings, headers, cookies, file parts, data
//! parts, method, body) and lets the transport do the I/O.
//!
//! A builder runs at most one request. In request/response mode the
//! transport is closed before `execute` returns, whatever the outcome. In
//! WebSocket mode the transport stays open inside the builder for
//! `push`/`recv` until the caller closes it or takes it with `into_client`.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{
    default_headers, Body, ClientDefaults, ClientSettings, Cookies, DataAttachment, FileAttachment, Headers,
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS,
};
use crate::error::Error;
use crate::frame::Frame;
use crate::response::Response;
use crate::target::TargetUrl;
use crate::transport::{Connector, Transport};

enum Stage<T> {
    Configuring,
    Executed,
    Upgraded { transport: T, accepted: bool },
    Closed,
}

/// Chainable request configuration bound to a transport factory.
pub struct HttpClient<C: Connector> {
    connector: C,
    url: Option<TargetUrl>,
    method: String,
    headers: Headers,
    body: Body,
    cookies: Cookies,
    files: Vec<FileAttachment>,
    data: Vec<DataAttachment>,
    settings: ClientSettings,
    stage: Stage<C::Transport>,
}

impl<C: Connector> HttpClient<C> {
    pub fn new(connector: C) -> Self {
        let mut settings = ClientSettings::new();
        settings.insert(ClientSettings::TIMEOUT, DEFAULT_TIMEOUT_SECS);
        settings.insert(ClientSettings::CONNECT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT_SECS);
        Self {
            connector,
            url: None,
            method: "GET".to_string(),
            headers: default_headers(),
            body: Body::default(),
            cookies: Cookies::new(),
            files: Vec::new(),
            data: Vec::new(),
            settings,
            stage: Stage::Configuring,
        }
    }

    pub fn with_url(connector: C, url: &str) -> Result<Self, Error> {
        let mut client = Self::new(connector);
        client.set_url(url)?;
        Ok(client)
    }

    pub fn with_defaults(connector: C, defaults: &ClientDefaults) -> Self {
        let mut client = Self::new(connector);
        client.headers = defaults.headers();
        client.settings = defaults.settings();
        client
    }

    // ---------------------------------------------------------------------
    // Configuration
    // ---------------------------------------------------------------------

    pub fn set_url(&mut self, url: &str) -> Result<&mut Self, Error> {
        self.url = Some(TargetUrl::parse(url)?);
        Ok(self)
    }

    pub fn url(&self) -> Option<&TargetUrl> {
        self.url.as_ref()
    }

    /// Replace the body with form fields. The method is left alone.
    pub fn set_data<I, K, V>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.body = Body::form(fields);
        self
    }

    pub fn set_method(&mut self, method: &str) -> &mut Self {
        self.method = method.to_uppercase();
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Switch to `POST` with `body`.
    ///
    /// A raw body also sets `Content-Length` to its length in bytes.
    pub fn post(&mut self, body: impl Into<Body>, content_type: Option<&str>) -> &mut Self {
        self.body = body.into();
        self.method = "POST".to_string();
        if let Some(content_type) = content_type {
            self.set_header("Content-Type", content_type);
        }
        if let Body::Raw(raw) = &self.body {
            let length = raw.len().to_string();
            self.set_header("Content-Length", length);
        }
        self
    }

    pub fn post_json(&mut self, json: &str) -> &mut Self {
        self.post(json, Some("text/json"))
    }

    pub fn post_xml(&mut self, xml: &str) -> &mut Self {
        self.post(xml, Some("text/xml"))
    }

    /// Replace every header, defaults included.
    pub fn set_headers<I, K, V>(&mut self, headers: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers = headers.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Replace every client setting, timeouts included.
    pub fn set_client_settings(&mut self, settings: ClientSettings) -> &mut Self {
        self.settings = settings;
        self
    }

    pub fn set_client_setting(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.settings.insert(key, value);
        self
    }

    pub fn client_settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn set_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.settings.set_timeout(timeout);
        self
    }

    pub fn set_connect_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.settings.set_connect_timeout(timeout);
        self
    }

    /// Replace every cookie.
    pub fn add_cookies<I, K, V>(&mut self, cookies: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.cookies = cookies.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self
    }

    pub fn add_cookie(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn cookies(&self) -> &Cookies {
        &self.cookies
    }

    pub fn add_file(&mut self, file: FileAttachment) -> &mut Self {
        self.files.push(file);
        self
    }

    pub fn add_data(&mut self, data: DataAttachment) -> &mut Self {
        self.data.push(data);
        self
    }

    // ---------------------------------------------------------------------
    // Execution
    // ---------------------------------------------------------------------

    /// Run one request and return the transport's response.
    ///
    /// `timeout` overrides the configured overall timeout. The transport is
    /// closed exactly once before this returns.
    pub fn execute(&mut self, timeout: Option<Duration>) -> Result<Response, Error> {
        self.ensure_unused()?;
        if let Some(timeout) = timeout {
            self.set_timeout(timeout);
        }
        let (mut transport, uri) = self.connect()?;
        self.stage = Stage::Executed;

        for file in &self.files {
            transport.add_file(file);
        }
        for datum in &self.data {
            transport.add_data(datum);
        }
        transport.set_method(&self.method);
        transport.set_body(&self.body.encode());

        debug!(
            method = %self.method,
            %uri,
            files = self.files.len(),
            data = self.data.len(),
            "executing request"
        );
        let outcome = transport.execute(&uri).map(|()| transport.response());
        transport.close();

        match outcome {
            Ok(response) => {
                debug!(status = response.status, %uri, "request completed");
                Ok(response)
            }
            Err(err) => {
                warn!(error = %err, %uri, "request failed");
                Err(err.into())
            }
        }
    }

    /// Ask the transport to upgrade to WebSocket. The transport stays open
    /// in the builder whatever the answer.
    pub fn upgrade(&mut self, mask: bool) -> Result<bool, Error> {
        self.ensure_unused()?;
        self.settings.insert(ClientSettings::WEBSOCKET_MASK, mask);
        let (mut transport, uri) = self.connect()?;

        let outcome = transport.upgrade(&uri);
        let accepted = matches!(outcome, Ok(true));
        self.stage = Stage::Upgraded { transport, accepted };

        match outcome {
            Ok(accepted) => {
                debug!(%uri, accepted, mask, "websocket upgrade finished");
                Ok(accepted)
            }
            Err(err) => {
                warn!(error = %err, %uri, "websocket upgrade failed");
                Err(err.into())
            }
        }
    }

    pub fn push(&mut self, frame: &Frame) -> Result<bool, Error> {
        Ok(self.upgraded()?.push(frame)?)
    }

    pub fn recv(&mut self, timeout: Duration) -> Result<Frame, Error> {
        Ok(self.upgraded()?.recv(timeout)?)
    }

    /// The transport retained by `upgrade`, if any.
    pub fn client(&self) -> Option<&C::Transport> {
        match &self.stage {
            Stage::Upgraded { transport, .. } => Some(transport),
            _ => None,
        }
    }

    pub fn client_mut(&mut self) -> Option<&mut C::Transport> {
        match &mut self.stage {
            Stage::Upgraded { transport, .. } => Some(transport),
            _ => None,
        }
    }

    /// Take ownership of the transport retained by `upgrade`.
    pub fn into_client(self) -> Option<C::Transport> {
        match self.stage {
            Stage::Upgraded { transport, .. } => Some(transport),
            _ => None,
        }
    }

    /// Close the transport retained by `upgrade`. No-op otherwise.
    pub fn close(&mut self) {
        if let Stage::Upgraded { transport, .. } = &mut self.stage {
            debug!("closing websocket transport");
            transport.close();
            self.stage = Stage::Closed;
        }
    }

    fn ensure_unused(&self) -> Result<(), Error> {
        match self.stage {
            Stage::Configuring => Ok(()),
            _ => Err(Error::AlreadyUsed),
        }
    }

    fn upgraded(&mut self) -> Result<&mut C::Transport, Error> {
        match &mut self.stage {
            Stage::Upgraded {
                transport,
                accepted: true,
            } => Ok(transport),
            _ => Err(Error::NotUpgraded),
        }
    }

    /// Create a transport for the configured URL and push the shared
    /// configuration into it. Returns the transport and the request URI.
    fn connect(&self) -> Result<(C::Transport, String), Error> {
        let url = self
            .url
            .as_ref()
            .ok_or_else(|| Error::InvalidUrl("no url configured".to_string()))?;
        let endpoint = url.endpoint();
        debug!(
            host = %endpoint.host,
            port = endpoint.port,
            tls = endpoint.tls,
            "creating transport"
        );

        let mut transport = self.connector.connect(&endpoint);
        transport.set_settings(&self.settings);
        transport.set_headers(&self.headers);
        if !self.cookies.is_empty() {
            transport.set_cookies(&self.cookies);
        }
        Ok((transport, url.request_uri()))
    }
}
