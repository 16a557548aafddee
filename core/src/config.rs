//! Request configuration pieces accumulated by `HttpClient`.
//!
//! # Design
//! Header and cookie maps are plain `BTreeMap<String, String>` so that a
//! transport sees them in a stable order. Client settings are an open map of
//! JSON values: the builder only understands `timeout`, `connect_timeout` and
//! `websocket_mask`; any other key is an opaque knob for the transport.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

pub type Headers = BTreeMap<String, String>;
pub type Cookies = BTreeMap<String, String>;

pub const DEFAULT_USER_AGENT: &str = "coro-http/0.1";
pub const DEFAULT_TIMEOUT_SECS: f64 = 3.0;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: f64 = 5.0;

/// Headers every new builder starts with.
pub fn default_headers() -> Headers {
    [
        ("User-Agent", DEFAULT_USER_AGENT),
        ("Accept", "text/html,application/xhtml+xml,application/xml"),
        ("Accept-Encoding", "gzip"),
        ("Pragma", "no-cache"),
        ("Cache-Control", "no-cache"),
        ("Content-Type", "application/x-www-form-urlencoded"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Request body: form fields encoded on execute, or a pre-encoded payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Form(Vec<(String, String)>),
    Raw(String),
}

impl Body {
    pub fn form<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Body::Form(fields.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// The string handed to the transport: `application/x-www-form-urlencoded`
    /// for form fields, the payload itself otherwise.
    pub fn encode(&self) -> String {
        match self {
            Body::Form(fields) => form_urlencoded::Serializer::new(String::new())
                .extend_pairs(fields.iter())
                .finish(),
            Body::Raw(raw) => raw.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Body::Form(fields) => fields.is_empty(),
            Body::Raw(raw) => raw.is_empty(),
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Body::Form(Vec::new())
    }
}

impl From<&str> for Body {
    fn from(raw: &str) -> Self {
        Body::Raw(raw.to_string())
    }
}

impl From<String> for Body {
    fn from(raw: String) -> Self {
        Body::Raw(raw)
    }
}

impl From<Vec<(String, String)>> for Body {
    fn from(fields: Vec<(String, String)>) -> Self {
        Body::Form(fields)
    }
}

/// A file sent as one part of a multipart body.
///
/// `length == 0` means "from `offset` to the end of the file".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttachment {
    pub path: PathBuf,
    pub name: String,
    pub mime_type: Option<String>,
    pub filename: Option<String>,
    pub offset: u64,
    pub length: u64,
}

impl FileAttachment {
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            mime_type: None,
            filename: None,
            offset: 0,
            length: 0,
        }
    }

    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn range(mut self, offset: u64, length: u64) -> Self {
        self.offset = offset;
        self.length = length;
        self
    }
}

/// In-memory data sent as one part of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataAttachment {
    pub data: Vec<u8>,
    pub name: String,
    pub mime_type: Option<String>,
    pub filename: Option<String>,
}

impl DataAttachment {
    pub fn new(data: impl Into<Vec<u8>>, name: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            name: name.into(),
            mime_type: None,
            filename: None,
        }
    }

    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }
}

/// Transport knobs keyed by name. Timeouts are stored as fractional seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientSettings(BTreeMap<String, Value>);

impl ClientSettings {
    pub const TIMEOUT: &'static str = "timeout";
    pub const CONNECT_TIMEOUT: &'static str = "connect_timeout";
    pub const WEBSOCKET_MASK: &'static str = "websocket_mask";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.seconds(Self::TIMEOUT)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.seconds(Self::CONNECT_TIMEOUT)
    }

    pub fn websocket_mask(&self) -> Option<bool> {
        self.0.get(Self::WEBSOCKET_MASK).and_then(Value::as_bool)
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.insert(Self::TIMEOUT, timeout.as_secs_f64());
    }

    pub fn set_connect_timeout(&mut self, timeout: Duration) {
        self.insert(Self::CONNECT_TIMEOUT, timeout.as_secs_f64());
    }

    // Negative, out-of-range or non-numeric values read as unset.
    fn seconds(&self, key: &str) -> Option<Duration> {
        let secs = self.0.get(key)?.as_f64()?;
        Duration::try_from_secs_f64(secs).ok()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ClientSettings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Starting configuration for new builders, loadable from JSON.
///
/// Missing fields fall back to the built-in defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientDefaults {
    pub user_agent: String,
    pub timeout_secs: f64,
    pub connect_timeout_secs: f64,
    /// Merged over the built-in default headers.
    pub headers: Headers,
    /// Merged over the timeout settings.
    pub settings: ClientSettings,
}

impl ClientDefaults {
    pub fn from_json(raw: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn headers(&self) -> Headers {
        let mut headers = default_headers();
        headers.insert("User-Agent".to_string(), self.user_agent.clone());
        headers.extend(self.headers.iter().map(|(k, v)| (k.clone(), v.clone())));
        headers
    }

    pub fn settings(&self) -> ClientSettings {
        let mut settings = ClientSettings::new();
        settings.insert(ClientSettings::TIMEOUT, self.timeout_secs);
        settings.insert(ClientSettings::CONNECT_TIMEOUT, self.connect_timeout_secs);
        for (key, value) in self.settings.iter() {
            settings.insert(key.clone(), value.clone());
        }
        settings
    }
}

impl Default for ClientDefaults {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            headers: Headers::new(),
            settings: ClientSettings::new(),
        }
    }
}
