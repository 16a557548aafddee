//! End-to-end requests against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port and drives `HttpClient` through a
//! small blocking `Transport` built on ureq. The transport is deliberately
//! simple (no WebSocket support, multipart encoded by hand); it exists to
//! prove that the builder's configuration arrives intact on the wire.

use std::io::Write;
use std::net::SocketAddr;
use std::time::Duration;

use coro_http::{
    Body, ClientSettings, Cookies, DataAttachment, Endpoint, Error, FileAttachment, Frame, Headers, HttpClient,
    Response, Transport, TransportError, TransportErrorKind,
};
use mock_server::Echo;

const BOUNDARY: &str = "coro-http-test-boundary";

enum Part {
    File(FileAttachment),
    Data(DataAttachment),
}

/// Blocking transport over ureq, one request per instance.
struct UreqTransport {
    base: String,
    settings: ClientSettings,
    headers: Headers,
    cookies: Cookies,
    parts: Vec<Part>,
    method: String,
    body: String,
    response: Response,
    closed: bool,
}

fn connect(endpoint: &Endpoint) -> UreqTransport {
    let scheme = if endpoint.tls { "https" } else { "http" };
    UreqTransport {
        base: format!("{scheme}://{}:{}", endpoint.host, endpoint.port),
        settings: ClientSettings::new(),
        headers: Headers::new(),
        cookies: Cookies::new(),
        parts: Vec::new(),
        method: "GET".to_string(),
        body: String::new(),
        response: Response::default(),
        closed: false,
    }
}

fn map_ureq_error(err: ureq::Error) -> TransportError {
    let kind = match &err {
        ureq::Error::Timeout(_) => TransportErrorKind::Timeout,
        ureq::Error::HostNotFound | ureq::Error::ConnectionFailed => TransportErrorKind::Connect,
        ureq::Error::Io(io) => match io.kind() {
            std::io::ErrorKind::TimedOut => TransportErrorKind::Timeout,
            std::io::ErrorKind::ConnectionRefused => TransportErrorKind::Connect,
            _ => TransportErrorKind::Io,
        },
        _ => TransportErrorKind::Protocol,
    };
    TransportError::new(kind, err.to_string())
}

fn write_part(out: &mut Vec<u8>, name: &str, filename: Option<&str>, mime_type: Option<&str>, content: &[u8]) {
    write!(out, "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"").unwrap();
    if let Some(filename) = filename {
        write!(out, "; filename=\"{filename}\"").unwrap();
    }
    out.extend_from_slice(b"\r\n");
    if let Some(mime_type) = mime_type {
        write!(out, "Content-Type: {mime_type}\r\n").unwrap();
    }
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(content);
    out.extend_from_slice(b"\r\n");
}

impl UreqTransport {
    /// Content type override and payload bytes for the request.
    fn payload(&self) -> Result<(Option<String>, Vec<u8>), TransportError> {
        if self.parts.is_empty() {
            return Ok((None, self.body.clone().into_bytes()));
        }

        let mut out = Vec::new();
        for (name, value) in form_urlencoded::parse(self.body.as_bytes()) {
            write_part(&mut out, &name, None, None, value.as_bytes());
        }
        for part in &self.parts {
            match part {
                Part::File(file) => {
                    let bytes = std::fs::read(&file.path)
                        .map_err(|e| TransportError::new(TransportErrorKind::Io, e.to_string()))?;
                    let start = (file.offset as usize).min(bytes.len());
                    let end = match file.length {
                        0 => bytes.len(),
                        length => (start + length as usize).min(bytes.len()),
                    };
                    let filename = file
                        .filename
                        .clone()
                        .or_else(|| file.path.file_name().map(|n| n.to_string_lossy().into_owned()));
                    let mime_type = file.mime_type.as_deref().unwrap_or("application/octet-stream");
                    write_part(&mut out, &file.name, filename.as_deref(), Some(mime_type), &bytes[start..end]);
                }
                Part::Data(data) => write_part(
                    &mut out,
                    &data.name,
                    data.filename.as_deref(),
                    data.mime_type.as_deref(),
                    &data.data,
                ),
            }
        }
        write!(out, "--{BOUNDARY}--\r\n").unwrap();
        Ok((Some(format!("multipart/form-data; boundary={BOUNDARY}")), out))
    }
}

impl Transport for UreqTransport {
    fn set_settings(&mut self, settings: &ClientSettings) {
        self.settings = settings.clone();
    }

    fn set_headers(&mut self, headers: &Headers) {
        self.headers = headers.clone();
    }

    fn set_cookies(&mut self, cookies: &Cookies) {
        self.cookies = cookies.clone();
    }

    fn add_file(&mut self, file: &FileAttachment) {
        self.parts.push(Part::File(file.clone()));
    }

    fn add_data(&mut self, data: &DataAttachment) {
        self.parts.push(Part::Data(data.clone()));
    }

    fn set_method(&mut self, method: &str) {
        self.method = method.to_string();
    }

    fn set_body(&mut self, body: &str) {
        self.body = body.to_string();
    }

    fn execute(&mut self, uri: &str) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::new(TransportErrorKind::Closed, "transport already closed"));
        }
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(self.settings.timeout())
            .timeout_connect(self.settings.connect_timeout())
            .build()
            .new_agent();

        let (content_type, payload) = self.payload()?;
        let mut builder = ureq::http::Request::builder()
            .method(self.method.as_str())
            .uri(format!("{}{uri}", self.base));
        for (name, value) in &self.headers {
            // Framing headers belong to ureq.
            if name.eq_ignore_ascii_case("content-length") {
                continue;
            }
            if content_type.is_some() && name.eq_ignore_ascii_case("content-type") {
                continue;
            }
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(content_type) = &content_type {
            builder = builder.header("Content-Type", content_type.as_str());
        }
        if !self.cookies.is_empty() {
            let line: Vec<String> = self.cookies.iter().map(|(k, v)| format!("{k}={v}")).collect();
            builder = builder.header("Cookie", line.join("; "));
        }

        let protocol = |e: ureq::http::Error| TransportError::new(TransportErrorKind::Protocol, e.to_string());
        let result = if payload.is_empty() {
            agent.run(builder.body(()).map_err(protocol)?)
        } else {
            agent.run(builder.body(payload).map_err(protocol)?)
        };
        let mut response = result.map_err(map_ureq_error)?;

        let mut snapshot = Response {
            status: response.status().as_u16(),
            ..Response::default()
        };
        for (name, value) in response.headers() {
            let Ok(value) = value.to_str() else {
                continue;
            };
            if *name == ureq::http::header::SET_COOKIE {
                snapshot.set_cookie_headers.push(value.to_string());
                let pair = value.split(';').next().and_then(|pair| pair.split_once('='));
                if let Some((k, v)) = pair {
                    snapshot.cookies.insert(k.trim().to_string(), v.trim().to_string());
                }
            }
            snapshot.headers.push((name.as_str().to_string(), value.to_string()));
        }
        snapshot.body = response.body_mut().read_to_vec().map_err(map_ureq_error)?;
        self.response = snapshot;
        Ok(())
    }

    fn response(&self) -> Response {
        self.response.clone()
    }

    fn close(&mut self) {
        self.closed = true;
    }

    fn upgrade(&mut self, _uri: &str) -> Result<bool, TransportError> {
        Err(TransportError::new(
            TransportErrorKind::Protocol,
            "websocket is not supported by the ureq transport",
        ))
    }

    fn push(&mut self, _frame: &Frame) -> Result<bool, TransportError> {
        Err(TransportError::new(TransportErrorKind::Protocol, "not upgraded"))
    }

    fn recv(&mut self, _timeout: Duration) -> Result<Frame, TransportError> {
        Err(TransportError::new(TransportErrorKind::Protocol, "not upgraded"))
    }
}

/// Start the mock server on a random port in a background thread.
fn start_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

fn client(addr: SocketAddr, path: &str) -> HttpClient<fn(&Endpoint) -> UreqTransport> {
    HttpClient::with_url(connect as fn(&Endpoint) -> UreqTransport, &format!("http://{addr}{path}")).unwrap()
}

#[test]
fn get_carries_headers_query_and_cookies() {
    let addr = start_server();
    let mut client = client(addr, "/search?q=rust");
    client.set_header("X-Trace", "on").add_cookie("sid", "abc");

    let response = client.execute(None).unwrap();
    assert_eq!(response.status, 200);
    assert!(response.is_success());
    assert_eq!(response.cookie("served_by"), Some("mock-server"));
    assert_eq!(response.set_cookie_headers, vec![mock_server::SESSION_COOKIE.to_string()]);

    let echo: Echo = response.json().unwrap();
    assert_eq!(echo.method, "GET");
    assert_eq!(echo.path, "/search");
    assert_eq!(echo.query.as_deref(), Some("q=rust"));
    assert_eq!(echo.headers["user-agent"], "coro-http/0.1");
    assert_eq!(echo.headers["x-trace"], "on");
    assert_eq!(echo.cookies["sid"], "abc");
    assert!(echo.body.is_empty());
}

#[test]
fn url_without_path_requests_root() {
    let addr = start_server();
    let mut client = client(addr, "?page=2");

    let echo: Echo = client.execute(None).unwrap().json().unwrap();
    assert_eq!(echo.path, "/");
    assert_eq!(echo.query.as_deref(), Some("page=2"));
}

#[test]
fn form_post_is_url_encoded() {
    let addr = start_server();
    let mut client = client(addr, "/form");
    client.post(Body::form([("a", "1"), ("b", "x y")]), None);

    let echo: Echo = client.execute(None).unwrap().json().unwrap();
    assert_eq!(echo.method, "POST");
    assert_eq!(echo.body, "a=1&b=x+y");
    assert_eq!(echo.headers["content-type"], "application/x-www-form-urlencoded");
}

#[test]
fn json_post_sends_raw_body() {
    let addr = start_server();
    let mut client = client(addr, "/api/items");
    client.post_json(r#"{"k":1}"#);

    let echo: Echo = client.execute(None).unwrap().json().unwrap();
    assert_eq!(echo.method, "POST");
    assert_eq!(echo.body, r#"{"k":1}"#);
    assert_eq!(echo.headers["content-type"], "text/json");
    assert_eq!(echo.headers["content-length"], "7");
}

#[test]
fn custom_method_is_uppercased() {
    let addr = start_server();
    let mut client = client(addr, "/items/7");
    client.set_method("delete");

    let echo: Echo = client.execute(None).unwrap().json().unwrap();
    assert_eq!(echo.method, "DELETE");
}

#[test]
fn binary_body_is_returned_untouched() {
    let addr = start_server();
    let mut client = client(addr, "/logo.png");

    let response = client.execute(None).unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.header("content-type"), Some("image/png"));
    assert_eq!(response.body, mock_server::LOGO_BYTES);
    assert!(std::str::from_utf8(&response.body).is_err());
}

#[test]
fn error_status_is_a_response_not_an_error() {
    let addr = start_server();
    let mut client = client(addr, "/status/404");

    let response = client.execute(None).unwrap();
    assert_eq!(response.status, 404);
    assert!(!response.is_success());
}

#[test]
fn multipart_parts_arrive_in_order() {
    let addr = start_server();
    let path = std::env::temp_dir().join(format!("coro-http-upload-{}.txt", std::process::id()));
    std::fs::write(&path, "0123456789").unwrap();

    let mut client = client(addr, "/upload");
    client
        .set_method("POST")
        .set_data([("title", "report")])
        .add_file(FileAttachment::new(&path, "first").filename("digits.txt").range(2, 3))
        .add_data(DataAttachment::new("inline text", "second").mime_type("text/plain"));

    let echo: Echo = client.execute(None).unwrap().json().unwrap();
    std::fs::remove_file(&path).unwrap();

    assert!(echo.headers["content-type"].starts_with("multipart/form-data"));
    let title = echo.body.find("name=\"title\"").unwrap();
    let first = echo.body.find("name=\"first\"; filename=\"digits.txt\"").unwrap();
    let second = echo.body.find("name=\"second\"").unwrap();
    assert!(title < first && first < second);
    assert!(echo.body.contains("\r\n\r\n234\r\n"));
    assert!(echo.body.contains("inline text"));
}

#[test]
fn slow_response_exceeds_timeout() {
    let addr = start_server();
    let mut client = client(addr, "/slow?ms=1000");

    let err = client.execute(Some(Duration::from_millis(100))).unwrap_err();
    match err {
        Error::Transport(err) => assert_eq!(err.kind, TransportErrorKind::Timeout),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn refused_connection_is_a_connect_error() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let mut client = client(addr, "/");

    let err = client.execute(None).unwrap_err();
    match err {
        Error::Transport(err) => assert_eq!(err.kind, TransportErrorKind::Connect),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn unsupported_upgrade_propagates_transport_error() {
    let addr = start_server();
    let mut client = client(addr, "/socket");

    let err = client.upgrade(true).unwrap_err();
    assert!(matches!(
        err,
        Error::Transport(TransportError {
            kind: TransportErrorKind::Protocol,
            ..
        })
    ));
    assert!(matches!(client.push(&Frame::text("x")), Err(Error::NotUpgraded)));
}
