//! Shared blocking HTTP plumbing.
//!
//! All three adapters talk to their service over JSON/HTTP. This module owns
//! the client builder, timeout settings, and the [`TransportError`] that every
//! adapter error chains as its source.

use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error as ThisError;

/// Failure of a single call to an underlying service client.
#[derive(Debug, ThisError)]
pub enum TransportError {
    /// The request could not be sent or the response could not be read.
    #[error("{kind} error")]
    Http {
        /// Coarse classification: `timeout`, `connect`, `request`, `body` or `unknown`.
        kind: &'static str,
        /// The client error.
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("server returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as returned.
        body: String,
    },

    /// The response body was not the JSON we expected.
    #[error("unexpected response body")]
    Decode(#[source] serde_json::Error),

    /// The configured address does not form a valid URL.
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A local file needed for the request could not be read.
    #[error("failed to read '{path}'")]
    Io {
        /// Path that was read.
        path: String,
        /// The I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl TransportError {
    /// Returns true when the server reported that the resource does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }

    fn from_reqwest(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            "timeout"
        } else if err.is_connect() {
            "connect"
        } else if err.is_request() {
            "request"
        } else if err.is_body() || err.is_decode() {
            "body"
        } else {
            "unknown"
        };
        Self::Http { kind, source: err }
    }
}

/// HTTP client configuration shared by every adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpConfig {
    /// Request timeout in milliseconds (0 to disable).
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds (0 to disable).
    pub connect_timeout_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            connect_timeout_ms: 3_000,
        }
    }
}

impl HttpConfig {
    /// Loads HTTP configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Applies environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Applies overrides from `lookup`, keyed by environment variable name.
    ///
    /// Unparseable values are ignored.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let parse = |name: &str| lookup(name).and_then(|v| v.trim().parse::<u64>().ok());
        if let Some(timeout_ms) = parse("CONDUIT_HTTP_TIMEOUT_MS") {
            self.timeout_ms = timeout_ms;
        }
        if let Some(connect_timeout_ms) = parse("CONDUIT_HTTP_CONNECT_TIMEOUT_MS") {
            self.connect_timeout_ms = connect_timeout_ms;
        }
        self
    }
}

/// Builds a blocking HTTP client with configured timeouts.
#[must_use]
pub fn build_http_client(config: HttpConfig) -> reqwest::blocking::Client {
    let mut builder = reqwest::blocking::Client::builder();
    if config.timeout_ms > 0 {
        builder = builder.timeout(Duration::from_millis(config.timeout_ms));
    }
    if config.connect_timeout_ms > 0 {
        builder = builder.connect_timeout(Duration::from_millis(config.connect_timeout_ms));
    }

    builder.build().unwrap_or_else(|err| {
        tracing::warn!("Failed to build HTTP client: {err}");
        reqwest::blocking::Client::new()
    })
}

/// Sends a request and fails on any non-success status.
pub(crate) fn send(
    request: reqwest::blocking::RequestBuilder,
) -> Result<reqwest::blocking::Response, TransportError> {
    let response = request.send().map_err(TransportError::from_reqwest)?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(TransportError::Status {
            status: status.as_u16(),
            body,
        });
    }

    Ok(response)
}

/// Reads a response body as JSON.
pub(crate) fn read_json<T: DeserializeOwned>(
    response: reqwest::blocking::Response,
) -> Result<T, TransportError> {
    let body = response.text().map_err(TransportError::from_reqwest)?;
    serde_json::from_str(&body).map_err(TransportError::Decode)
}

/// Sends a request and decodes the JSON response body.
pub(crate) fn send_json<T: DeserializeOwned>(
    request: reqwest::blocking::RequestBuilder,
) -> Result<T, TransportError> {
    read_json(send(request)?)
}

/// Joins a host that may or may not carry a scheme with a port.
pub(crate) fn base_url(host: &str, port: u16) -> String {
    let host = host.trim_end_matches('/');
    if host.contains("://") {
        format!("{host}:{port}")
    } else {
        format!("http://{host}:{port}")
    }
}


/// Scripted HTTP/1.1 server on a loopback port, for client tests.
#[cfg(test)]
pub(crate) mod loopback {
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread::JoinHandle;
    use std::time::{Duration, Instant};

    const WAIT: Duration = Duration::from_secs(5);

    /// One request as received by the server.
    #[derive(Debug, Clone)]
    pub(crate) struct Recorded {
        pub(crate) method: String,
        /// Path and query, as sent on the request line.
        pub(crate) target: String,
        headers: Vec<(String, String)>,
        pub(crate) body: String,
    }

    impl Recorded {
        pub(crate) fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        }

        pub(crate) fn json(&self) -> serde_json::Value {
            serde_json::from_str(&self.body).unwrap()
        }
    }

    /// Answers one connection per scripted `(status, body)` pair, in order.
    pub(crate) struct Server {
        port: u16,
        handle: JoinHandle<Vec<Recorded>>,
    }

    impl Server {
        pub(crate) fn start(replies: Vec<(u16, &str)>) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let port = listener.local_addr().unwrap().port();
            listener.set_nonblocking(true).unwrap();
            let replies: Vec<(u16, String)> =
                replies.into_iter().map(|(s, b)| (s, b.to_string())).collect();

            let handle = std::thread::spawn(move || {
                let mut seen = Vec::new();
                for (status, body) in replies {
                    let Some(mut stream) = accept(&listener) else {
                        break;
                    };
                    seen.push(read_request(&stream));
                    let response = format!(
                        "HTTP/1.1 {status} Scripted\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    stream.write_all(response.as_bytes()).unwrap();
                    stream.flush().unwrap();
                }
                seen
            });

            Self { port, handle }
        }

        pub(crate) const fn port(&self) -> u16 {
            self.port
        }

        pub(crate) fn url(&self) -> String {
            format!("http://127.0.0.1:{}", self.port)
        }

        /// Waits for the script to finish and returns what was received.
        pub(crate) fn requests(self) -> Vec<Recorded> {
            self.handle.join().unwrap()
        }
    }

    fn accept(listener: &TcpListener) -> Option<TcpStream> {
        let deadline = Instant::now() + WAIT;
        while Instant::now() < deadline {
            match listener.accept() {
                Ok((stream, _)) => {
                    stream.set_nonblocking(false).unwrap();
                    stream.set_read_timeout(Some(WAIT)).unwrap();
                    return Some(stream);
                },
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(Duration::from_millis(5));
                },
                Err(e) => panic!("accept failed: {e}"),
            }
        }
        None
    }

    fn read_request(stream: &TcpStream) -> Recorded {
        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        let mut parts = line.split_whitespace();
        let method = parts.next().unwrap_or_default().to_string();
        let target = parts.next().unwrap_or_default().to_string();

        let mut headers = Vec::new();
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                headers.push((name.trim().to_string(), value.trim().to_string()));
            }
        }

        let length = headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, v)| v.parse::<usize>().ok())
            .unwrap_or(0);
        let mut body = vec![0; length];
        reader.read_exact(&mut body).unwrap();

        Recorded {
            method,
            target,
            headers,
            body: String::from_utf8(body).unwrap(),
        }
    }
}
