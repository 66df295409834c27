//! Single-attempt HTTP transports.
//!
//! # Design
//! `Transport` is the only I/O seam in the crate. It has exactly two entry
//! points, blocking and awaited, and both take the same `HttpRequest`. A
//! transport never retries, never logs, and never interprets status codes:
//! any response that arrives, 4xx/5xx included, is returned as data.
//!
//! `HttpTransport` owns one pooled `ureq::Agent` for blocking calls and one
//! pooled `reqwest::Client` for async calls, both built once at client
//! construction. Dropping the transport closes every pooled connection.
//! Dropping an in-flight `execute_async` future aborts the underlying
//! request and releases its connection.

use std::error::Error as StdError;
use std::fmt;
use std::io;

use async_trait::async_trait;

use crate::config::ClientConfig;
use crate::error::{ConfigError, TransportError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform `request`, blocking the calling thread.
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;

    /// Perform `request` on the async runtime.
    async fn execute_async(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Production transport.
#[derive(Clone)]
pub struct HttpTransport {
    agent: ureq::Agent,
    client: reqwest::Client,
    max_body_bytes: u64,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .max_idle_connections(config.max_idle_connections)
            .max_idle_connections_per_host(config.max_idle_connections)
            .build()
            .new_agent();

        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(config.max_idle_connections)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            agent,
            client,
            max_body_bytes: config.max_body_bytes,
        })
    }
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("max_body_bytes", &self.max_body_bytes)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = match request.method {
            HttpMethod::Get => self.agent.get(&request.url),
        };
        for (key, value) in &request.query {
            builder = builder.query(key, value);
        }
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }

        let mut response = builder
            .config()
            .timeout_global(Some(request.timeout))
            .build()
            .call()
            .map_err(|e| map_ureq_error(e, request, self.max_body_bytes))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
            .collect();
        let body = response
            .body_mut()
            .with_config()
            .limit(self.max_body_bytes)
            .read_to_vec()
            .map_err(|e| map_ureq_error(e, request, self.max_body_bytes))?;

        Ok(HttpResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }

    async fn execute_async(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
        };
        let mut builder = builder.query(&request.query).timeout(request.timeout);
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }

        let mut response = builder
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, request))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
            .collect();

        if response
            .content_length()
            .is_some_and(|len| len > self.max_body_bytes)
        {
            return Err(body_too_large(request, self.max_body_bytes));
        }
        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| map_reqwest_error(e, request))?
        {
            if (bytes.len() + chunk.len()) as u64 > self.max_body_bytes {
                return Err(body_too_large(request, self.max_body_bytes));
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(HttpResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

fn body_too_large(request: &HttpRequest, limit: u64) -> TransportError {
    TransportError::BodyTooLarge {
        url: request.url.clone(),
        limit,
    }
}

fn map_ureq_error(err: ureq::Error, request: &HttpRequest, limit: u64) -> TransportError {
    let url = request.url.clone();
    match err {
        ureq::Error::Timeout(_) => TransportError::Timeout {
            url,
            timeout: request.timeout,
        },
        ureq::Error::Io(e) if e.kind() == io::ErrorKind::TimedOut => TransportError::Timeout {
            url,
            timeout: request.timeout,
        },
        ureq::Error::BodyExceedsLimit(_) => TransportError::BodyTooLarge { url, limit },
        ureq::Error::ConnectionFailed => TransportError::Connect {
            url,
            message: "connection failed".to_string(),
        },
        ureq::Error::HostNotFound => TransportError::Connect {
            url,
            message: "host not found".to_string(),
        },
        ureq::Error::Io(e) if is_connect_io(&e) => TransportError::Connect {
            url,
            message: e.to_string(),
        },
        ureq::Error::Tls(message) => TransportError::Tls {
            url,
            message: message.to_string(),
        },
        other => TransportError::Other {
            url,
            message: other.to_string(),
        },
    }
}

fn is_connect_io(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::AddrNotAvailable
    )
}

fn map_reqwest_error(err: reqwest::Error, request: &HttpRequest) -> TransportError {
    let url = request.url.clone();
    if err.is_timeout() {
        return TransportError::Timeout {
            url,
            timeout: request.timeout,
        };
    }
    let message = error_chain(&err);
    if err.is_connect() {
        let lower = message.to_lowercase();
        if lower.contains("certificate") || lower.contains("tls") {
            return TransportError::Tls { url, message };
        }
        return TransportError::Connect { url, message };
    }
    TransportError::Other { url, message }
}

/// Flatten an error and its sources into one line.
fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
