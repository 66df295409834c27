//! Error types for the IFPA API client.
//!
//! # Design
//! Each failure kind gets its own type so callers can match on exactly the
//! layer that failed: configuration, pre-flight validation, transport, an API
//! status, or a response shape mismatch. Errors derived from an HTTP exchange
//! carry the `RequestContext` that produced them.
//!
//! Semantic API errors are not a separate type: they are `ApiError` values
//! whose `kind` is something other than `ApiErrorKind::Generic`, so code that
//! only cares about "the API said no" can treat them uniformly.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::http::RequestContext;

/// Top-level error returned by every `IfpaClient` operation.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Api(#[from] ApiError),

    /// A 2xx response whose body did not match the expected shape.
    #[error("response from {} did not match the expected shape: {message}", context.url)]
    Deserialization {
        context: RequestContext,
        message: String,
    },

    /// A `first` call matched nothing.
    #[error("query against {} returned no results", context.url)]
    Empty { context: RequestContext },

    /// `get_all` found more results than the caller allowed.
    #[error("query has more than {max_results} results ({collected} seen before stopping)")]
    LimitExceeded { max_results: usize, collected: usize },
}

impl Error {
    /// The semantic kind when this is an API error.
    pub fn api_kind(&self) -> Option<&ApiErrorKind> {
        match self {
            Error::Api(err) => Some(&err.kind),
            _ => None,
        }
    }

    /// The request context when the error came from an HTTP exchange.
    pub fn context(&self) -> Option<&RequestContext> {
        match self {
            Error::Api(err) => Some(&err.context),
            Error::Deserialization { context, .. } | Error::Empty { context } => Some(context),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.api_kind(), Some(ApiErrorKind::NotFound { .. }))
    }
}

/// Client construction failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no API key configured: pass one explicitly or set {env_var}")]
    MissingApiKey { env_var: &'static str },

    #[error("invalid base URL {url:?}: expected an http:// or https:// URL")]
    InvalidBaseUrl { url: String },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Single-attempt transport failures. Never retried inside the crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("could not connect to {url}: {message}")]
    Connect { url: String, message: String },

    #[error("TLS failure talking to {url}: {message}")]
    Tls { url: String, message: String },

    #[error("response from {url} exceeded {limit} bytes")]
    BodyTooLarge { url: String, limit: u64 },

    #[error("transport failure for {url}: {message}")]
    Other { url: String, message: String },
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout { .. })
    }

    pub fn url(&self) -> &str {
        match self {
            TransportError::Timeout { url, .. }
            | TransportError::Connect { url, .. }
            | TransportError::Tls { url, .. }
            | TransportError::BodyTooLarge { url, .. }
            | TransportError::Other { url, .. } => url,
        }
    }
}

/// A non-2xx response from the API.
///
/// `status`, `body` and `context` are always populated verbatim; `kind` is
/// refined by the classifier when the response matches a known pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: u16,
    pub body: String,
    pub context: RequestContext,
    pub kind: ApiErrorKind,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HTTP {} from {} {}",
            self.status,
            self.context.method.as_str(),
            self.context.url
        )?;
        if !self.context.query.is_empty() {
            let params: Vec<String> = self
                .context
                .query
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            write!(f, "?{}", params.join("&"))?;
        }
        match &self.kind {
            ApiErrorKind::Generic => write!(f, ": {}", self.body),
            kind => write!(f, ": {kind}"),
        }
    }
}

impl std::error::Error for ApiError {}

/// Semantic classification of an API error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// No descriptor matched.
    Generic,

    /// The two players have no shared tournament history.
    PlayersNeverMet { player_id: u64, opponent_id: u64 },

    /// The requested resource does not exist.
    NotFound { resource: String, id: Option<u64> },

    /// The API key was missing, invalid, or lacks access.
    Unauthorized { message: String },

    /// Too many requests. `retry_after` is in seconds when the server sent it.
    RateLimited { retry_after: Option<u64> },
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiErrorKind::Generic => write!(f, "unclassified API error"),
            ApiErrorKind::PlayersNeverMet {
                player_id,
                opponent_id,
            } => write!(f, "players {player_id} and {opponent_id} have never met"),
            ApiErrorKind::NotFound { resource, id: Some(id) } => {
                write!(f, "{resource} {id} not found")
            }
            ApiErrorKind::NotFound { resource, id: None } => write!(f, "{resource} not found"),
            ApiErrorKind::Unauthorized { message } => write!(f, "unauthorized: {message}"),
            ApiErrorKind::RateLimited {
                retry_after: Some(secs),
            } => write!(f, "rate limited, retry after {secs}s"),
            ApiErrorKind::RateLimited { retry_after: None } => write!(f, "rate limited"),
        }
    }
}

/// Every rule a request violated, collected in one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub operation: &'static str,
    pub violations: Vec<Violation>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid parameters for {} ({} problem{})",
            self.operation,
            self.violations.len(),
            if self.violations.len() == 1 { "" } else { "s" }
        )?;
        for violation in &self.violations {
            write!(f, "\n  - {violation}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// One violated rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Rule identifier, e.g. `date_format`.
    pub rule: &'static str,
    /// Wire names of the parameters involved.
    pub params: Vec<&'static str>,
    pub message: String,
    pub hint: Option<&'static str>,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.rule, self.message)?;
        if let Some(hint) = self.hint {
            write!(f, " ({hint})")?;
        }
        Ok(())
    }
}
