//! HTTP exchange types shared by the engine and the transports.
//!
//! # Design
//! Requests and responses are plain data. The engine resolves queries into
//! `HttpRequest` values without touching the network and interprets
//! `HttpResponse` values the same way regardless of which transport produced
//! them. Only the `Transport` implementations perform I/O.
//!
//! `RequestContext` is the credential-free subset of a request. It is copied
//! into every error derived from an exchange so failures name the URL and
//! parameters that caused them.

use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

/// HTTP method for a request. The upstream API is read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HttpMethod {
    Get,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
        }
    }
}

/// A fully resolved HTTP request.
///
/// Built by `IfpaClient::resolve*`. `url` is the absolute URL without the
/// query string; `path` is the endpoint path relative to the base URL.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub id: Uuid,
    pub method: HttpMethod,
    pub url: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
}

impl HttpRequest {
    pub fn context(&self) -> RequestContext {
        RequestContext {
            request_id: self.id,
            method: self.method,
            url: self.url.clone(),
            path: self.path.clone(),
            query: self.query.clone(),
        }
    }

    /// Look up a query parameter by wire name.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Look up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// An HTTP response as returned by a transport.
///
/// A 4xx/5xx status is still a successful transport result; status
/// interpretation belongs to the engine.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// The request that produced a response or failure, minus credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub method: HttpMethod,
    pub url: String,
    pub path: String,
    pub query: Vec<(String, String)>,
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}
