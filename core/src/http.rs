//! HTTP transport types and the transport seam.
//!
//! # Design
//! Requests and responses are plain owned data: the core builds
//! `HttpRequest` values and parses `HttpResponse` values without touching
//! the network. I/O happens only behind the [`Transport`] trait, so the
//! translation logic stays deterministic and easy to test. Because a
//! response is fully buffered before it is handed back, abandoning a paged
//! stream mid-iteration can never leak a live connection — whatever the
//! transport acquired is released inside `execute`.

use thiserror::Error;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// An HTTP request described as plain data, ready for a [`Transport`] to
/// execute.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// An HTTP response described as plain data, fully buffered.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// First header value with the given name, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether the body may be decoded as JSON. A missing content-type is
    /// treated as JSON-capable; some servers omit the header entirely.
    pub fn is_json(&self) -> bool {
        match self.header("content-type") {
            Some(ct) => ct.contains("json"),
            None => true,
        }
    }
}

/// Why a transport could not produce a response.
#[derive(Debug, Clone, Error)]
pub enum TransportFailure {
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("timed out: {0}")]
    Timeout(String),
}

/// The single I/O seam of the crate.
///
/// Implementations execute one request, fully read the response body, and
/// release the underlying connection resources before returning.
pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportFailure>;
}
