//! Error taxonomy for the REST mapping layer.
//!
//! # Design
//! Every variant that comes out of a request carries an [`ErrorContext`]
//! (operation, resource, attempted URL, status) so a failure is actionable
//! without re-running with extra instrumentation. Only `Server` and
//! `Transport` are retry-eligible; everything else is raised immediately.

use std::fmt;

use thiserror::Error;

use crate::value::FieldType;

/// Where an error happened: the logical operation, the resource it targeted,
/// the URL that was attempted, and the HTTP status if a response was
/// obtained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    pub operation: &'static str,
    pub resource: String,
    pub url: String,
    pub status: Option<u16>,
}

impl ErrorContext {
    pub fn new(operation: &'static str, resource: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            operation,
            resource: resource.into(),
            url: url.into(),
            status: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on `{}` ({})", self.operation, self.resource, self.url)?;
        if let Some(status) = self.status {
            write!(f, " [status {status}]")?;
        }
        Ok(())
    }
}

/// A single field failed to convert between its model type and its wire
/// shape. Carries the field name and the raw value for diagnosis.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("field `{field}` cannot be converted to {expected}: raw value ({raw})")]
pub struct CodecError {
    pub field: String,
    pub expected: FieldType,
    pub raw: String,
}

impl CodecError {
    pub fn new(field: impl Into<String>, expected: FieldType, raw: impl fmt::Display) -> Self {
        Self {
            field: field.into(),
            expected,
            raw: raw.to_string(),
        }
    }
}

/// Field-level message extracted from a validation error body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub messages: Vec<String>,
}

/// Errors raised by the REST mapping layer.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A field value could not be converted to its declared type.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The request payload could not be encoded into a request.
    #[error("cannot build request: {0}")]
    Serialization(String),

    /// A success status arrived with a body that is not decodable JSON.
    #[error("malformed response for {ctx}: {detail}")]
    MalformedResponse { ctx: ErrorContext, detail: String },

    /// The server returned 404 — the resource does not exist.
    #[error("not found for {ctx}")]
    NotFound { ctx: ErrorContext },

    /// The server rejected the payload (400/422), with any field-level
    /// messages the body supplied.
    #[error("validation failed for {ctx}: {detail}")]
    Validation {
        ctx: ErrorContext,
        detail: String,
        field_errors: Vec<FieldError>,
    },

    /// The server returned 401 or 403.
    #[error("authentication rejected for {ctx}: {detail}")]
    Auth { ctx: ErrorContext, detail: String },

    /// Any other 4xx status.
    #[error("client error for {ctx}: {detail}")]
    Client { ctx: ErrorContext, detail: String },

    /// A 5xx status. Retry-eligible.
    #[error("server error for {ctx}: {detail}")]
    Server { ctx: ErrorContext, detail: String },

    /// No response was obtained at all. Retry-eligible.
    #[error("transport failure for {ctx}: {detail}")]
    Transport { ctx: ErrorContext, detail: String },
}

impl ApiError {
    /// True for errors the adapter may retry with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Server { .. } | ApiError::Transport { .. })
    }

    /// The HTTP status attached to this error, if a response was obtained.
    pub fn status(&self) -> Option<u16> {
        self.context().and_then(|ctx| ctx.status)
    }

    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            ApiError::Codec(_) | ApiError::Serialization(_) => None,
            ApiError::MalformedResponse { ctx, .. }
            | ApiError::NotFound { ctx }
            | ApiError::Validation { ctx, .. }
            | ApiError::Auth { ctx, .. }
            | ApiError::Client { ctx, .. }
            | ApiError::Server { ctx, .. }
            | ApiError::Transport { ctx, .. } => Some(ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ErrorContext {
        ErrorContext::new("fetch-one", "contact", "http://x/contacts/1").with_status(500)
    }

    #[test]
    fn server_and_transport_are_retryable() {
        let server = ApiError::Server {
            ctx: ctx(),
            detail: "boom".into(),
        };
        let transport = ApiError::Transport {
            ctx: ErrorContext::new("fetch-one", "contact", "http://x/contacts/1"),
            detail: "refused".into(),
        };
        assert!(server.is_retryable());
        assert!(transport.is_retryable());
    }

    #[test]
    fn client_side_errors_are_not_retryable() {
        let not_found = ApiError::NotFound { ctx: ctx() };
        let validation = ApiError::Validation {
            ctx: ctx(),
            detail: "bad".into(),
            field_errors: Vec::new(),
        };
        let codec = ApiError::Codec(CodecError::new("age", FieldType::Int, "\"x\""));
        assert!(!not_found.is_retryable());
        assert!(!validation.is_retryable());
        assert!(!codec.is_retryable());
    }

    #[test]
    fn status_comes_from_context() {
        let err = ApiError::Server {
            ctx: ctx(),
            detail: "boom".into(),
        };
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn display_includes_operation_and_url() {
        let err = ApiError::NotFound { ctx: ctx() };
        let text = err.to_string();
        assert!(text.contains("fetch-one"));
        assert!(text.contains("http://x/contacts/1"));
    }
}
