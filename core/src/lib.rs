//! Synchronous object-to-REST mapping core.
//!
//! # Overview
//! Translates typed records into `HttpRequest` values and `HttpResponse`
//! values back into records, against a per-resource [`ResourceSchema`].
//! I/O happens only behind the [`Transport`] trait; everything else is
//! deterministic and testable without a network.
//!
//! # Design
//! - `RestClient` holds schema, context and transport; all shared state is
//!   immutable, so one client serves concurrent callers.
//! - Request building and response parsing are plain functions over plain
//!   data, so the I/O boundary is explicit.
//! - Records carry three-state fields (absent, explicit null, present) with
//!   dirty-tracking, so partial updates send exactly what changed.
//! - Fetch-many is a lazy [`RecordStream`] that pages on demand and may be
//!   abandoned at any point without leaking.

pub mod client;
pub mod codec;
pub mod context;
pub mod error;
pub mod http;
pub mod pager;
pub mod query;
pub mod record;
pub mod request;
pub mod response;
pub mod schema;
pub mod url;
pub mod value;

pub use client::{RestClient, RetryPolicy};
pub use codec::EncodeScope;
pub use context::ApiContext;
pub use error::{ApiError, CodecError, ErrorContext, FieldError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportFailure};
pub use pager::RecordStream;
pub use query::{Cursor, FilterOp, QuerySpec, SortDirection};
pub use record::Record;
pub use response::{PageMeta, ParsedResult};
pub use schema::{
    EnvelopeConfig, FieldDef, FilterTokens, PaginationStyle, ResourceSchema, SortEncoding,
    Strictness, UnknownFieldPolicy,
};
pub use value::{FieldType, FieldValue, Value};
