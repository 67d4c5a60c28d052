//! Request builder: one logical operation becomes one `HttpRequest`.
//!
//! The builder substitutes the record id into the resource path for
//! singular operations, merges in the encoded query, serializes the
//! codec-encoded payload as JSON, and appends the context-supplied headers
//! verbatim — credential internals are never inspected here.

use serde_json::Value as Json;

use crate::codec::{encode_record, EncodeScope};
use crate::context::ApiContext;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest};
use crate::query::EncodedQuery;
use crate::record::Record;
use crate::schema::ResourceSchema;
use crate::url;
use crate::value::Value;

/// A logical adapter operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    FetchOne,
    FetchMany,
    Create,
    Replace,
    Update,
    Delete,
    DeleteMany,
    BulkUpdate,
}

impl Operation {
    pub fn method(self) -> HttpMethod {
        match self {
            Operation::FetchOne | Operation::FetchMany => HttpMethod::Get,
            Operation::Create => HttpMethod::Post,
            Operation::Replace => HttpMethod::Put,
            Operation::Update | Operation::BulkUpdate => HttpMethod::Patch,
            Operation::Delete | Operation::DeleteMany => HttpMethod::Delete,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Operation::FetchOne => "fetch-one",
            Operation::FetchMany => "fetch-many",
            Operation::Create => "create",
            Operation::Replace => "replace",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::DeleteMany => "delete-many",
            Operation::BulkUpdate => "bulk-update",
        }
    }

    /// Whether the operation addresses a single record by id in the path.
    pub fn is_singular(self) -> bool {
        matches!(
            self,
            Operation::FetchOne | Operation::Replace | Operation::Update | Operation::Delete
        )
    }
}

/// Outbound payload for an operation.
pub enum Payload<'a> {
    None,
    Record(&'a Record, EncodeScope),
    /// Bulk body: one wire object per record, already codec-encoded.
    Objects(Vec<serde_json::Map<String, Json>>),
}

/// Compose method, URL, headers and body for one operation.
pub fn build_request(
    op: Operation,
    id: Option<&Value>,
    payload: Payload<'_>,
    schema: &ResourceSchema,
    context: &ApiContext,
    query: &EncodedQuery,
) -> Result<HttpRequest, ApiError> {
    let id_text;
    // A resource path may span several segments, e.g. "v2/contacts".
    let mut segments: Vec<&str> = schema.path.split('/').collect();
    if op.is_singular() {
        let id = id.ok_or_else(|| {
            ApiError::Serialization(format!(
                "{} on `{}` requires a record id",
                op.name(),
                schema.resource
            ))
        })?;
        id_text = match id {
            Value::Str(s) => s.clone(),
            Value::Int(n) => n.to_string(),
            other => {
                return Err(ApiError::Serialization(format!(
                    "{} value cannot be used as a record id",
                    other.type_name()
                )))
            }
        };
        segments.push(&id_text);
    }

    let body = match payload {
        Payload::None => None,
        Payload::Record(record, scope) => {
            let wire = encode_record(record, schema, scope)?;
            Some(serialize_body(&Json::Object(wire))?)
        }
        Payload::Objects(objects) => {
            let array: Vec<Json> = objects.into_iter().map(Json::Object).collect();
            Some(serialize_body(&Json::Array(array))?)
        }
    };

    let mut headers = Vec::new();
    if body.is_some() {
        headers.push(("content-type".to_string(), "application/json".to_string()));
    }
    headers.extend(context.resolve_headers());

    Ok(HttpRequest {
        method: op.method(),
        url: url::join(context.base_url(), &segments, &query.params),
        headers,
        body,
    })
}

fn serialize_body(body: &Json) -> Result<String, ApiError> {
    serde_json::to_string(body).map_err(|e| ApiError::Serialization(e.to_string()))
}
