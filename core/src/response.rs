//! Response parser: HTTP status and JSON body to records or a typed error.
//!
//! # Design
//! Status classification happens first; only 2xx responses reach body
//! decoding. An empty or non-JSON body on a success status is a valid
//! empty success (delete/update acknowledgements), but a body that claims
//! to be JSON and fails to decode is a `MalformedResponse` — never
//! silently swallowed. Collections arrive either as a bare array or inside
//! the schema-configured envelope, which also carries the pagination
//! metadata.

use serde_json::Value as Json;

use crate::codec::decode_record;
use crate::error::{ApiError, ErrorContext, FieldError};
use crate::http::HttpResponse;
use crate::record::Record;
use crate::request::Operation;
use crate::schema::ResourceSchema;

/// Pagination metadata extracted from one collection response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMeta {
    /// Continuation token (or URL) for the next page; `None` ends paging.
    pub next_token: Option<String>,
    /// Total record count when the envelope reports one.
    pub total_count: Option<u64>,
    /// How many records this page returned.
    pub returned: usize,
}

/// Outcome of parsing one successful response.
#[derive(Debug)]
pub enum ParsedResult {
    One(Record),
    Many { records: Vec<Record>, page: PageMeta },
    Empty,
}

/// Validate status, decode the body, hydrate records.
///
/// `ctx` names the operation, resource and attempted URL; the response
/// status is attached here.
pub fn parse_response(
    response: &HttpResponse,
    schema: &ResourceSchema,
    op: Operation,
    ctx: ErrorContext,
) -> Result<ParsedResult, ApiError> {
    let ctx = ctx.with_status(response.status);

    if !(200..300).contains(&response.status) {
        return Err(classify_error(response, ctx));
    }

    if response.body.trim().is_empty() || !response.is_json() {
        return Ok(ParsedResult::Empty);
    }

    let json: Json = serde_json::from_str(&response.body).map_err(|e| {
        ApiError::MalformedResponse {
            ctx: ctx.clone(),
            detail: format!("undecodable JSON body: {e}"),
        }
    })?;

    match op {
        Operation::Delete | Operation::DeleteMany => Ok(ParsedResult::Empty),
        Operation::FetchMany | Operation::BulkUpdate => parse_collection(&json, schema, &ctx),
        Operation::FetchOne | Operation::Create | Operation::Replace | Operation::Update => {
            match &json {
                Json::Object(wire) => {
                    let record = decode_record(wire, schema)?;
                    Ok(ParsedResult::One(record))
                }
                _ => Err(ApiError::MalformedResponse {
                    ctx,
                    detail: format!("expected a record object, got {}", json_kind(&json)),
                }),
            }
        }
    }
}

fn parse_collection(
    json: &Json,
    schema: &ResourceSchema,
    ctx: &ErrorContext,
) -> Result<ParsedResult, ApiError> {
    let (items, page) = match json {
        Json::Array(items) => (
            items,
            PageMeta {
                next_token: None,
                total_count: None,
                returned: items.len(),
            },
        ),
        Json::Object(envelope) => {
            let items = envelope
                .get(&schema.envelope.records_key)
                .and_then(Json::as_array)
                .ok_or_else(|| ApiError::MalformedResponse {
                    ctx: ctx.clone(),
                    detail: format!(
                        "collection envelope is missing the `{}` array",
                        schema.envelope.records_key
                    ),
                })?;
            let next_token = envelope
                .get(&schema.envelope.next_key)
                .and_then(Json::as_str)
                .map(str::to_string);
            let total_count = schema
                .envelope
                .total_key
                .as_ref()
                .and_then(|key| envelope.get(key))
                .and_then(Json::as_u64);
            (
                items,
                PageMeta {
                    next_token,
                    total_count,
                    returned: items.len(),
                },
            )
        }
        other => {
            return Err(ApiError::MalformedResponse {
                ctx: ctx.clone(),
                detail: format!("expected a collection, got {}", json_kind(other)),
            })
        }
    };

    let mut records = Vec::with_capacity(items.len());
    for item in items {
        let wire = item.as_object().ok_or_else(|| ApiError::MalformedResponse {
            ctx: ctx.clone(),
            detail: format!("collection item is not an object: {}", json_kind(item)),
        })?;
        records.push(decode_record(wire, schema)?);
    }
    Ok(ParsedResult::Many { records, page })
}

/// Map a non-2xx response to the error taxonomy.
fn classify_error(response: &HttpResponse, ctx: ErrorContext) -> ApiError {
    let body = response.body.as_str();
    match response.status {
        404 => ApiError::NotFound { ctx },
        400 | 422 => ApiError::Validation {
            ctx,
            detail: extract_detail(body),
            field_errors: extract_field_errors(body),
        },
        401 | 403 => ApiError::Auth {
            ctx,
            detail: extract_detail(body),
        },
        status if status >= 500 => ApiError::Server {
            ctx,
            detail: extract_detail(body),
        },
        _ => ApiError::Client {
            ctx,
            detail: extract_detail(body),
        },
    }
}

/// Human-oriented detail from an error body: a `detail` string when the
/// body is JSON in the common convention, otherwise the raw text.
fn extract_detail(body: &str) -> String {
    if let Ok(Json::Object(obj)) = serde_json::from_str::<Json>(body) {
        if let Some(detail) = obj.get("detail").and_then(Json::as_str) {
            return detail.to_string();
        }
    }
    body.to_string()
}

/// Field-level messages from a validation body shaped like
/// `{"errors": {"field": ["msg", ...]}}`. Single-string messages are
/// accepted too. Anything else yields no field errors.
fn extract_field_errors(body: &str) -> Vec<FieldError> {
    let Ok(Json::Object(obj)) = serde_json::from_str::<Json>(body) else {
        return Vec::new();
    };
    let Some(Json::Object(errors)) = obj.get("errors") else {
        return Vec::new();
    };
    errors
        .iter()
        .map(|(field, raw)| FieldError {
            field: field.clone(),
            messages: messages_of(raw),
        })
        .collect()
}

fn messages_of(raw: &Json) -> Vec<String> {
    match raw {
        Json::String(s) => vec![s.clone()],
        Json::Array(items) => items
            .iter()
            .filter_map(Json::as_str)
            .map(str::to_string)
            .collect(),
        other => vec![other.to_string()],
    }
}

fn json_kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "a boolean",
        Json::Number(_) => "a number",
        Json::String(_) => "a string",
        Json::Array(_) => "an array",
        Json::Object(_) => "an object",
    }
}
