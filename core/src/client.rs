//! The REST adapter: operations over one resource through a transport.
//!
//! # Design
//! `RestClient` is constructed once per resource and shared freely; all of
//! its state is immutable, per-call state lives on the stack. Each
//! operation walks the same path: encode the query, build the request,
//! send it through the retry loop, parse the response. Only `Server` and
//! `Transport` errors are retried, with bounded exponential backoff and an
//! optional overall deadline.

use std::time::{Duration, Instant};

use serde_json::Value as Json;

use crate::codec::{encode_record, EncodeScope};
use crate::context::ApiContext;
use crate::error::{ApiError, ErrorContext};
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::pager::RecordStream;
use crate::query::{encode_query, EncodedQuery, FilterOp, QuerySpec};
use crate::record::Record;
use crate::request::{build_request, Operation, Payload};
use crate::response::{parse_response, PageMeta, ParsedResult};
use crate::schema::ResourceSchema;
use crate::value::Value;

/// Backoff configuration for retry-eligible failures.
///
/// `max_attempts` counts every try including the first; the delay before
/// attempt `n + 1` is `base_delay * 2^n`, capped at `max_delay`. When a
/// `deadline` is set, no retry starts once it would overrun the deadline.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub deadline: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            deadline: None,
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no backoff.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Overall time budget across all attempts of one operation.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Backoff before the retry following attempt number `attempt`
    /// (zero-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.min(16);
        self.base_delay
            .saturating_mul(1u32 << exp)
            .min(self.max_delay)
    }

    fn may_retry(&self, attempt: u32, started: Instant) -> bool {
        if attempt >= self.max_attempts {
            return false;
        }
        match self.deadline {
            Some(deadline) => started.elapsed() + self.delay_for(attempt - 1) < deadline,
            None => true,
        }
    }
}

/// Typed REST operations over one resource.
pub struct RestClient<T: Transport> {
    schema: ResourceSchema,
    context: ApiContext,
    transport: T,
    retry: RetryPolicy,
}

impl<T: Transport> RestClient<T> {
    pub fn new(schema: ResourceSchema, context: ApiContext, transport: T) -> Self {
        Self {
            schema,
            context,
            transport,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn schema(&self) -> &ResourceSchema {
        &self.schema
    }

    pub fn context(&self) -> &ApiContext {
        &self.context
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetch a single record by id.
    pub fn fetch_one(&self, id: impl Into<Value>) -> Result<Record, ApiError> {
        let id = id.into();
        let (parsed, ctx) = self.execute(
            Operation::FetchOne,
            Some(&id),
            Payload::None,
            &EncodedQuery::default(),
        )?;
        match parsed {
            ParsedResult::One(record) => Ok(record),
            ParsedResult::Many { mut records, .. } if records.len() == 1 => Ok(records.remove(0)),
            _ => Err(ApiError::MalformedResponse {
                ctx,
                detail: "expected exactly one record in the response".to_string(),
            }),
        }
    }

    /// Lazily fetch all records matching the query, page by page.
    pub fn fetch_many(&self, query: &QuerySpec) -> RecordStream<'_, T> {
        RecordStream::new(self, query.clone())
    }

    /// Fetch the first matching record, or `None` when there is no match.
    pub fn fetch_first(&self, query: &QuerySpec) -> Result<Option<Record>, ApiError> {
        let (records, _) = self.fetch_page(&query.clone().page_size(1))?;
        Ok(records.into_iter().next())
    }

    /// Create a record. Returns the server's echo of the created record when
    /// the response carries one; the local record is marked clean either way.
    pub fn create(&self, record: &mut Record) -> Result<Option<Record>, ApiError> {
        let (parsed, _) = self.execute(
            Operation::Create,
            None,
            Payload::Record(record, EncodeScope::All),
            &EncodedQuery::default(),
        )?;
        record.mark_clean();
        Ok(maybe_one(parsed))
    }

    /// Replace a record wholesale (PUT of every set field).
    pub fn replace(&self, record: &mut Record) -> Result<Option<Record>, ApiError> {
        let id = self.record_id(record)?;
        let (parsed, _) = self.execute(
            Operation::Replace,
            Some(&id),
            Payload::Record(record, EncodeScope::All),
            &EncodedQuery::default(),
        )?;
        record.mark_clean();
        Ok(maybe_one(parsed))
    }

    /// Partially update a record: PATCH carrying only the dirty fields.
    /// A clean record sends nothing and returns `Ok(None)`.
    pub fn update(&self, record: &mut Record) -> Result<Option<Record>, ApiError> {
        if !record.is_dirty() {
            tracing::debug!(resource = %self.schema.resource, "update skipped, no changes");
            return Ok(None);
        }
        let id = self.record_id(record)?;
        let (parsed, _) = self.execute(
            Operation::Update,
            Some(&id),
            Payload::Record(record, EncodeScope::DirtyOnly),
            &EncodedQuery::default(),
        )?;
        record.mark_clean();
        Ok(maybe_one(parsed))
    }

    /// Send all dirty records in one PATCH with an array body. Each wire
    /// object carries the record's dirty fields plus its id. Clean records
    /// are skipped. Returns how many records were sent.
    pub fn bulk_update(&self, records: &mut [Record]) -> Result<usize, ApiError> {
        let mut objects = Vec::new();
        let mut sent = Vec::new();
        for (index, record) in records.iter().enumerate() {
            if !record.is_dirty() {
                continue;
            }
            let id = self.record_id(record)?;
            let mut wire = encode_record(record, &self.schema, EncodeScope::DirtyOnly)?;
            let id_wire = self.schema.wire_name(&self.schema.id_field).to_string();
            wire.insert(id_wire, scalar_to_json(&id)?);
            objects.push(wire);
            sent.push(index);
        }
        if objects.is_empty() {
            tracing::debug!(resource = %self.schema.resource, "bulk update skipped, no changes");
            return Ok(0);
        }
        let count = objects.len();
        self.execute(
            Operation::BulkUpdate,
            None,
            Payload::Objects(objects),
            &EncodedQuery::default(),
        )?;
        for index in sent {
            records[index].mark_clean();
        }
        Ok(count)
    }

    /// Delete the record's server-side counterpart.
    pub fn delete(&self, record: &Record) -> Result<(), ApiError> {
        let id = self.record_id(record)?;
        self.delete_id(&id)
    }

    pub fn delete_id(&self, id: &Value) -> Result<(), ApiError> {
        self.execute(
            Operation::Delete,
            Some(id),
            Payload::None,
            &EncodedQuery::default(),
        )?;
        Ok(())
    }

    /// Delete several records in one request, addressed by an id in-set
    /// filter on the collection.
    pub fn delete_many(&self, ids: &[Value]) -> Result<(), ApiError> {
        if ids.is_empty() {
            return Ok(());
        }
        let spec = QuerySpec::new().filter(
            self.schema.id_field.clone(),
            FilterOp::In,
            Value::List(ids.to_vec()),
        );
        let query = encode_query(&spec, &self.schema);
        self.execute(Operation::DeleteMany, None, Payload::None, &query)?;
        Ok(())
    }

    /// One page of a fetch-many. The pager drives this.
    pub(crate) fn fetch_page(&self, query: &QuerySpec) -> Result<(Vec<Record>, PageMeta), ApiError> {
        let encoded = encode_query(query, &self.schema);
        let (parsed, _) = self.execute(Operation::FetchMany, None, Payload::None, &encoded)?;
        match parsed {
            ParsedResult::Many { records, page } => Ok((records, page)),
            ParsedResult::One(record) => {
                let page = PageMeta {
                    next_token: None,
                    total_count: None,
                    returned: 1,
                };
                Ok((vec![record], page))
            }
            ParsedResult::Empty => Ok((Vec::new(), PageMeta::default())),
        }
    }

    fn execute(
        &self,
        op: Operation,
        id: Option<&Value>,
        payload: Payload<'_>,
        query: &EncodedQuery,
    ) -> Result<(ParsedResult, ErrorContext), ApiError> {
        let request = build_request(op, id, payload, &self.schema, &self.context, query)?;
        let ctx = ErrorContext::new(op.name(), self.schema.resource.clone(), request.url.clone());
        let response = self.send(&request, &ctx)?;
        let parsed = parse_response(&response, &self.schema, op, ctx.clone())?;
        Ok((parsed, ctx.with_status(response.status)))
    }

    /// Execute with retry. Only transport failures and 5xx responses are
    /// retried; any other response is returned as-is for classification.
    fn send(&self, request: &HttpRequest, ctx: &ErrorContext) -> Result<HttpResponse, ApiError> {
        let started = Instant::now();
        let mut attempt = 0u32;
        loop {
            tracing::debug!(
                method = request.method.as_str(),
                url = %request.url,
                attempt = attempt + 1,
                "sending request"
            );
            match self.transport.execute(request) {
                Ok(response) => {
                    attempt += 1;
                    if response.status >= 500 && self.retry.may_retry(attempt, started) {
                        let delay = self.retry.delay_for(attempt - 1);
                        tracing::warn!(
                            status = response.status,
                            url = %request.url,
                            delay_ms = delay.as_millis() as u64,
                            "server error, retrying"
                        );
                        std::thread::sleep(delay);
                        continue;
                    }
                    return Ok(response);
                }
                Err(failure) => {
                    attempt += 1;
                    if self.retry.may_retry(attempt, started) {
                        let delay = self.retry.delay_for(attempt - 1);
                        tracing::warn!(
                            error = %failure,
                            url = %request.url,
                            delay_ms = delay.as_millis() as u64,
                            "transport failure, retrying"
                        );
                        std::thread::sleep(delay);
                        continue;
                    }
                    return Err(ApiError::Transport {
                        ctx: ctx.clone(),
                        detail: failure.to_string(),
                    });
                }
            }
        }
    }

    fn record_id(&self, record: &Record) -> Result<Value, ApiError> {
        record
            .value(&self.schema.id_field)
            .cloned()
            .ok_or_else(|| {
                ApiError::Serialization(format!(
                    "record has no `{}` value",
                    self.schema.id_field
                ))
            })
    }

}

fn maybe_one(parsed: ParsedResult) -> Option<Record> {
    match parsed {
        ParsedResult::One(record) => Some(record),
        _ => None,
    }
}

fn scalar_to_json(id: &Value) -> Result<Json, ApiError> {
    match id {
        Value::Str(s) => Ok(Json::String(s.clone())),
        Value::Int(n) => Ok(Json::Number((*n).into())),
        other => Err(ApiError::Serialization(format!(
            "{} value cannot be used as a record id",
            other.type_name()
        ))),
    }
}
