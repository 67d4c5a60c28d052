//! Query specification and its rendering into query parameters.
//!
//! A [`QuerySpec`] is an immutable value object built per call. Encoding is
//! deterministic: the same spec against the same schema always yields the
//! same parameters in the same order, so requests are reproducible and
//! cacheable by the caller.

use chrono::SecondsFormat;

use crate::schema::{PaginationStyle, ResourceSchema};
use crate::value::Value;

/// Filter comparison operator. The wire token for each operator comes from
/// the schema's [`FilterTokens`](crate::schema::FilterTokens) table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Contains,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

/// Position inside a paged result set: a numeric offset or an opaque token
/// echoed back to the server, depending on the pagination style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor {
    Offset(u64),
    Token(String),
}

/// A structured query: filters, sort order, pagination and an optional
/// field subset. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySpec {
    filters: Vec<Filter>,
    sort: Vec<SortKey>,
    page_size: Option<u64>,
    cursor: Option<Cursor>,
    select: Option<Vec<String>>,
}

impl QuerySpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn sort_asc(mut self, field: impl Into<String>) -> Self {
        self.sort.push(SortKey {
            field: field.into(),
            direction: SortDirection::Ascending,
        });
        self
    }

    pub fn sort_desc(mut self, field: impl Into<String>) -> Self {
        self.sort.push(SortKey {
            field: field.into(),
            direction: SortDirection::Descending,
        });
        self
    }

    pub fn page_size(mut self, size: u64) -> Self {
        self.page_size = Some(size);
        self
    }

    /// Request a subset of fields. One or many names are normalized into an
    /// ordered sequence here at the boundary; the identity field is added
    /// during encoding regardless.
    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn page_size_value(&self) -> Option<u64> {
        self.page_size
    }

    pub fn cursor_value(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    /// The same query positioned at a cursor. Used by the pager to advance;
    /// filters and sort are carried over untouched.
    pub fn at_cursor(&self, cursor: Cursor) -> QuerySpec {
        let mut spec = self.clone();
        spec.cursor = Some(cursor);
        spec
    }
}

/// Rendered query parameters, in deterministic order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodedQuery {
    pub params: Vec<(String, String)>,
}

/// Render a query spec against a schema.
///
/// Parameter order is fixed: filters (declaration order), sort, field
/// subset, page size, cursor. The field subset is silently omitted when the
/// schema declares no selection parameter — selection is a hint, never a
/// correctness requirement.
pub fn encode_query(spec: &QuerySpec, schema: &ResourceSchema) -> EncodedQuery {
    let mut params = Vec::new();

    for filter in &spec.filters {
        let wire = schema.wire_name(&filter.field);
        let key = format!("{wire}{}", schema.filter_tokens.suffix(filter.op));
        params.push((key, render_value(&filter.value)));
    }

    if !spec.sort.is_empty() {
        let rendered: Vec<String> = spec
            .sort
            .iter()
            .map(|key| match key.direction {
                SortDirection::Ascending => schema.wire_name(&key.field).to_string(),
                SortDirection::Descending => format!(
                    "{}{}",
                    schema.sort.descending_prefix,
                    schema.wire_name(&key.field)
                ),
            })
            .collect();
        params.push((
            schema.sort.param.clone(),
            rendered.join(&schema.sort.separator),
        ));
    }

    if let Some(param) = &schema.fields_param {
        // An explicit subset wins; otherwise excluded-by-default fields
        // produce a default subset of everything else. With neither, no
        // selection parameter is sent and the server returns its default.
        let names = match &spec.select {
            Some(select) => Some(
                select
                    .iter()
                    .map(|f| schema.wire_name(f).to_string())
                    .collect::<Vec<_>>(),
            ),
            None if schema.fields().iter().any(|f| f.excluded) => Some(
                schema
                    .fields()
                    .iter()
                    .filter(|f| !f.excluded)
                    .map(|f| f.wire_name.clone())
                    .collect(),
            ),
            None => None,
        };
        if let Some(mut names) = names {
            let id_wire = schema.wire_name(&schema.id_field).to_string();
            if !names.contains(&id_wire) {
                names.insert(0, id_wire);
            }
            params.push((param.clone(), names.join(",")));
        }
    }

    if let Some(size) = spec.page_size {
        let limit_param = match &schema.pagination {
            PaginationStyle::OffsetLimit { limit_param, .. } => limit_param,
            PaginationStyle::CursorToken { limit_param, .. } => limit_param,
        };
        params.push((limit_param.clone(), size.to_string()));
    }

    match (&spec.cursor, &schema.pagination) {
        (Some(Cursor::Offset(offset)), PaginationStyle::OffsetLimit { offset_param, .. }) => {
            params.push((offset_param.clone(), offset.to_string()));
        }
        (Some(Cursor::Token(token)), PaginationStyle::CursorToken { cursor_param, .. }) => {
            params.push((cursor_param.clone(), token.clone()));
        }
        // A cursor of the wrong kind for the configured style carries no
        // meaning for the server and is not rendered.
        _ => {}
    }

    EncodedQuery { params }
}

/// Render a filter value as a query literal. Lists join with commas (the
/// in-set convention); timestamps render as ISO-8601.
fn render_value(value: &Value) -> String {
    match value {
        Value::Str(s) => s.clone(),
        Value::Int(n) => n.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Timestamp(ts) => ts.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        Value::List(items) => items
            .iter()
            .map(render_value)
            .collect::<Vec<_>>()
            .join(","),
        Value::Map(entries) => serde_json::to_string(
            &entries
                .iter()
                .map(|(k, v)| (k.clone(), render_value(v)))
                .collect::<std::collections::BTreeMap<_, _>>(),
        )
        .unwrap_or_default(),
    }
}
