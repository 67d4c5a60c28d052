//! Resource configuration: field mapping, pagination style, envelope shape.
//!
//! A [`ResourceSchema`] is built once per resource type and never mutated
//! afterwards; the adapter shares it across concurrent calls. REST APIs
//! disagree on filter syntax, sort encoding and envelope shape, so all of
//! those are configuration points here rather than hardcoded conventions.

use crate::query::FilterOp;
use crate::value::FieldType;

/// One declared field: model name, wire name and type.
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: String,
    pub wire_name: String,
    pub field_type: FieldType,
    /// Excluded from the default field-selection subset.
    pub excluded: bool,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        Self {
            wire_name: name.clone(),
            name,
            field_type,
            excluded: false,
        }
    }

    /// Map the model field to a differently named wire field.
    pub fn wire(mut self, wire_name: impl Into<String>) -> Self {
        self.wire_name = wire_name.into();
        self
    }

    pub fn excluded(mut self) -> Self {
        self.excluded = true;
        self
    }
}

/// What to do with wire fields that are not in the declared mapping.
/// This is a single schema-wide switch, never a per-field decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownFieldPolicy {
    #[default]
    Drop,
    Keep,
}

/// Whether a single bad field aborts the whole record or is dropped with a
/// warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strictness {
    #[default]
    Strict,
    Lenient,
}

/// How fetch-many results are paged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaginationStyle {
    /// Numeric offset plus page-size limit, both as query parameters.
    OffsetLimit { offset_param: String, limit_param: String },
    /// Opaque continuation token echoed back to the server.
    CursorToken { cursor_param: String, limit_param: String },
}

impl PaginationStyle {
    pub fn offset_limit() -> Self {
        PaginationStyle::OffsetLimit {
            offset_param: "offset".to_string(),
            limit_param: "limit".to_string(),
        }
    }

    pub fn cursor_token() -> Self {
        PaginationStyle::CursorToken {
            cursor_param: "cursor".to_string(),
            limit_param: "limit".to_string(),
        }
    }
}

/// Keys of the collection-response envelope. A collection may also arrive
/// as a bare JSON array, in which case none of these apply.
#[derive(Debug, Clone)]
pub struct EnvelopeConfig {
    /// Key holding the array of records.
    pub records_key: String,
    /// Key holding the next-page token or URL; null/absent ends pagination.
    pub next_key: String,
    /// Key holding the total record count, when the API reports one.
    pub total_key: Option<String>,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            records_key: "results".to_string(),
            next_key: "next".to_string(),
            total_key: None,
        }
    }
}

/// How sort order is rendered into a single ordered query parameter.
#[derive(Debug, Clone)]
pub struct SortEncoding {
    pub param: String,
    pub separator: String,
    pub descending_prefix: String,
}

impl Default for SortEncoding {
    fn default() -> Self {
        Self {
            param: "ordering".to_string(),
            separator: ",".to_string(),
            descending_prefix: "-".to_string(),
        }
    }
}

/// Operator-to-token table for rendering filter predicates. The token is
/// appended to the wire field name; equality is conventionally bare.
#[derive(Debug, Clone)]
pub struct FilterTokens {
    pub eq: String,
    pub ne: String,
    pub gt: String,
    pub gte: String,
    pub lt: String,
    pub lte: String,
    pub r#in: String,
    pub contains: String,
}

impl Default for FilterTokens {
    fn default() -> Self {
        Self {
            eq: String::new(),
            ne: "__ne".to_string(),
            gt: "__gt".to_string(),
            gte: "__gte".to_string(),
            lt: "__lt".to_string(),
            lte: "__lte".to_string(),
            r#in: "__in".to_string(),
            contains: "__contains".to_string(),
        }
    }
}

impl FilterTokens {
    pub fn suffix(&self, op: FilterOp) -> &str {
        match op {
            FilterOp::Eq => &self.eq,
            FilterOp::Ne => &self.ne,
            FilterOp::Gt => &self.gt,
            FilterOp::Gte => &self.gte,
            FilterOp::Lt => &self.lt,
            FilterOp::Lte => &self.lte,
            FilterOp::In => &self.r#in,
            FilterOp::Contains => &self.contains,
        }
    }
}

/// Immutable configuration for one REST resource.
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    /// Resource name used in diagnostics, e.g. `"contact"`.
    pub resource: String,
    /// Collection path under the base URL, e.g. `"contacts"`. Singular
    /// operations append the record id as an extra path segment.
    pub path: String,
    /// Model name of the identity field.
    pub id_field: String,
    fields: Vec<FieldDef>,
    pub unknown_fields: UnknownFieldPolicy,
    pub strictness: Strictness,
    pub pagination: PaginationStyle,
    pub envelope: EnvelopeConfig,
    pub filter_tokens: FilterTokens,
    pub sort: SortEncoding,
    /// Query parameter for field-subset selection. `None` means the API
    /// does not support selection and the hint is silently omitted.
    pub fields_param: Option<String>,
}

impl ResourceSchema {
    pub fn new(resource: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            path: path.into(),
            id_field: "id".to_string(),
            fields: Vec::new(),
            unknown_fields: UnknownFieldPolicy::default(),
            strictness: Strictness::default(),
            pagination: PaginationStyle::offset_limit(),
            envelope: EnvelopeConfig::default(),
            filter_tokens: FilterTokens::default(),
            sort: SortEncoding::default(),
            fields_param: None,
        }
    }

    /// Declare a field. Declaration order is preserved and drives encode
    /// order and sort tie-breaking.
    pub fn field(mut self, def: FieldDef) -> Self {
        self.fields.push(def);
        self
    }

    pub fn with_id_field(mut self, name: impl Into<String>) -> Self {
        self.id_field = name.into();
        self
    }

    pub fn with_pagination(mut self, style: PaginationStyle) -> Self {
        self.pagination = style;
        self
    }

    pub fn with_envelope(mut self, envelope: EnvelopeConfig) -> Self {
        self.envelope = envelope;
        self
    }

    pub fn with_unknown_fields(mut self, policy: UnknownFieldPolicy) -> Self {
        self.unknown_fields = policy;
        self
    }

    pub fn with_strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = strictness;
        self
    }

    pub fn with_filter_tokens(mut self, tokens: FilterTokens) -> Self {
        self.filter_tokens = tokens;
        self
    }

    pub fn with_sort(mut self, sort: SortEncoding) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_fields_param(mut self, param: impl Into<String>) -> Self {
        self.fields_param = Some(param.into());
        self
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn field_def(&self, model_name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == model_name)
    }

    pub fn field_by_wire(&self, wire_name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.wire_name == wire_name)
    }

    /// Wire name for a model field, falling back to the model name when the
    /// field is not declared.
    pub fn wire_name<'a>(&'a self, model_name: &'a str) -> &'a str {
        self.field_def(model_name)
            .map(|f| f.wire_name.as_str())
            .unwrap_or(model_name)
    }
}
