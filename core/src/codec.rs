//! Field codec: model values to and from JSON-compatible wire values.
//!
//! Timestamps travel as ISO-8601 strings and come back as `DateTime<Utc>`.
//! Decoding distinguishes absent keys, explicit nulls and present values;
//! per-field failures either abort the record (`Strict`) or drop the field
//! with a warning (`Lenient`) — the lenient omission is still observable
//! through the `tracing` diagnostics.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Number, Value as Json};
use tracing::warn;

use crate::error::CodecError;
use crate::record::Record;
use crate::schema::{FieldDef, ResourceSchema, Strictness, UnknownFieldPolicy};
use crate::value::{FieldType, FieldValue, Value};

/// Which declared fields an outbound record encoding includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeScope {
    /// Every declared field that is set — full-replace updates and creates.
    All,
    /// Only fields changed since load — partial updates.
    DirtyOnly,
}

/// Encode one model value as its wire shape.
///
/// The declared type is only used for error reporting on nested values;
/// the value's own variant drives the encoding.
pub fn encode_value(field: &str, expected: FieldType, value: &Value) -> Result<Json, CodecError> {
    match value {
        Value::Str(s) => Ok(Json::String(s.clone())),
        Value::Int(n) => Ok(Json::Number(Number::from(*n))),
        Value::Float(f) => Number::from_f64(*f)
            .map(Json::Number)
            .ok_or_else(|| CodecError::new(field, expected, f)),
        Value::Bool(b) => Ok(Json::Bool(*b)),
        Value::Timestamp(ts) => Ok(Json::String(
            ts.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        )),
        Value::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(encode_value(field, expected, item)?);
            }
            Ok(Json::Array(out))
        }
        Value::Map(entries) => {
            let mut out = Map::new();
            for (key, item) in entries {
                out.insert(key.clone(), encode_value(field, expected, item)?);
            }
            Ok(Json::Object(out))
        }
    }
}

/// Decode one wire value into the field's declared type.
pub fn decode_value(field: &str, expected: FieldType, raw: &Json) -> Result<Value, CodecError> {
    let err = || CodecError::new(field, expected, raw);
    match expected {
        FieldType::Str => raw.as_str().map(Value::str).ok_or_else(err),
        FieldType::Int => raw.as_i64().map(Value::Int).ok_or_else(err),
        FieldType::Float => raw.as_f64().map(Value::Float).ok_or_else(err),
        FieldType::Bool => raw.as_bool().map(Value::Bool).ok_or_else(err),
        FieldType::Timestamp => {
            let text = raw.as_str().ok_or_else(err)?;
            DateTime::parse_from_rfc3339(text)
                .map(|ts| Value::Timestamp(ts.with_timezone(&Utc)))
                .map_err(|_| err())
        }
        FieldType::List => match raw {
            Json::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(decode_untyped(field, item)?);
                }
                Ok(Value::List(out))
            }
            _ => Err(err()),
        },
        FieldType::Map => match raw {
            Json::Object(entries) => {
                let mut out = std::collections::BTreeMap::new();
                for (key, item) in entries {
                    out.insert(key.clone(), decode_untyped(field, item)?);
                }
                Ok(Value::Map(out))
            }
            _ => Err(err()),
        },
    }
}

/// Decode a nested value whose element type is not declared; the JSON shape
/// drives the result. Nulls have no model representation inside nested
/// structures and fail the field.
fn decode_untyped(field: &str, raw: &Json) -> Result<Value, CodecError> {
    match raw {
        Json::String(s) => Ok(Value::Str(s.clone())),
        Json::Bool(b) => Ok(Value::Bool(*b)),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Int(i))
            } else if let Some(f) = n.as_f64() {
                Ok(Value::Float(f))
            } else {
                Err(CodecError::new(field, FieldType::Float, raw))
            }
        }
        Json::Array(_) => decode_value(field, FieldType::List, raw),
        Json::Object(_) => decode_value(field, FieldType::Map, raw),
        Json::Null => Err(CodecError::new(field, FieldType::Map, raw)),
    }
}

/// Encode a record into a wire object.
///
/// Absent fields are skipped; explicit nulls encode as JSON null so the
/// server clears them. Under `DirtyOnly`, only fields changed since load
/// are included. Extra (unknown) fields ride along on full encodes when the
/// schema keeps them.
pub fn encode_record(
    record: &Record,
    schema: &ResourceSchema,
    scope: EncodeScope,
) -> Result<Map<String, Json>, CodecError> {
    let mut out = Map::new();
    for def in schema.fields() {
        if scope == EncodeScope::DirtyOnly && !record.is_field_dirty(&def.name) {
            continue;
        }
        match record.get(&def.name) {
            FieldValue::Absent => {}
            FieldValue::ExplicitNull => {
                out.insert(def.wire_name.clone(), Json::Null);
            }
            FieldValue::Present(value) => {
                out.insert(
                    def.wire_name.clone(),
                    encode_value(&def.name, def.field_type, value)?,
                );
            }
        }
    }
    if scope == EncodeScope::All && schema.unknown_fields == UnknownFieldPolicy::Keep {
        for (wire_name, raw) in record.extra() {
            out.entry(wire_name.clone()).or_insert_with(|| raw.clone());
        }
    }
    Ok(out)
}

/// Hydrate a record from a wire object.
///
/// Missing keys leave the field absent, JSON null becomes `ExplicitNull`,
/// values are decoded per the declared type. The hydrated field set is
/// always a subset of the declared mapping; unmapped wire fields are kept
/// or dropped per the schema's single policy switch.
pub fn decode_record(
    wire: &Map<String, Json>,
    schema: &ResourceSchema,
) -> Result<Record, CodecError> {
    let mut record = Record::new();
    for def in schema.fields() {
        match wire.get(&def.wire_name) {
            None => {}
            Some(Json::Null) => record.load(def.name.clone(), FieldValue::ExplicitNull),
            Some(raw) => match decode_value(&def.name, def.field_type, raw) {
                Ok(value) => record.load(def.name.clone(), FieldValue::Present(value)),
                Err(e) => match schema.strictness {
                    Strictness::Strict => return Err(e),
                    Strictness::Lenient => {
                        warn!(
                            resource = %schema.resource,
                            field = %def.name,
                            error = %e,
                            "dropping undecodable field in lenient mode"
                        );
                    }
                },
            },
        }
    }
    if schema.unknown_fields == UnknownFieldPolicy::Keep {
        for (wire_name, raw) in wire {
            if schema.field_by_wire(wire_name).is_none() {
                record.load_extra(wire_name.clone(), raw.clone());
            }
        }
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldDef;
    use chrono::TimeZone;
    use serde_json::json;

    fn schema() -> ResourceSchema {
        ResourceSchema::new("contact", "contacts")
            .field(FieldDef::new("id", FieldType::Int))
            .field(FieldDef::new("name", FieldType::Str))
            .field(FieldDef::new("email", FieldType::Str))
            .field(FieldDef::new("age", FieldType::Int))
            .field(FieldDef::new("score", FieldType::Float))
            .field(FieldDef::new("active", FieldType::Bool))
            .field(FieldDef::new("signup_date", FieldType::Timestamp).wire("signupDate"))
            .field(FieldDef::new("tags", FieldType::List))
    }

    fn wire(value: Json) -> Map<String, Json> {
        match value {
            Json::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn round_trip_preserves_every_field_type() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 17, 8, 30, 0).unwrap();
        let mut rec = Record::new();
        rec.set("id", 9i64);
        rec.set("name", "Ada");
        rec.set("age", 36i64);
        rec.set("score", 0.5f64);
        rec.set("active", true);
        rec.set("signup_date", ts);
        rec.set(
            "tags",
            Value::List(vec![Value::str("alpha"), Value::Int(2)]),
        );
        rec.clear("email");
        rec.mark_clean();

        let schema = schema();
        let encoded = encode_record(&rec, &schema, EncodeScope::All).unwrap();
        let decoded = decode_record(&encoded, &schema).unwrap();
        assert_eq!(decoded, rec);
    }

    #[test]
    fn three_states_survive_decoding() {
        let schema = schema();
        let decoded = decode_record(
            &wire(json!({"id": 1, "email": null})),
            &schema,
        )
        .unwrap();
        assert_eq!(decoded.get("email"), &FieldValue::ExplicitNull);
        assert!(decoded.get("name").is_absent());
        assert_eq!(decoded.value("id"), Some(&Value::Int(1)));
    }

    #[test]
    fn absent_fields_are_not_encoded() {
        let schema = schema();
        let mut rec = Record::new();
        rec.set("name", "Ada");
        let encoded = encode_record(&rec, &schema, EncodeScope::All).unwrap();
        assert_eq!(encoded.len(), 1);
        assert_eq!(encoded.get("name"), Some(&json!("Ada")));
    }

    #[test]
    fn dirty_only_encodes_exactly_the_changed_fields() {
        let schema = schema();
        let mut rec = Record::new();
        rec.load("id", FieldValue::Present(Value::Int(4)));
        rec.load("name", FieldValue::Present(Value::str("Ada")));
        rec.load("age", FieldValue::Present(Value::Int(36)));
        rec.set("name", "Grace");
        rec.clear("email");
        let encoded = encode_record(&rec, &schema, EncodeScope::DirtyOnly).unwrap();
        assert_eq!(encoded.len(), 2);
        assert_eq!(encoded.get("name"), Some(&json!("Grace")));
        assert_eq!(encoded.get("email"), Some(&Json::Null));
    }

    #[test]
    fn timestamp_decodes_offset_into_utc() {
        let schema = schema();
        let decoded = decode_record(
            &wire(json!({"signupDate": "2024-05-17T10:30:00+02:00"})),
            &schema,
        )
        .unwrap();
        let expected = Utc.with_ymd_and_hms(2024, 5, 17, 8, 30, 0).unwrap();
        assert_eq!(
            decoded.value("signup_date"),
            Some(&Value::Timestamp(expected))
        );
    }

    #[test]
    fn strict_mode_aborts_on_bad_field() {
        let schema = schema();
        let err = decode_record(&wire(json!({"age": "not a number"})), &schema).unwrap_err();
        assert_eq!(err.field, "age");
        assert!(err.raw.contains("not a number"));
    }

    #[test]
    fn lenient_mode_drops_bad_field_and_continues() {
        let schema = schema().with_strictness(Strictness::Lenient);
        let decoded =
            decode_record(&wire(json!({"age": "bad", "name": "Ada"})), &schema).unwrap();
        assert!(decoded.get("age").is_absent());
        assert_eq!(decoded.value("name"), Some(&Value::str("Ada")));
    }

    #[test]
    fn unknown_fields_dropped_by_default_kept_on_request() {
        let payload = wire(json!({"name": "Ada", "shoe_size": 7}));
        let dropping = decode_record(&payload, &schema()).unwrap();
        assert!(dropping.extra().is_empty());

        let keeping = decode_record(
            &payload,
            &schema().with_unknown_fields(UnknownFieldPolicy::Keep),
        )
        .unwrap();
        assert_eq!(keeping.extra().get("shoe_size"), Some(&json!(7)));
    }

    #[test]
    fn int_field_refuses_fractional_number() {
        let err = decode_record(&wire(json!({"age": 1.5})), &schema()).unwrap_err();
        assert_eq!(err.field, "age");
    }

    #[test]
    fn non_finite_float_fails_encoding() {
        let schema = schema();
        let mut rec = Record::new();
        rec.set("score", f64::NAN);
        let err = encode_record(&rec, &schema, EncodeScope::All).unwrap_err();
        assert_eq!(err.field, "score");
    }
}
