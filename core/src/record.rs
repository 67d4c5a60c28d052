//! The typed record with dirty-tracking that the adapter hydrates and sends.
//!
//! # Design
//! A `Record` is plain owned data keyed by model field name. `set` and
//! `clear` mark the field dirty; hydration inserts values clean, so a
//! partial update encodes exactly what changed since load. Wire fields
//! outside the declared mapping survive only in `extra`, and only when the
//! schema's [`UnknownFieldPolicy`](crate::schema::UnknownFieldPolicy) says
//! to keep them.

use std::collections::{BTreeMap, BTreeSet};

use crate::value::{FieldValue, Value};

static ABSENT: FieldValue = FieldValue::Absent;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    values: BTreeMap<String, FieldValue>,
    dirty: BTreeSet<String>,
    extra: BTreeMap<String, serde_json::Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of a field; `Absent` when it was never set or loaded.
    pub fn get(&self, field: &str) -> &FieldValue {
        self.values.get(field).unwrap_or(&ABSENT)
    }

    pub fn value(&self, field: &str) -> Option<&Value> {
        self.get(field).as_value()
    }

    /// Set a field value and mark it dirty.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        let field = field.into();
        self.values.insert(field.clone(), FieldValue::Present(value.into()));
        self.dirty.insert(field);
    }

    /// Deliberately clear a field: the next update request sends an explicit
    /// null so the server erases it.
    pub fn clear(&mut self, field: impl Into<String>) {
        let field = field.into();
        self.values.insert(field.clone(), FieldValue::ExplicitNull);
        self.dirty.insert(field);
    }

    /// Forget a field entirely; it becomes absent and is not sent at all.
    pub fn unset(&mut self, field: &str) {
        self.values.remove(field);
        self.dirty.remove(field);
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn is_field_dirty(&self, field: &str) -> bool {
        self.dirty.contains(field)
    }

    pub fn dirty_fields(&self) -> impl Iterator<Item = &str> {
        self.dirty.iter().map(|s| s.as_str())
    }

    /// Reset dirty-tracking, typically after a successful send or when the
    /// server echoed the latest state back.
    pub fn mark_clean(&mut self) {
        self.dirty.clear();
    }

    /// Set fields iterated as `(name, FieldValue)` pairs.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Unmapped wire fields preserved under `UnknownFieldPolicy::Keep`.
    pub fn extra(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.extra
    }

    /// Insert a value without marking it dirty. Hydration from the wire
    /// goes through here so a freshly fetched record has no changes to send.
    pub fn load(&mut self, field: impl Into<String>, value: FieldValue) {
        self.values.insert(field.into(), value);
    }

    pub(crate) fn load_extra(&mut self, wire_name: impl Into<String>, raw: serde_json::Value) {
        self.extra.insert(wire_name.into(), raw);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_marks_dirty_and_clear_is_explicit_null() {
        let mut rec = Record::new();
        rec.set("name", "Ada");
        rec.clear("email");
        assert!(rec.is_field_dirty("name"));
        assert!(rec.is_field_dirty("email"));
        assert_eq!(rec.get("email"), &FieldValue::ExplicitNull);
        assert_eq!(rec.value("name"), Some(&Value::Str("Ada".into())));
    }

    #[test]
    fn load_does_not_mark_dirty() {
        let mut rec = Record::new();
        rec.load("name", FieldValue::Present(Value::Str("Ada".into())));
        assert!(!rec.is_dirty());
        rec.set("name", "Grace");
        assert_eq!(rec.dirty_fields().collect::<Vec<_>>(), vec!["name"]);
    }

    #[test]
    fn missing_field_reads_as_absent() {
        let rec = Record::new();
        assert!(rec.get("anything").is_absent());
    }

    #[test]
    fn unset_removes_value_and_dirt() {
        let mut rec = Record::new();
        rec.set("name", "Ada");
        rec.unset("name");
        assert!(rec.get("name").is_absent());
        assert!(!rec.is_dirty());
    }
}
