//! Source format parsers
//!
//! Both parsers produce an ordered sequence of [`RawRecord`]s. XML fields
//! are single-element arrays (`{"Nom": ["Dupont"]}`); JSON fields keep
//! their exported value. The mapper unwraps either shape.

pub mod json;
pub mod xml;

pub use json::parse_json_records;
pub use xml::parse_xml_rows;

use serde_json::{Map, Value};

/// One source record: field name to value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    fields: Map<String, Value>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) {
        self.fields.insert(field.into(), value);
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    /// Fields other than `excluded`, as a JSON object
    pub fn remaining_fields(&self, excluded: &[&str]) -> Map<String, Value> {
        self.fields
            .iter()
            .filter(|(name, _)| !excluded.contains(&name.as_str()))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}
