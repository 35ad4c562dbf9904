//! JSON export parser
//!
//! Export snapshots wrap each entity in `data.<entityName>`:
//!
//! ```json
//! { "data": { "visitExaminations": [ { "id": 1, "patientCode": "1042" } ] } }
//! ```

use super::RawRecord;
use cabinet_common::{Error, Result};
use serde_json::Value;

/// Fields generated by the exporting store; the destination assigns its own
pub const GENERATED_FIELDS: &[&str] = &["id", "createdAt", "updatedAt"];

/// Timestamp fields only, for entities whose `id` is a caller-supplied key
pub const TIMESTAMP_FIELDS: &[&str] = &["createdAt", "updatedAt"];

/// Parse `data.<entity>` into records, removing the `strip` fields
pub fn parse_json_records(content: &str, entity: &str, strip: &[&str]) -> Result<Vec<RawRecord>> {
    let document: Value = serde_json::from_str(content)?;

    let items = document
        .get("data")
        .and_then(|data| data.get(entity))
        .ok_or_else(|| Error::Parse(format!("Missing data.{} in JSON export", entity)))?
        .as_array()
        .ok_or_else(|| Error::Parse(format!("data.{} is not an array", entity)))?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(fields) => {
                let mut record = RawRecord::from_map(fields.clone());
                for field in strip {
                    record.remove(field);
                }
                Ok(record)
            }
            _ => Err(Error::Parse(format!(
                "data.{}[{}] is not an object",
                entity, index
            ))),
        })
        .collect()
}
