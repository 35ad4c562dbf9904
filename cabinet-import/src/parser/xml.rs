//! XML table dump parser
//!
//! Legacy exports are flat tables:
//!
//! ```xml
//! <Table>
//!   <Table_Contenu>
//!     <Date>30/10/2025</Date>
//!     <CodePatient>1042</CodePatient>
//!   </Table_Contenu>
//! </Table>
//! ```
//!
//! Every `Table_Contenu` element becomes one record and every child
//! element one field, held as a sequence of its text values.

use super::RawRecord;
use cabinet_common::{Error, Result};
use serde_json::Value;

/// Row element name used by every legacy table dump
pub const TABLE_ROW_TAG: &str = "Table_Contenu";

/// Parse all `row_tag` elements of an XML document, in document order
pub fn parse_xml_rows(content: &str, row_tag: &str) -> Result<Vec<RawRecord>> {
    // Some exporters emit a DOCTYPE header
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    };
    let doc = roxmltree::Document::parse_with_options(content, options)
        .map_err(|e| Error::Parse(format!("XML parse error: {}", e)))?;

    let mut records = Vec::new();

    for row in doc
        .descendants()
        .filter(|node| node.is_element() && node.tag_name().name() == row_tag)
    {
        let mut record = RawRecord::new();

        for field in row.children().filter(|node| node.is_element()) {
            let name = field.tag_name().name();
            let text: String = field
                .descendants()
                .filter(|node| node.is_text())
                .filter_map(|node| node.text())
                .collect();

            match record.remove(name) {
                Some(Value::Array(mut values)) => {
                    values.push(Value::String(text));
                    record.insert(name, Value::Array(values));
                }
                _ => record.insert(name, Value::Array(vec![Value::String(text)])),
            }
        }

        records.push(record);
    }

    Ok(records)
}
