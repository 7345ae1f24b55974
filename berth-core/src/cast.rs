use crate::{Record, RowLabeled, TableSchema, Value};

/// Storage conversion attached to an attribute at registration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastKind {
    /// Array attributes are persisted as JSON text and revived on the way out.
    ArrayJson,
}

impl CastKind {
    /// Outbound leg. Arrays already serialize at bind time, so this leaves the
    /// value untouched.
    pub fn to_storage(&self, value: Value) -> Value {
        match self {
            CastKind::ArrayJson => value,
        }
    }

    /// Inbound leg. Revives JSON text into a structured value, anything that
    /// does not parse passes through untouched.
    pub fn from_storage(&self, value: Value) -> Value {
        match self {
            CastKind::ArrayJson => match value {
                Value::Varchar(Some(text)) if !text.is_empty() => {
                    match serde_json::from_str::<serde_json::Value>(&text) {
                        Ok(parsed) => Value::from_json(&parsed),
                        Err(..) => Value::Varchar(Some(text)),
                    }
                }
                other => other,
            },
        }
    }
}

/// Run the outbound leg over a record about to be written.
pub fn record_to_storage(schema: &TableSchema, record: Record) -> Record {
    if !schema.has_casts() {
        return record;
    }
    record
        .into_iter()
        .map(|(name, value)| {
            let value = if schema.needs_cast_attribute(&name) {
                CastKind::ArrayJson.to_storage(value)
            } else {
                value
            };
            (name, value)
        })
        .collect()
}

/// Turn a backend row into a caller facing record.
///
/// Labels matching a storage column are renamed to the logical attribute name
/// and their values run through the inbound cast leg. Labels the schema does
/// not know (aggregates like `count`) pass through untouched.
pub fn row_to_record(schema: &TableSchema, row: RowLabeled) -> Record {
    let cast = schema.has_casts();
    let RowLabeled { labels, values } = row;
    labels
        .iter()
        .zip(values)
        .map(|(label, value)| match schema.by_column(label) {
            Some(def) => {
                let value = if cast && schema.needs_cast_column(&def.column) {
                    CastKind::ArrayJson.from_storage(value)
                } else {
                    value
                };
                (def.name.clone(), value)
            }
            None => (label.clone(), value),
        })
        .collect()
}
