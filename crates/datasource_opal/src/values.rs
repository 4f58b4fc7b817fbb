//! Extraction of scalar and list values out of raw opal records.

use opal_connector::models::{RawValue, ValueSet};
use serde_json::Value;

/// A single extracted cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Scalar(String),
    List(Vec<CellValue>),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

/// Extract the values of a record at the requested positions, one output per
/// position, in request order.
///
/// Position -1 addresses the record identifier. Positions past the end of
/// the cell list and unrecognized cell shapes resolve to null, never to an
/// error, so schema drift on the server degrades instead of failing scans.
pub fn extract_values(value_set: &ValueSet, positions: &[i32]) -> Vec<CellValue> {
    positions
        .iter()
        .map(|&pos| {
            if pos < 0 {
                return CellValue::Scalar(value_set.identifier.clone());
            }
            match value_set.values.get(pos as usize) {
                Some(value) => extract_value(value),
                None => CellValue::Null,
            }
        })
        .collect()
}

fn extract_value(value: &RawValue) -> CellValue {
    match value {
        // Binary cells only ship the size of the data.
        RawValue::Binary { length } => scalar_string(length),
        RawValue::Scalar { value } => scalar_string(value),
        RawValue::Sequence { values } => {
            CellValue::List(values.iter().map(extract_value).collect())
        }
        RawValue::Unknown(_) => CellValue::Null,
    }
}

fn scalar_string(value: &Value) -> CellValue {
    match value {
        Value::Null => CellValue::Null,
        Value::String(s) => CellValue::Scalar(s.clone()),
        other => CellValue::Scalar(other.to_string()),
    }
}
