//! JSON encodings of [`Table`] and [`Scalar`].

use serde_json::{Map, Number, Value};

use super::model::{Scalar, Table};
use crate::config::DataLayout;

impl Scalar {
    /// Converts to a JSON value. Non-finite floats become `null`.
    pub fn to_json(&self) -> Value {
        match self {
            Scalar::Null => Value::Null,
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Int(i) => Value::Number((*i).into()),
            Scalar::Float(x) => Number::from_f64(*x)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Scalar::Text(s) => Value::String(s.clone()),
        }
    }

    /// Converts a JSON value to a cell. Arrays and objects are kept as
    /// their compact JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Scalar::Null,
            Value::Bool(b) => Scalar::Bool(*b),
            Value::Number(n) => n
                .as_i64()
                .map(Scalar::Int)
                .or_else(|| n.as_f64().map(Scalar::Float))
                .unwrap_or_else(|| Scalar::Text(n.to_string())),
            Value::String(s) => Scalar::Text(s.clone()),
            other => Scalar::Text(other.to_string()),
        }
    }
}

/// Encodes rows as a JSON array using the given layout.
pub fn rows_to_json(table: &Table, layout: DataLayout) -> Value {
    match layout {
        DataLayout::Records => records_json(table),
        DataLayout::Arrays => arrays_json(table),
    }
}

/// `[{"col": value, ...}, ...]`
pub fn records_json(table: &Table) -> Value {
    Value::Array(
        table
            .rows()
            .map(|row| {
                let record: Map<String, Value> = table
                    .column_names()
                    .iter()
                    .cloned()
                    .zip(row.iter().map(|cell| cell.to_json()))
                    .collect();
                Value::Object(record)
            })
            .collect(),
    )
}

/// `[[value, ...], ...]` without a header row.
pub fn arrays_json(table: &Table) -> Value {
    Value::Array(
        table
            .rows()
            .map(|row| Value::Array(row.iter().map(|cell| cell.to_json()).collect()))
            .collect(),
    )
}
