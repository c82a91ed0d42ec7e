use crate::error::DbError;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::{Map, Value};
use sqlx::postgres::PgRow;
use sqlx::{Column, Row, TypeInfo};
use uuid::Uuid;

/// Collect driver rows into ordered column-name → value maps, normalising
/// driver-specific representations to JSON-friendly ones. Sixteen-byte
/// binary values are rewritten as canonical lowercase UUID text.
pub fn rows_to_maps(rows: &[PgRow]) -> Result<Vec<Map<String, Value>>, DbError> {
    rows.iter().map(row_to_map).collect()
}

fn row_to_map(row: &PgRow) -> Result<Map<String, Value>, DbError> {
    let mut record = Map::new();
    for (index, column) in row.columns().iter().enumerate() {
        let value = column_value(row, index, column.type_info().name()).map_err(|source| {
            DbError::Decode {
                column: column.name().to_string(),
                source,
            }
        })?;
        record.insert(column.name().to_string(), value);
    }
    Ok(record)
}

fn column_value(row: &PgRow, index: usize, type_name: &str) -> Result<Value, sqlx::Error> {
    let value = match type_name {
        "BOOL" => row.try_get::<Option<bool>, _>(index)?.map(Value::from),
        "INT2" => row.try_get::<Option<i16>, _>(index)?.map(Value::from),
        "INT4" => row.try_get::<Option<i32>, _>(index)?.map(Value::from),
        "INT8" => row.try_get::<Option<i64>, _>(index)?.map(Value::from),
        "FLOAT4" => row.try_get::<Option<f32>, _>(index)?.map(Value::from),
        "FLOAT8" => row.try_get::<Option<f64>, _>(index)?.map(Value::from),
        "NUMERIC" => row
            .try_get::<Option<Decimal>, _>(index)?
            .map(decimal_value),
        "UUID" => row
            .try_get::<Option<Uuid>, _>(index)?
            .map(|u| Value::String(u.to_string())),
        "BYTEA" => row.try_get::<Option<Vec<u8>>, _>(index)?.map(bytes_value),
        "TIMESTAMPTZ" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(index)?
            .map(|t| Value::String(t.to_rfc3339())),
        "TIMESTAMP" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(index)?
            .map(|t| Value::String(t.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
        "DATE" => row
            .try_get::<Option<chrono::NaiveDate>, _>(index)?
            .map(|d| Value::String(d.to_string())),
        "TIME" => row
            .try_get::<Option<chrono::NaiveTime>, _>(index)?
            .map(|t| Value::String(t.to_string())),
        "JSON" | "JSONB" => row.try_get::<Option<Value>, _>(index)?,
        _ => match row.try_get::<Option<String>, _>(index) {
            Ok(s) => s.map(Value::String),
            // A type we have no mapping for; better a null than a failed
            // whole-result response.
            Err(_) => Some(Value::Null),
        },
    };
    Ok(value.unwrap_or(Value::Null))
}

fn decimal_value(decimal: Decimal) -> Value {
    match decimal.to_f64().and_then(serde_json::Number::from_f64) {
        Some(number) => Value::Number(number),
        None => Value::String(decimal.to_string()),
    }
}

/// Binary columns are almost always raw UUIDs in this corpus; render any
/// 16-byte value in canonical form and fall back to hex for other sizes.
fn bytes_value(bytes: Vec<u8>) -> Value {
    match <[u8; 16]>::try_from(bytes.as_slice()) {
        Ok(raw) => Value::String(Uuid::from_bytes(raw).to_string()),
        Err(_) => Value::String(
            bytes
                .iter()
                .map(|b| format!("{b:02x}"))
                .collect::<String>(),
        ),
    }
}
