use mysql_async::Value as DbValue;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use super::strategy::StoreError;

/// One result row, shaped identically by every transport.
pub type Row = Map<String, Value>;

/// Synthetic single row returned by Execute-kind operations.
pub(crate) fn write_ack(affected_rows: u64, last_insert_id: Option<u64>) -> Row {
    let mut row = Row::new();
    row.insert("affected_rows".into(), affected_rows.into());
    row.insert(
        "last_insert_id".into(),
        last_insert_id.map(Value::from).unwrap_or(Value::Null),
    );
    row
}

pub(crate) fn mysql_row_to_json(row: mysql_async::Row) -> Row {
    let columns = row.columns();
    let values = row.unwrap();
    let mut out = Row::with_capacity(values.len());
    for (column, value) in columns.iter().zip(values) {
        out.insert(column.name_str().into_owned(), db_value_to_json(value));
    }
    out
}

fn db_value_to_json(value: DbValue) -> Value {
    match value {
        DbValue::NULL => Value::Null,
        DbValue::Bytes(bytes) => Value::String(String::from_utf8_lossy(&bytes).into_owned()),
        DbValue::Int(n) => Value::from(n),
        DbValue::UInt(n) => Value::from(n),
        DbValue::Float(f) => Value::from(f as f64),
        DbValue::Double(f) => Value::from(f),
        DbValue::Date(year, month, day, hour, minute, second, _micros) => Value::String(format!(
            "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}"
        )),
        DbValue::Time(negative, days, hours, minutes, seconds, _micros) => {
            let sign = if negative { "-" } else { "" };
            let total_hours = u32::from(hours) + days * 24;
            Value::String(format!("{sign}{total_hours:02}:{minutes:02}:{seconds:02}"))
        }
    }
}

pub(crate) fn decode<T: DeserializeOwned>(row: Row) -> Result<T, StoreError> {
    serde_json::from_value(Value::Object(row)).map_err(|e| StoreError::Decode(e.to_string()))
}

/// MySQL booleans are TINYINT on the wire; proxies may also send real bools.
pub fn bool_from_int<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Bool(b) => Ok(b),
        Value::Number(n) => Ok(n.as_i64().unwrap_or(0) != 0),
        Value::Null => Ok(false),
        Value::String(s) => Ok(s == "1" || s.eq_ignore_ascii_case("true")),
        other => Err(serde::de::Error::custom(format!(
            "expected a bool-like value, got {other}"
        ))),
    }
}

/// DECIMAL columns arrive as strings from some drivers and bridges.
pub fn opt_f64_lenient<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(n.as_f64()),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        other => Err(serde::de::Error::custom(format!(
            "expected a numeric value, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PracticeSession;
    use serde_json::json;

    #[test]
    fn sessions_decode_from_wire_typical_rows() {
        let row = json!({
            "id": 12,
            "user_id": 3,
            "session_type": "exam_simulation",
            "questions_answered": 25,
            "correct_answers": 20,
            "score_percentage": "80.00",
            "completed": 1,
            "started_at": "2026-08-01 09:00:00",
            "completed_at": null,
        });
        let session: PracticeSession = serde_json::from_value(row).expect("row should decode");
        assert!(session.completed);
        assert_eq!(session.score_percentage, Some(80.0));
        assert_eq!(session.completed_at, None);
    }

    #[test]
    fn write_ack_shape_is_stable() {
        let ack = write_ack(1, Some(42));
        assert_eq!(ack["affected_rows"], 1);
        assert_eq!(ack["last_insert_id"], 42);
        let ack = write_ack(2, None);
        assert!(ack["last_insert_id"].is_null());
    }

    #[test]
    fn datetime_values_render_as_sql_strings() {
        let value = db_value_to_json(DbValue::Date(2026, 8, 1, 9, 30, 5, 0));
        assert_eq!(value, json!("2026-08-01 09:30:05"));
        assert_eq!(db_value_to_json(DbValue::NULL), Value::Null);
        assert_eq!(
            db_value_to_json(DbValue::Bytes(b"se\xc3\xb1ales".to_vec())),
            json!("señales")
        );
    }
}
