// =====================================================
// VALUE CODEC
// Textual parsing, type conversion, comparison and display of cell values
// =====================================================
//
// Cell representation by column type:
//   ascii/text, decimal, uuid/timeuuid, date, time, inet -> Value::String
//   blob                                                  -> Value::String ("0x" + lowercase hex)
//   int family, counter, timestamp (epoch millis)         -> Value::Number (i64)
//   varint                                                -> Value::Number, or Value::String beyond i64
//   float/double                                          -> Value::Number (f64)
//   boolean                                               -> Value::Bool
//   list/set                                              -> Value::Array
//   map                                                   -> Value::Object keyed by the key's text form

use crate::table_types::ColumnType;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde_json::{Number, Value};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::LazyLock;
use uuid::Uuid;

pub type ValueParser = fn(&str) -> Result<Value, String>;

static DECIMAL_LITERAL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-+]?(\d+\.?\d*|\.\d+)([eE][-+]?\d+)?$").unwrap());
static VARINT_LITERAL_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[-+]?\d+$").unwrap());

static PARSER_REGISTRY: LazyLock<HashMap<&'static str, ValueParser>> = LazyLock::new(|| {
    let mut registry: HashMap<&'static str, ValueParser> = HashMap::new();
    registry.insert("ascii", parse_text);
    registry.insert("text", parse_text);
    registry.insert("int", parse_int);
    registry.insert("bigint", parse_bigint);
    registry.insert("counter", parse_bigint);
    registry.insert("smallint", parse_smallint);
    registry.insert("tinyint", parse_tinyint);
    registry.insert("varint", parse_varint);
    registry.insert("float", parse_floating);
    registry.insert("double", parse_floating);
    registry.insert("decimal", parse_decimal);
    registry.insert("boolean", parse_boolean);
    registry.insert("uuid", parse_uuid);
    registry.insert("timeuuid", parse_timeuuid);
    registry.insert("timestamp", parse_timestamp);
    registry.insert("date", parse_date);
    registry.insert("time", parse_time);
    registry.insert("blob", parse_blob);
    registry.insert("inet", parse_inet);
    registry
});

/// Resolves the textual parser for a column type. Collections have no
/// textual form and are rejected here, when the caller is being configured.
pub fn parser_for(column_type: &ColumnType) -> Result<ValueParser, String> {
    PARSER_REGISTRY
        .get(column_type.type_tag())
        .copied()
        .ok_or_else(|| format!("No textual parser registered for type {}", column_type))
}

pub fn parse_value(column_type: &ColumnType, text: &str) -> Result<Value, String> {
    let parser = parser_for(column_type)?;
    parser(text)
}

fn parse_text(text: &str) -> Result<Value, String> {
    Ok(Value::String(text.to_string()))
}

fn parse_integer_in_range(text: &str, min: i64, max: i64, label: &str) -> Result<Value, String> {
    let parsed = text
        .trim()
        .parse::<i64>()
        .map_err(|e| format!("Invalid {} '{}': {}", label, text, e))?;
    if parsed < min || parsed > max {
        return Err(format!("Value {} is out of range for {}", parsed, label));
    }
    Ok(Value::Number(Number::from(parsed)))
}

fn parse_int(text: &str) -> Result<Value, String> {
    parse_integer_in_range(text, i32::MIN as i64, i32::MAX as i64, "int")
}

fn parse_bigint(text: &str) -> Result<Value, String> {
    parse_integer_in_range(text, i64::MIN, i64::MAX, "bigint")
}

fn parse_smallint(text: &str) -> Result<Value, String> {
    parse_integer_in_range(text, i16::MIN as i64, i16::MAX as i64, "smallint")
}

fn parse_tinyint(text: &str) -> Result<Value, String> {
    parse_integer_in_range(text, i8::MIN as i64, i8::MAX as i64, "tinyint")
}

fn parse_varint(text: &str) -> Result<Value, String> {
    let trimmed = text.trim();
    if !VARINT_LITERAL_REGEX.is_match(trimmed) {
        return Err(format!("Invalid varint '{}'", text));
    }
    match trimmed.parse::<i64>() {
        Ok(parsed) => Ok(Value::Number(Number::from(parsed))),
        Err(_) => Ok(Value::String(trimmed.trim_start_matches('+').to_string())),
    }
}

fn parse_floating(text: &str) -> Result<Value, String> {
    let parsed = text
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("Invalid floating point value '{}': {}", text, e))?;
    Number::from_f64(parsed)
        .map(Value::Number)
        .ok_or_else(|| format!("Floating point value '{}' is not finite", text))
}

fn parse_decimal(text: &str) -> Result<Value, String> {
    let trimmed = text.trim();
    if !DECIMAL_LITERAL_REGEX.is_match(trimmed) {
        return Err(format!("Invalid decimal '{}'", text));
    }
    Ok(Value::String(trimmed.to_string()))
}

fn parse_boolean(text: &str) -> Result<Value, String> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(Value::Bool(true)),
        "false" => Ok(Value::Bool(false)),
        _ => Err(format!("Invalid boolean '{}'", text)),
    }
}

fn parse_uuid(text: &str) -> Result<Value, String> {
    let parsed = Uuid::parse_str(text.trim()).map_err(|e| format!("Invalid uuid '{}': {}", text, e))?;
    Ok(Value::String(parsed.hyphenated().to_string()))
}

fn parse_timeuuid(text: &str) -> Result<Value, String> {
    let parsed =
        Uuid::parse_str(text.trim()).map_err(|e| format!("Invalid timeuuid '{}': {}", text, e))?;
    if parsed.get_version_num() != 1 {
        return Err(format!(
            "Invalid timeuuid '{}': version {} is not a time-based uuid",
            text,
            parsed.get_version_num()
        ));
    }
    Ok(Value::String(parsed.hyphenated().to_string()))
}

fn parse_timestamp(text: &str) -> Result<Value, String> {
    let trimmed = text.trim();
    if let Ok(millis) = trimmed.parse::<i64>() {
        return Ok(Value::Number(Number::from(millis)));
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(Value::Number(Number::from(parsed.timestamp_millis())));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(Value::Number(Number::from(parsed.and_utc().timestamp_millis())));
        }
    }
    Err(format!("Invalid timestamp '{}'", text))
}

fn parse_date(text: &str) -> Result<Value, String> {
    let parsed = NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .map_err(|e| format!("Invalid date '{}': {}", text, e))?;
    Ok(Value::String(parsed.format("%Y-%m-%d").to_string()))
}

fn parse_time(text: &str) -> Result<Value, String> {
    let parsed = NaiveTime::parse_from_str(text.trim(), "%H:%M:%S%.f")
        .map_err(|e| format!("Invalid time '{}': {}", text, e))?;
    Ok(Value::String(parsed.format("%H:%M:%S%.f").to_string()))
}

fn parse_blob(text: &str) -> Result<Value, String> {
    let trimmed = text.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let bytes = hex::decode(digits).map_err(|e| format!("Invalid blob '{}': {}", text, e))?;
    Ok(Value::String(format!("0x{}", hex::encode(bytes))))
}

fn parse_inet(text: &str) -> Result<Value, String> {
    let parsed = text
        .trim()
        .parse::<IpAddr>()
        .map_err(|e| format!("Invalid inet '{}': {}", text, e))?;
    Ok(Value::String(parsed.to_string()))
}

/// Text form of a scalar cell; the inverse of the registered parser.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Display form used in diff reports.
pub fn format_value(column_type: &ColumnType, value: &Value) -> String {
    match (column_type, value) {
        (_, Value::Null) => "null".to_string(),
        (ColumnType::Set(_), Value::Array(items)) => {
            let mut rendered = items.iter().map(value_to_text).collect::<Vec<String>>();
            rendered.sort();
            format!("{{{}}}", rendered.join(","))
        }
        (ColumnType::List(_), Value::Array(items)) => format!(
            "[{}]",
            items.iter().map(value_to_text).collect::<Vec<String>>().join(",")
        ),
        (ColumnType::Map(_, _), Value::Object(entries)) => format!(
            "{{{}}}",
            entries
                .iter()
                .map(|(key, entry)| format!("{}={}", key, value_to_text(entry)))
                .collect::<Vec<String>>()
                .join(",")
        ),
        (_, other) => value_to_text(other),
    }
}

fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn integer_bounds(column_type: &ColumnType) -> (i64, i64) {
    match column_type {
        ColumnType::Int => (i32::MIN as i64, i32::MAX as i64),
        ColumnType::SmallInt => (i16::MIN as i64, i16::MAX as i64),
        ColumnType::TinyInt => (i8::MIN as i64, i8::MAX as i64),
        _ => (i64::MIN, i64::MAX),
    }
}

/// Converts a cell from one column type to another. Identical types pass
/// through untouched; null stays null.
pub fn convert_value(value: &Value, from: &ColumnType, to: &ColumnType) -> Result<Value, String> {
    if value.is_null() || from == to {
        return Ok(value.clone());
    }

    match (from, to) {
        (from, to) if from.is_integer() && (to.is_integer() || *to == ColumnType::Timestamp) => {
            integer_to(value, from, to)
        }
        (ColumnType::Timestamp, to) if to.is_integer() => integer_to(value, from, to),
        (from, to) if (from.is_integer() || from.is_floating()) && to.is_floating() => value_as_f64(value)
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| format!("Cannot convert {} value {} to {}", from, value, to)),
        (from, ColumnType::Decimal) if from.is_integer() || from.is_floating() => {
            Ok(Value::String(value_to_text(value)))
        }
        (ColumnType::Decimal, to) if to.is_floating() || to.is_integer() => {
            parse_value(to, &value_to_text(value))
        }
        (ColumnType::Uuid, ColumnType::TimeUuid) => parse_timeuuid(&value_to_text(value)),
        (ColumnType::TimeUuid, ColumnType::Uuid) => Ok(value.clone()),
        (from, to) if from.is_textual() && to.is_textual() => Ok(value.clone()),
        (from, to) if from.is_textual() && !to.is_collection() => {
            parse_value(to, &value_to_text(value))
        }
        (from, to) if to.is_textual() && !from.is_collection() => {
            Ok(Value::String(value_to_text(value)))
        }
        (ColumnType::List(from_element), ColumnType::List(to_element))
        | (ColumnType::Set(from_element), ColumnType::Set(to_element))
        | (ColumnType::List(from_element), ColumnType::Set(to_element))
        | (ColumnType::Set(from_element), ColumnType::List(to_element)) => {
            let items = value
                .as_array()
                .ok_or_else(|| format!("Expected a collection value for {}, got {}", from, value))?;
            let converted = items
                .iter()
                .map(|item| convert_value(item, from_element, to_element))
                .collect::<Result<Vec<Value>, String>>()?;
            Ok(Value::Array(converted))
        }
        (ColumnType::Map(from_key, from_value), ColumnType::Map(to_key, to_value)) => {
            let entries = value
                .as_object()
                .ok_or_else(|| format!("Expected a map value for {}, got {}", from, value))?;
            let mut converted = serde_json::Map::with_capacity(entries.len());
            for (key, entry) in entries {
                let typed_key = parse_value(from_key, key)?;
                let converted_key = convert_value(&typed_key, from_key, to_key)?;
                converted.insert(
                    value_to_text(&converted_key),
                    convert_value(entry, from_value, to_value)?,
                );
            }
            Ok(Value::Object(converted))
        }
        _ => Err(format!("No conversion from {} to {}", from, to)),
    }
}

fn integer_to(value: &Value, from: &ColumnType, to: &ColumnType) -> Result<Value, String> {
    let number = value_as_i64(value)
        .ok_or_else(|| format!("Cannot read {} value {} as an integer", from, value))?;
    let (min, max) = integer_bounds(to);
    if number < min || number > max {
        return Err(format!("Value {} is out of range for {}", number, to));
    }
    Ok(Value::Number(Number::from(number)))
}

/// Type-aware inequality: sets ignore element order, numbers compare by
/// numeric value, everything else compares structurally.
pub fn values_differ(column_type: &ColumnType, left: &Value, right: &Value) -> bool {
    match (column_type, left, right) {
        (_, Value::Null, Value::Null) => false,
        (ColumnType::Set(_), Value::Array(a), Value::Array(b)) => {
            let mut a_text = a.iter().map(|v| v.to_string()).collect::<Vec<String>>();
            let mut b_text = b.iter().map(|v| v.to_string()).collect::<Vec<String>>();
            a_text.sort();
            b_text.sort();
            a_text != b_text
        }
        (column_type, Value::Number(a), Value::Number(b)) if column_type.is_floating() => {
            a.as_f64() != b.as_f64()
        }
        (column_type, Value::Number(a), Value::Number(b)) if column_type.is_integer() => {
            match (a.as_i64(), b.as_i64()) {
                (Some(a), Some(b)) => a != b,
                _ => a != b,
            }
        }
        (_, a, b) => a != b,
    }
}

#[cfg(test)]
mod tests;
