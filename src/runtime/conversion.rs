//! Type conversion service.
//!
//! `can_convert` answers from the value's type alone, so callers can decide
//! on a fallback path without attempting the conversion. `convert` may still
//! fail for a convertible pair (`"abc"` to an integer).

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use indexmap::IndexSet;

use crate::error::ConversionError;
use crate::types::{self, MapKind, TypeKind, TypeRef};
use crate::value::{MapValue, Value};

/// Converts values between nominal types.
pub trait TypeConverter: Send + Sync + fmt::Debug {
    /// Whether a value of this shape can be converted to `target`.
    fn can_convert(&self, value: &Value, target: &TypeRef) -> bool;

    /// Convert `value` to `target`.
    fn convert(&self, value: Value, target: &TypeRef) -> Result<Value, ConversionError>;
}

/// Conversions between strings, numbers, booleans, dates and collections.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTypeConverter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Identity,
    String,
    Boolean,
    Integer,
    Long,
    Double,
    Number,
    Bytes,
    Date,
    DateTime,
    List,
    Set,
    Map(MapKind),
}

impl DefaultTypeConverter {
    pub fn new() -> Self {
        Self
    }

    fn target_of(value: &Value, target: &TypeRef) -> Option<Target> {
        if value.is_null() || target.is_assignable_from(&value.natural_type()) {
            return Some(Target::Identity);
        }

        let scalar = matches!(
            value,
            Value::Bool(_)
                | Value::Int(_)
                | Value::Float(_)
                | Value::String(_)
                | Value::Date(_)
                | Value::DateTime(_)
        );
        let numeric_or_text = matches!(value, Value::Int(_) | Value::Float(_) | Value::String(_));

        if *target == *types::STRING {
            return scalar.then_some(Target::String);
        }
        if *target == *types::BOOLEAN {
            return matches!(value, Value::String(_)).then_some(Target::Boolean);
        }
        if *target == *types::INTEGER {
            return numeric_or_text.then_some(Target::Integer);
        }
        if *target == *types::LONG {
            return numeric_or_text.then_some(Target::Long);
        }
        if *target == *types::DOUBLE {
            return numeric_or_text.then_some(Target::Double);
        }
        if *target == *types::NUMBER {
            return matches!(value, Value::String(_)).then_some(Target::Number);
        }
        if *target == *types::BYTES {
            return matches!(value, Value::String(_) | Value::Content(_)).then_some(Target::Bytes);
        }
        if *target == *types::DATE {
            return matches!(value, Value::String(_) | Value::DateTime(_)).then_some(Target::Date);
        }
        if *target == *types::DATE_TIME {
            return matches!(value, Value::String(_)).then_some(Target::DateTime);
        }

        let collection = matches!(value, Value::List(_) | Value::Set(_));
        match target.kind() {
            TypeKind::List if collection => Some(Target::List),
            TypeKind::Set if collection => Some(Target::Set),
            TypeKind::Map(kind) if matches!(value, Value::Map(_)) => Some(Target::Map(kind)),
            _ => None,
        }
    }
}

impl TypeConverter for DefaultTypeConverter {
    fn can_convert(&self, value: &Value, target: &TypeRef) -> bool {
        Self::target_of(value, target).is_some()
    }

    fn convert(&self, value: Value, target: &TypeRef) -> Result<Value, ConversionError> {
        let fail = |value: &Value, reason: &str| {
            ConversionError::new(value.to_string(), value.type_name(), target.name(), reason)
        };

        let Some(kind) = Self::target_of(&value, target) else {
            return Err(fail(&value, "no conversion available"));
        };

        match kind {
            Target::Identity => Ok(value),
            Target::String => Ok(Value::String(value.to_string())),
            Target::Boolean => match value.as_str().map(|s| s.trim().to_ascii_lowercase()) {
                Some(s) if s == "true" => Ok(Value::Bool(true)),
                Some(s) if s == "false" => Ok(Value::Bool(false)),
                _ => Err(fail(&value, "not a boolean")),
            },
            Target::Integer => {
                let long = to_long(&value).ok_or_else(|| fail(&value, "not an integer"))?;
                i32::try_from(long)
                    .map(|i| Value::Int(i64::from(i)))
                    .map_err(|_| fail(&value, "out of range for an integer"))
            }
            Target::Long => match value {
                Value::Float(f) if f.is_finite() && !in_long_range(f) => {
                    Err(fail(&value, "out of range for a long"))
                }
                _ => to_long(&value)
                    .map(Value::Int)
                    .ok_or_else(|| fail(&value, "not an integer")),
            },
            Target::Double => to_double(&value)
                .map(Value::Float)
                .ok_or_else(|| fail(&value, "not a number")),
            Target::Number => to_long(&value)
                .map(Value::Int)
                .or_else(|| to_double(&value).map(Value::Float))
                .ok_or_else(|| fail(&value, "not a number")),
            Target::Bytes => match value {
                Value::String(s) => Ok(Value::Bytes(s.into_bytes())),
                Value::Content(content) => Ok(Value::Bytes(content.data)),
                other => Err(fail(&other, "not binary")),
            },
            Target::Date => match &value {
                Value::DateTime(date) => Ok(Value::Date(date.naive_local())),
                Value::String(s) => parse_date(s).ok_or_else(|| fail(&value, "not a date")),
                _ => Err(fail(&value, "not a date")),
            },
            Target::DateTime => value
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok())
                .map(Value::DateTime)
                .ok_or_else(|| fail(&value, "not an RFC 3339 date-time")),
            Target::List => match value {
                Value::Set(items) => Ok(Value::List(items.into_iter().collect())),
                other => Ok(other),
            },
            Target::Set => match value {
                Value::List(items) => Ok(Value::Set(items.into_iter().collect::<IndexSet<_>>())),
                other => Ok(other),
            },
            Target::Map(kind) => match value {
                Value::Map(map) => Ok(Value::Map(MapValue {
                    kind,
                    entries: map.entries,
                })),
                other => Err(fail(&other, "not a map")),
            },
        }
    }
}

fn to_long(value: &Value) -> Option<i64> {
    match value {
        Value::Int(i) => Some(*i),
        Value::Float(f) if f.fract() == 0.0 && in_long_range(*f) => Some(*f as i64),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// i64::MAX as f64 rounds up to 2^63, which is already out of range
fn in_long_range(f: f64) -> bool {
    f >= i64::MIN as f64 && f < i64::MAX as f64
}

fn to_double(value: &Value) -> Option<f64> {
    match value {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_date(text: &str) -> Option<Value> {
    let text = text.trim();
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(Value::Date)
}
