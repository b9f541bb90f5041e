//! Dynamic runtime values.
//!
//! Everything a resolver can produce is a [`Value`]: scalars, dates, the
//! assembled collections and maps, pojo instances built by object builders,
//! messages, deferred expression functions and data types.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use indexmap::{IndexMap, IndexSet};

use crate::datatype::DataType;
use crate::runtime::{ExpressionFunction, Message};
use crate::types::{self, MapKind, TypeRef};

/// Represents every value flowing through resolvers.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    Date(NaiveDateTime),
    DateTime(DateTime<FixedOffset>),
    List(Vec<Value>),
    Set(IndexSet<Value>),
    Map(MapValue),
    Object(ObjectValue),
    Message(Arc<Message>),
    Content(Content),
    Function(ExpressionFunction),
    DataType(DataType),
}

/// A map value together with the concrete map flavour it was assembled as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapValue {
    pub kind: MapKind,
    pub entries: IndexMap<Value, Value>,
}

impl MapValue {
    pub fn new(kind: MapKind) -> Self {
        Self {
            kind,
            entries: IndexMap::new(),
        }
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Lookup by string key, the common case for attribute style maps.
    pub fn get_str(&self, key: &str) -> Option<&Value> {
        self.entries.get(&Value::String(key.to_string()))
    }

    pub fn insert(&mut self, key: Value, value: Value) -> Option<Value> {
        self.entries.insert(key, value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Instance of a pojo type produced by an object builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectValue {
    pub type_ref: TypeRef,
    pub fields: IndexMap<String, Value>,
}

impl ObjectValue {
    pub fn new(type_ref: &TypeRef) -> Self {
        Self {
            type_ref: type_ref.clone(),
            fields: IndexMap::new(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.fields.insert(field.into(), value);
    }
}

/// Raw content that carries its own content type (a stream or an attachment).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Content {
    pub content_type: String,
    pub data: Vec<u8>,
}

impl Content {
    pub fn new(content_type: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            content_type: content_type.into(),
            data: data.into(),
        }
    }
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapValue> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectValue> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    /// The run-time type of this value.
    pub fn natural_type(&self) -> TypeRef {
        match self {
            Value::Null => types::OBJECT.clone(),
            Value::Bool(_) => types::BOOLEAN.clone(),
            Value::Int(_) => types::LONG.clone(),
            Value::Float(_) => types::DOUBLE.clone(),
            Value::String(_) => types::STRING.clone(),
            Value::Bytes(_) | Value::Content(_) => types::BYTES.clone(),
            Value::Date(_) => types::DATE.clone(),
            Value::DateTime(_) => types::DATE_TIME.clone(),
            Value::List(_) => types::ARRAY_LIST.clone(),
            Value::Set(_) => types::HASH_SET.clone(),
            Value::Map(map) => match map.kind {
                MapKind::Hash => types::HASH_MAP.clone(),
                MapKind::Ordered => types::LINKED_HASH_MAP.clone(),
                MapKind::Concurrent => types::CONCURRENT_HASH_MAP.clone(),
            },
            Value::Object(object) => object.type_ref.clone(),
            Value::Message(_) => types::MESSAGE.clone(),
            Value::Function(_) => types::FUNCTION.clone(),
            Value::DataType(_) => types::DATA_TYPE.clone(),
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn type_name(&self) -> String {
        self.natural_type().name().to_string()
    }

    /// Convert to JSON for display and CLI output.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::String(s) => Json::String(s.clone()),
            Value::Bytes(bytes) => Json::from(bytes.clone()),
            Value::Date(date) => Json::String(date.format("%Y-%m-%dT%H:%M:%S").to_string()),
            Value::DateTime(date) => Json::String(date.to_rfc3339()),
            Value::List(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Set(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(map) => Json::Object(
                map.entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_json()))
                    .collect(),
            ),
            Value::Object(object) => {
                let mut fields = serde_json::Map::new();
                fields.insert("@type".to_string(), Json::String(object.type_ref.name().to_string()));
                for (name, value) in &object.fields {
                    fields.insert(name.clone(), value.to_json());
                }
                Json::Object(fields)
            }
            Value::Message(message) => message.payload.to_json(),
            Value::Content(content) => Json::String(String::from_utf8_lossy(&content.data).into_owned()),
            Value::Function(function) => Json::String(function.expression().to_string()),
            Value::DataType(data_type) => Json::String(data_type.to_string()),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(f) = n.as_f64() {
                    Value::Float(f)
                } else {
                    Value::Null
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(fields) => {
                let mut map = MapValue::new(MapKind::Ordered);
                for (k, v) in fields {
                    map.insert(Value::String(k), Value::from(v));
                }
                Value::Map(map)
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Set(a), Value::Set(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Message(a), Value::Message(b)) => Arc::ptr_eq(a, b) || a == b,
            (Value::Content(a), Value::Content(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a == b,
            (Value::DataType(a), Value::DataType(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::String(s) => s.hash(state),
            Value::Bytes(bytes) => bytes.hash(state),
            Value::Date(date) => date.hash(state),
            Value::DateTime(date) => date.hash(state),
            Value::List(items) => items.hash(state),
            // Unordered equality: entries are combined commutatively
            Value::Set(items) => unordered_hash(items.iter()).hash(state),
            Value::Map(map) => {
                map.kind.hash(state);
                unordered_hash(map.entries.iter()).hash(state);
            }
            Value::Object(object) => {
                object.type_ref.hash(state);
                unordered_hash(object.fields.iter()).hash(state);
            }
            Value::Message(message) => message.payload.hash(state),
            Value::Content(content) => content.hash(state),
            Value::Function(function) => function.hash(state),
            Value::DataType(data_type) => data_type.hash(state),
        }
    }
}

/// Order-independent hash of `items`.
pub(crate) fn unordered_hash<T: Hash>(items: impl Iterator<Item = T>) -> u64 {
    items.fold(0u64, |acc, item| {
        let mut hasher = DefaultHasher::new();
        item.hash(&mut hasher);
        acc.wrapping_add(hasher.finish())
    })
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::String(s) => write!(f, "{}", s),
            Value::Date(date) => write!(f, "{}", date.format("%Y-%m-%dT%H:%M:%S")),
            Value::DateTime(date) => write!(f, "{}", date.to_rfc3339()),
            Value::Function(function) => write!(f, "#[{}]", function.expression()),
            Value::DataType(data_type) => write!(f, "{}", data_type),
            _ => write!(f, "{}", self.to_json()),
        }
    }
}
