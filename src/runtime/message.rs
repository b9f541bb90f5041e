//! Messages carried by in-flight events.

use indexmap::IndexMap;

use crate::datatype::DataType;
use crate::value::Value;

/// An immutable message: payload, its data type and inbound attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub payload: Value,
    pub data_type: DataType,
    pub attributes: IndexMap<String, Value>,
}

impl Message {
    /// Message whose data type is derived from the payload.
    pub fn of(payload: impl Into<Value>) -> Self {
        Self::builder(payload).build()
    }

    pub fn builder(payload: impl Into<Value>) -> MessageBuilder {
        MessageBuilder {
            payload: payload.into(),
            data_type: None,
            attributes: IndexMap::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Field of a map or pojo payload.
    pub fn payload_field(&self, name: &str) -> Option<&Value> {
        match &self.payload {
            Value::Map(map) => map.get_str(name),
            Value::Object(object) => object.get(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MessageBuilder {
    payload: Value,
    data_type: Option<DataType>,
    attributes: IndexMap<String, Value>,
}

impl MessageBuilder {
    pub fn data_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn build(self) -> Message {
        let data_type = self
            .data_type
            .unwrap_or_else(|| DataType::of(&self.payload.natural_type()));
        Message {
            payload: self.payload,
            data_type,
            attributes: self.attributes,
        }
    }
}
