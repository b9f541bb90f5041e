//! Data types: immutable descriptors of a value's nominal type, MIME type and
//! encoding, plus the item type for collections.
//!
//! Data types are only created through [`DataTypeBuilder`] and are served
//! from a process-wide canonical cache, so equal builder states share a
//! single live instance.
//!
//! # Example
//!
//! ```
//! use mediate::DataType;
//! use mediate::types::STRING;
//!
//! let dt = DataType::builder()
//!     .of_type(&STRING)
//!     .mime_type("text/plain; charset=UTF-8")?
//!     .build();
//!
//! assert_eq!(dt.mime_type(), "text/plain");
//! assert_eq!(dt.encoding(), Some("UTF-8"));
//! assert!(dt.is_compatible_with(&DataType::string()));
//! # Ok::<(), mediate::error::ConfigError>(())
//! ```

mod builder;
pub mod cache;
pub mod mime;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::ConfigError;
use crate::types::{self, TypeRef};
use crate::value::Value;

pub use builder::DataTypeBuilder;
pub use cache::DataTypeCache;

/// Builder state a canonical data type is keyed by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataTypeKey {
    pub(crate) type_ref: TypeRef,
    pub(crate) item_type: Option<TypeRef>,
    pub(crate) mime_type: String,
    pub(crate) encoding: Option<String>,
}

#[derive(Debug)]
pub struct DataTypeInner {
    key: DataTypeKey,
}

impl DataTypeInner {
    fn new(key: DataTypeKey) -> Self {
        Self { key }
    }
}

/// Immutable, cheaply cloned data type handle.
#[derive(Clone)]
pub struct DataType(Arc<DataTypeInner>);

impl DataType {
    pub fn builder() -> DataTypeBuilder {
        DataTypeBuilder::new()
    }

    /// Data type for `type_ref` with the wildcard MIME type and no encoding.
    pub fn of(type_ref: &TypeRef) -> DataType {
        Self::builder().of_type(type_ref).build()
    }

    pub fn object() -> DataType {
        Self::of(&types::OBJECT)
    }

    pub fn string() -> DataType {
        Self::of(&types::STRING)
    }

    pub fn boolean() -> DataType {
        Self::of(&types::BOOLEAN)
    }

    pub fn number() -> DataType {
        Self::of(&types::NUMBER)
    }

    pub fn bytes() -> DataType {
        Self::of(&types::BYTES)
    }

    /// A string with MIME type `text/plain`.
    pub fn text_string() -> DataType {
        Self::with_mime(&types::STRING, mime::TEXT)
    }

    /// A string with MIME type `application/json`.
    pub fn json_string() -> DataType {
        Self::with_mime(&types::STRING, mime::JSON)
    }

    fn with_mime(type_ref: &TypeRef, mime_type: &'static str) -> DataType {
        let inner = DataTypeKey {
            type_ref: type_ref.clone(),
            item_type: None,
            mime_type: mime_type.to_string(),
            encoding: None,
        };
        cache::DATA_TYPE_CACHE.get_or_build(inner)
    }

    /// Derive a data type from a value.
    ///
    /// A [`Value::DataType`] is returned unchanged. Messages contribute the
    /// payload's type and their own MIME type. Content contributes its content
    /// type without parameters. Everything else gets its natural type and the
    /// wildcard MIME type.
    ///
    /// # Errors
    ///
    /// `InvalidMimeType` when a content type attached to the value is malformed.
    pub fn from_object(value: &Value) -> Result<DataType, ConfigError> {
        match value {
            Value::DataType(data_type) => Ok(data_type.clone()),
            Value::Message(message) => Self::builder()
                .of_type(&message.payload.natural_type())
                .mime_type(message.data_type.mime_type())
                .map(DataTypeBuilder::build),
            Value::Content(content) => Self::builder()
                .of_type(&value.natural_type())
                .mime_type(mime::strip_params(&content.content_type))
                .map(DataTypeBuilder::build),
            other => Ok(Self::of(&other.natural_type())),
        }
    }

    pub fn type_ref(&self) -> &TypeRef {
        &self.0.key.type_ref
    }

    /// Item type, only present for collections.
    pub fn item_type(&self) -> Option<&TypeRef> {
        self.0.key.item_type.as_ref()
    }

    pub fn mime_type(&self) -> &str {
        &self.0.key.mime_type
    }

    pub fn encoding(&self) -> Option<&str> {
        self.0.key.encoding.as_deref()
    }

    pub fn is_collection(&self) -> bool {
        self.0.key.item_type.is_some()
    }

    /// Whether both handles point to the same canonical instance.
    pub fn ptr_eq(&self, other: &DataType) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Looser than equality: types assignable in either direction, item types
    /// likewise when either side is a collection, and MIME types equal or one
    /// of them the wildcard.
    pub fn is_compatible_with(&self, other: &DataType) -> bool {
        if self == other {
            return true;
        }

        if !types_compatible(self.type_ref(), other.type_ref()) {
            return false;
        }

        if self.is_collection() || other.is_collection() {
            let ours = self.item_type().unwrap_or(&types::OBJECT);
            let theirs = other.item_type().unwrap_or(&types::OBJECT);
            if !types_compatible(ours, theirs) {
                return false;
            }
        }

        self.mime_type() == other.mime_type()
            || self.mime_type() == mime::ANY
            || other.mime_type() == mime::ANY
    }
}

fn types_compatible(a: &TypeRef, b: &TypeRef) -> bool {
    a.is_assignable_from(b) || b.is_assignable_from(a)
}

impl PartialEq for DataType {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.0.key == other.0.key
    }
}

impl Eq for DataType {}

impl Hash for DataType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.key.hash(state);
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoding = self.encoding().unwrap_or("null");
        match self.item_type() {
            Some(item_type) => write!(
                f,
                "CollectionDataType{{type={}, itemType={}, mimeType='{}', encoding='{}'}}",
                self.type_ref(),
                item_type,
                self.mime_type(),
                encoding
            ),
            None => write!(
                f,
                "SimpleDataType{{type={}, mimeType='{}', encoding='{}'}}",
                self.type_ref(),
                self.mime_type(),
                encoding
            ),
        }
    }
}

impl fmt::Debug for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Message;
    use crate::types::{ARRAY_LIST, COLLECTION, INTEGER, LIST, NUMBER, STRING};
    use crate::value::Content;
    use serde_json::json;

    #[test]
    fn test_equal_states_share_an_instance() {
        let a = DataType::builder()
            .of_type(&STRING)
            .mime_type("application/xml")
            .unwrap()
            .build();
        let b = DataType::builder()
            .of_type(&STRING)
            .mime_type("application/xml")
            .unwrap()
            .build();

        assert_eq!(a, b);
        assert!(a.ptr_eq(&b));
    }

    #[test]
    fn test_compatibility_is_reflexive_and_wider_than_equality() {
        let any = DataType::string();
        let text = DataType::text_string();

        assert!(any.is_compatible_with(&any));
        assert_ne!(any, text);
        assert!(any.is_compatible_with(&text));
        assert!(text.is_compatible_with(&any));
    }

    #[test]
    fn test_compatibility_rules() {
        assert!(DataType::number().is_compatible_with(&DataType::of(&INTEGER)));
        assert!(DataType::of(&INTEGER).is_compatible_with(&DataType::number()));
        assert!(DataType::object().is_compatible_with(&DataType::string()));
        assert!(!DataType::string().is_compatible_with(&DataType::of(&INTEGER)));

        // No sub-type matching between concrete MIME types
        assert!(!DataType::text_string().is_compatible_with(&DataType::json_string()));

        let strings = DataType::builder()
            .collection_type(&ARRAY_LIST, &STRING)
            .unwrap()
            .build();
        let numbers = DataType::builder()
            .collection_type(&LIST, &NUMBER)
            .unwrap()
            .build();
        let anything = DataType::of(&COLLECTION);
        assert!(!strings.is_compatible_with(&numbers));
        assert!(strings.is_compatible_with(&anything));
    }

    #[test]
    fn test_display() {
        let dt = DataType::builder()
            .collection_type(&ARRAY_LIST, &STRING)
            .unwrap()
            .build();
        assert_eq!(
            dt.to_string(),
            "CollectionDataType{type=ArrayList, itemType=String, mimeType='*/*', encoding='null'}"
        );
        assert_eq!(
            DataType::text_string().to_string(),
            "SimpleDataType{type=String, mimeType='text/plain', encoding='null'}"
        );
    }

    #[test]
    fn test_from_object() {
        let dt = DataType::json_string();
        assert!(DataType::from_object(&Value::DataType(dt.clone())).unwrap().ptr_eq(&dt));

        assert_eq!(
            DataType::from_object(&Value::Int(4)).unwrap(),
            DataType::of(&types::LONG)
        );

        let message = Message::builder(Value::from(json!("hello")))
            .data_type(DataType::text_string())
            .build();
        let from_message = DataType::from_object(&Value::Message(Arc::new(message))).unwrap();
        assert_eq!(from_message.type_ref(), &*STRING);
        assert_eq!(from_message.mime_type(), "text/plain");

        let content = Content::new("text/xml; charset=UTF-8", b"<a/>".to_vec());
        let from_content = DataType::from_object(&Value::Content(content)).unwrap();
        assert_eq!(from_content.mime_type(), "text/xml");
        assert_eq!(from_content.encoding(), None);
    }
}
