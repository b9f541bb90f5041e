use crate::error::ConfigError;
use crate::types::{self, normalize_proxy, TypeRef};

use super::cache::DATA_TYPE_CACHE;
use super::mime::{self, MimeType};
use super::{DataType, DataTypeKey};

/// Staging object for a [`DataType`].
///
/// Every setter validates its input right away. The builder is consumed by
/// [`build`](Self::build), so a builder can never be used again after it has
/// produced a data type:
///
/// ```compile_fail
/// use mediate::DataType;
///
/// let builder = DataType::builder();
/// let first = builder.build();
/// let second = builder.build();
/// ```
#[derive(Debug, Clone)]
pub struct DataTypeBuilder {
    type_ref: TypeRef,
    item_type: Option<TypeRef>,
    mime_type: String,
    encoding: Option<String>,
    explicit_encoding: bool,
}

impl DataTypeBuilder {
    pub(crate) fn new() -> Self {
        Self {
            type_ref: types::OBJECT.clone(),
            item_type: None,
            mime_type: mime::ANY.to_string(),
            encoding: None,
            explicit_encoding: false,
        }
    }

    /// Set the nominal type. Proxy types are replaced by their first interface.
    pub fn of_type(mut self, type_ref: &TypeRef) -> Self {
        self.type_ref = normalize_proxy(type_ref);
        self
    }

    /// Set a collection type together with its item type.
    ///
    /// # Errors
    ///
    /// `NotACollectionType` when `collection_type` is not a collection.
    pub fn collection_type(
        mut self,
        collection_type: &TypeRef,
        item_type: &TypeRef,
    ) -> Result<Self, ConfigError> {
        if !collection_type.is_collection() {
            return Err(ConfigError::NotACollectionType(
                collection_type.name().to_string(),
            ));
        }
        self.type_ref = normalize_proxy(collection_type);
        self.item_type = Some(normalize_proxy(item_type));
        Ok(self)
    }

    /// Set the MIME type. `None` resets it to the wildcard.
    ///
    /// A `charset` parameter becomes the encoding, unless an encoding was
    /// given explicitly through [`encoding`](Self::encoding), before or after
    /// this call.
    pub fn mime_type<'a>(mut self, mime_type: impl Into<Option<&'a str>>) -> Result<Self, ConfigError> {
        let Some(raw) = mime_type.into() else {
            self.mime_type = mime::ANY.to_string();
            return Ok(self);
        };

        let parsed = MimeType::parse(raw)?;
        if let Some(charset) = parsed.charset() {
            if !self.explicit_encoding {
                self.encoding = Some(validate_charset(charset)?);
            }
        }
        self.mime_type = parsed.essence();
        Ok(self)
    }

    /// Set the encoding. `None` or a blank name unsets it.
    ///
    /// # Errors
    ///
    /// `UnsupportedCharset` when the name is not a supported charset.
    pub fn encoding<'a>(mut self, encoding: impl Into<Option<&'a str>>) -> Result<Self, ConfigError> {
        match encoding.into().filter(|name| !name.trim().is_empty()) {
            Some(name) => {
                self.encoding = Some(validate_charset(name)?);
                self.explicit_encoding = true;
            }
            None => {
                self.encoding = None;
                self.explicit_encoding = false;
            }
        }
        Ok(self)
    }

    /// Start from an existing data type.
    ///
    /// The copied encoding counts as derived, a later `charset` parameter may
    /// replace it.
    pub fn from_template(mut self, template: &DataType) -> Self {
        self.type_ref = template.type_ref().clone();
        self.item_type = template.item_type().cloned();
        self.mime_type = template.mime_type().to_string();
        self.encoding = template.encoding().map(str::to_string);
        self.explicit_encoding = false;
        self
    }

    /// Produce the canonical data type for the staged state.
    ///
    /// Collections without an item type get the declared element type of the
    /// collection class, or the universal object type.
    pub fn build(self) -> DataType {
        let item_type = if self.type_ref.is_collection() {
            Some(
                self.item_type
                    .or_else(|| self.type_ref.element_type().cloned())
                    .unwrap_or_else(|| types::OBJECT.clone()),
            )
        } else {
            None
        };

        DATA_TYPE_CACHE.get_or_build(DataTypeKey {
            type_ref: self.type_ref,
            item_type,
            mime_type: self.mime_type,
            encoding: self.encoding,
        })
    }
}

fn validate_charset(name: &str) -> Result<String, ConfigError> {
    mime::canonical_charset(name)
        .map(str::to_string)
        .ok_or_else(|| ConfigError::UnsupportedCharset(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldInfo, ARRAY_LIST, HASH_SET, INTEGER, LIST, STRING};

    #[test]
    fn test_charset_from_mime_type() {
        let dt = DataType::builder()
            .of_type(&STRING)
            .mime_type("text/plain; charset=UTF-8")
            .unwrap()
            .build();

        assert_eq!(dt.mime_type(), "text/plain");
        assert_eq!(dt.encoding(), Some("UTF-8"));
    }

    #[test]
    fn test_explicit_encoding_wins_in_either_order() {
        let before = DataType::builder()
            .encoding("ISO-8859-1")
            .unwrap()
            .mime_type("text/plain; charset=UTF-8")
            .unwrap()
            .build();
        let after = DataType::builder()
            .mime_type("text/plain; charset=UTF-8")
            .unwrap()
            .encoding("ISO-8859-1")
            .unwrap()
            .build();

        assert_eq!(before.encoding(), Some("ISO-8859-1"));
        assert_eq!(before, after);
    }

    #[test]
    fn test_blank_encoding_unsets() {
        let dt = DataType::builder()
            .encoding("UTF-8")
            .unwrap()
            .encoding("  ")
            .unwrap()
            .build();
        assert_eq!(dt.encoding(), None);
    }

    #[test]
    fn test_invalid_inputs_fail_fast() {
        assert_eq!(
            DataType::builder().mime_type("not a mime").unwrap_err(),
            ConfigError::InvalidMimeType("not a mime".to_string())
        );
        assert_eq!(
            DataType::builder().encoding("no-such-charset").unwrap_err(),
            ConfigError::UnsupportedCharset("no-such-charset".to_string())
        );
        assert_eq!(
            DataType::builder()
                .collection_type(&STRING, &STRING)
                .unwrap_err(),
            ConfigError::NotACollectionType("String".to_string())
        );
    }

    #[test]
    fn test_none_mime_type_resets_to_wildcard() {
        let dt = DataType::builder()
            .mime_type("application/json")
            .unwrap()
            .mime_type(None)
            .unwrap()
            .build();
        assert_eq!(dt.mime_type(), mime::ANY);
    }

    #[test]
    fn test_collection_item_type_inference() {
        let plain = DataType::builder().of_type(&ARRAY_LIST).build();
        assert_eq!(plain.item_type(), Some(&*types::OBJECT));

        let numbers = TypeRef::builder("IntegerList")
            .kind(types::TypeKind::List)
            .extends(&LIST)
            .element_type(&INTEGER)
            .build();
        let inferred = DataType::builder().of_type(&numbers).build();
        assert_eq!(inferred.item_type(), Some(&*INTEGER));

        let explicit = DataType::builder()
            .collection_type(&HASH_SET, &STRING)
            .unwrap()
            .build();
        assert_eq!(explicit.item_type(), Some(&*STRING));
    }

    #[test]
    fn test_non_collection_has_no_item_type() {
        let person = TypeRef::builder("Person")
            .field(FieldInfo::new("name", &STRING))
            .build();
        assert_eq!(DataType::builder().of_type(&person).build().item_type(), None);
    }

    #[test]
    fn test_proxy_types_are_normalized() {
        let proxy = TypeRef::builder("$Proxy7").proxy_of(&[STRING.clone()]).build();
        let dt = DataType::builder().of_type(&proxy).build();
        assert_eq!(dt.type_ref(), &*STRING);
    }

    #[test]
    fn test_template_copy() {
        let template = DataType::builder()
            .collection_type(&ARRAY_LIST, &STRING)
            .unwrap()
            .mime_type("application/json; charset=UTF-16")
            .unwrap()
            .build();
        let copy = DataType::builder().from_template(&template).build();
        assert_eq!(copy, template);

        // Copied encoding is not explicit
        let replaced = DataType::builder()
            .from_template(&template)
            .mime_type("application/json; charset=UTF-8")
            .unwrap()
            .build();
        assert_eq!(replaced.encoding(), Some("UTF-8"));
    }
}
