//! Declared component and parameter models.
//!
//! A [`ComponentModel`] lists the parameters a configurable component
//! accepts. Each [`ParameterModel`] carries a [`MetadataType`] describing the
//! shape of its value, which the parameter parser matches on to pick a
//! resolver.

pub mod loader;

use serde::{Deserialize, Serialize};

use crate::types::{self, FieldInfo, TypeRef};
use crate::value::Value;

pub use loader::{load_component_model, load_component_models_from_dir, ComponentModelLoader};

/// Whether and how a parameter accepts expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpressionSupport {
    /// Expressions are rejected.
    NotSupported,
    /// Values are taken verbatim, markers included, and never evaluated.
    Literal,
    /// The value must be an expression.
    Required,
    /// Expressions and fixed values are both accepted.
    #[default]
    Supported,
}

/// Annotations any metadata type may carry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeAnnotations {
    pub default: Option<Value>,
    pub expression_support: Option<ExpressionSupport>,
}

/// Shape of a declared parameter or field type.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataType {
    /// Strings, numbers, booleans, binary and the universal object type.
    Simple(SimpleType),
    /// Local date-time without offset.
    Date(TypeAnnotations),
    /// Date-time with offset.
    DateTime(TypeAnnotations),
    /// A pojo with declared fields.
    Object(ObjectType),
    Array(ArrayType),
    Dictionary(DictionaryType),
    Function(FunctionType),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimpleType {
    pub type_ref: TypeRef,
    pub annotations: TypeAnnotations,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectType {
    pub type_ref: TypeRef,
    pub fields: Vec<ObjectField>,
    pub annotations: TypeAnnotations,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectField {
    pub name: String,
    pub alias: Option<String>,
    pub value_type: MetadataType,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayType {
    /// Declared collection interface, `None` when undeclared.
    pub collection_type: Option<TypeRef>,
    pub item_type: Box<MetadataType>,
    pub annotations: TypeAnnotations,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DictionaryType {
    /// Declared map interface, `None` when undeclared.
    pub map_type: Option<TypeRef>,
    pub key_type: Box<MetadataType>,
    pub value_type: Box<MetadataType>,
    pub annotations: TypeAnnotations,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionType {
    pub argument_type: TypeRef,
    pub return_type: TypeRef,
    pub annotations: TypeAnnotations,
}

impl MetadataType {
    /// Simple type for `type_ref`.
    pub fn simple(type_ref: &TypeRef) -> Self {
        MetadataType::Simple(SimpleType {
            type_ref: type_ref.clone(),
            annotations: TypeAnnotations::default(),
        })
    }

    pub fn date() -> Self {
        MetadataType::Date(TypeAnnotations::default())
    }

    pub fn date_time() -> Self {
        MetadataType::DateTime(TypeAnnotations::default())
    }

    pub fn array(collection_type: Option<&TypeRef>, item_type: MetadataType) -> Self {
        MetadataType::Array(ArrayType {
            collection_type: collection_type.cloned(),
            item_type: Box::new(item_type),
            annotations: TypeAnnotations::default(),
        })
    }

    pub fn dictionary(map_type: Option<&TypeRef>, key_type: MetadataType, value_type: MetadataType) -> Self {
        MetadataType::Dictionary(DictionaryType {
            map_type: map_type.cloned(),
            key_type: Box::new(key_type),
            value_type: Box::new(value_type),
            annotations: TypeAnnotations::default(),
        })
    }

    pub fn function(argument_type: &TypeRef, return_type: &TypeRef) -> Self {
        MetadataType::Function(FunctionType {
            argument_type: argument_type.clone(),
            return_type: return_type.clone(),
            annotations: TypeAnnotations::default(),
        })
    }

    /// Metadata for a plain type: dates, simple types and pojos.
    pub fn of_type(type_ref: &TypeRef) -> Self {
        if *type_ref == *types::DATE {
            MetadataType::date()
        } else if *type_ref == *types::DATE_TIME {
            MetadataType::date_time()
        } else if is_simple_type(type_ref) {
            MetadataType::simple(type_ref)
        } else {
            MetadataType::Object(ObjectType::from_type_ref(type_ref))
        }
    }

    /// The nominal type values of this shape have.
    pub fn type_ref(&self) -> TypeRef {
        match self {
            MetadataType::Simple(simple) => simple.type_ref.clone(),
            MetadataType::Date(_) => types::DATE.clone(),
            MetadataType::DateTime(_) => types::DATE_TIME.clone(),
            MetadataType::Object(object) => object.type_ref.clone(),
            MetadataType::Array(array) => array
                .collection_type
                .clone()
                .unwrap_or_else(|| types::LIST.clone()),
            MetadataType::Dictionary(dictionary) => dictionary
                .map_type
                .clone()
                .unwrap_or_else(|| types::MAP.clone()),
            MetadataType::Function(_) => types::FUNCTION.clone(),
        }
    }

    pub fn annotations(&self) -> &TypeAnnotations {
        match self {
            MetadataType::Simple(simple) => &simple.annotations,
            MetadataType::Date(annotations) | MetadataType::DateTime(annotations) => annotations,
            MetadataType::Object(object) => &object.annotations,
            MetadataType::Array(array) => &array.annotations,
            MetadataType::Dictionary(dictionary) => &dictionary.annotations,
            MetadataType::Function(function) => &function.annotations,
        }
    }

    pub fn annotations_mut(&mut self) -> &mut TypeAnnotations {
        match self {
            MetadataType::Simple(simple) => &mut simple.annotations,
            MetadataType::Date(annotations) | MetadataType::DateTime(annotations) => annotations,
            MetadataType::Object(object) => &mut object.annotations,
            MetadataType::Array(array) => &mut array.annotations,
            MetadataType::Dictionary(dictionary) => &mut dictionary.annotations,
            MetadataType::Function(function) => &mut function.annotations,
        }
    }

    /// Per-type default value.
    pub fn default_value(&self) -> Option<&Value> {
        self.annotations().default.as_ref()
    }

    /// Per-type expression support, [`ExpressionSupport::Supported`] when
    /// not annotated.
    pub fn expression_support(&self) -> ExpressionSupport {
        self.annotations().expression_support.unwrap_or_default()
    }

    /// A function taking the in-flight event.
    pub fn is_expression_function(&self) -> bool {
        match self {
            MetadataType::Function(function) => {
                types::EVENT.is_assignable_from(&function.argument_type)
            }
            _ => false,
        }
    }

    /// Short name of the shape, for logs and errors.
    pub fn shape_name(&self) -> &'static str {
        match self {
            MetadataType::Simple(_) => "simple",
            MetadataType::Date(_) => "date",
            MetadataType::DateTime(_) => "date-time",
            MetadataType::Object(_) => "object",
            MetadataType::Array(_) => "array",
            MetadataType::Dictionary(_) => "dictionary",
            MetadataType::Function(_) => "function",
        }
    }
}

/// Types whose values are written inline as text.
pub fn is_simple_type(type_ref: &TypeRef) -> bool {
    [
        &*types::STRING,
        &*types::BOOLEAN,
        &*types::NUMBER,
        &*types::INTEGER,
        &*types::LONG,
        &*types::DOUBLE,
        &*types::BYTES,
        &*types::OBJECT,
    ]
    .contains(&type_ref)
}

impl ObjectType {
    /// Declare a pojo type named `name` with `fields`, building its
    /// [`TypeRef`] along the way.
    pub fn declare(name: &str, fields: Vec<ObjectField>) -> Self {
        let mut builder = TypeRef::builder(name);
        for field in &fields {
            let mut info = FieldInfo::new(field.name.as_str(), &field.value_type.type_ref());
            if let Some(alias) = &field.alias {
                info = info.with_alias(alias.as_str());
            }
            if let Some(default) = field.value_type.default_value() {
                info = info.with_default(default.clone());
            }
            builder = builder.field(info);
        }
        Self {
            type_ref: builder.build(),
            fields,
            annotations: TypeAnnotations::default(),
        }
    }

    /// Object metadata for an existing type, fields described by their
    /// declared types.
    pub fn from_type_ref(type_ref: &TypeRef) -> Self {
        let fields = type_ref
            .fields()
            .iter()
            .map(|info| {
                let mut value_type = MetadataType::of_type(&info.type_ref);
                value_type.annotations_mut().default = info.default.clone();
                ObjectField {
                    name: info.name.clone(),
                    alias: info.alias.clone(),
                    value_type,
                    required: false,
                }
            })
            .collect();
        Self {
            type_ref: type_ref.clone(),
            fields,
            annotations: TypeAnnotations::default(),
        }
    }

    /// Field lookup by name or alias.
    pub fn field(&self, key: &str) -> Option<&ObjectField> {
        self.fields
            .iter()
            .find(|field| field.alias.as_deref() == Some(key) || field.name == key)
    }
}

impl ObjectField {
    pub fn new(name: impl Into<String>, value_type: MetadataType) -> Self {
        Self {
            name: name.into(),
            alias: None,
            value_type,
            required: false,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Name used in configuration: the alias when declared.
    pub fn config_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// A declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterModel {
    pub name: String,
    /// Name of the member the value is bound to, when it differs.
    pub member_name: Option<String>,
    pub metadata_type: MetadataType,
    pub default: Option<Value>,
    pub expression_support: ExpressionSupport,
    pub required: bool,
}

impl ParameterModel {
    pub fn new(name: impl Into<String>, metadata_type: MetadataType) -> Self {
        Self {
            name: name.into(),
            member_name: None,
            metadata_type,
            default: None,
            expression_support: ExpressionSupport::default(),
            required: false,
        }
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_expression_support(mut self, expression_support: ExpressionSupport) -> Self {
        self.expression_support = expression_support;
        self
    }

    pub fn with_member_name(mut self, member_name: impl Into<String>) -> Self {
        self.member_name = Some(member_name.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Key the resolver is registered under: the member name, else the name.
    pub fn key(&self) -> &str {
        self.member_name.as_deref().unwrap_or(&self.name)
    }
}

/// What kind of component a model describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Configuration,
    ConnectionProvider,
    Operation,
    Source,
}

/// A configurable component and its parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentModel {
    pub name: String,
    pub kind: ComponentKind,
    pub description: Option<String>,
    pub parameters: Vec<ParameterModel>,
}

impl ComponentModel {
    pub fn new(name: impl Into<String>, kind: ComponentKind) -> Self {
        Self {
            name: name.into(),
            kind,
            description: None,
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, parameter: ParameterModel) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterModel> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HASH_SET, INTEGER, STRING};

    #[test]
    fn test_expression_support_serde() {
        let support: ExpressionSupport = serde_yaml::from_str("not_supported").unwrap();
        assert_eq!(support, ExpressionSupport::NotSupported);
        assert_eq!(ExpressionSupport::default(), ExpressionSupport::Supported);
    }

    #[test]
    fn test_parameter_key() {
        let plain = ParameterModel::new("retries", MetadataType::simple(&INTEGER));
        assert_eq!(plain.key(), "retries");

        let member = plain.clone().with_member_name("maxRetries");
        assert_eq!(member.key(), "maxRetries");
    }

    #[test]
    fn test_type_refs() {
        assert_eq!(MetadataType::date().type_ref(), *types::DATE);
        assert_eq!(
            MetadataType::array(None, MetadataType::simple(&STRING)).type_ref(),
            *types::LIST
        );
        assert_eq!(
            MetadataType::array(Some(&HASH_SET), MetadataType::simple(&STRING)).type_ref(),
            *HASH_SET
        );
        assert_eq!(
            MetadataType::dictionary(None, MetadataType::simple(&STRING), MetadataType::simple(&STRING))
                .type_ref(),
            *types::MAP
        );
    }

    #[test]
    fn test_expression_function_detection() {
        assert!(MetadataType::function(&types::EVENT, &STRING).is_expression_function());
        assert!(!MetadataType::function(&STRING, &STRING).is_expression_function());
        assert!(!MetadataType::simple(&STRING).is_expression_function());
    }

    #[test]
    fn test_declared_object_type() {
        let address = ObjectType::declare(
            "Address",
            vec![
                ObjectField::new("street", MetadataType::simple(&STRING)),
                ObjectField::new("zipCode", MetadataType::simple(&INTEGER)).with_alias("zip-code"),
            ],
        );

        assert_eq!(address.type_ref.name(), "Address");
        assert_eq!(address.type_ref.fields().len(), 2);
        assert_eq!(address.field("zip-code").map(|f| f.name.as_str()), Some("zipCode"));
        assert_eq!(address.fields[1].config_name(), "zip-code");
        assert!(matches!(MetadataType::of_type(&address.type_ref), MetadataType::Object(_)));
        assert!(matches!(MetadataType::of_type(&types::DATE_TIME), MetadataType::DateTime(_)));
    }
}
