//! Parameter parsing: from declared models and configured values to
//! resolvers.
//!
//! [`ParameterParser::resolver_of`] picks the resolver for one raw value,
//! first match wins:
//!
//! 1. `Literal` expression support keeps the raw value verbatim.
//! 2. A function taking the event becomes an expression function.
//! 3. Text containing a `#[...]` template becomes a type-safe expression.
//! 4. Otherwise the declared shape decides: conversion for simple types,
//!    pattern parsing for dates, registry lookups for object references,
//!    nested resolvers for collections and maps.
//! 5. With nothing configured, the declared default.
//!
//! The resulting resolver is then checked against the expression support
//! policy.

pub mod naming;

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime};

use crate::component::to_value_resolver;
use crate::config::ConfigElement;
use crate::error::{ConfigError, Error};
use crate::model::{
    ArrayType, ComponentModel, DictionaryType, ExpressionSupport, MetadataType, ObjectType,
    ParameterModel,
};
use crate::resolver::{
    CollectionValueResolver, ExpressionFunctionValueResolver, MapValueResolver, ObjectBuilder,
    ObjectBuilderValueResolver, RegistryLookupValueResolver, ResolverRef, ResolverSet,
    StaticValueResolver, TypeSafeExpressionValueResolver,
};
use crate::runtime::{template, RuntimeServices};
use crate::types::{self, MapKind, TypeKind, TypeRef};
use crate::value::Value;

pub use naming::{hyphenize, pluralize, singularize};

/// Pattern for `Date` parameters.
pub const DATE_PATTERN: &str = "%Y-%m-%dT%H:%M:%S";

/// Pattern for `DateTime` parameters.
pub const DATE_TIME_PATTERN: &str = "%Y-%m-%dT%H:%M:%S%#z";

/// Attribute carrying a map entry's key.
pub const KEY_ATTRIBUTE: &str = "key";

/// Attribute carrying a map entry's or collection item's value.
pub const VALUE_ATTRIBUTE: &str = "value";

/// A configured value as handed to the parser.
#[derive(Debug, Clone, Default)]
pub enum RawValue {
    /// Nothing was configured.
    #[default]
    Absent,
    /// Text from an attribute or element body.
    Text(String),
    /// An already typed value.
    Value(Value),
    /// A resolver built elsewhere, used as is.
    Resolver(ResolverRef),
}

impl RawValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, RawValue::Absent)
    }

    fn as_text(&self) -> Option<&str> {
        match self {
            RawValue::Text(text) => Some(text),
            RawValue::Value(Value::String(text)) => Some(text),
            _ => None,
        }
    }
}

impl From<&str> for RawValue {
    fn from(text: &str) -> Self {
        RawValue::Text(text.to_string())
    }
}

impl From<String> for RawValue {
    fn from(text: String) -> Self {
        RawValue::Text(text)
    }
}

impl From<Option<&str>> for RawValue {
    fn from(text: Option<&str>) -> Self {
        text.map_or(RawValue::Absent, RawValue::from)
    }
}

impl From<Value> for RawValue {
    fn from(value: Value) -> Self {
        RawValue::Value(value)
    }
}

/// A parameter's registration key and its resolver.
#[derive(Debug, Clone)]
pub struct ParsedParameter {
    pub name: String,
    pub resolver: ResolverRef,
}

/// Builds resolvers for declared parameters.
#[derive(Debug, Clone, Default)]
pub struct ParameterParser {
    services: RuntimeServices,
}

impl ParameterParser {
    pub fn new(services: RuntimeServices) -> Self {
        Self { services }
    }

    pub fn services(&self) -> &RuntimeServices {
        &self.services
    }

    /// Build the resolver for one raw value of parameter `name`.
    ///
    /// # Errors
    ///
    /// * `ExpressionNotSupported` when an expression is given to a parameter
    ///   that rejects them
    /// * `ExpressionRequired` when a required, expression-only parameter is
    ///   given a fixed value
    /// * `InvalidDate` / `InvalidParameterValue` for values that cannot take
    ///   the declared type
    pub fn resolver_of(
        &self,
        name: &str,
        metadata_type: &MetadataType,
        raw: RawValue,
        default: Option<&Value>,
        support: ExpressionSupport,
        required: bool,
    ) -> Result<ResolverRef, ConfigError> {
        let resolver = self.build_resolver(name, metadata_type, raw, default, support)?;
        validate_expression_support(name, metadata_type, &resolver, support, required)?;
        Ok(resolver)
    }

    fn build_resolver(
        &self,
        name: &str,
        metadata_type: &MetadataType,
        raw: RawValue,
        default: Option<&Value>,
        support: ExpressionSupport,
    ) -> Result<ResolverRef, ConfigError> {
        if let RawValue::Resolver(resolver) = raw {
            return Ok(resolver);
        }

        if support == ExpressionSupport::Literal {
            let value = match raw {
                RawValue::Text(text) => Value::String(text),
                RawValue::Value(value) => value,
                _ => default.cloned().unwrap_or(Value::Null),
            };
            return Ok(Arc::new(StaticValueResolver::new(value)));
        }

        if let MetadataType::Function(function) = metadata_type {
            if metadata_type.is_expression_function() {
                match raw {
                    RawValue::Value(value @ Value::Function(_)) => {
                        return Ok(Arc::new(StaticValueResolver::new(value)));
                    }
                    RawValue::Value(ref value) if value.as_str().is_none() => {
                        return Err(ConfigError::InvalidParameterValue {
                            parameter: name.to_string(),
                            reason: format!("expected an expression, got {}", value),
                        });
                    }
                    _ => {}
                }
                let expression = raw
                    .as_text()
                    .map(str::to_string)
                    .or_else(|| default.and_then(Value::as_str).map(str::to_string));
                return Ok(match expression {
                    Some(expression) => Arc::new(ExpressionFunctionValueResolver::new(
                        expression,
                        &function.return_type,
                    )),
                    None => Arc::new(StaticValueResolver::new(default.cloned().unwrap_or(Value::Null))),
                });
            }
        }

        if let Some(text) = raw.as_text() {
            if template::contains_template(text) {
                tracing::trace!(parameter = name, expression = %text, "expression parameter");
                return Ok(Arc::new(TypeSafeExpressionValueResolver::new(
                    text,
                    &metadata_type.type_ref(),
                )));
            }
        }

        match metadata_type {
            MetadataType::Date(_) | MetadataType::DateTime(_) => {
                let source = match raw {
                    RawValue::Absent => match default {
                        Some(default) => default.clone(),
                        None => return Ok(Arc::new(StaticValueResolver::null())),
                    },
                    RawValue::Text(text) => Value::String(text),
                    RawValue::Value(value) => value,
                    RawValue::Resolver(resolver) => return Ok(resolver),
                };
                let with_offset = matches!(metadata_type, MetadataType::DateTime(_));
                let value = parse_date(source, with_offset)?;
                Ok(Arc::new(StaticValueResolver::new(value)))
            }
            _ if raw.is_absent() => Ok(Arc::new(StaticValueResolver::new(
                default.cloned().unwrap_or(Value::Null),
            ))),
            MetadataType::Simple(simple) => self.simple_resolver(name, &simple.type_ref, raw),
            MetadataType::Object(_) | MetadataType::Function(_) => Ok(reference_or_value(raw)),
            MetadataType::Array(array) => match raw {
                RawValue::Value(value @ (Value::List(_) | Value::Set(_))) => {
                    let collection_type = concrete_collection_type(array.collection_type.as_ref());
                    let items = match value {
                        Value::List(items) => items,
                        Value::Set(items) => items.into_iter().collect(),
                        _ => Vec::new(),
                    };
                    let items = items.into_iter().map(to_value_resolver).collect();
                    Ok(Arc::new(CollectionValueResolver::new(&collection_type, items)?))
                }
                other => Ok(reference_or_value(other)),
            },
            MetadataType::Dictionary(dictionary) => match raw {
                RawValue::Value(Value::Map(map)) => {
                    let map_type = concrete_map_type(dictionary.map_type.as_ref());
                    let (keys, values): (Vec<ResolverRef>, Vec<ResolverRef>) = map
                        .entries
                        .into_iter()
                        .map(|(k, v)| (to_value_resolver(k), to_value_resolver(v)))
                        .unzip();
                    Ok(Arc::new(MapValueResolver::new(&map_type, keys, values)?))
                }
                other => Ok(reference_or_value(other)),
            },
        }
    }

    fn simple_resolver(&self, name: &str, target: &TypeRef, raw: RawValue) -> Result<ResolverRef, ConfigError> {
        let value = match raw {
            RawValue::Text(text) => Value::String(text),
            RawValue::Value(value) => value,
            RawValue::Resolver(resolver) => return Ok(resolver),
            RawValue::Absent => Value::Null,
        };

        let converter = self.services.converter();
        if !converter.can_convert(&value, target) {
            tracing::trace!(parameter = name, target = %target, "no conversion, using registry reference");
            return Ok(match value {
                Value::String(reference) => Arc::new(RegistryLookupValueResolver::new(reference)),
                other => Arc::new(StaticValueResolver::new(other)),
            });
        }

        let converted = converter
            .convert(value, target)
            .map_err(|e| ConfigError::InvalidParameterValue {
                parameter: name.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Arc::new(StaticValueResolver::new(converted)))
    }

    /// Parse `parameter` from the attributes and children of `element`.
    ///
    /// An attribute named after the parameter wins. Otherwise the parameter's
    /// shape decides which child elements hold it.
    pub fn parse_parameter(
        &self,
        parameter: &ParameterModel,
        element: &ConfigElement,
    ) -> Result<ParsedParameter, ConfigError> {
        let default = parameter
            .default
            .as_ref()
            .or_else(|| parameter.metadata_type.default_value());
        let configured = is_configured(&parameter.name, &parameter.metadata_type, element);
        if !configured && parameter.required && default.is_none() {
            return Err(ConfigError::InvalidParameterValue {
                parameter: parameter.name.clone(),
                reason: "required parameter has no value".to_string(),
            });
        }

        let resolver = self.parse_value(
            &parameter.name,
            &parameter.metadata_type,
            element,
            default,
            parameter.expression_support,
            parameter.required,
        )?;
        Ok(ParsedParameter {
            name: parameter.key().to_string(),
            resolver,
        })
    }

    /// Parse every parameter of `model` from `element` into a resolver set.
    pub fn parse_component(&self, model: &ComponentModel, element: &ConfigElement) -> Result<ResolverSet, Error> {
        let mut set = ResolverSet::new();
        for parameter in &model.parameters {
            let parsed = self.parse_parameter(parameter, element)?;
            set.add(parsed.name, parsed.resolver)?;
        }
        tracing::debug!(
            component = %model.name,
            element = %element.qualified_identifier(),
            parameters = set.len(),
            dynamic = set.is_dynamic(),
            "parsed component parameters"
        );
        Ok(set)
    }

    fn parse_value(
        &self,
        name: &str,
        metadata_type: &MetadataType,
        element: &ConfigElement,
        default: Option<&Value>,
        support: ExpressionSupport,
        required: bool,
    ) -> Result<ResolverRef, ConfigError> {
        if let Some(text) = element.attribute(name) {
            return self.resolver_of(name, metadata_type, RawValue::from(text), default, support, required);
        }

        let nested = match metadata_type {
            MetadataType::Object(object) => element
                .child(&hyphenize(name))
                .map(|child| self.object_resolver(object, child))
                .transpose()?,
            MetadataType::Array(array) => element
                .child(&hyphenize(name))
                .map(|wrapper| self.collection_resolver(name, array, wrapper))
                .transpose()?,
            MetadataType::Dictionary(dictionary) => element
                .child(&hyphenize(&pluralize(name)))
                .map(|wrapper| self.map_resolver(name, dictionary, wrapper))
                .transpose()?,
            _ => {
                let text = element.child(&hyphenize(name)).and_then(ConfigElement::text);
                if let Some(text) = text {
                    return self.resolver_of(name, metadata_type, RawValue::from(text), default, support, required);
                }
                None
            }
        };

        let raw = nested.map_or(RawValue::Absent, RawValue::Resolver);
        self.resolver_of(name, metadata_type, raw, default, support, required)
    }

    /// Build a pojo from the attributes and children of `element`, one
    /// resolver per configured field.
    fn object_resolver(&self, object: &ObjectType, element: &ConfigElement) -> Result<ResolverRef, ConfigError> {
        let mut builder = ObjectBuilder::new(&object.type_ref);
        for field in &object.fields {
            let key = field.config_name();
            if !is_configured(key, &field.value_type, element) {
                if field.required && field.value_type.default_value().is_none() {
                    return Err(ConfigError::InvalidParameterValue {
                        parameter: key.to_string(),
                        reason: format!("required field of '{}' has no value", object.type_ref.name()),
                    });
                }
                continue;
            }
            let resolver = self.parse_value(
                key,
                &field.value_type,
                element,
                field.value_type.default_value(),
                field.value_type.expression_support(),
                field.required,
            )?;
            builder.add_property_resolver(&field.name, resolver)?;
        }
        Ok(Arc::new(ObjectBuilderValueResolver::new(builder)))
    }

    fn collection_resolver(
        &self,
        name: &str,
        array: &ArrayType,
        wrapper: &ConfigElement,
    ) -> Result<ResolverRef, ConfigError> {
        let item_name = hyphenize(&singularize(name));
        let items = wrapper
            .children_named(&item_name)
            .map(|item| self.item_resolver(&item_name, &array.item_type, item))
            .collect::<Result<Vec<_>, _>>()?;
        let collection_type = concrete_collection_type(array.collection_type.as_ref());
        Ok(Arc::new(CollectionValueResolver::new(&collection_type, items)?))
    }

    fn map_resolver(
        &self,
        name: &str,
        dictionary: &DictionaryType,
        wrapper: &ConfigElement,
    ) -> Result<ResolverRef, ConfigError> {
        let entry_name = hyphenize(&singularize(name));
        let mut keys = Vec::new();
        let mut values = Vec::new();
        for entry in wrapper.children_named(&entry_name) {
            let key = entry.attribute(KEY_ATTRIBUTE).ok_or_else(|| ConfigError::InvalidParameterValue {
                parameter: name.to_string(),
                reason: format!("'{}' entry has no '{}' attribute", entry_name, KEY_ATTRIBUTE),
            })?;
            keys.push(self.resolver_of(
                name,
                &dictionary.key_type,
                RawValue::from(key),
                None,
                ExpressionSupport::Supported,
                false,
            )?);
            values.push(self.entry_value_resolver(name, &entry_name, &dictionary.value_type, entry)?);
        }
        let map_type = concrete_map_type(dictionary.map_type.as_ref());
        Ok(Arc::new(MapValueResolver::new(&map_type, keys, values)?))
    }

    fn entry_value_resolver(
        &self,
        name: &str,
        entry_name: &str,
        value_type: &MetadataType,
        entry: &ConfigElement,
    ) -> Result<ResolverRef, ConfigError> {
        if let Some(value) = entry.attribute(VALUE_ATTRIBUTE) {
            return self.resolver_of(
                name,
                value_type,
                RawValue::from(value),
                None,
                value_type.expression_support(),
                false,
            );
        }
        match value_type {
            MetadataType::Array(array) => {
                let item_name = format!("{}-item", entry_name);
                let items = entry
                    .children_named(&item_name)
                    .map(|item| self.item_resolver(&item_name, &array.item_type, item))
                    .collect::<Result<Vec<_>, _>>()?;
                let collection_type = concrete_collection_type(array.collection_type.as_ref());
                Ok(Arc::new(CollectionValueResolver::new(&collection_type, items)?))
            }
            MetadataType::Object(object) => self.object_resolver(object, entry),
            _ => self.resolver_of(
                name,
                value_type,
                RawValue::from(entry.text()),
                None,
                value_type.expression_support(),
                false,
            ),
        }
    }

    fn item_resolver(
        &self,
        item_name: &str,
        item_type: &MetadataType,
        item: &ConfigElement,
    ) -> Result<ResolverRef, ConfigError> {
        let text = item.attribute(VALUE_ATTRIBUTE).or_else(|| item.text());
        match (item_type, text) {
            (MetadataType::Object(object), None) => self.object_resolver(object, item),
            (_, text) => self.resolver_of(
                item_name,
                item_type,
                RawValue::from(text),
                item_type.default_value(),
                item_type.expression_support(),
                false,
            ),
        }
    }
}

/// Whether `element` configures `name` in any of the forms its shape allows.
fn is_configured(name: &str, metadata_type: &MetadataType, element: &ConfigElement) -> bool {
    if element.has_attribute(name) {
        return true;
    }
    let child_name = match metadata_type {
        MetadataType::Dictionary(_) => hyphenize(&pluralize(name)),
        _ => hyphenize(name),
    };
    element.child(&child_name).is_some()
}

fn validate_expression_support(
    name: &str,
    metadata_type: &MetadataType,
    resolver: &ResolverRef,
    support: ExpressionSupport,
    required: bool,
) -> Result<(), ConfigError> {
    let dynamic = resolver.is_dynamic();
    if dynamic && support == ExpressionSupport::NotSupported {
        return Err(ConfigError::ExpressionNotSupported {
            parameter: name.to_string(),
        });
    }
    // Expression functions are always expressions, even though they
    // resolve the same function for every event
    if !dynamic
        && support == ExpressionSupport::Required
        && required
        && !metadata_type.is_expression_function()
    {
        return Err(ConfigError::ExpressionRequired {
            parameter: name.to_string(),
        });
    }
    Ok(())
}

/// A name given for an object, collection or map refers to a registered
/// object; typed values are used directly.
fn reference_or_value(raw: RawValue) -> ResolverRef {
    match raw {
        RawValue::Text(reference) => Arc::new(RegistryLookupValueResolver::new(reference)),
        RawValue::Value(value) => Arc::new(StaticValueResolver::new(value)),
        RawValue::Resolver(resolver) => resolver,
        RawValue::Absent => Arc::new(StaticValueResolver::null()),
    }
}

fn parse_date(source: Value, with_offset: bool) -> Result<Value, ConfigError> {
    let pattern = if with_offset { DATE_TIME_PATTERN } else { DATE_PATTERN };
    match source {
        Value::String(text) => {
            let text = text.trim();
            let parsed = if with_offset {
                DateTime::parse_from_str(text, DATE_TIME_PATTERN)
                    .or_else(|_| DateTime::parse_from_rfc3339(text))
                    .map(Value::DateTime)
            } else {
                NaiveDateTime::parse_from_str(text, DATE_PATTERN).map(Value::Date)
            };
            parsed.map_err(|_| ConfigError::InvalidDate {
                value: text.to_string(),
                pattern: pattern.to_string(),
            })
        }
        Value::Date(date) if with_offset => Ok(Value::DateTime(date.and_utc().fixed_offset())),
        Value::DateTime(date_time) if !with_offset => Ok(Value::Date(date_time.naive_local())),
        value @ (Value::Date(_) | Value::DateTime(_) | Value::Null) => Ok(value),
        other => Err(ConfigError::UnconvertibleDate {
            type_name: other.type_name(),
        }),
    }
}

/// Concrete collection for a declared interface.
pub fn concrete_collection_type(declared: Option<&TypeRef>) -> TypeRef {
    match declared {
        Some(declared) if !declared.is_abstract() => declared.clone(),
        Some(declared) if declared.kind() == TypeKind::Set => types::HASH_SET.clone(),
        _ => types::ARRAY_LIST.clone(),
    }
}

/// Concrete map for a declared interface.
pub fn concrete_map_type(declared: Option<&TypeRef>) -> TypeRef {
    match declared {
        Some(declared) if !declared.is_abstract() => declared.clone(),
        Some(declared) => match declared.map_kind() {
            Some(MapKind::Ordered) => types::LINKED_HASH_MAP.clone(),
            Some(MapKind::Concurrent) => types::CONCURRENT_HASH_MAP.clone(),
            _ => types::HASH_MAP.clone(),
        },
        None => types::HASH_MAP.clone(),
    }
}
