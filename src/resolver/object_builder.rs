use indexmap::IndexMap;

use crate::error::{ConfigError, ResolutionError};
use crate::runtime::ResolvingContext;
use crate::types::TypeRef;
use crate::value::{ObjectValue, Value};

use super::{any_dynamic, ResolverRef, ValueResolver};

/// Template for building instances of a pojo type: the type plus one
/// resolver per configured field.
#[derive(Debug, Clone)]
pub struct ObjectBuilder {
    type_ref: TypeRef,
    properties: IndexMap<String, ResolverRef>,
}

impl ObjectBuilder {
    pub fn new(type_ref: &TypeRef) -> Self {
        Self {
            type_ref: type_ref.clone(),
            properties: IndexMap::new(),
        }
    }

    pub fn type_ref(&self) -> &TypeRef {
        &self.type_ref
    }

    /// Bind `field` (name or alias) to `resolver`, replacing any previous
    /// binding.
    ///
    /// # Errors
    ///
    /// `UnknownField` when the type declares no such field.
    pub fn add_property_resolver(
        &mut self,
        field: &str,
        resolver: ResolverRef,
    ) -> Result<&mut Self, ConfigError> {
        let declared = self
            .type_ref
            .field(field)
            .ok_or_else(|| ConfigError::UnknownField {
                type_name: self.type_ref.name().to_string(),
                field: field.to_string(),
            })?;
        self.properties.insert(declared.name.clone(), resolver);
        Ok(self)
    }

    pub fn has_property(&self, field: &str) -> bool {
        self.type_ref
            .field(field)
            .is_some_and(|declared| self.properties.contains_key(&declared.name))
    }

    pub fn is_dynamic(&self) -> bool {
        any_dynamic(self.properties.values())
    }

    /// Resolve every bound field and build the instance. Unbound fields take
    /// their declared default, when there is one.
    pub fn build(&self, ctx: &ResolvingContext<'_>) -> Result<ObjectValue, ResolutionError> {
        let mut object = ObjectValue::new(&self.type_ref);
        for field in self.type_ref.fields() {
            match self.properties.get(&field.name) {
                Some(resolver) => {
                    let value = resolver
                        .resolve(ctx)
                        .map_err(|err| err.for_parameter(field.name.as_str()))?;
                    object.set(field.name.as_str(), value);
                }
                None => {
                    if let Some(default) = &field.default {
                        object.set(field.name.as_str(), default.clone());
                    }
                }
            }
        }
        Ok(object)
    }
}

/// Builds a new pojo instance on every resolution.
#[derive(Debug, Clone)]
pub struct ObjectBuilderValueResolver {
    builder: ObjectBuilder,
    dynamic: bool,
}

impl ObjectBuilderValueResolver {
    pub fn new(builder: ObjectBuilder) -> Self {
        let dynamic = builder.is_dynamic();
        Self { builder, dynamic }
    }

    pub fn builder(&self) -> &ObjectBuilder {
        &self.builder
    }
}

impl ValueResolver for ObjectBuilderValueResolver {
    fn resolve(&self, ctx: &ResolvingContext<'_>) -> Result<Value, ResolutionError> {
        self.builder.build(ctx).map(Value::Object)
    }

    fn is_dynamic(&self) -> bool {
        self.dynamic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{constant, RegistryLookupValueResolver, TypeSafeExpressionValueResolver};
    use crate::runtime::{Event, Message, RuntimeServices};
    use crate::types::{FieldInfo, INTEGER, STRING};
    use serde_json::json;
    use std::sync::Arc;

    fn connection_type() -> TypeRef {
        TypeRef::builder("ConnectionConfig")
            .field(FieldInfo::new("host", &STRING))
            .field(FieldInfo::new("port", &INTEGER).with_default(Value::Int(8080)))
            .field(FieldInfo::new("userName", &STRING).with_alias("user-name"))
            .build()
    }

    #[test]
    fn test_builds_object_with_defaults() {
        let mut builder = ObjectBuilder::new(&connection_type());
        builder
            .add_property_resolver("host", constant("localhost"))
            .unwrap()
            .add_property_resolver("user-name", constant("admin"))
            .unwrap();

        let resolver = ObjectBuilderValueResolver::new(builder);
        assert!(!resolver.is_dynamic());

        let services = RuntimeServices::default();
        let value = resolver.resolve(&services.context(&Event::empty())).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.get("host"), Some(&Value::string("localhost")));
        assert_eq!(object.get("port"), Some(&Value::Int(8080)));
        assert_eq!(object.get("userName"), Some(&Value::string("admin")));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let mut builder = ObjectBuilder::new(&connection_type());
        let err = builder
            .add_property_resolver("password", constant("secret"))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnknownField {
                type_name: "ConnectionConfig".to_string(),
                field: "password".to_string(),
            }
        );
    }

    #[test]
    fn test_dynamic_field_makes_builder_dynamic() {
        let mut builder = ObjectBuilder::new(&connection_type());
        builder
            .add_property_resolver(
                "port",
                Arc::new(TypeSafeExpressionValueResolver::new("#[payload.port]", &INTEGER)),
            )
            .unwrap();
        let resolver = ObjectBuilderValueResolver::new(builder);
        assert!(resolver.is_dynamic());

        let services = RuntimeServices::default();
        let event = Event::new(Message::of(Value::from(json!({"port": "9090"}))));
        let value = resolver.resolve(&services.context(&event)).unwrap();
        assert_eq!(value.as_object().and_then(|o| o.get("port")), Some(&Value::Int(9090)));
    }

    #[test]
    fn test_field_failures_name_the_field() {
        let mut builder = ObjectBuilder::new(&connection_type());
        builder
            .add_property_resolver("host", Arc::new(RegistryLookupValueResolver::new("nowhere")))
            .unwrap();

        let services = RuntimeServices::default();
        let err = ObjectBuilderValueResolver::new(builder)
            .resolve(&services.context(&Event::empty()))
            .unwrap_err();
        assert!(matches!(err, ResolutionError::Parameter { ref parameter, .. } if parameter == "host"));
    }
}
