//! Object factories consuming resolver sets: top-level pojo parameters,
//! configuration providers and message sources.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use indexmap::IndexMap;
use uuid::Uuid;

use crate::config::ConfigElement;
use crate::error::{ConfigError, Error, ModelError, ResolutionError};
use crate::model::{ComponentKind, ComponentModel, ComponentModelLoader};
use crate::parser::ParameterParser;
use crate::resolver::{
    CollectionValueResolver, MapValueResolver, ObjectBuilder, ObjectBuilderValueResolver,
    ResolverRef, ResolverSet, ResolverSetResult, StaticValueResolver, ValueResolver,
};
use crate::runtime::{Event, ResolvingContext, RuntimeServices};
use crate::types::{FieldInfo, TypeRef};
use crate::value::Value;

/// Wrap a plain value in a resolver. Lists, sets and maps become collection
/// and map resolvers over static children.
pub fn to_value_resolver(value: Value) -> ResolverRef {
    match value {
        Value::List(items) => Arc::new(CollectionValueResolver::list(
            items.into_iter().map(to_value_resolver).collect(),
        )),
        Value::Set(items) => Arc::new(CollectionValueResolver::set(
            items.into_iter().map(to_value_resolver).collect(),
        )),
        Value::Map(map) => Arc::new(MapValueResolver::from_pairs(
            map.kind,
            map.entries
                .into_iter()
                .map(|(k, v)| (to_value_resolver(k), to_value_resolver(v)))
                .collect(),
        )),
        other => Arc::new(StaticValueResolver::new(other)),
    }
}

/// Builds resolvers for pojo parameters declared at the top level of a
/// configuration.
#[derive(Debug, Clone)]
pub struct TopLevelParameterFactory {
    object_type: TypeRef,
}

impl TopLevelParameterFactory {
    pub fn new(object_type: &TypeRef) -> Self {
        Self {
            object_type: object_type.clone(),
        }
    }

    pub fn object_type(&self) -> &TypeRef {
        &self.object_type
    }

    /// Resolver for an instance whose fields come from `parameters`. Keys
    /// that match no declared field, by name or alias, are skipped.
    pub fn create(&self, parameters: &IndexMap<String, Value>) -> Result<ObjectBuilderValueResolver, ConfigError> {
        self.create_from_resolvers(
            parameters
                .iter()
                .map(|(key, value)| (key.as_str(), to_value_resolver(value.clone()))),
        )
    }

    /// Like [`create`](Self::create), with resolvers already built.
    pub fn create_from_resolvers<'a>(
        &self,
        parameters: impl IntoIterator<Item = (&'a str, ResolverRef)>,
    ) -> Result<ObjectBuilderValueResolver, ConfigError> {
        let mut builder = ObjectBuilder::new(&self.object_type);
        for (key, resolver) in parameters {
            if self.object_type.field(key).is_none() {
                tracing::trace!(
                    object_type = %self.object_type,
                    parameter = key,
                    "skipping undeclared parameter"
                );
                continue;
            }
            builder.add_property_resolver(key, resolver)?;
        }
        Ok(ObjectBuilderValueResolver::new(builder))
    }
}

/// Resolves the connection provider declared inside a configuration, as a
/// pojo built from the provider's parameters.
#[derive(Debug, Clone)]
pub struct ConnectionProviderResolver {
    name: String,
    provider: ObjectBuilderValueResolver,
}

impl ConnectionProviderResolver {
    /// Build the resolver from the provider's model and its parsed
    /// parameters.
    pub fn new(model: &ComponentModel, resolvers: &ResolverSet) -> Result<Self, ConfigError> {
        let provider_type = model
            .parameters
            .iter()
            .fold(TypeRef::builder(model.name.as_str()), |builder, parameter| {
                builder.field(FieldInfo::new(parameter.key(), &parameter.metadata_type.type_ref()))
            })
            .build();
        let provider = TopLevelParameterFactory::new(&provider_type)
            .create_from_resolvers(resolvers.iter().map(|(key, resolver)| (key, resolver.clone())))?;
        Ok(Self {
            name: model.name.clone(),
            provider,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl ValueResolver for ConnectionProviderResolver {
    fn resolve(&self, ctx: &ResolvingContext<'_>) -> Result<Value, ResolutionError> {
        self.provider.resolve(ctx)
    }

    fn is_dynamic(&self) -> bool {
        self.provider.is_dynamic()
    }
}

/// Source of the current time for expiring dynamic configurations.
pub trait TimeSupplier: Send + Sync + fmt::Debug {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSupplier;

impl TimeSupplier for SystemTimeSupplier {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Expiration policy of dynamic configuration instances: an instance not
/// handed out for `max_idle` is dropped.
#[derive(Debug, Clone)]
pub struct DynamicConfigPolicy {
    max_idle: Duration,
    time_supplier: Arc<dyn TimeSupplier>,
}

impl DynamicConfigPolicy {
    pub const DEFAULT_MAX_IDLE: Duration = Duration::from_secs(5 * 60);

    pub fn new(max_idle: Duration) -> Self {
        Self {
            max_idle,
            time_supplier: Arc::new(SystemTimeSupplier),
        }
    }

    pub fn with_time_supplier(mut self, time_supplier: Arc<dyn TimeSupplier>) -> Self {
        self.time_supplier = time_supplier;
        self
    }

    pub fn max_idle(&self) -> Duration {
        self.max_idle
    }

    fn now(&self) -> Instant {
        self.time_supplier.now()
    }
}

impl Default for DynamicConfigPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_IDLE)
    }
}

/// A configuration's resolved parameter values, plus its connection provider
/// when it declares one.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationInstance {
    id: Uuid,
    name: String,
    values: ResolverSetResult,
    connection_provider: Option<Value>,
}

impl ConfigurationInstance {
    fn new(name: &str, values: ResolverSetResult, connection_provider: Option<Value>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            values,
            connection_provider,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &ResolverSetResult {
        &self.values
    }

    pub fn get(&self, parameter: &str) -> Option<&Value> {
        self.values.get(parameter)
    }

    pub fn connection_provider(&self) -> Option<&Value> {
        self.connection_provider.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct InstanceKey {
    values: ResolverSetResult,
    connection_provider: Option<Value>,
}

#[derive(Debug)]
struct CachedInstance {
    instance: Arc<ConfigurationInstance>,
    last_used: Instant,
}

/// Hands out configuration instances for a named configuration.
///
/// A static provider resolves its parameters once, at creation. A dynamic one
/// resolves them for every event, see [`DynamicConfiguration`].
#[derive(Debug)]
pub enum ConfigurationProvider {
    Static { instance: Arc<ConfigurationInstance> },
    Dynamic(DynamicConfiguration),
}

impl ConfigurationProvider {
    /// Provider without a connection provider, using the default policy.
    ///
    /// # Errors
    ///
    /// Resolution failures of a static configuration surface here.
    pub fn new(
        name: impl Into<String>,
        resolvers: ResolverSet,
        services: &RuntimeServices,
    ) -> Result<Self, ResolutionError> {
        Self::create(name, resolvers, None, DynamicConfigPolicy::default(), services)
    }

    /// Create the provider, static unless one of the parameters or the
    /// connection provider is dynamic. The set is frozen.
    pub fn create(
        name: impl Into<String>,
        mut resolvers: ResolverSet,
        connection_provider: Option<ConnectionProviderResolver>,
        policy: DynamicConfigPolicy,
        services: &RuntimeServices,
    ) -> Result<Self, ResolutionError> {
        let name = name.into();
        resolvers.freeze();

        let dynamic_connection = connection_provider.as_ref().is_some_and(|cp| cp.is_dynamic());
        if resolvers.is_dynamic() || dynamic_connection {
            tracing::info!(
                configuration = %name,
                dynamic_parameters = ?resolvers.dynamic_parameters(),
                dynamic_connection,
                max_idle = ?policy.max_idle(),
                "creating dynamic configuration provider"
            );
            return Ok(ConfigurationProvider::Dynamic(DynamicConfiguration {
                name,
                resolvers,
                connection_provider,
                policy,
                instances: DashMap::new(),
            }));
        }

        let event = Event::empty();
        let ctx = services.context(&event);
        let values = resolvers.resolve(&ctx)?;
        let connection = connection_provider.map(|cp| cp.resolve(&ctx)).transpose()?;
        tracing::info!(configuration = %name, "creating static configuration provider");
        Ok(ConfigurationProvider::Static {
            instance: Arc::new(ConfigurationInstance::new(&name, values, connection)),
        })
    }

    pub fn name(&self) -> &str {
        match self {
            ConfigurationProvider::Static { instance } => instance.name(),
            ConfigurationProvider::Dynamic(dynamic) => dynamic.name(),
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, ConfigurationProvider::Dynamic(_))
    }

    /// The configuration instance for the event in `ctx`.
    pub fn get(&self, ctx: &ResolvingContext<'_>) -> Result<Arc<ConfigurationInstance>, ResolutionError> {
        match self {
            ConfigurationProvider::Static { instance } => Ok(instance.clone()),
            ConfigurationProvider::Dynamic(dynamic) => dynamic.get(ctx),
        }
    }

    /// Drop idle dynamic instances, returning how many were dropped.
    pub fn expire_idle(&self) -> usize {
        match self {
            ConfigurationProvider::Static { .. } => 0,
            ConfigurationProvider::Dynamic(dynamic) => dynamic.expire_idle(),
        }
    }

    /// Number of live instances.
    pub fn instance_count(&self) -> usize {
        match self {
            ConfigurationProvider::Static { .. } => 1,
            ConfigurationProvider::Dynamic(dynamic) => dynamic.instance_count(),
        }
    }
}

/// Per-event configuration: one instance per distinct set of resolved values
/// (connection provider included), dropped once idle longer than the policy's
/// `max_idle`. Idle instances are swept whenever a new one is created.
#[derive(Debug)]
pub struct DynamicConfiguration {
    name: String,
    resolvers: ResolverSet,
    connection_provider: Option<ConnectionProviderResolver>,
    policy: DynamicConfigPolicy,
    instances: DashMap<InstanceKey, CachedInstance>,
}

impl DynamicConfiguration {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> &DynamicConfigPolicy {
        &self.policy
    }

    pub fn get(&self, ctx: &ResolvingContext<'_>) -> Result<Arc<ConfigurationInstance>, ResolutionError> {
        let key = InstanceKey {
            values: self.resolvers.resolve(ctx)?,
            connection_provider: self
                .connection_provider
                .as_ref()
                .map(|cp| cp.resolve(ctx))
                .transpose()?,
        };
        let now = self.policy.now();
        if let Some(mut cached) = self.instances.get_mut(&key) {
            cached.last_used = now;
            return Ok(cached.instance.clone());
        }

        self.expire_idle();
        let instance = self
            .instances
            .entry(key.clone())
            .and_modify(|cached| cached.last_used = now)
            .or_insert_with(|| {
                tracing::debug!(configuration = %self.name, "new dynamic configuration instance");
                CachedInstance {
                    instance: Arc::new(ConfigurationInstance::new(
                        &self.name,
                        key.values,
                        key.connection_provider,
                    )),
                    last_used: now,
                }
            })
            .instance
            .clone();
        Ok(instance)
    }

    pub fn expire_idle(&self) -> usize {
        let now = self.policy.now();
        let max_idle = self.policy.max_idle();
        let before = self.instances.len();
        self.instances
            .retain(|_, cached| now.saturating_duration_since(cached.last_used) < max_idle);
        let expired = before.saturating_sub(self.instances.len());
        if expired > 0 {
            tracing::debug!(configuration = %self.name, expired, "expired idle configuration instances");
        }
        expired
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }
}

/// A message source with its resolved parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageSource {
    pub name: String,
    pub parameters: ResolverSetResult,
}

/// Creates message sources. Sources are started once, so their parameters
/// cannot depend on an event.
#[derive(Debug, Clone)]
pub struct MessageSourceFactory {
    source_name: String,
    resolvers: ResolverSet,
}

impl MessageSourceFactory {
    pub fn new(source_name: impl Into<String>, resolvers: ResolverSet) -> Self {
        Self {
            source_name: source_name.into(),
            resolvers,
        }
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// # Errors
    ///
    /// `DynamicSourceParameters`, listing the offending parameters, when any
    /// parameter uses an expression.
    pub fn create(&self, services: &RuntimeServices) -> Result<MessageSource, Error> {
        if self.resolvers.is_dynamic() {
            return Err(ConfigError::DynamicSourceParameters {
                source_name: self.source_name.clone(),
                parameters: self.resolvers.dynamic_parameters().join(", "),
            }
            .into());
        }

        let event = Event::empty();
        let parameters = self.resolvers.resolve(&services.context(&event))?;
        tracing::debug!(source = %self.source_name, parameters = parameters.len(), "created message source");
        Ok(MessageSource {
            name: self.source_name.clone(),
            parameters,
        })
    }
}

/// A configured component, built according to its model's kind.
#[derive(Debug)]
pub enum Component {
    Configuration(ConfigurationProvider),
    ConnectionProvider(ConnectionProviderResolver),
    Operation(ResolverSet),
    Source(MessageSource),
}

impl Component {
    pub fn kind(&self) -> ComponentKind {
        match self {
            Component::Configuration(_) => ComponentKind::Configuration,
            Component::ConnectionProvider(_) => ComponentKind::ConnectionProvider,
            Component::Operation(_) => ComponentKind::Operation,
            Component::Source(_) => ComponentKind::Source,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        match self {
            Component::Configuration(provider) => provider.is_dynamic(),
            Component::ConnectionProvider(resolver) => resolver.is_dynamic(),
            Component::Operation(resolvers) => resolvers.is_dynamic(),
            Component::Source(_) => false,
        }
    }
}

/// Builds components from configuration elements, dispatching on the kind of
/// the element's component model.
pub struct ComponentFactory<'a> {
    models: &'a ComponentModelLoader,
    parser: &'a ParameterParser,
    policy: DynamicConfigPolicy,
}

impl<'a> ComponentFactory<'a> {
    pub fn new(models: &'a ComponentModelLoader, parser: &'a ParameterParser) -> Self {
        Self {
            models,
            parser,
            policy: DynamicConfigPolicy::default(),
        }
    }

    pub fn with_dynamic_config_policy(mut self, policy: DynamicConfigPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn model_for(&self, element: &ConfigElement) -> Result<&'a ComponentModel, Error> {
        self.models
            .component(element.identifier())
            .ok_or_else(|| ModelError::UnknownComponent(element.qualified_identifier()).into())
    }

    /// # Errors
    ///
    /// * `UnknownComponent` when no model matches the element
    /// * parse errors of the element's parameters
    /// * `DynamicSourceParameters` for a source using expressions
    /// * `MultipleConnectionProviders` for a configuration with more than one
    pub fn create(&self, element: &ConfigElement) -> Result<Component, Error> {
        let model = self.model_for(element)?;
        let resolvers = self.parser.parse_component(model, element)?;
        let name = element.name().unwrap_or(element.identifier()).to_string();
        tracing::debug!(component = %name, kind = ?model.kind, "creating component");

        match model.kind {
            ComponentKind::Configuration => {
                let connection_provider = self.connection_provider_of(&name, element)?;
                let provider = ConfigurationProvider::create(
                    name,
                    resolvers,
                    connection_provider,
                    self.policy.clone(),
                    self.parser.services(),
                )?;
                Ok(Component::Configuration(provider))
            }
            ComponentKind::ConnectionProvider => Ok(Component::ConnectionProvider(
                ConnectionProviderResolver::new(model, &resolvers)?,
            )),
            ComponentKind::Operation => Ok(Component::Operation(resolvers)),
            ComponentKind::Source => Ok(Component::Source(
                MessageSourceFactory::new(name, resolvers).create(self.parser.services())?,
            )),
        }
    }

    /// The connection provider declared among the children of a
    /// configuration element.
    fn connection_provider_of(
        &self,
        configuration: &str,
        element: &ConfigElement,
    ) -> Result<Option<ConnectionProviderResolver>, Error> {
        let mut providers = element.children().iter().filter_map(|child| {
            self.models
                .component(child.identifier())
                .filter(|model| model.kind == ComponentKind::ConnectionProvider)
                .map(|model| (model, child))
        });

        let Some((model, child)) = providers.next() else {
            return Ok(None);
        };
        let others: Vec<&str> = providers.map(|(_, child)| child.identifier()).collect();
        if !others.is_empty() {
            return Err(ConfigError::MultipleConnectionProviders {
                configuration: configuration.to_string(),
                providers: std::iter::once(child.identifier())
                    .chain(others)
                    .collect::<Vec<_>>()
                    .join(", "),
            }
            .into());
        }

        let resolvers = self.parser.parse_component(model, child)?;
        Ok(Some(ConnectionProviderResolver::new(model, &resolvers)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_str;
    use crate::resolver::{constant, TypeSafeExpressionValueResolver};
    use crate::runtime::Message;
    use crate::types::{MapKind, TypeCatalog, INTEGER, STRING};
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Debug)]
    struct ManualClock {
        start: Instant,
        elapsed: Mutex<Duration>,
    }

    impl ManualClock {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                start: Instant::now(),
                elapsed: Mutex::new(Duration::ZERO),
            })
        }

        fn advance(&self, by: Duration) {
            *self.elapsed.lock().unwrap() += by;
        }
    }

    impl TimeSupplier for ManualClock {
        fn now(&self) -> Instant {
            self.start + *self.elapsed.lock().unwrap()
        }
    }

    const HTTP_MODELS: &str = r#"
components:
  - name: requester
    kind: configuration
    parameters:
      - name: basePath
        type: string
        default: /
  - name: connection
    kind: connection_provider
    parameters:
      - name: host
        type: string
      - name: port
        type: integer
        default: 80
  - name: poller
    kind: source
    parameters:
      - name: frequency
        type: integer
"#;

    fn models() -> ComponentModelLoader {
        let mut loader = ComponentModelLoader::new(TypeCatalog::new());
        loader.load_str(HTTP_MODELS, "inline").unwrap();
        loader
    }

    fn port_resolvers() -> ResolverSet {
        let mut resolvers = ResolverSet::new();
        resolvers
            .add("port", Arc::new(TypeSafeExpressionValueResolver::new("#[payload]", &INTEGER)))
            .unwrap();
        resolvers
    }

    #[test]
    fn test_to_value_resolver() {
        let services = RuntimeServices::default();
        let event = Event::empty();
        let ctx = services.context(&event);

        let value = Value::from(json!({"hosts": ["a", "b"], "port": 80}));
        let resolved = to_value_resolver(value.clone()).resolve(&ctx).unwrap();
        let map = resolved.as_map().unwrap();
        assert_eq!(map.kind, MapKind::Ordered);
        assert_eq!(resolved, value);

        let scalar = to_value_resolver(Value::Int(1));
        assert!(!scalar.is_dynamic());
        assert_eq!(scalar.resolve(&ctx).unwrap(), Value::Int(1));
    }

    #[test]
    fn test_top_level_parameter_factory_skips_unknown_keys() {
        let object_type = TypeRef::builder("Credentials")
            .field(FieldInfo::new("user", &STRING))
            .field(FieldInfo::new("maxSessions", &INTEGER).with_alias("max-sessions"))
            .build();
        let factory = TopLevelParameterFactory::new(&object_type);

        let mut parameters = IndexMap::new();
        parameters.insert("user".to_string(), Value::string("admin"));
        parameters.insert("max-sessions".to_string(), Value::Int(4));
        parameters.insert("colour".to_string(), Value::string("blue"));

        let resolver = factory.create(&parameters).unwrap();
        let services = RuntimeServices::default();
        let value = resolver.resolve(&services.context(&Event::empty())).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.get("user"), Some(&Value::string("admin")));
        assert_eq!(object.get("maxSessions"), Some(&Value::Int(4)));
        assert_eq!(object.get("colour"), None);
    }

    #[test]
    fn test_static_configuration_provider() {
        let mut resolvers = ResolverSet::new();
        resolvers.add("host", constant("localhost")).unwrap();

        let services = RuntimeServices::default();
        let provider = ConfigurationProvider::new("http", resolvers, &services).unwrap();
        assert!(!provider.is_dynamic());

        let first_event = Event::new(Message::of("a"));
        let second_event = Event::new(Message::of("b"));
        let first = provider.get(&services.context(&first_event)).unwrap();
        let second = provider.get(&services.context(&second_event)).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.get("host"), Some(&Value::string("localhost")));
        assert_eq!(provider.name(), "http");
    }

    #[test]
    fn test_dynamic_configuration_provider_caches_per_values() {
        let mut resolvers = ResolverSet::new();
        resolvers.add("host", constant("localhost")).unwrap();
        resolvers
            .add("port", Arc::new(TypeSafeExpressionValueResolver::new("#[payload.port]", &INTEGER)))
            .unwrap();

        let services = RuntimeServices::default();
        let provider = ConfigurationProvider::new("http", resolvers, &services).unwrap();
        assert!(provider.is_dynamic());

        let event = |port: i64| Event::new(Message::of(Value::from(json!({"port": port}))));
        let a = provider.get(&services.context(&event(80))).unwrap();
        let b = provider.get(&services.context(&event(80))).unwrap();
        let c = provider.get(&services.context(&event(443))).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(c.get("port"), Some(&Value::Int(443)));
        assert_eq!(provider.instance_count(), 2);
    }

    #[test]
    fn test_idle_dynamic_instances_expire() {
        let clock = ManualClock::new();
        let policy = DynamicConfigPolicy::new(Duration::from_secs(60)).with_time_supplier(clock.clone());
        let services = RuntimeServices::default();
        let provider = ConfigurationProvider::create("http", port_resolvers(), None, policy, &services).unwrap();

        for port in 0..100i64 {
            let event = Event::new(Message::of(port));
            provider.get(&services.context(&event)).unwrap();
        }
        assert_eq!(provider.instance_count(), 100);

        // Keep one instance in use while the others go idle
        clock.advance(Duration::from_secs(45));
        let busy = Event::new(Message::of(7i64));
        let kept = provider.get(&services.context(&busy)).unwrap();
        clock.advance(Duration::from_secs(30));

        let fresh = Event::new(Message::of(1000i64));
        provider.get(&services.context(&fresh)).unwrap();
        assert_eq!(provider.instance_count(), 2);

        let again = provider.get(&services.context(&busy)).unwrap();
        assert!(Arc::ptr_eq(&kept, &again));

        clock.advance(Duration::from_secs(61));
        assert_eq!(provider.expire_idle(), 2);
        assert_eq!(provider.instance_count(), 0);
    }

    #[test]
    fn test_dynamic_connection_makes_configuration_dynamic() {
        let loader = models();
        let connection_model = loader.component("connection").unwrap();
        let mut connection = ResolverSet::new();
        connection
            .add("host", Arc::new(TypeSafeExpressionValueResolver::new("#[vars.host]", &STRING)))
            .unwrap();
        let connection = ConnectionProviderResolver::new(connection_model, &connection).unwrap();
        assert!(connection.is_dynamic());

        let mut resolvers = ResolverSet::new();
        resolvers.add("basePath", constant("/api")).unwrap();
        assert!(!resolvers.is_dynamic());

        let services = RuntimeServices::default();
        let provider = ConfigurationProvider::create(
            "requester",
            resolvers,
            Some(connection),
            DynamicConfigPolicy::default(),
            &services,
        )
        .unwrap();
        assert!(provider.is_dynamic());

        let eu = Event::empty().with_variable("host", "eu.example.com");
        let us = Event::empty().with_variable("host", "us.example.com");
        let a = provider.get(&services.context(&eu)).unwrap();
        let b = provider.get(&services.context(&us)).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));

        let connection = a.connection_provider().and_then(Value::as_object).unwrap();
        assert_eq!(connection.get("host"), Some(&Value::string("eu.example.com")));
        assert_eq!(a.get("basePath"), Some(&Value::string("/api")));
    }

    #[test]
    fn test_static_connection_keeps_configuration_static() {
        let loader = models();
        let mut connection = ResolverSet::new();
        connection.add("host", constant("localhost")).unwrap();
        connection.add("port", constant(8443i64)).unwrap();
        let connection = ConnectionProviderResolver::new(loader.component("connection").unwrap(), &connection).unwrap();

        let services = RuntimeServices::default();
        let provider = ConfigurationProvider::create(
            "requester",
            ResolverSet::new(),
            Some(connection),
            DynamicConfigPolicy::default(),
            &services,
        )
        .unwrap();
        assert!(!provider.is_dynamic());

        let instance = provider.get(&services.context(&Event::empty())).unwrap();
        let connection = instance.connection_provider().and_then(Value::as_object).unwrap();
        assert_eq!(connection.get("port"), Some(&Value::Int(8443)));
    }

    #[test]
    fn test_component_factory_dispatches_on_kind() {
        let loader = models();
        let parser = ParameterParser::new(RuntimeServices::default());
        let factory = ComponentFactory::new(&loader, &parser);
        let document = load_config_str(
            r##"
elements:
  - identifier: requester
    attributes: { name: api, basePath: /v1 }
    children:
      - identifier: connection
        attributes: { host: "#[vars.host]" }
  - identifier: poller
    attributes: { name: poll, frequency: "#[payload]" }
  - identifier: poller
    attributes: { name: slow, frequency: "500" }
  - identifier: unknown
    attributes: { name: mystery }
"##,
            "inline",
        )
        .unwrap();

        let api = factory.create(document.global("api").unwrap()).unwrap();
        assert_eq!(api.kind(), ComponentKind::Configuration);
        assert!(api.is_dynamic());

        let err = factory.create(document.global("poll").unwrap()).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::DynamicSourceParameters { .. })));

        match factory.create(document.global("slow").unwrap()).unwrap() {
            Component::Source(source) => {
                assert_eq!(source.parameters.get("frequency"), Some(&Value::Int(500)));
            }
            other => panic!("expected a source, got {:?}", other),
        }

        let err = factory.create(document.global("mystery").unwrap()).unwrap_err();
        assert!(matches!(err, Error::Model(ModelError::UnknownComponent(ref id)) if id == "unknown"));
    }

    #[test]
    fn test_message_source_rejects_dynamic_parameters() {
        let mut resolvers = ResolverSet::new();
        resolvers.add("path", constant("/inbox")).unwrap();
        resolvers
            .add("filter", Arc::new(TypeSafeExpressionValueResolver::new("#[payload]", &STRING)))
            .unwrap();

        let services = RuntimeServices::default();
        let err = MessageSourceFactory::new("listener", resolvers)
            .create(&services)
            .unwrap_err();
        match err {
            Error::Config(ConfigError::DynamicSourceParameters { source_name, parameters }) => {
                assert_eq!(source_name, "listener");
                assert_eq!(parameters, "filter");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_message_source_with_static_parameters() {
        let mut resolvers = ResolverSet::new();
        resolvers.add("path", constant("/inbox")).unwrap();

        let source = MessageSourceFactory::new("listener", resolvers)
            .create(&RuntimeServices::default())
            .unwrap();
        assert_eq!(source.parameters.get("path"), Some(&Value::string("/inbox")));
    }
}
