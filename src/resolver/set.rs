use std::hash::{Hash, Hasher};

use indexmap::IndexMap;

use crate::error::{ConfigError, Error, ResolutionError, StateError};
use crate::runtime::ResolvingContext;
use crate::value::{unordered_hash, Value};

use super::{ResolverRef, ValueResolver};

/// The resolvers of one configurable component, keyed by parameter.
///
/// Keys are unique. Once [`freeze`](Self::freeze) is called the set is
/// read-only.
#[derive(Debug, Clone, Default)]
pub struct ResolverSet {
    resolvers: IndexMap<String, ResolverRef>,
    frozen: bool,
}

impl ResolverSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the resolver for `key`.
    ///
    /// # Errors
    ///
    /// * `ConfigError::EmptyParameterKey` for a blank key
    /// * `StateError::Frozen` once the set is frozen
    /// * `StateError::DuplicateParameter` when `key` is already present; the
    ///   existing resolver is kept
    pub fn add(&mut self, key: impl Into<String>, resolver: ResolverRef) -> Result<&mut Self, Error> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(ConfigError::EmptyParameterKey.into());
        }
        if self.frozen {
            return Err(StateError::Frozen(key).into());
        }
        if self.resolvers.contains_key(&key) {
            return Err(StateError::DuplicateParameter(key).into());
        }
        self.resolvers.insert(key, resolver);
        Ok(self)
    }

    pub fn get(&self, key: &str) -> Option<&ResolverRef> {
        self.resolvers.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.resolvers.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.resolvers.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResolverRef)> {
        self.resolvers.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// True when any resolver depends on the in-flight event.
    pub fn is_dynamic(&self) -> bool {
        self.resolvers.values().any(|resolver| resolver.is_dynamic())
    }

    /// Keys of the dynamic resolvers, in insertion order.
    pub fn dynamic_parameters(&self) -> Vec<&str> {
        self.resolvers
            .iter()
            .filter(|(_, resolver)| resolver.is_dynamic())
            .map(|(key, _)| key.as_str())
            .collect()
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Resolve every entry once. The first failure aborts the whole
    /// resolution, no partial result is returned.
    pub fn resolve(&self, ctx: &ResolvingContext<'_>) -> Result<ResolverSetResult, ResolutionError> {
        tracing::trace!(
            parameters = self.resolvers.len(),
            event = %ctx.event().id(),
            "resolving parameters"
        );

        let mut values = IndexMap::with_capacity(self.resolvers.len());
        for (key, resolver) in &self.resolvers {
            let value = resolver
                .resolve(ctx)
                .map_err(|err| err.for_parameter(key.as_str()))?;
            values.insert(key.clone(), value);
        }
        Ok(ResolverSetResult { values })
    }
}

/// Immutable outcome of resolving a [`ResolverSet`].
///
/// Equality and hashing ignore parameter order, so two resolutions that
/// produced the same values are interchangeable as cache keys.
#[derive(Debug, Clone, Default)]
pub struct ResolverSetResult {
    values: IndexMap<String, Value>,
}

impl ResolverSetResult {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn into_map(self) -> IndexMap<String, Value> {
        self.values
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

impl PartialEq for ResolverSetResult {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl Eq for ResolverSetResult {}

impl Hash for ResolverSetResult {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.values.len().hash(state);
        unordered_hash(self.values.iter()).hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{constant, ExpressionValueResolver, TypeSafeExpressionValueResolver};
    use crate::runtime::{Event, Message, RuntimeServices};
    use crate::types::INTEGER;
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_duplicates_are_rejected_and_first_is_kept() {
        let mut set = ResolverSet::new();
        set.add("host", constant("first")).unwrap();

        let err = set.add("host", constant("second")).unwrap_err();
        assert!(matches!(err, Error::State(StateError::DuplicateParameter(ref k)) if k == "host"));

        let services = RuntimeServices::default();
        let result = set.resolve(&services.context(&Event::empty())).unwrap();
        assert_eq!(result.get("host"), Some(&Value::string("first")));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_empty_key_and_frozen_set() {
        let mut set = ResolverSet::new();
        assert!(matches!(
            set.add(" ", constant(1i64)),
            Err(Error::Config(ConfigError::EmptyParameterKey))
        ));

        set.freeze();
        assert!(matches!(
            set.add("late", constant(1i64)),
            Err(Error::State(StateError::Frozen(_)))
        ));
    }

    #[test]
    fn test_is_dynamic_propagation() {
        let mut set = ResolverSet::new();
        set.add("a", constant(1i64)).unwrap();
        set.add("b", constant("x")).unwrap();
        assert!(!set.is_dynamic());
        assert!(set.dynamic_parameters().is_empty());

        set.add("c", Arc::new(ExpressionValueResolver::new("#[payload]"))).unwrap();
        assert!(set.is_dynamic());
        assert_eq!(set.dynamic_parameters(), vec!["c"]);
    }

    #[test]
    fn test_static_set_resolves_identically_for_any_event() {
        let mut set = ResolverSet::new();
        set.add("a", constant(1i64)).unwrap();
        set.add("b", constant("x")).unwrap();

        let services = RuntimeServices::default();
        let first = set.resolve(&services.context(&Event::new(Message::of("one")))).unwrap();
        let second = set.resolve(&services.context(&Event::new(Message::of("two")))).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_failure_aborts_and_names_parameter() {
        let mut set = ResolverSet::new();
        set.add("ok", constant(1i64)).unwrap();
        set.add(
            "retries",
            Arc::new(TypeSafeExpressionValueResolver::new("#[payload.retries]", &INTEGER)),
        )
        .unwrap();

        let services = RuntimeServices::default();
        let event = Event::new(Message::of(Value::from(json!({"retries": "lots"}))));
        let err = set.resolve(&services.context(&event)).unwrap_err();
        assert!(matches!(err, ResolutionError::Parameter { ref parameter, .. } if parameter == "retries"));
    }

    #[test]
    fn test_result_equality_ignores_order() {
        let mut forward = ResolverSet::new();
        forward.add("a", constant(1i64)).unwrap();
        forward.add("b", constant(2i64)).unwrap();
        let mut backward = ResolverSet::new();
        backward.add("b", constant(2i64)).unwrap();
        backward.add("a", constant(1i64)).unwrap();

        let services = RuntimeServices::default();
        let event = Event::empty();
        let a = forward.resolve(&services.context(&event)).unwrap();
        let b = backward.resolve(&services.context(&event)).unwrap();
        assert_eq!(a, b);

        let mut seen = HashSet::new();
        seen.insert(a);
        assert!(seen.contains(&b));
    }
}
