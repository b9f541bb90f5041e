use crate::error::ResolutionError;
use crate::runtime::ResolvingContext;
use crate::value::Value;

use super::ValueResolver;

/// Resolves to a fixed value, whatever the context.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticValueResolver {
    value: Value,
}

impl StaticValueResolver {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    /// Resolver for `Null`, used for optional parameters without a default.
    pub fn null() -> Self {
        Self::new(Value::Null)
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl ValueResolver for StaticValueResolver {
    fn resolve(&self, _ctx: &ResolvingContext<'_>) -> Result<Value, ResolutionError> {
        Ok(self.value.clone())
    }

    fn is_dynamic(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{Event, Message, RuntimeServices};

    #[test]
    fn test_ignores_context() {
        let services = RuntimeServices::default();
        let resolver = StaticValueResolver::new(Value::Int(3));

        for payload in ["a", "b"] {
            let event = Event::new(Message::of(payload));
            assert_eq!(resolver.resolve(&services.context(&event)).unwrap(), Value::Int(3));
        }
        assert!(!resolver.is_dynamic());
    }
}
