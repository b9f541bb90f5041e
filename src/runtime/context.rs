//! Resolution context.
//!
//! Resolvers receive a [`ResolvingContext`]: the event being processed plus
//! the services needed to evaluate expressions, look up registered objects
//! and convert values. The services are shared across every context created
//! from the same [`RuntimeServices`].

use std::fmt;
use std::sync::Arc;

use super::conversion::{DefaultTypeConverter, TypeConverter};
use super::event::Event;
use super::expression::{DefaultExpressionEvaluator, ExpressionEvaluator};
use super::registry::{ObjectRegistry, SimpleRegistry};

/// Shared runtime collaborators.
#[derive(Clone)]
pub struct RuntimeServices {
    evaluator: Arc<dyn ExpressionEvaluator>,
    registry: Arc<dyn ObjectRegistry>,
    converter: Arc<dyn TypeConverter>,
}

impl RuntimeServices {
    pub fn new(
        evaluator: Arc<dyn ExpressionEvaluator>,
        registry: Arc<dyn ObjectRegistry>,
        converter: Arc<dyn TypeConverter>,
    ) -> Self {
        Self {
            evaluator,
            registry,
            converter,
        }
    }

    /// Default services around the given registry.
    pub fn with_registry(registry: Arc<dyn ObjectRegistry>) -> Self {
        Self {
            registry,
            ..Self::default()
        }
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn with_converter(mut self, converter: Arc<dyn TypeConverter>) -> Self {
        self.converter = converter;
        self
    }

    pub fn evaluator(&self) -> &dyn ExpressionEvaluator {
        self.evaluator.as_ref()
    }

    pub fn registry(&self) -> &dyn ObjectRegistry {
        self.registry.as_ref()
    }

    pub fn converter(&self) -> &dyn TypeConverter {
        self.converter.as_ref()
    }

    /// Context for resolving against `event`.
    pub fn context<'a>(&'a self, event: &'a Event) -> ResolvingContext<'a> {
        ResolvingContext {
            event,
            services: self,
        }
    }
}

impl Default for RuntimeServices {
    fn default() -> Self {
        Self {
            evaluator: Arc::new(DefaultExpressionEvaluator::new()),
            registry: Arc::new(SimpleRegistry::new()),
            converter: Arc::new(DefaultTypeConverter::new()),
        }
    }
}

impl fmt::Debug for RuntimeServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeServices")
            .field("evaluator", &self.evaluator)
            .field("registry", &self.registry)
            .field("converter", &self.converter)
            .finish()
    }
}

/// Per-event view handed to resolvers.
#[derive(Clone, Copy)]
pub struct ResolvingContext<'a> {
    event: &'a Event,
    services: &'a RuntimeServices,
}

impl<'a> ResolvingContext<'a> {
    pub fn event(&self) -> &'a Event {
        self.event
    }

    pub fn services(&self) -> &'a RuntimeServices {
        self.services
    }

    pub fn evaluator(&self) -> &'a dyn ExpressionEvaluator {
        self.services.evaluator()
    }

    pub fn registry(&self) -> &'a dyn ObjectRegistry {
        self.services.registry()
    }

    pub fn converter(&self) -> &'a dyn TypeConverter {
        self.services.converter()
    }
}

impl fmt::Debug for ResolvingContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvingContext")
            .field("event", &self.event.id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Message;
    use crate::value::Value;

    #[test]
    fn test_context_exposes_event_and_services() {
        let registry = Arc::new(SimpleRegistry::new());
        registry.register("answer", Value::Int(42));

        let services = RuntimeServices::with_registry(registry);
        let event = Event::new(Message::of("hello"));
        let ctx = services.context(&event);

        assert_eq!(ctx.event().id(), event.id());
        assert_eq!(ctx.registry().lookup("answer"), Some(Value::Int(42)));
        assert_eq!(
            ctx.evaluator().evaluate("#[payload]", ctx.event()).unwrap(),
            Value::string("hello")
        );
    }
}
