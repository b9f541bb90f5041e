//! In-flight events.
//!
//! An event wraps the message being processed together with the flow
//! variables set so far. Resolvers read from it but never change it.

use std::sync::Arc;

use indexmap::IndexMap;
use uuid::Uuid;

use super::message::Message;
use crate::value::Value;

/// A single message travelling through a flow.
#[derive(Debug, Clone)]
pub struct Event {
    id: Uuid,
    message: Arc<Message>,
    variables: IndexMap<String, Value>,
    flow_name: Option<String>,
}

impl Event {
    /// Create an event for `message` with a fresh id.
    ///
    /// # Example
    /// ```
    /// use mediate::runtime::{Event, Message};
    ///
    /// let event = Event::new(Message::of("hello"))
    ///     .with_flow_name("orders")
    ///     .with_variable("attempt", 1i64);
    /// assert_eq!(event.flow_name(), Some("orders"));
    /// ```
    pub fn new(message: Message) -> Self {
        Self {
            id: Uuid::new_v4(),
            message: Arc::new(message),
            variables: IndexMap::new(),
            flow_name: None,
        }
    }

    /// An event carrying a null payload. Used to resolve static
    /// configurations once, outside of any flow.
    pub fn empty() -> Self {
        Self::new(Message::of(Value::Null))
    }

    pub fn with_flow_name(mut self, flow_name: impl Into<String>) -> Self {
        self.flow_name = Some(flow_name.into());
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    /// Shared handle to the message, for values that embed it.
    pub fn message_handle(&self) -> Arc<Message> {
        Arc::clone(&self.message)
    }

    /// Get a flow variable by name.
    ///
    /// # Returns
    /// `Some(&value)` if the variable is set, `None` otherwise
    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Set a flow variable, replacing any previous value.
    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.variables.insert(name.into(), value.into());
    }

    pub fn variables(&self) -> &IndexMap<String, Value> {
        &self.variables
    }

    pub fn flow_name(&self) -> Option<&str> {
        self.flow_name.as_deref()
    }
}

impl Default for Event {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_event() {
        let event = Event::empty();
        assert!(event.message().payload.is_null());
        assert!(event.variables().is_empty());
        assert_eq!(event.flow_name(), None);
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(Event::empty().id(), Event::empty().id());
    }

    #[test]
    fn test_variables() {
        let mut event = Event::new(Message::of(Value::from(json!({"a": 1}))));
        event.set_variable("region", "eu-west");
        event.set_variable("region", "us-east");

        assert_eq!(event.variable("region"), Some(&Value::string("us-east")));
        assert_eq!(event.variable("missing"), None);
    }
}
