//! Object registry trait and the default in-memory registry.
//!
//! Registry lookups resolve configuration references by name: a parameter
//! whose declared type is a pojo and whose value is plain text names an
//! object registered elsewhere.

use dashmap::DashMap;

use crate::value::Value;

/// Name based lookup of registered objects.
///
/// # Example
///
/// ```rust
/// use mediate::runtime::ObjectRegistry;
/// use mediate::Value;
///
/// #[derive(Debug)]
/// pub struct FixedRegistry;
///
/// impl ObjectRegistry for FixedRegistry {
///     fn lookup(&self, name: &str) -> Option<Value> {
///         match name {
///             "defaultTimeout" => Some(Value::Int(30)),
///             _ => None,
///         }
///     }
/// }
///
/// assert_eq!(FixedRegistry.lookup("defaultTimeout"), Some(Value::Int(30)));
/// ```
pub trait ObjectRegistry: Send + Sync + std::fmt::Debug {
    /// Look up an object by name.
    ///
    /// # Returns
    ///
    /// * `Some(Value)` - The registered object
    /// * `None` - Nothing is registered under `name`
    fn lookup(&self, name: &str) -> Option<Value>;
}

/// Concurrent, mutable registry.
///
/// Objects may be registered and replaced while events are in flight.
#[derive(Debug, Default)]
pub struct SimpleRegistry {
    objects: DashMap<String, Value>,
}

impl SimpleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an object, returning the one it replaced.
    pub fn register(&self, name: impl Into<String>, object: impl Into<Value>) -> Option<Value> {
        let name = name.into();
        tracing::debug!(name = %name, "registering object");
        self.objects.insert(name, object.into())
    }

    pub fn unregister(&self, name: &str) -> Option<Value> {
        self.objects.remove(name).map(|(_, object)| object)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.objects.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.objects.iter().map(|entry| entry.key().clone()).collect()
    }
}

impl ObjectRegistry for SimpleRegistry {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.objects.get(name).map(|entry| entry.value().clone())
    }
}
