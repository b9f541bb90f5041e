use crate::error::ResolutionError;
use crate::runtime::ResolvingContext;
use crate::value::Value;

use super::ValueResolver;

/// Looks a named object up in the registry at resolution time.
///
/// Reported as static: the name never changes, even though the object
/// registered under it may be replaced between events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryLookupValueResolver {
    name: String,
}

impl RegistryLookupValueResolver {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl ValueResolver for RegistryLookupValueResolver {
    fn resolve(&self, ctx: &ResolvingContext<'_>) -> Result<Value, ResolutionError> {
        ctx.registry()
            .lookup(&self.name)
            .ok_or_else(|| ResolutionError::NotFound(self.name.clone()))
    }

    fn is_dynamic(&self) -> bool {
        false
    }
}
