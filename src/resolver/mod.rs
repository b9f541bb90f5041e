//! Value resolvers.
//!
//! A resolver turns a [`ResolvingContext`] into a concrete [`Value`]. Static
//! resolvers ignore the context, expression resolvers evaluate against the
//! in-flight event, and aggregate resolvers (collections, maps, object
//! builders) resolve their children and assemble the result.
//!
//! [`ValueResolver::is_dynamic`] is answered from the composition alone,
//! without resolving anything. It decides between resolving a configuration
//! once or once per event, and rejects expressions where a parameter forbids
//! them.

mod collection;
mod expression;
mod object_builder;
mod registry_lookup;
mod set;
mod static_value;

use std::fmt;
use std::sync::Arc;

use crate::error::ResolutionError;
use crate::runtime::ResolvingContext;
use crate::value::Value;

pub use collection::{CollectionValueResolver, MapValueResolver};
pub use expression::{
    ExpressionFunctionValueResolver, ExpressionValueResolver, TypeSafeExpressionValueResolver,
};
pub use object_builder::{ObjectBuilder, ObjectBuilderValueResolver};
pub use registry_lookup::RegistryLookupValueResolver;
pub use set::{ResolverSet, ResolverSetResult};
pub use static_value::StaticValueResolver;

/// Strategy producing a value for a given context.
pub trait ValueResolver: Send + Sync + fmt::Debug {
    /// Resolve against `ctx`.
    fn resolve(&self, ctx: &ResolvingContext<'_>) -> Result<Value, ResolutionError>;

    /// Whether the result depends on the in-flight event, directly or
    /// through any child resolver.
    fn is_dynamic(&self) -> bool;
}

/// Shared handle to a resolver.
pub type ResolverRef = Arc<dyn ValueResolver>;

/// Shorthand for a shared static resolver.
pub fn constant(value: impl Into<Value>) -> ResolverRef {
    Arc::new(StaticValueResolver::new(value.into()))
}

pub(crate) fn any_dynamic<'a>(resolvers: impl IntoIterator<Item = &'a ResolverRef>) -> bool {
    resolvers.into_iter().any(|resolver| resolver.is_dynamic())
}
