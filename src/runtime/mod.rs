//! Runtime collaborators consumed by resolvers.
//!
//! Events and messages, the expression template syntax and evaluator, the
//! object registry and the type conversion service.

pub mod context;
pub mod conversion;
pub mod event;
pub mod expression;
pub mod message;
pub mod path;
pub mod registry;
pub mod template;

// Re-export key types
pub use context::{ResolvingContext, RuntimeServices};
pub use conversion::{DefaultTypeConverter, TypeConverter};
pub use event::Event;
pub use expression::{
    DefaultExpressionEvaluator, ExpressionEvaluator, ExpressionFunction, ExpressionFunctionFn,
    FunctionError, FunctionRegistry,
};
pub use message::{Message, MessageBuilder};
pub use registry::{ObjectRegistry, SimpleRegistry};
