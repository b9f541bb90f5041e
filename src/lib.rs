//! # Mediate: Parameter Resolution for Message Mediation
//!
//! Mediate turns declared component parameters and their configured values
//! into resolvers that produce concrete values for every in-flight message.
//!
//! ## Features
//!
//! - **Data types**: canonical, cached descriptors of a value's type, item type, MIME type and encoding
//! - **Value resolvers**: static values, `#[...]` expressions, registry lookups, collections, maps and pojos
//! - **Resolver sets**: per-component parameter resolution, static or dynamic
//! - **Parameter parsing**: declared models plus configuration elements in, resolver sets out
//! - **YAML loading**: component models and configuration documents from YAML files
//!
//! ## Example: Component Model
//!
//! ```yaml
//! component:
//!   name: request
//!   kind: operation
//!   parameters:
//!     - name: retries
//!       type: integer
//!       default: 3
//!     - name: path
//!       type: string
//!       expression_support: required
//!       required: true
//!     - name: headers
//!       type: map<string, string>
//! ```
//!
//! ## Example: Resolving a Parameter
//!
//! ```
//! use mediate::model::{ExpressionSupport, MetadataType};
//! use mediate::parser::{ParameterParser, RawValue};
//! use mediate::runtime::{Event, Message, RuntimeServices};
//! use mediate::types::INTEGER;
//! use mediate::Value;
//!
//! let services = RuntimeServices::default();
//! let parser = ParameterParser::new(services.clone());
//! let resolver = parser
//!     .resolver_of(
//!         "retries",
//!         &MetadataType::simple(&INTEGER),
//!         RawValue::from("#[payload]"),
//!         Some(&Value::Int(3)),
//!         ExpressionSupport::Supported,
//!         false,
//!     )
//!     .unwrap();
//!
//! assert!(resolver.is_dynamic());
//! let event = Event::new(Message::of("5"));
//! assert_eq!(resolver.resolve(&services.context(&event)).unwrap(), Value::Int(5));
//! ```

pub mod component;
pub mod config;
pub mod datatype;
pub mod error;
pub mod model;
pub mod parser;
pub mod resolver;
pub mod runtime;
pub mod types;
pub mod value;

// Re-export key types
pub use datatype::{DataType, DataTypeBuilder};
pub use error::{ConfigError, Error, ResolutionError, Result, StateError};
pub use resolver::{ResolverRef, ResolverSet, ResolverSetResult, ValueResolver};
pub use value::Value;

// Re-export runtime types
pub use runtime::{Event, Message, ResolvingContext, RuntimeServices};
