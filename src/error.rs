//! Error types for the resolution kernel.
//!
//! Errors fall into three families:
//!
//! - [`ConfigError`]: argument errors raised while building data types,
//!   resolvers and resolver sets. These are caller bugs or misconfigured
//!   parameters and always name the offending value or parameter.
//! - [`ResolutionError`]: per-message failures raised while resolving a
//!   resolver against an in-flight event.
//! - [`StateError`]: operations on an object in the wrong lifecycle state.
//!
//! [`ModelError`] covers loading component models and configuration files.

use thiserror::Error;

/// Argument errors: fail fast, the caller handed in something invalid.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("MimeType cannot be parsed: {0}")]
    InvalidMimeType(String),

    #[error("Unsupported charset: {0}")]
    UnsupportedCharset(String),

    #[error("collectionType {0} is not a Collection type")]
    NotACollectionType(String),

    #[error("mapType {0} is not a Map type")]
    NotAMapType(String),

    #[error("Parameter key cannot be empty")]
    EmptyParameterKey,

    #[error("An expression value was given for parameter '{parameter}' but it doesn't support expressions")]
    ExpressionNotSupported { parameter: String },

    #[error("A fixed value was given for parameter '{parameter}' but it only supports expressions")]
    ExpressionRequired { parameter: String },

    #[error("Could not transform value '{value}' into a Date using pattern '{pattern}'")]
    InvalidDate { value: String, pattern: String },

    #[error("Could not transform value of type '{type_name}' to Date")]
    UnconvertibleDate { type_name: String },

    #[error("Invalid value for parameter '{parameter}': {reason}")]
    InvalidParameterValue { parameter: String, reason: String },

    #[error("Type '{type_name}' has no field named '{field}'")]
    UnknownField { type_name: String, field: String },

    #[error("Map resolver needs one value per key, got {keys} keys and {values} values")]
    MismatchedMapEntries { keys: usize, values: usize },

    #[error("The '{source_name}' message source is using expressions, which are not allowed on message sources. Offending parameters are: [{parameters}]")]
    DynamicSourceParameters { source_name: String, parameters: String },

    #[error("Two configuration elements have been defined with the same global name '{0}'. Global name must be unique")]
    DuplicateGlobalName(String),

    #[error("Only top level elements can have a name attribute. Component '{identifier}' has attribute name with value '{name}'")]
    NameOnNestedElement { identifier: String, name: String },

    #[error("Unresolvable placeholder '${{{0}}}'")]
    UnresolvedPlaceholder(String),

    #[error("Configuration '{configuration}' declares more than one connection provider: {providers}")]
    MultipleConnectionProviders { configuration: String, providers: String },
}

/// Conversion failure reported by a [`TypeConverter`](crate::runtime::TypeConverter).
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Cannot convert {value} of type '{value_type}' to '{target}': {reason}")]
pub struct ConversionError {
    pub value: String,
    pub value_type: String,
    pub target: String,
    pub reason: String,
}

impl ConversionError {
    pub fn new(
        value: impl Into<String>,
        value_type: impl Into<String>,
        target: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            value: value.into(),
            value_type: value_type.into(),
            target: target.into(),
            reason: reason.into(),
        }
    }
}

/// Per-message resolution failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolutionError {
    #[error("Failed to evaluate expression '{expression}': {reason}")]
    Expression { expression: String, reason: String },

    #[error("No object named '{0}' was found in the registry")]
    NotFound(String),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error("Expression '{expression}' resolved to a value of type '{actual}' which is not compatible with '{expected}'")]
    IncompatibleType {
        expression: String,
        expected: String,
        actual: String,
    },

    #[error("Failed to resolve parameter '{parameter}': {source}")]
    Parameter {
        parameter: String,
        #[source]
        source: Box<ResolutionError>,
    },
}

impl ResolutionError {
    pub fn expression(expression: impl Into<String>, reason: impl Into<String>) -> Self {
        ResolutionError::Expression {
            expression: expression.into(),
            reason: reason.into(),
        }
    }

    /// Wrap this error with the name of the parameter being resolved.
    pub fn for_parameter(self, parameter: impl Into<String>) -> Self {
        ResolutionError::Parameter {
            parameter: parameter.into(),
            source: Box::new(self),
        }
    }
}

/// Operations attempted in the wrong lifecycle state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StateError {
    #[error("A resolver was already registered for parameter '{0}'")]
    DuplicateParameter(String),

    #[error("Resolver set is frozen, cannot add parameter '{0}'")]
    Frozen(String),
}

/// Failures while loading component models or configuration trees.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML in {path}: {message}")]
    Yaml { path: String, message: String },

    #[error("Unknown type '{0}'")]
    UnknownType(String),

    #[error("Invalid type expression '{expression}': {reason}")]
    InvalidTypeExpression { expression: String, reason: String },

    #[error("Invalid component model '{component}': {reason}")]
    InvalidComponent { component: String, reason: String },

    #[error("No component model for '{0}'")]
    UnknownComponent(String),
}

/// Crate-level error.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

pub type Result<T> = std::result::Result<T, Error>;
