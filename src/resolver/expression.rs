use crate::error::ResolutionError;
use crate::runtime::{template, ExpressionFunction, ResolvingContext};
use crate::types::TypeRef;
use crate::value::Value;

use super::ValueResolver;

/// Evaluates an expression and returns whatever it yields.
///
/// Text without markers resolves to itself.
#[derive(Debug, Clone)]
pub struct ExpressionValueResolver {
    expression: String,
    dynamic: bool,
}

impl ExpressionValueResolver {
    pub fn new(expression: impl Into<String>) -> Self {
        let expression = expression.into();
        let dynamic = template::contains_template(&expression);
        Self {
            expression,
            dynamic,
        }
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }
}

impl ValueResolver for ExpressionValueResolver {
    fn resolve(&self, ctx: &ResolvingContext<'_>) -> Result<Value, ResolutionError> {
        if !self.dynamic {
            return Ok(Value::String(self.expression.clone()));
        }
        ctx.evaluator().evaluate(&self.expression, ctx.event())
    }

    fn is_dynamic(&self) -> bool {
        self.dynamic
    }
}

/// Evaluates an expression and coerces the result to an expected type.
#[derive(Debug, Clone)]
pub struct TypeSafeExpressionValueResolver {
    inner: ExpressionValueResolver,
    expected_type: TypeRef,
}

impl TypeSafeExpressionValueResolver {
    pub fn new(expression: impl Into<String>, expected_type: &TypeRef) -> Self {
        Self {
            inner: ExpressionValueResolver::new(expression),
            expected_type: expected_type.clone(),
        }
    }

    pub fn expression(&self) -> &str {
        self.inner.expression()
    }

    pub fn expected_type(&self) -> &TypeRef {
        &self.expected_type
    }
}

impl ValueResolver for TypeSafeExpressionValueResolver {
    fn resolve(&self, ctx: &ResolvingContext<'_>) -> Result<Value, ResolutionError> {
        let value = self.inner.resolve(ctx)?;
        let actual = value.natural_type();
        if value.is_null() || self.expected_type.is_assignable_from(&actual) {
            return Ok(value);
        }

        if !ctx.converter().can_convert(&value, &self.expected_type) {
            return Err(ResolutionError::IncompatibleType {
                expression: self.expression().to_string(),
                expected: self.expected_type.name().to_string(),
                actual: actual.name().to_string(),
            });
        }

        ctx.converter()
            .convert(value, &self.expected_type)
            .map_err(|err| ResolutionError::expression(self.expression(), err.to_string()))
    }

    fn is_dynamic(&self) -> bool {
        self.inner.is_dynamic()
    }
}

/// Resolves to an [`ExpressionFunction`] the component applies to events
/// later on. Resolving never evaluates the expression.
#[derive(Debug, Clone)]
pub struct ExpressionFunctionValueResolver {
    expression: String,
    return_type: TypeRef,
}

impl ExpressionFunctionValueResolver {
    pub fn new(expression: impl Into<String>, return_type: &TypeRef) -> Self {
        Self {
            expression: expression.into(),
            return_type: return_type.clone(),
        }
    }
}

impl ValueResolver for ExpressionFunctionValueResolver {
    fn resolve(&self, ctx: &ResolvingContext<'_>) -> Result<Value, ResolutionError> {
        Ok(Value::Function(ExpressionFunction::new(
            self.expression.as_str(),
            &self.return_type,
            ctx.services().clone(),
        )))
    }

    fn is_dynamic(&self) -> bool {
        false
    }
}
