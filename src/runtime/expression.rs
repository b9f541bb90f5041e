//! Expression evaluation.
//!
//! The default language is deliberately small: paths rooted at the event
//! (`payload`, `message.*`, `vars.*`, `flowVars.*`, `flowName`, `id`),
//! literals (`42`, `1.5`, `'text'`, `true`, `null`) and calls to registered
//! functions (`upper(payload.name)`). A value mixing text and markers is a
//! template and always evaluates to a string.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use thiserror::Error;

use super::context::RuntimeServices;
use super::event::Event;
use super::path::{self, FieldPath, PathSegment};
use super::template::{self, TemplatePart};
use crate::error::ResolutionError;
use crate::types::TypeRef;
use crate::value::{MapValue, Value};

/// Evaluates expressions against an event.
pub trait ExpressionEvaluator: Send + Sync + fmt::Debug {
    /// Evaluate `expression`, which is either a bare expression, a single
    /// `#[...]` marker, or a template mixing text and markers.
    fn evaluate(&self, expression: &str, event: &Event) -> Result<Value, ResolutionError>;
}

/// Error type for expression function calls
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FunctionError {
    #[error("Function not found: {0}")]
    NotFound(String),
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),
    #[error("Execution error: {0}")]
    ExecutionError(String),
}

/// A function callable from expressions.
pub trait ExpressionFunctionFn: Send + Sync {
    fn call(&self, args: &[Value]) -> Result<Value, FunctionError>;
}

impl<F> ExpressionFunctionFn for F
where
    F: Fn(&[Value]) -> Result<Value, FunctionError> + Send + Sync,
{
    fn call(&self, args: &[Value]) -> Result<Value, FunctionError> {
        self(args)
    }
}

/// Registry for storing and calling expression functions.
pub struct FunctionRegistry {
    functions: HashMap<String, Box<dyn ExpressionFunctionFn>>,
}

impl FunctionRegistry {
    /// Create an empty function registry
    pub fn new() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    /// Registry with the built-in functions: `upper`, `lower`, `trim`,
    /// `concat` and `length`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("upper", Box::new(|args: &[Value]| {
            single_string(args, "upper").map(|s| Value::String(s.to_uppercase()))
        }));
        registry.register("lower", Box::new(|args: &[Value]| {
            single_string(args, "lower").map(|s| Value::String(s.to_lowercase()))
        }));
        registry.register("trim", Box::new(|args: &[Value]| {
            single_string(args, "trim").map(|s| Value::String(s.trim().to_string()))
        }));
        registry.register("concat", Box::new(|args: &[Value]| -> Result<Value, FunctionError> {
            Ok(Value::String(
                args.iter()
                    .filter(|arg| !arg.is_null())
                    .map(Value::to_string)
                    .collect(),
            ))
        }));
        registry.register("length", Box::new(|args: &[Value]| match args {
            [Value::String(s)] => Ok(Value::Int(s.chars().count() as i64)),
            [Value::List(items)] => Ok(Value::Int(items.len() as i64)),
            [Value::Set(items)] => Ok(Value::Int(items.len() as i64)),
            [Value::Map(map)] => Ok(Value::Int(map.len() as i64)),
            [Value::Null] => Ok(Value::Int(0)),
            _ => Err(FunctionError::InvalidArgs(
                "length expects a single string, collection or map".to_string(),
            )),
        }));
        registry
    }

    /// Register a function, replacing any previous one with the same name.
    pub fn register(&mut self, name: impl Into<String>, function: Box<dyn ExpressionFunctionFn>) {
        self.functions.insert(name.into(), function);
    }

    /// Call a registered function
    ///
    /// # Returns
    ///
    /// * `Ok(Value)` - Function succeeded
    /// * `Err(FunctionError)` - Function is unknown or failed
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, FunctionError> {
        let function = self
            .functions
            .get(name)
            .ok_or_else(|| FunctionError::NotFound(name.to_string()))?;

        function.call(args)
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn function_names(&self) -> Vec<String> {
        self.functions.keys().cloned().collect()
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = self.function_names();
        names.sort();
        f.debug_struct("FunctionRegistry").field("functions", &names).finish()
    }
}

fn single_string(args: &[Value], name: &str) -> Result<String, FunctionError> {
    match args {
        [Value::String(s)] => Ok(s.clone()),
        [Value::Null] => Ok(String::new()),
        [other] => Ok(other.to_string()),
        _ => Err(FunctionError::InvalidArgs(format!(
            "{} expects exactly one argument, got {}",
            name,
            args.len()
        ))),
    }
}

/// Parsed form of a bare expression.
#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(Value),
    Path(FieldPath),
    Call { name: String, args: Vec<Expr> },
}

struct ExprParser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> ExprParser<'a> {
    fn parse(source: &'a str) -> Result<Expr, String> {
        let mut parser = Self {
            source,
            chars: source.chars().collect(),
            pos: 0,
        };
        let expr = parser.expr()?;
        parser.skip_ws();
        if parser.pos < parser.chars.len() {
            return Err(format!(
                "unexpected '{}' at position {}",
                parser.chars[parser.pos], parser.pos
            ));
        }
        Ok(expr)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expr(&mut self) -> Result<Expr, String> {
        self.skip_ws();
        match self.peek() {
            None => Err("empty expression".to_string()),
            Some(quote @ ('\'' | '"')) => self.string(quote),
            Some(c) if c.is_ascii_digit() || c == '-' => self.number(),
            Some(c) if path::is_ident_char(c) => self.path_or_call(),
            Some(c) => Err(format!("unexpected '{}' in '{}'", c, self.source)),
        }
    }

    fn string(&mut self, quote: char) -> Result<Expr, String> {
        self.pos += 1;
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == quote {
                let text: String = self.chars[start..self.pos].iter().collect();
                self.pos += 1;
                return Ok(Expr::Literal(Value::String(text)));
            }
            self.pos += 1;
        }
        Err(format!("unterminated string in '{}'", self.source))
    }

    fn number(&mut self) -> Result<Expr, String> {
        let start = self.pos;
        self.pos += 1;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E')
        {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        if let Ok(i) = text.parse::<i64>() {
            return Ok(Expr::Literal(Value::Int(i)));
        }
        text.parse::<f64>()
            .map(|f| Expr::Literal(Value::Float(f)))
            .map_err(|_| format!("invalid number '{}'", text))
    }

    fn path_or_call(&mut self) -> Result<Expr, String> {
        let start = self.pos;
        let mut depth = 0usize;
        let mut quote: Option<char> = None;

        // A path runs until whitespace, a comma or an unmatched ')'
        while let Some(c) = self.peek() {
            match (quote, c) {
                (Some(open), c) if c == open => quote = None,
                (Some(_), _) => {}
                (None, '\'' | '"') => quote = Some(c),
                (None, '[') => depth += 1,
                (None, ']') => depth = depth.saturating_sub(1),
                (None, '(') if depth == 0 => break,
                (None, c) if depth == 0 && (c.is_whitespace() || c == ',' || c == ')') => break,
                _ => {}
            }
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();

        if self.peek() == Some('(') {
            self.pos += 1;
            let args = self.args()?;
            return Ok(Expr::Call { name: text, args });
        }

        match text.as_str() {
            "true" => Ok(Expr::Literal(Value::Bool(true))),
            "false" => Ok(Expr::Literal(Value::Bool(false))),
            "null" => Ok(Expr::Literal(Value::Null)),
            _ => FieldPath::parse(&text).map(Expr::Path),
        }
    }

    fn args(&mut self) -> Result<Vec<Expr>, String> {
        let mut args = Vec::new();
        self.skip_ws();
        if self.peek() == Some(')') {
            self.pos += 1;
            return Ok(args);
        }
        loop {
            args.push(self.expr()?);
            self.skip_ws();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(')') => {
                    self.pos += 1;
                    return Ok(args);
                }
                _ => return Err(format!("expected ',' or ')' in '{}'", self.source)),
            }
        }
    }
}

/// The built-in expression language.
#[derive(Debug, Default)]
pub struct DefaultExpressionEvaluator {
    functions: FunctionRegistry,
}

impl DefaultExpressionEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_functions(functions: FunctionRegistry) -> Self {
        Self { functions }
    }

    pub fn functions_mut(&mut self) -> &mut FunctionRegistry {
        &mut self.functions
    }

    fn evaluate_bare(&self, source: &str, event: &Event) -> Result<Value, ResolutionError> {
        let expr = ExprParser::parse(source).map_err(|reason| ResolutionError::expression(source, reason))?;
        self.eval(&expr, event)
            .map_err(|reason| ResolutionError::expression(source, reason))
    }

    fn eval(&self, expr: &Expr, event: &Event) -> Result<Value, String> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Path(path) => self.eval_path(path, event),
            Expr::Call { name, args } => {
                let values = args
                    .iter()
                    .map(|arg| self.eval(arg, event))
                    .collect::<Result<Vec<_>, _>>()?;
                self.functions
                    .call(name, &values)
                    .map_err(|err| err.to_string())
            }
        }
    }

    fn eval_path(&self, path: &FieldPath, event: &Event) -> Result<Value, String> {
        let segments = &path.segments;
        let root = path.root().name().unwrap_or_default();
        let rest = &segments[1..];

        match root {
            "payload" => path::navigate(&event.message().payload, rest),
            "message" => self.eval_message(event, rest),
            "vars" | "flowVars" => match rest.split_first() {
                Some((first, tail)) => {
                    let name = first
                        .name()
                        .ok_or_else(|| format!("invalid variable reference '{}'", path))?;
                    let value = event.variable(name).cloned().unwrap_or(Value::Null);
                    path::navigate(&value, tail)
                }
                None => Ok(Value::Map(variables_map(event))),
            },
            "flowName" => Ok(event
                .flow_name()
                .map(|name| Value::String(name.to_string()))
                .unwrap_or(Value::Null)),
            "id" => Ok(Value::String(event.id().to_string())),
            other => Err(format!("unknown expression root '{}'", other)),
        }
    }

    fn eval_message(&self, event: &Event, rest: &[PathSegment]) -> Result<Value, String> {
        let message = event.message();
        let Some((first, tail)) = rest.split_first() else {
            return Ok(Value::Message(event.message_handle()));
        };

        match first.name() {
            Some("payload") => path::navigate(&message.payload, tail),
            Some("attributes") => {
                let mut attributes = MapValue::new(crate::types::MapKind::Ordered);
                for (name, value) in &message.attributes {
                    attributes.insert(Value::String(name.clone()), value.clone());
                }
                path::navigate(&Value::Map(attributes), tail)
            }
            Some("dataType") => path::navigate(&Value::DataType(message.data_type.clone()), tail),
            Some("id") => Ok(Value::String(event.id().to_string())),
            // message.<field> is shorthand for message.payload.<field>
            Some(_) => path::navigate(&message.payload, rest),
            None => Err("message cannot be indexed".to_string()),
        }
    }
}

fn variables_map(event: &Event) -> MapValue {
    let mut variables = MapValue::new(crate::types::MapKind::Ordered);
    for (name, value) in event.variables() {
        variables.insert(Value::String(name.clone()), value.clone());
    }
    variables
}

impl ExpressionEvaluator for DefaultExpressionEvaluator {
    fn evaluate(&self, expression: &str, event: &Event) -> Result<Value, ResolutionError> {
        if let Some(body) = template::single_expression(expression) {
            return self.evaluate_bare(body, event);
        }

        if !template::contains_template(expression) {
            return self.evaluate_bare(expression, event);
        }

        let mut rendered = String::new();
        for part in template::split_template(expression) {
            match part {
                TemplatePart::Literal(text) => rendered.push_str(text),
                TemplatePart::Expression(body) => {
                    let value = self.evaluate_bare(body, event)?;
                    if !value.is_null() {
                        rendered.push_str(&value.to_string());
                    }
                }
            }
        }
        Ok(Value::String(rendered))
    }
}

/// An expression applied later to an event of the caller's choosing.
///
/// Produced by resolving parameters typed as functions of an event: the
/// component receives the function and applies it to each event it handles.
#[derive(Clone)]
pub struct ExpressionFunction {
    expression: Arc<str>,
    return_type: TypeRef,
    services: RuntimeServices,
}

impl ExpressionFunction {
    pub fn new(expression: impl Into<Arc<str>>, return_type: &TypeRef, services: RuntimeServices) -> Self {
        Self {
            expression: expression.into(),
            return_type: return_type.clone(),
            services,
        }
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn return_type(&self) -> &TypeRef {
        &self.return_type
    }

    /// Evaluate against `event` and convert to the return type.
    pub fn apply(&self, event: &Event) -> Result<Value, ResolutionError> {
        let value = self.services.evaluator().evaluate(&self.expression, event)?;
        if self.return_type.is_assignable_from(&value.natural_type()) {
            return Ok(value);
        }
        Ok(self.services.converter().convert(value, &self.return_type)?)
    }
}

impl PartialEq for ExpressionFunction {
    fn eq(&self, other: &Self) -> bool {
        self.expression == other.expression && self.return_type == other.return_type
    }
}

impl Eq for ExpressionFunction {}

impl Hash for ExpressionFunction {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.expression.hash(state);
        self.return_type.hash(state);
    }
}

impl fmt::Debug for ExpressionFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpressionFunction")
            .field("expression", &self.expression)
            .field("return_type", &self.return_type)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Message;
    use crate::types::{INTEGER, STRING};
    use serde_json::json;

    fn event() -> Event {
        let message = Message::builder(Value::from(json!({
            "retries": 5,
            "customer": {"name": "Alice", "tags": ["gold"]}
        })))
        .attribute("content-type", "application/json")
        .build();
        Event::new(message)
            .with_flow_name("orders")
            .with_variable("region", "eu")
    }

    fn eval(expression: &str) -> Result<Value, ResolutionError> {
        DefaultExpressionEvaluator::new().evaluate(expression, &event())
    }

    #[test]
    fn test_paths() {
        assert_eq!(eval("#[message.retries]").unwrap(), Value::Int(5));
        assert_eq!(eval("#[payload.customer.name]").unwrap(), Value::string("Alice"));
        assert_eq!(eval("#[message.payload.customer.tags[0]]").unwrap(), Value::string("gold"));
        assert_eq!(
            eval("#[message.attributes['content-type']]").unwrap(),
            Value::string("application/json")
        );
        assert_eq!(eval("#[vars.region]").unwrap(), Value::string("eu"));
        assert_eq!(eval("#[flowVars.region]").unwrap(), Value::string("eu"));
        assert_eq!(eval("#[flowName]").unwrap(), Value::string("orders"));
        assert_eq!(eval("#[vars.missing]").unwrap(), Value::Null);
    }

    #[test]
    fn test_literals_and_functions() {
        assert_eq!(eval("#[42]").unwrap(), Value::Int(42));
        assert_eq!(eval("#[-1.5]").unwrap(), Value::Float(-1.5));
        assert_eq!(eval("#['it works']").unwrap(), Value::string("it works"));
        assert_eq!(eval("#[true]").unwrap(), Value::Bool(true));
        assert_eq!(eval("#[upper(payload.customer.name)]").unwrap(), Value::string("ALICE"));
        assert_eq!(
            eval("#[concat(vars.region, '-', message.retries)]").unwrap(),
            Value::string("eu-5")
        );
        assert_eq!(eval("#[length(payload.customer.tags)]").unwrap(), Value::Int(1));
    }

    #[test]
    fn test_templates_render_strings() {
        assert_eq!(
            eval("Hello #[payload.customer.name] from #[vars.region]").unwrap(),
            Value::string("Hello Alice from eu")
        );
    }

    #[test]
    fn test_errors_name_the_expression() {
        let err = eval("#[nowhere.to.go]").unwrap_err();
        assert!(err.to_string().contains("nowhere.to.go"));
        assert!(matches!(eval("#[nope(1)]"), Err(ResolutionError::Expression { .. })));
        assert!(eval("#[upper(]").is_err());
    }

    #[test]
    fn test_custom_functions() {
        let mut evaluator = DefaultExpressionEvaluator::new();
        evaluator.functions_mut().register(
            "double",
            Box::new(|args: &[Value]| match args {
                [Value::Int(i)] => Ok(Value::Int(i * 2)),
                _ => Err(FunctionError::InvalidArgs("double expects an integer".to_string())),
            }),
        );
        assert_eq!(
            evaluator.evaluate("#[double(message.retries)]", &event()).unwrap(),
            Value::Int(10)
        );
    }

    #[test]
    fn test_expression_function_applies_per_event() {
        let function = ExpressionFunction::new("#[message.retries]", &STRING, RuntimeServices::default());
        assert_eq!(function.apply(&event()).unwrap(), Value::string("5"));

        let as_int = ExpressionFunction::new("#[message.retries]", &INTEGER, RuntimeServices::default());
        assert_ne!(function, as_int);
        assert_eq!(as_int.apply(&event()).unwrap(), Value::Int(5));
    }
}
