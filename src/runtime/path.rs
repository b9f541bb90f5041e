//! Field paths inside expressions.
//!
//! Paths address values reachable from an event: `payload.customer.name`,
//! `message.attributes['content-length']`, `vars.items[0]`.

use std::fmt;

use crate::value::Value;

/// A parsed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    /// The raw path string
    pub raw: String,
    /// Parsed path segments
    pub segments: Vec<PathSegment>,
}

/// A segment in a field path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// A named field (e.g., "customer", "name")
    Field(String),
    /// A bracketed, quoted key (e.g., ['content-type'])
    Key(String),
    /// A list index (e.g., [0], [5])
    Index(usize),
}

impl PathSegment {
    /// The name of a field or key segment.
    pub fn name(&self) -> Option<&str> {
        match self {
            PathSegment::Field(name) | PathSegment::Key(name) => Some(name),
            PathSegment::Index(_) => None,
        }
    }
}

impl FieldPath {
    /// Parse a dotted path with optional bracket segments.
    ///
    /// # Example
    ///
    /// ```
    /// use mediate::runtime::path::{FieldPath, PathSegment};
    ///
    /// let path = FieldPath::parse("vars.items[0]['sku']").unwrap();
    /// assert_eq!(path.segments.len(), 4);
    /// assert_eq!(path.segments[2], PathSegment::Index(0));
    /// ```
    pub fn parse(path: &str) -> Result<Self, String> {
        let mut segments = Vec::new();
        let chars: Vec<char> = path.trim().chars().collect();
        let mut i = 0;

        while i < chars.len() {
            match chars[i] {
                '.' => {
                    // A dot must separate two segments and introduce a field name
                    let next_is_field = chars.get(i + 1).copied().is_some_and(is_ident_char);
                    if segments.is_empty() || !next_is_field {
                        return Err(format!("unexpected '.' in path '{}'", path));
                    }
                    i += 1;
                }
                '[' => {
                    let close = chars[i..]
                        .iter()
                        .position(|c| *c == ']')
                        .map(|offset| i + offset)
                        .ok_or_else(|| format!("unclosed '[' in path '{}'", path))?;
                    let inner: String = chars[i + 1..close].iter().collect();
                    segments.push(Self::bracket_segment(inner.trim(), path)?);
                    i = close + 1;
                }
                c if is_ident_char(c) => {
                    let start = i;
                    while i < chars.len() && is_ident_char(chars[i]) {
                        i += 1;
                    }
                    segments.push(PathSegment::Field(chars[start..i].iter().collect()));
                }
                c => return Err(format!("unexpected '{}' in path '{}'", c, path)),
            }
        }

        if segments.is_empty() {
            return Err("empty path".to_string());
        }

        Ok(Self {
            raw: path.trim().to_string(),
            segments,
        })
    }

    fn bracket_segment(inner: &str, path: &str) -> Result<PathSegment, String> {
        if let Ok(index) = inner.parse::<usize>() {
            return Ok(PathSegment::Index(index));
        }
        let quoted = inner.len() >= 2
            && ((inner.starts_with('\'') && inner.ends_with('\''))
                || (inner.starts_with('"') && inner.ends_with('"')));
        if quoted {
            return Ok(PathSegment::Key(inner[1..inner.len() - 1].to_string()));
        }
        Err(format!("invalid bracket segment '[{}]' in path '{}'", inner, path))
    }

    /// First segment, the root the path starts from.
    pub fn root(&self) -> &PathSegment {
        &self.segments[0]
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

pub(crate) fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '$'
}

/// Walk `segments` starting at `value`.
///
/// Missing fields and out of range indexes yield `Null`. Navigating into a
/// scalar is an error.
pub fn navigate(value: &Value, segments: &[PathSegment]) -> Result<Value, String> {
    let mut current = value.clone();
    for segment in segments {
        current = step(&current, segment)?;
    }
    Ok(current)
}

fn step(value: &Value, segment: &PathSegment) -> Result<Value, String> {
    match (value, segment) {
        (Value::Null, _) => Ok(Value::Null),
        (Value::Map(map), segment) => Ok(match segment {
            PathSegment::Index(index) => map.get(&Value::Int(*index as i64)),
            PathSegment::Field(name) | PathSegment::Key(name) => map.get_str(name),
        }
        .cloned()
        .unwrap_or(Value::Null)),
        (Value::Object(object), PathSegment::Field(name) | PathSegment::Key(name)) => {
            Ok(object.get(name).cloned().unwrap_or(Value::Null))
        }
        (Value::Message(message), PathSegment::Field(name) | PathSegment::Key(name)) => {
            Ok(message.payload_field(name).cloned().unwrap_or(Value::Null))
        }
        (Value::List(items), PathSegment::Index(index)) => {
            Ok(items.get(*index).cloned().unwrap_or(Value::Null))
        }
        (Value::Set(items), PathSegment::Index(index)) => {
            Ok(items.get_index(*index).cloned().unwrap_or(Value::Null))
        }
        (other, segment) => Err(format!(
            "cannot read {:?} from a value of type '{}'",
            segment,
            other.type_name()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_path_parse() {
        let path = FieldPath::parse("user.address.city").unwrap();

        assert_eq!(path.segments.len(), 3);
        assert_eq!(path.segments[0], PathSegment::Field("user".to_string()));
        assert_eq!(path.segments[1], PathSegment::Field("address".to_string()));
        assert_eq!(path.segments[2], PathSegment::Field("city".to_string()));
    }

    #[test]
    fn test_field_path_with_index_and_key() {
        let path = FieldPath::parse("message.attributes['content-type']").unwrap();
        assert_eq!(path.segments[2], PathSegment::Key("content-type".to_string()));

        let path = FieldPath::parse("items[0].name").unwrap();
        assert_eq!(path.segments[1], PathSegment::Index(0));
        assert_eq!(path.raw, "items[0].name");
    }

    #[test]
    fn test_invalid_paths() {
        assert!(FieldPath::parse("").is_err());
        assert!(FieldPath::parse(".a").is_err());
        assert!(FieldPath::parse("a.").is_err());
        assert!(FieldPath::parse("a..b").is_err());
        assert!(FieldPath::parse("a.[0]").is_err());
        assert!(FieldPath::parse("a[").is_err());
        assert!(FieldPath::parse("a[b]").is_err());
        assert!(FieldPath::parse("a + b").is_err());
    }

    #[test]
    fn test_navigate() {
        let value = Value::from(json!({
            "customer": {"name": "Alice", "tags": ["gold", "eu"]}
        }));

        let path = FieldPath::parse("customer.tags[1]").unwrap();
        assert_eq!(navigate(&value, &path.segments).unwrap(), Value::string("eu"));

        let missing = FieldPath::parse("customer.age").unwrap();
        assert_eq!(navigate(&value, &missing.segments).unwrap(), Value::Null);

        let scalar = FieldPath::parse("customer.name.first").unwrap();
        assert!(navigate(&value, &scalar.segments).is_err());
    }
}
