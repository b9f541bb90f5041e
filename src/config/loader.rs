use std::collections::HashSet;
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::error::{ConfigError, Error, ModelError};

use super::{ConfigElement, NAME_ATTRIBUTE};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").expect("Invalid placeholder pattern"));

#[derive(Debug, Deserialize)]
struct DocumentDefinition {
    #[serde(default)]
    properties: serde_yaml::Mapping,
    #[serde(default)]
    elements: Vec<ElementDefinition>,
}

#[derive(Debug, Deserialize)]
struct ElementDefinition {
    identifier: String,
    #[serde(default)]
    namespace: Option<String>,
    #[serde(default)]
    attributes: serde_yaml::Mapping,
    #[serde(default)]
    children: Vec<ElementDefinition>,
    #[serde(default)]
    text: Option<String>,
}

/// Top-level configuration elements loaded from one file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigDocument {
    properties: IndexMap<String, String>,
    elements: Vec<ConfigElement>,
}

impl ConfigDocument {
    /// Build a document from already constructed elements, validating
    /// global names.
    pub fn new(elements: Vec<ConfigElement>) -> Result<Self, ConfigError> {
        validate_names(&elements)?;
        Ok(Self {
            properties: IndexMap::new(),
            elements,
        })
    }

    pub fn elements(&self) -> &[ConfigElement] {
        &self.elements
    }

    pub fn properties(&self) -> &IndexMap<String, String> {
        &self.properties
    }

    /// Top-level element with the given global name.
    pub fn global(&self, name: &str) -> Option<&ConfigElement> {
        self.elements.iter().find(|e| e.name() == Some(name))
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Load a configuration document from a YAML file.
///
/// `${key}` placeholders in attributes and text are replaced from the
/// document's `properties` section, then from the process environment.
///
/// # Example
/// ```ignore
/// let document = mediate::config::load_config_file("config/flows.yaml")?;
/// let listener = document.global("orders-listener").unwrap();
/// ```
pub fn load_config_file<P: AsRef<Path>>(path: P) -> Result<ConfigDocument, Error> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ModelError::Io {
        path: path.display().to_string(),
        source,
    })?;
    load_config_str(&contents, &path.display().to_string())
}

/// Load a configuration document from YAML text. `origin` names the source
/// in errors.
pub fn load_config_str(contents: &str, origin: &str) -> Result<ConfigDocument, Error> {
    let definition: DocumentDefinition =
        serde_yaml::from_str(contents).map_err(|e| ModelError::Yaml {
            path: origin.to_string(),
            message: e.to_string(),
        })?;

    let mut properties = IndexMap::new();
    for (key, value) in &definition.properties {
        properties.insert(scalar_text(key, origin)?, scalar_text(value, origin)?);
    }

    let mut elements = definition
        .elements
        .into_iter()
        .map(|element| build_element(element, origin))
        .collect::<Result<Vec<_>, _>>()?;

    for element in &mut elements {
        element.try_map_strings(&mut |value| resolve_placeholders(value, &properties))?;
    }
    validate_names(&elements)?;

    tracing::debug!(origin, elements = elements.len(), "loaded configuration");
    Ok(ConfigDocument {
        properties,
        elements,
    })
}

fn build_element(definition: ElementDefinition, origin: &str) -> Result<ConfigElement, ModelError> {
    let mut builder = ConfigElement::builder(definition.identifier);
    if let Some(namespace) = definition.namespace {
        builder = builder.namespace(namespace);
    }
    for (key, value) in &definition.attributes {
        builder = builder.attribute(scalar_text(key, origin)?, scalar_text(value, origin)?);
    }
    for child in definition.children {
        builder = builder.child(build_element(child, origin)?);
    }
    if let Some(text) = definition.text {
        builder = builder.text(text);
    }
    Ok(builder.build())
}

/// Attributes are plain text; YAML scalars are taken as written.
fn scalar_text(value: &serde_yaml::Value, origin: &str) -> Result<String, ModelError> {
    match value {
        serde_yaml::Value::String(s) => Ok(s.clone()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Null => Ok(String::new()),
        other => Err(ModelError::Yaml {
            path: origin.to_string(),
            message: format!("expected a scalar attribute value, got {:?}", other),
        }),
    }
}

fn resolve_placeholders(
    value: &str,
    properties: &IndexMap<String, String>,
) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_string());
    }

    let mut resolved = String::with_capacity(value.len());
    let mut last = 0;
    for captures in PLACEHOLDER.captures_iter(value) {
        let (Some(whole), Some(key)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let key = key.as_str().trim();
        let replacement = match properties.get(key) {
            Some(property) => property.clone(),
            None => std::env::var(key).map_err(|_| ConfigError::UnresolvedPlaceholder(key.to_string()))?,
        };
        resolved.push_str(&value[last..whole.start()]);
        resolved.push_str(&replacement);
        last = whole.end();
    }
    resolved.push_str(&value[last..]);
    Ok(resolved)
}

/// Global names are unique and only top-level elements carry one.
fn validate_names(elements: &[ConfigElement]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for element in elements {
        if let Some(name) = element.name() {
            if !seen.insert(name) {
                return Err(ConfigError::DuplicateGlobalName(name.to_string()));
            }
        }
        for child in element.children() {
            reject_nested_names(child)?;
        }
    }
    Ok(())
}

fn reject_nested_names(element: &ConfigElement) -> Result<(), ConfigError> {
    if let Some(name) = element.attribute(NAME_ATTRIBUTE) {
        return Err(ConfigError::NameOnNestedElement {
            identifier: element.qualified_identifier(),
            name: name.to_string(),
        });
    }
    element.children().iter().try_for_each(reject_nested_names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_load_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("flows.yaml");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(
            br#"
properties:
  http.port: 8081
elements:
  - identifier: listener-config
    namespace: http
    attributes:
      name: listener
      port: "${http.port}"
      secure: false
    children:
      - identifier: headers
        children:
          - identifier: header
            attributes:
              key: Accept
              value: application/json
"#,
        )
        .unwrap();

        let document = load_config_file(&path).unwrap();
        assert_eq!(document.len(), 1);

        let listener = document.global("orders-listener").unwrap();
        assert_eq!(listener.qualified_identifier(), "http:listener-config");
        assert_eq!(listener.attribute("port"), Some("8081"));
        assert_eq!(listener.attribute("secure"), Some("false"));

        let header = listener.child("headers").and_then(|h| h.child("header")).unwrap();
        assert_eq!(header.attribute("value"), Some("application/json"));
    }

    #[test]
    fn test_unresolved_placeholder() {
        let err = load_config_str(
            r#"
elements:
  - identifier: request
    attributes:
      path: "${mediate.test.surely.undefined}"
"#,
            "inline",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::UnresolvedPlaceholder(ref key)) if key == "mediate.test.surely.undefined"
        ));
    }

    #[test]
    fn test_duplicate_global_names() {
        let err = load_config_str(
            r#"
elements:
  - identifier: config
    attributes: { name: shared }
  - identifier: request
    attributes: { name: shared }
"#,
            "inline",
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::DuplicateGlobalName(ref n)) if n == "shared"));
    }

    #[test]
    fn test_name_on_nested_element() {
        let nested = ConfigElement::builder("child").attribute("name", "inner").build();
        let top = ConfigElement::builder("config").child(nested).build();
        assert_eq!(
            ConfigDocument::new(vec![top]).unwrap_err(),
            ConfigError::NameOnNestedElement {
                identifier: "child".to_string(),
                name: "inner".to_string(),
            }
        );
    }

    #[test]
    fn test_placeholders_keep_surrounding_text() {
        let mut properties = IndexMap::new();
        properties.insert("host".to_string(), "localhost".to_string());
        properties.insert("port".to_string(), "80".to_string());
        assert_eq!(
            resolve_placeholders("http://${host}:${port}/api", &properties).unwrap(),
            "http://localhost:80/api"
        );
        assert_eq!(resolve_placeholders("#[payload]", &properties).unwrap(), "#[payload]");
    }

    #[test]
    fn test_invalid_yaml() {
        let err = load_config_str("elements: [", "broken.yaml").unwrap_err();
        assert!(matches!(err, Error::Model(ModelError::Yaml { ref path, .. }) if path == "broken.yaml"));
    }
}
