//! Configuration element trees.
//!
//! A [`ConfigElement`] is one node of a component's declared configuration:
//! an identifier, string attributes, nested children and optional text.
//! Elements are immutable once built.

pub mod loader;

use indexmap::IndexMap;

pub use loader::{load_config_file, load_config_str, ConfigDocument};

/// Attribute holding an element's global name.
pub const NAME_ATTRIBUTE: &str = "name";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfigElement {
    namespace: Option<String>,
    identifier: String,
    attributes: IndexMap<String, String>,
    children: Vec<ConfigElement>,
    text: Option<String>,
}

impl ConfigElement {
    pub fn builder(identifier: impl Into<String>) -> ConfigElementBuilder {
        ConfigElementBuilder {
            element: ConfigElement {
                identifier: identifier.into(),
                ..Default::default()
            },
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn attributes(&self) -> &IndexMap<String, String> {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn children(&self) -> &[ConfigElement] {
        &self.children
    }

    /// First child with the given identifier.
    pub fn child(&self, identifier: &str) -> Option<&ConfigElement> {
        self.children.iter().find(|c| c.identifier == identifier)
    }

    pub fn children_named<'a>(&'a self, identifier: &'a str) -> impl Iterator<Item = &'a ConfigElement> + 'a {
        self.children.iter().filter(move |c| c.identifier == identifier)
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// The element's global name, if it has one.
    pub fn name(&self) -> Option<&str> {
        self.attribute(NAME_ATTRIBUTE)
    }

    /// `namespace:identifier`, or just the identifier.
    pub fn qualified_identifier(&self) -> String {
        match &self.namespace {
            Some(namespace) => format!("{}:{}", namespace, self.identifier),
            None => self.identifier.clone(),
        }
    }

    /// Rewrite every attribute value and text in the tree with `f`.
    pub(crate) fn try_map_strings<E>(
        &mut self,
        f: &mut impl FnMut(&str) -> Result<String, E>,
    ) -> Result<(), E> {
        for value in self.attributes.values_mut() {
            *value = f(value)?;
        }
        if let Some(text) = &mut self.text {
            *text = f(text)?;
        }
        for child in &mut self.children {
            child.try_map_strings(f)?;
        }
        Ok(())
    }
}

/// Builder for [`ConfigElement`]; `build` consumes it.
#[derive(Debug, Clone)]
pub struct ConfigElementBuilder {
    element: ConfigElement,
}

impl ConfigElementBuilder {
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.element.namespace = Some(namespace.into());
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.element.attributes.insert(name.into(), value.into());
        self
    }

    pub fn child(mut self, child: ConfigElement) -> Self {
        self.element.children.push(child);
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.element.text = Some(text.into());
        self
    }

    pub fn build(self) -> ConfigElement {
        self.element
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_lookups() {
        let element = ConfigElement::builder("request")
            .namespace("http")
            .attribute("name", "get-users")
            .attribute("path", "/users")
            .child(ConfigElement::builder("header").attribute("key", "a").build())
            .child(ConfigElement::builder("header").attribute("key", "b").build())
            .child(ConfigElement::builder("body").text("{}").build())
            .build();

        assert_eq!(element.qualified_identifier(), "http:request");
        assert_eq!(element.name(), Some("get-users"));
        assert_eq!(element.attribute("path"), Some("/users"));
        assert_eq!(element.attribute("missing"), None);
        assert_eq!(element.children_named("header").count(), 2);
        assert_eq!(element.child("body").and_then(|b| b.text()), Some("{}"));
        assert!(element.child("footer").is_none());
    }

    #[test]
    fn test_attributes_keep_order() {
        let element = ConfigElement::builder("config")
            .attribute("z", "1")
            .attribute("a", "2")
            .build();
        let keys: Vec<_> = element.attributes().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["z", "a"]);
    }
}
