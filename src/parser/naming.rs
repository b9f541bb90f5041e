//! Naming conventions for configuration elements.

use convert_case::{Case, Casing};

const IRREGULAR: &[(&str, &str)] = &[
    ("child", "children"),
    ("person", "people"),
    ("man", "men"),
    ("woman", "women"),
    ("index", "indices"),
];

const UNCOUNTABLE: &[&str] = &["data", "metadata", "information", "equipment", "series", "news"];

/// `maxRetries` -> `max-retries`
pub fn hyphenize(name: &str) -> String {
    name.to_case(Case::Kebab)
}

/// Plural of the last word of `name`, keeping its casing style.
pub fn pluralize(name: &str) -> String {
    inflect_last_word(name, pluralize_word)
}

/// Singular of the last word of `name`, keeping its casing style.
pub fn singularize(name: &str) -> String {
    inflect_last_word(name, singularize_word)
}

fn inflect_last_word(name: &str, inflect: fn(&str) -> String) -> String {
    let split = name
        .char_indices()
        .rev()
        .find(|(i, c)| *c == '-' || *c == '_' || (c.is_uppercase() && *i > 0))
        .map(|(i, c)| if c.is_uppercase() { i } else { i + c.len_utf8() })
        .unwrap_or(0);

    let (head, word) = name.split_at(split);
    let lower = word.to_lowercase();
    let inflected = inflect(&lower);
    if lower == inflected {
        return name.to_string();
    }

    // Keep a leading capital, as in `maxRetry` -> `maxRetries`
    let mut chars = inflected.chars();
    let word = match (word.chars().next(), chars.next()) {
        (Some(first), Some(inflected_first)) if first.is_uppercase() => {
            inflected_first.to_uppercase().chain(chars).collect()
        }
        _ => inflected,
    };
    format!("{}{}", head, word)
}

fn pluralize_word(word: &str) -> String {
    if word.is_empty() || UNCOUNTABLE.contains(&word) {
        return word.to_string();
    }
    if let Some((_, plural)) = IRREGULAR.iter().find(|(singular, _)| *singular == word) {
        return plural.to_string();
    }
    if IRREGULAR.iter().any(|(_, plural)| *plural == word) {
        return word.to_string();
    }
    if let Some(stem) = word.strip_suffix('y') {
        if !stem.ends_with(['a', 'e', 'i', 'o', 'u']) {
            return format!("{}ies", stem);
        }
    }
    if ["ss", "us", "x", "z", "ch", "sh"].iter().any(|suffix| word.ends_with(suffix)) {
        return format!("{}es", word);
    }
    // Already plural
    if word.ends_with('s') {
        return word.to_string();
    }
    format!("{}s", word)
}

fn singularize_word(word: &str) -> String {
    if word.is_empty() || UNCOUNTABLE.contains(&word) {
        return word.to_string();
    }
    if let Some((singular, _)) = IRREGULAR.iter().find(|(_, plural)| *plural == word) {
        return singular.to_string();
    }
    if let Some(stem) = word.strip_suffix("ies") {
        return format!("{}y", stem);
    }
    if let Some(stem) = word.strip_suffix("es") {
        if ["s", "x", "z", "ch", "sh"].iter().any(|suffix| stem.ends_with(suffix)) {
            return stem.to_string();
        }
    }
    if word.ends_with("ss") || word.ends_with("us") || word.ends_with("is") {
        return word.to_string();
    }
    match word.strip_suffix('s') {
        Some(stem) => stem.to_string(),
        None => word.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hyphenize() {
        assert_eq!(hyphenize("maxRetries"), "max-retries");
        assert_eq!(hyphenize("headers"), "headers");
        assert_eq!(hyphenize("connection_timeout"), "connection-timeout");
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("header"), "headers");
        assert_eq!(pluralize("entry"), "entries");
        assert_eq!(pluralize("key"), "keys");
        assert_eq!(pluralize("address"), "addresses");
        assert_eq!(pluralize("child"), "children");
        assert_eq!(pluralize("headers"), "headers");
        assert_eq!(pluralize("queryParam"), "queryParams");
        assert_eq!(pluralize("retry-policy"), "retry-policies");
    }

    #[test]
    fn test_singularize() {
        assert_eq!(singularize("headers"), "header");
        assert_eq!(singularize("entries"), "entry");
        assert_eq!(singularize("addresses"), "address");
        assert_eq!(singularize("boxes"), "box");
        assert_eq!(singularize("children"), "child");
        assert_eq!(singularize("status"), "status");
        assert_eq!(singularize("data"), "data");
        assert_eq!(singularize("queryParams"), "queryParam");
        assert_eq!(singularize("retryPolicies"), "retryPolicy");
    }
}
