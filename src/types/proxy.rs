//! Proxy type classification.
//!
//! Data types never describe a dynamic proxy itself, they describe the first
//! interface the proxy implements. Classification results are cached per type
//! name. The cache holds the classified type weakly so that a different type
//! object registered under the same name (two isolated modules loading the
//! same class) is detected and never served a stale answer.

use std::sync::{Arc, Weak};

use dashmap::DashMap;
use once_cell::sync::Lazy;

use super::{TypeInfo, TypeRef};

struct ProxyIndicator {
    target: Weak<TypeInfo>,
    is_proxy: bool,
}

static PROXY_CLASS_CACHE: Lazy<DashMap<String, ProxyIndicator>> = Lazy::new(DashMap::new);

/// Whether `type_ref` is a dynamic proxy type.
pub fn is_proxy_type(type_ref: &TypeRef) -> bool {
    let cached = PROXY_CLASS_CACHE.get(type_ref.name()).map(|indicator| {
        match indicator.target.upgrade() {
            Some(target) if Arc::ptr_eq(&target, &type_ref.0) => Some(indicator.is_proxy),
            // Same name, different type object: classify without the cache
            Some(_) => Some(classify(type_ref)),
            None => None,
        }
    });

    if let Some(Some(is_proxy)) = cached {
        return is_proxy;
    }

    // Either nothing is cached or the cached type is gone
    let is_proxy = classify(type_ref);
    PROXY_CLASS_CACHE.insert(
        type_ref.name().to_string(),
        ProxyIndicator {
            target: Arc::downgrade(&type_ref.0),
            is_proxy,
        },
    );
    is_proxy
}

/// Replace a proxy type by the first interface it implements.
pub fn normalize_proxy(type_ref: &TypeRef) -> TypeRef {
    if is_proxy_type(type_ref) {
        if let Some(interface) = type_ref.proxy_interfaces().first() {
            return interface.clone();
        }
    }
    type_ref.clone()
}

fn classify(type_ref: &TypeRef) -> bool {
    !type_ref.proxy_interfaces().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TypeRef, LIST, STRING};

    #[test]
    fn test_plain_type_is_not_proxy() {
        assert!(!is_proxy_type(&STRING));
        assert_eq!(normalize_proxy(&STRING), *STRING);
    }

    #[test]
    fn test_proxy_normalizes_to_first_interface() {
        let proxy = TypeRef::builder("$Proxy12").proxy_of(&[LIST.clone()]).build();

        assert!(is_proxy_type(&proxy));
        // second call is served from the cache
        assert!(is_proxy_type(&proxy));
        assert_eq!(normalize_proxy(&proxy), *LIST);
    }

    #[test]
    fn test_duplicate_names_are_classified_independently() {
        let plain = TypeRef::builder("com.acme.Duplicated").build();
        let proxy = TypeRef::builder("com.acme.Duplicated")
            .proxy_of(&[STRING.clone()])
            .build();

        assert!(!is_proxy_type(&plain));
        assert!(is_proxy_type(&proxy));
        assert!(!is_proxy_type(&plain));
    }

    #[test]
    fn test_dropped_type_entry_is_replaced() {
        {
            let transient = TypeRef::builder("com.acme.Transient").build();
            assert!(!is_proxy_type(&transient));
        }
        let replacement = TypeRef::builder("com.acme.Transient")
            .proxy_of(&[STRING.clone()])
            .build();
        assert!(is_proxy_type(&replacement));
        assert!(is_proxy_type(&replacement));
    }
}
