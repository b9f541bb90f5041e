//! Nominal type descriptors.
//!
//! A [`TypeRef`] plays the role a class object plays in a reflective runtime:
//! it is compared by identity, knows its supertypes, and carries enough
//! shape information (collection/map kind, declared element type, pojo fields,
//! proxy interfaces) for data types and resolvers to reason about it.

pub mod proxy;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use convert_case::{Case, Casing};
use indexmap::IndexMap;
use once_cell::sync::Lazy;

use crate::value::Value;

pub use proxy::{is_proxy_type, normalize_proxy};

/// Concrete map flavour produced when a map value is assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapKind {
    /// Hash based, no iteration order guarantee.
    Hash,
    /// Insertion ordered.
    Ordered,
    /// Safe for concurrent access.
    Concurrent,
}

/// Shape of a nominal type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Plain,
    /// Sequence collections (lists and generic collection interfaces).
    List,
    Set,
    Map(MapKind),
    Function,
}

/// Declared field of a pojo type.
#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub name: String,
    pub alias: Option<String>,
    pub type_ref: TypeRef,
    pub default: Option<Value>,
}

impl FieldInfo {
    pub fn new(name: impl Into<String>, type_ref: &TypeRef) -> Self {
        Self {
            name: name.into(),
            alias: None,
            type_ref: type_ref.clone(),
            default: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Name or alias match, aliases win when both are declared.
    pub fn answers_to(&self, key: &str) -> bool {
        self.alias.as_deref() == Some(key) || self.name == key
    }
}

/// The descriptor behind a [`TypeRef`].
#[derive(Debug)]
pub struct TypeInfo {
    name: String,
    kind: TypeKind,
    is_abstract: bool,
    supertypes: Vec<TypeRef>,
    element_type: Option<TypeRef>,
    fields: Vec<FieldInfo>,
    proxy_interfaces: Vec<TypeRef>,
}

/// Identity-compared handle to a [`TypeInfo`].
#[derive(Clone)]
pub struct TypeRef(Arc<TypeInfo>);

impl TypeRef {
    pub fn builder(name: impl Into<String>) -> TypeBuilder {
        TypeBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn kind(&self) -> TypeKind {
        self.0.kind
    }

    pub fn is_abstract(&self) -> bool {
        self.0.is_abstract
    }

    pub fn supertypes(&self) -> &[TypeRef] {
        &self.0.supertypes
    }

    /// Declared generic element type, for collection classes that fix one.
    pub fn element_type(&self) -> Option<&TypeRef> {
        self.0.element_type.as_ref()
    }

    pub fn fields(&self) -> &[FieldInfo] {
        &self.0.fields
    }

    /// Field lookup by name or alias.
    pub fn field(&self, key: &str) -> Option<&FieldInfo> {
        self.0.fields.iter().find(|f| f.answers_to(key))
    }

    pub fn proxy_interfaces(&self) -> &[TypeRef] {
        &self.0.proxy_interfaces
    }

    pub fn is_collection(&self) -> bool {
        matches!(self.0.kind, TypeKind::List | TypeKind::Set)
    }

    pub fn is_map(&self) -> bool {
        matches!(self.0.kind, TypeKind::Map(_))
    }

    pub fn map_kind(&self) -> Option<MapKind> {
        match self.0.kind {
            TypeKind::Map(kind) => Some(kind),
            _ => None,
        }
    }

    /// Whether a value of type `other` can be used where `self` is expected.
    ///
    /// The universal [`OBJECT`] type accepts everything.
    pub fn is_assignable_from(&self, other: &TypeRef) -> bool {
        if self == other || *self == *OBJECT {
            return true;
        }
        other
            .supertypes()
            .iter()
            .any(|parent| self.is_assignable_from(parent))
    }

    pub(crate) fn ptr(&self) -> *const TypeInfo {
        Arc::as_ptr(&self.0)
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for TypeRef {}

impl Hash for TypeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.ptr() as usize).hash(state);
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeRef({})", self.0.name)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.name)
    }
}

/// Builder for user defined types.
#[derive(Debug)]
pub struct TypeBuilder {
    info: TypeInfo,
}

impl TypeBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            info: TypeInfo {
                name: name.into(),
                kind: TypeKind::Plain,
                is_abstract: false,
                supertypes: Vec::new(),
                element_type: None,
                fields: Vec::new(),
                proxy_interfaces: Vec::new(),
            },
        }
    }

    pub fn kind(mut self, kind: TypeKind) -> Self {
        self.info.kind = kind;
        self
    }

    pub fn abstract_type(mut self) -> Self {
        self.info.is_abstract = true;
        self
    }

    pub fn extends(mut self, parent: &TypeRef) -> Self {
        self.info.supertypes.push(parent.clone());
        self
    }

    pub fn element_type(mut self, element: &TypeRef) -> Self {
        self.info.element_type = Some(element.clone());
        self
    }

    pub fn field(mut self, field: FieldInfo) -> Self {
        self.info.fields.push(field);
        self
    }

    /// Mark the type as a dynamic proxy implementing `interfaces`.
    ///
    /// Proxies are assignable to each of their interfaces.
    pub fn proxy_of(mut self, interfaces: &[TypeRef]) -> Self {
        for interface in interfaces {
            self.info.proxy_interfaces.push(interface.clone());
            self.info.supertypes.push(interface.clone());
        }
        self
    }

    pub fn build(self) -> TypeRef {
        TypeRef(Arc::new(self.info))
    }
}

fn builtin(name: &str, kind: TypeKind, parents: &[&TypeRef]) -> TypeRef {
    let mut builder = TypeRef::builder(name).kind(kind);
    for parent in parents {
        builder = builder.extends(parent);
    }
    builder.build()
}

fn builtin_abstract(name: &str, kind: TypeKind, parents: &[&TypeRef]) -> TypeRef {
    let mut builder = TypeRef::builder(name).kind(kind).abstract_type();
    for parent in parents {
        builder = builder.extends(parent);
    }
    builder.build()
}

pub static OBJECT: Lazy<TypeRef> = Lazy::new(|| builtin("Object", TypeKind::Plain, &[]));
pub static STRING: Lazy<TypeRef> = Lazy::new(|| builtin("String", TypeKind::Plain, &[]));
pub static BOOLEAN: Lazy<TypeRef> = Lazy::new(|| builtin("Boolean", TypeKind::Plain, &[]));
pub static NUMBER: Lazy<TypeRef> =
    Lazy::new(|| builtin_abstract("Number", TypeKind::Plain, &[]));
pub static INTEGER: Lazy<TypeRef> =
    Lazy::new(|| builtin("Integer", TypeKind::Plain, &[&*NUMBER]));
pub static LONG: Lazy<TypeRef> = Lazy::new(|| builtin("Long", TypeKind::Plain, &[&*NUMBER]));
pub static DOUBLE: Lazy<TypeRef> = Lazy::new(|| builtin("Double", TypeKind::Plain, &[&*NUMBER]));
pub static BYTES: Lazy<TypeRef> = Lazy::new(|| builtin("Bytes", TypeKind::Plain, &[]));
pub static DATE: Lazy<TypeRef> = Lazy::new(|| builtin("Date", TypeKind::Plain, &[]));
pub static DATE_TIME: Lazy<TypeRef> = Lazy::new(|| builtin("DateTime", TypeKind::Plain, &[]));

pub static ITERABLE: Lazy<TypeRef> =
    Lazy::new(|| builtin_abstract("Iterable", TypeKind::List, &[]));
pub static COLLECTION: Lazy<TypeRef> =
    Lazy::new(|| builtin_abstract("Collection", TypeKind::List, &[&*ITERABLE]));
pub static LIST: Lazy<TypeRef> =
    Lazy::new(|| builtin_abstract("List", TypeKind::List, &[&*COLLECTION]));
pub static SET: Lazy<TypeRef> =
    Lazy::new(|| builtin_abstract("Set", TypeKind::Set, &[&*COLLECTION]));
pub static ARRAY_LIST: Lazy<TypeRef> =
    Lazy::new(|| builtin("ArrayList", TypeKind::List, &[&*LIST]));
pub static HASH_SET: Lazy<TypeRef> = Lazy::new(|| builtin("HashSet", TypeKind::Set, &[&*SET]));

pub static MAP: Lazy<TypeRef> =
    Lazy::new(|| builtin_abstract("Map", TypeKind::Map(MapKind::Hash), &[]));
pub static ORDERED_MAP: Lazy<TypeRef> =
    Lazy::new(|| builtin_abstract("OrderedMap", TypeKind::Map(MapKind::Ordered), &[&*MAP]));
pub static CONCURRENT_MAP: Lazy<TypeRef> = Lazy::new(|| {
    builtin_abstract("ConcurrentMap", TypeKind::Map(MapKind::Concurrent), &[&*MAP])
});
pub static HASH_MAP: Lazy<TypeRef> =
    Lazy::new(|| builtin("HashMap", TypeKind::Map(MapKind::Hash), &[&*MAP]));
pub static LINKED_HASH_MAP: Lazy<TypeRef> = Lazy::new(|| {
    builtin(
        "LinkedHashMap",
        TypeKind::Map(MapKind::Ordered),
        &[&*HASH_MAP, &*ORDERED_MAP],
    )
});
pub static CONCURRENT_HASH_MAP: Lazy<TypeRef> = Lazy::new(|| {
    builtin(
        "ConcurrentHashMap",
        TypeKind::Map(MapKind::Concurrent),
        &[&*CONCURRENT_MAP],
    )
});

pub static FUNCTION: Lazy<TypeRef> =
    Lazy::new(|| builtin_abstract("Function", TypeKind::Function, &[]));
pub static EVENT: Lazy<TypeRef> = Lazy::new(|| builtin("Event", TypeKind::Plain, &[]));
pub static MESSAGE: Lazy<TypeRef> = Lazy::new(|| builtin("Message", TypeKind::Plain, &[]));
pub static DATA_TYPE: Lazy<TypeRef> = Lazy::new(|| builtin("DataType", TypeKind::Plain, &[]));

/// Name based lookup of known types.
///
/// Keys are normalized to snake_case so `DateTime`, `dateTime` and
/// `date_time` all find the same type.
#[derive(Debug, Clone)]
pub struct TypeCatalog {
    types: IndexMap<String, TypeRef>,
}

impl TypeCatalog {
    /// Create a catalog pre-populated with the built-in types.
    pub fn new() -> Self {
        let mut catalog = Self {
            types: IndexMap::new(),
        };
        let builtins: [&TypeRef; 26] = [
            &*OBJECT,
            &*STRING,
            &*BOOLEAN,
            &*NUMBER,
            &*INTEGER,
            &*LONG,
            &*DOUBLE,
            &*BYTES,
            &*DATE,
            &*DATE_TIME,
            &*ITERABLE,
            &*COLLECTION,
            &*LIST,
            &*SET,
            &*ARRAY_LIST,
            &*HASH_SET,
            &*MAP,
            &*ORDERED_MAP,
            &*CONCURRENT_MAP,
            &*HASH_MAP,
            &*LINKED_HASH_MAP,
            &*CONCURRENT_HASH_MAP,
            &*FUNCTION,
            &*EVENT,
            &*MESSAGE,
            &*DATA_TYPE,
        ];
        for type_ref in builtins {
            catalog.register(type_ref.clone());
        }
        catalog.alias("int", &*INTEGER);
        catalog.alias("bool", &*BOOLEAN);
        catalog.alias("float", &*DOUBLE);
        catalog.alias("binary", &*BYTES);
        catalog
    }

    /// Register a type under its own name, replacing any previous entry.
    pub fn register(&mut self, type_ref: TypeRef) {
        let key = Self::normalize(type_ref.name());
        self.types.insert(key, type_ref);
    }

    pub fn alias(&mut self, alias: &str, type_ref: &TypeRef) {
        self.types.insert(Self::normalize(alias), type_ref.clone());
    }

    pub fn get(&self, name: &str) -> Option<&TypeRef> {
        self.types.get(&Self::normalize(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    fn normalize(name: &str) -> String {
        name.trim().to_case(Case::Snake)
    }
}

impl Default for TypeCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_equality() {
        let a = TypeRef::builder("Person").build();
        let b = TypeRef::builder("Person").build();

        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_assignability() {
        assert!(OBJECT.is_assignable_from(&STRING));
        assert!(NUMBER.is_assignable_from(&INTEGER));
        assert!(!INTEGER.is_assignable_from(&NUMBER));
        assert!(COLLECTION.is_assignable_from(&ARRAY_LIST));
        assert!(ITERABLE.is_assignable_from(&HASH_SET));
        assert!(!LIST.is_assignable_from(&HASH_SET));
        assert!(MAP.is_assignable_from(&LINKED_HASH_MAP));
        assert!(ORDERED_MAP.is_assignable_from(&LINKED_HASH_MAP));
        assert!(!ORDERED_MAP.is_assignable_from(&HASH_MAP));
    }

    #[test]
    fn test_collection_and_map_shapes() {
        assert!(LIST.is_collection());
        assert!(HASH_SET.is_collection());
        assert!(!MAP.is_collection());
        assert_eq!(CONCURRENT_HASH_MAP.map_kind(), Some(MapKind::Concurrent));
        assert_eq!(STRING.map_kind(), None);
    }

    #[test]
    fn test_field_lookup_by_alias() {
        let person = TypeRef::builder("Person")
            .field(FieldInfo::new("firstName", &STRING).with_alias("first-name"))
            .field(FieldInfo::new("age", &INTEGER))
            .build();

        assert_eq!(person.field("first-name").map(|f| f.name.as_str()), Some("firstName"));
        assert_eq!(person.field("firstName").map(|f| f.name.as_str()), Some("firstName"));
        assert!(person.field("lastName").is_none());
    }

    #[test]
    fn test_catalog_normalizes_names() {
        let mut catalog = TypeCatalog::new();
        assert_eq!(catalog.get("DateTime"), Some(&*DATE_TIME));
        assert_eq!(catalog.get("date_time"), Some(&*DATE_TIME));
        assert_eq!(catalog.get("int"), Some(&*INTEGER));

        let address = TypeRef::builder("Address").build();
        catalog.register(address.clone());
        assert_eq!(catalog.get("address"), Some(&address));
        assert!(!catalog.contains("Unknown"));
    }
}
