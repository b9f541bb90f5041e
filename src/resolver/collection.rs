use indexmap::IndexSet;

use crate::error::{ConfigError, ResolutionError};
use crate::runtime::ResolvingContext;
use crate::types::{self, MapKind, TypeKind, TypeRef};
use crate::value::{MapValue, Value};

use super::{any_dynamic, ResolverRef, ValueResolver};

/// Resolves each item and assembles them into the declared collection type.
#[derive(Debug, Clone)]
pub struct CollectionValueResolver {
    collection_type: TypeRef,
    items: Vec<ResolverRef>,
}

impl CollectionValueResolver {
    /// # Errors
    ///
    /// `NotACollectionType` when `collection_type` is not a list or set type.
    pub fn new(collection_type: &TypeRef, items: Vec<ResolverRef>) -> Result<Self, ConfigError> {
        if !collection_type.is_collection() {
            return Err(ConfigError::NotACollectionType(
                collection_type.name().to_string(),
            ));
        }
        Ok(Self {
            collection_type: collection_type.clone(),
            items,
        })
    }

    /// Resolves into an `ArrayList`.
    pub fn list(items: Vec<ResolverRef>) -> Self {
        Self {
            collection_type: types::ARRAY_LIST.clone(),
            items,
        }
    }

    /// Resolves into a `HashSet`.
    pub fn set(items: Vec<ResolverRef>) -> Self {
        Self {
            collection_type: types::HASH_SET.clone(),
            items,
        }
    }

    pub fn collection_type(&self) -> &TypeRef {
        &self.collection_type
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl ValueResolver for CollectionValueResolver {
    fn resolve(&self, ctx: &ResolvingContext<'_>) -> Result<Value, ResolutionError> {
        let values = self
            .items
            .iter()
            .map(|item| item.resolve(ctx))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(match self.collection_type.kind() {
            TypeKind::Set => Value::Set(values.into_iter().collect::<IndexSet<_>>()),
            _ => Value::List(values),
        })
    }

    fn is_dynamic(&self) -> bool {
        any_dynamic(&self.items)
    }
}

/// Resolves parallel key and value resolvers into the declared map type.
#[derive(Debug, Clone)]
pub struct MapValueResolver {
    map_type: TypeRef,
    kind: MapKind,
    keys: Vec<ResolverRef>,
    values: Vec<ResolverRef>,
}

impl MapValueResolver {
    /// # Errors
    ///
    /// `NotAMapType` when `map_type` is not a map type,
    /// `MismatchedMapEntries` when `keys` and `values` differ in length.
    pub fn new(
        map_type: &TypeRef,
        keys: Vec<ResolverRef>,
        values: Vec<ResolverRef>,
    ) -> Result<Self, ConfigError> {
        let kind = map_type
            .map_kind()
            .ok_or_else(|| ConfigError::NotAMapType(map_type.name().to_string()))?;
        if keys.len() != values.len() {
            return Err(ConfigError::MismatchedMapEntries {
                keys: keys.len(),
                values: values.len(),
            });
        }
        Ok(Self {
            map_type: map_type.clone(),
            kind,
            keys,
            values,
        })
    }

    /// Map of the concrete type for `kind`, built from key/value pairs.
    pub fn from_pairs(kind: MapKind, pairs: Vec<(ResolverRef, ResolverRef)>) -> Self {
        let map_type = match kind {
            MapKind::Hash => types::HASH_MAP.clone(),
            MapKind::Ordered => types::LINKED_HASH_MAP.clone(),
            MapKind::Concurrent => types::CONCURRENT_HASH_MAP.clone(),
        };
        let (keys, values) = pairs.into_iter().unzip();
        Self {
            map_type,
            kind,
            keys,
            values,
        }
    }

    pub fn map_type(&self) -> &TypeRef {
        &self.map_type
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl ValueResolver for MapValueResolver {
    fn resolve(&self, ctx: &ResolvingContext<'_>) -> Result<Value, ResolutionError> {
        let mut map = MapValue::new(self.kind);
        for (key, value) in self.keys.iter().zip(&self.values) {
            map.insert(key.resolve(ctx)?, value.resolve(ctx)?);
        }
        Ok(Value::Map(map))
    }

    fn is_dynamic(&self) -> bool {
        any_dynamic(&self.keys) || any_dynamic(&self.values)
    }
}
