//! Internal field path to JSON key path mapping
//!
//! Rule violations are reported against internal field paths such as
//! `Address.City`; clients only know the JSON keys they sent
//! (`address.city`). The mapper derives that translation from a type's
//! schema once and memoizes it per type.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use crate::cache::{LimitedCache, DEFAULT_CACHE_CAPACITY};
use crate::schema::{TypeSchema, Validatable};
use crate::DEFAULT_MAX_DEPTH;

/// Internal dotted path -> external dotted JSON path
pub type FieldPathMap = HashMap<String, String>;

/// Cache of field path maps keyed by type identity
pub type FieldPathCache = LimitedCache<TypeId, Arc<FieldPathMap>>;

/// Builds and memoizes field path maps
#[derive(Clone)]
pub struct FieldPathMapper {
    cache: Arc<FieldPathCache>,
}

impl FieldPathMapper {
    pub fn new(cache: Arc<FieldPathCache>) -> Self {
        Self { cache }
    }

    /// Field path map for `T`, built on first use
    pub fn get_or_build<T: Validatable>(&self) -> Arc<FieldPathMap> {
        self.get_or_build_for(TypeId::of::<T>(), T::schema())
    }

    /// Field path map for the type identified by `type_id`
    ///
    /// `schema` must be the schema of that type; it is only read on a cache miss.
    pub fn get_or_build_for(&self, type_id: TypeId, schema: &TypeSchema) -> Arc<FieldPathMap> {
        if let Some(map) = self.cache.load(&type_id) {
            return map;
        }

        let map = Arc::new(build_field_map(schema));
        log::debug!(
            "Built field path map for {} ({} entries)",
            schema.name(),
            map.len()
        );
        self.cache.store(type_id, Arc::clone(&map));
        map
    }

    pub fn cache(&self) -> &Arc<FieldPathCache> {
        &self.cache
    }
}

impl Default for FieldPathMapper {
    fn default() -> Self {
        Self::new(Arc::new(FieldPathCache::new(DEFAULT_CACHE_CAPACITY)))
    }
}

/// Build the field path map of a schema without caching
pub fn build_field_map(schema: &TypeSchema) -> FieldPathMap {
    let mut map = FieldPathMap::new();
    collect_paths(schema, "", "", 0, &mut map);
    map
}

fn collect_paths(schema: &TypeSchema, parent_key: &str, parent_tag: &str, depth: usize, map: &mut FieldPathMap) {
    if depth > DEFAULT_MAX_DEPTH {
        log::warn!(
            "Field path mapping of {} stopped at depth {}",
            schema.name(),
            depth
        );
        return;
    }

    for field in schema.fields() {
        let key = join(parent_key, field.name());
        let tag_path = join(parent_tag, &field.external_name());

        map.insert(key.clone(), tag_path.clone());

        let Some(nested) = field.field_type().object_schema() else {
            continue;
        };

        if field.is_embedded() {
            // embedded sub-fields live at the parent's JSON level
            collect_paths(nested, &key, parent_tag, depth + 1, map);
        } else {
            collect_paths(nested, &key, &tag_path, depth + 1, map);
        }
    }
}

fn join(parent: &str, segment: &str) -> String {
    if parent.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", parent, segment)
    }
}
