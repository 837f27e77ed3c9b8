//! Optional memo of resolved references.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use ghcore_entities::EntityObject;

use crate::category::LinkCategory;

/// A reference resolves the same way for the same text in the same repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub category: LinkCategory,
    pub text: String,
    pub repo_id: Option<String>,
}

pub trait ResolutionCache: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<EntityObject>;

    fn put(&self, key: CacheKey, entity: EntityObject);
}

#[derive(Default)]
struct Entries {
    map: HashMap<CacheKey, EntityObject>,
    order: VecDeque<CacheKey>,
}

/// In-memory cache holding at most `capacity` entries, evicting the oldest
/// insertion first.
pub struct BoundedCache {
    capacity: usize,
    entries: Mutex<Entries>,
}

impl BoundedCache {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(Entries::default()),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |entries| entries.map.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResolutionCache for BoundedCache {
    fn get(&self, key: &CacheKey) -> Option<EntityObject> {
        self.entries.lock().ok()?.map.get(key).cloned()
    }

    fn put(&self, key: CacheKey, entity: EntityObject) {
        if self.capacity == 0 {
            return;
        }
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };
        if entries.map.insert(key.clone(), entity).is_some() {
            return;
        }
        entries.order.push_back(key);
        while entries.order.len() > self.capacity {
            if let Some(oldest) = entries.order.pop_front() {
                entries.map.remove(&oldest);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use ghcore_entities::{FieldScope, InitMode};

    use super::*;

    fn key(text: &str) -> CacheKey {
        CacheKey {
            category: LinkCategory::Actor,
            text: text.to_string(),
            repo_id: None,
        }
    }

    #[expect(clippy::expect_used, reason = "Built-in type")]
    fn actor() -> EntityObject {
        EntityObject::new("Actor", InitMode::BuildId, FieldScope::Identifying)
            .expect("Actor is a known type")
    }

    #[test]
    fn evicts_oldest_first() {
        let cache = BoundedCache::new(2);
        cache.put(key("@a"), actor());
        cache.put(key("@b"), actor());
        cache.put(key("@c"), actor());

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&key("@a")).is_none());
        assert!(cache.get(&key("@b")).is_some());
        assert!(cache.get(&key("@c")).is_some());
    }

    #[test]
    fn reinserting_does_not_grow() {
        let cache = BoundedCache::new(2);
        cache.put(key("@a"), actor());
        cache.put(key("@a"), actor());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn zero_capacity_stores_nothing() {
        let cache = BoundedCache::new(0);
        cache.put(key("@a"), actor());
        assert!(cache.is_empty());
    }
}
