//! Per-entity cache of the most recent full fetch.
//!
//! `replace_all` is the only mutator. A slot never mixes two fetches: the new
//! sequence swaps in whole, and anything absent from it is gone.

use crate::types::{EntityType, Record, RecordId};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Cache shared between the coordinator and readers
pub type SharedCache = Arc<RwLock<EntityCache>>;

/// Records of one entity type as returned by the last successful list call
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSlot {
    items: Arc<[Record]>,
    last_synced_at: DateTime<Utc>,
}

impl CacheSlot {
    pub fn items(&self) -> &[Record] {
        &self.items
    }

    /// Cheap handle to the records, usable after the cache lock is released
    pub fn snapshot(&self) -> Arc<[Record]> {
        Arc::clone(&self.items)
    }

    pub fn last_synced_at(&self) -> DateTime<Utc> {
        self.last_synced_at
    }
}

#[derive(Debug, Clone, Default)]
pub struct EntityCache {
    slots: HashMap<EntityType, CacheSlot>,
}

impl EntityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedCache {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Swap in a freshly fetched sequence, preserving backend order
    pub fn replace_all(&mut self, entity: EntityType, records: Vec<Record>) {
        self.replace_all_at(entity, records, Utc::now());
    }

    pub fn replace_all_at(
        &mut self,
        entity: EntityType,
        records: Vec<Record>,
        synced_at: DateTime<Utc>,
    ) {
        debug!(entity = %entity, count = records.len(), "cache replaced");
        self.slots.insert(
            entity,
            CacheSlot {
                items: records.into(),
                last_synced_at: synced_at,
            },
        );
    }

    /// Cached records; empty when nothing has been fetched yet
    pub fn get(&self, entity: EntityType) -> &[Record] {
        self.slots
            .get(&entity)
            .map(CacheSlot::items)
            .unwrap_or(&[])
    }

    pub fn slot(&self, entity: EntityType) -> Option<&CacheSlot> {
        self.slots.get(&entity)
    }

    /// Whether a fetch has ever completed for this entity type.
    /// Distinguishes "not loaded yet" from "loaded, zero records".
    pub fn is_loaded(&self, entity: EntityType) -> bool {
        self.slots.contains_key(&entity)
    }

    pub fn last_synced_at(&self, entity: EntityType) -> Option<DateTime<Utc>> {
        self.slots.get(&entity).map(CacheSlot::last_synced_at)
    }

    pub fn find_by_id(&self, entity: EntityType, id: RecordId) -> Option<&Record> {
        self.get(entity).iter().find(|r| r.id() == id)
    }

    pub fn len(&self, entity: EntityType) -> usize {
        self.get(entity).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user(id: i64, name: &str) -> Record {
        Record::from_value(EntityType::Users, json!({"userId": id, "firstName": name})).unwrap()
    }

    #[test]
    fn empty_cache_is_not_loaded() {
        let cache = EntityCache::new();
        assert!(cache.get(EntityType::Users).is_empty());
        assert!(!cache.is_loaded(EntityType::Users));
        assert!(cache.find_by_id(EntityType::Users, 1).is_none());
    }

    #[test]
    fn replace_all_swaps_whole_sequence() {
        let mut cache = EntityCache::new();
        cache.replace_all(EntityType::Users, vec![user(1, "Jo"), user(2, "Al")]);
        cache.replace_all(EntityType::Users, vec![user(3, "Bo")]);

        let ids: Vec<_> = cache.get(EntityType::Users).iter().map(Record::id).collect();
        assert_eq!(ids, vec![3]);
        assert!(cache.find_by_id(EntityType::Users, 1).is_none());
    }

    #[test]
    fn order_is_preserved() {
        let mut cache = EntityCache::new();
        cache.replace_all(EntityType::Users, vec![user(9, "Z"), user(1, "A"), user(5, "M")]);
        let ids: Vec<_> = cache.get(EntityType::Users).iter().map(Record::id).collect();
        assert_eq!(ids, vec![9, 1, 5]);
    }

    #[test]
    fn replacing_with_same_input_is_idempotent() {
        let at = Utc::now();
        let mut first = EntityCache::new();
        first.replace_all_at(EntityType::Users, vec![user(1, "Jo")], at);
        let mut second = first.clone();
        second.replace_all_at(EntityType::Users, vec![user(1, "Jo")], at);

        assert_eq!(first.slot(EntityType::Users), second.slot(EntityType::Users));
    }

    #[test]
    fn empty_fetch_counts_as_loaded() {
        let mut cache = EntityCache::new();
        cache.replace_all(EntityType::Boats, Vec::new());
        assert!(cache.is_loaded(EntityType::Boats));
        assert_eq!(cache.len(EntityType::Boats), 0);
    }

    #[test]
    fn slots_are_independent() {
        let mut cache = EntityCache::new();
        cache.replace_all(EntityType::Users, vec![user(1, "Jo")]);
        assert!(!cache.is_loaded(EntityType::Staff));
        assert_eq!(cache.len(EntityType::Users), 1);
    }
}
