//! Night storage
//!
//! The store owns the raw night collection. It is keyed by calendar date, so a
//! later write for the same date replaces the earlier one. Every mutation holds
//! the write lock for its full duration, which keeps concurrent upserts and
//! clears from interleaving into duplicate dates or a partially cleared map.

use crate::types::RawNight;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Storage collaborator for raw nights
pub trait NightStore: Send + Sync {
    /// Snapshot of every stored night, ordered by date ascending
    fn read_all(&self) -> Vec<RawNight>;

    /// Replace the whole collection. Duplicate dates collapse, last one wins.
    fn write_all(&self, nights: Vec<RawNight>);

    /// Remove every night
    fn clear(&self);

    /// Insert a night, replacing any existing night with the same date
    fn upsert(&self, night: RawNight) {
        self.upsert_many(vec![night]);
    }

    /// Insert several nights as one atomic write
    fn upsert_many(&self, nights: Vec<RawNight>);

    /// Number of stored nights
    fn len(&self) -> usize {
        self.read_all().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Volatile in-memory night store
#[derive(Debug, Default)]
pub struct MemoryNightStore {
    nights: RwLock<BTreeMap<String, RawNight>>,
}

/// Serialized form of a store snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreSnapshot {
    nights: Vec<RawNight>,
}

impl MemoryNightStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with nights (same-date entries collapse)
    pub fn with_nights(nights: Vec<RawNight>) -> Self {
        let store = Self::new();
        store.write_all(nights);
        store
    }

    /// Load a store snapshot from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let snapshot: StoreSnapshot = serde_json::from_str(json)?;
        Ok(Self::with_nights(snapshot.nights))
    }

    /// Serialize a store snapshot to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let snapshot = StoreSnapshot {
            nights: self.read_all(),
        };
        serde_json::to_string_pretty(&snapshot)
    }

    // Each write swaps in a fully built map, so a poisoned lock still guards
    // a consistent collection and can be recovered.
    fn read_guard(&self) -> RwLockReadGuard<'_, BTreeMap<String, RawNight>> {
        self.nights.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, BTreeMap<String, RawNight>> {
        self.nights.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl NightStore for MemoryNightStore {
    fn read_all(&self) -> Vec<RawNight> {
        self.read_guard().values().cloned().collect()
    }

    fn write_all(&self, nights: Vec<RawNight>) {
        let replacement: BTreeMap<String, RawNight> = nights
            .into_iter()
            .map(|night| (night.date.clone(), night))
            .collect();

        let mut guard = self.write_guard();
        *guard = replacement;
        log::debug!("store replaced, {} nights", guard.len());
    }

    fn clear(&self) {
        let mut guard = self.write_guard();
        let removed = guard.len();
        *guard = BTreeMap::new();
        log::info!("store cleared, {} nights removed", removed);
    }

    fn upsert_many(&self, nights: Vec<RawNight>) {
        let mut guard = self.write_guard();
        let mut updated = guard.clone();
        for night in nights {
            if let Some(previous) = updated.insert(night.date.clone(), night) {
                log::debug!("replaced existing night {}", previous.date);
            }
        }
        *guard = updated;
    }

    fn len(&self) -> usize {
        self.read_guard().len()
    }
}

impl<T: NightStore + ?Sized> NightStore for Arc<T> {
    fn read_all(&self) -> Vec<RawNight> {
        (**self).read_all()
    }

    fn write_all(&self, nights: Vec<RawNight>) {
        (**self).write_all(nights)
    }

    fn clear(&self) {
        (**self).clear()
    }

    fn upsert(&self, night: RawNight) {
        (**self).upsert(night)
    }

    fn upsert_many(&self, nights: Vec<RawNight>) {
        (**self).upsert_many(nights)
    }

    fn len(&self) -> usize {
        (**self).len()
    }
}
