//! Short-lived prediction cache keyed by pet id.
//!
//! Entries expire after a TTL measured against the caller-supplied `now`; there is
//! no other eviction. Writers racing on the same pet are harmless because
//! recomputation is idempotent.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};
use log::debug;

use crate::BehaviorPrediction;

/// Storage for behavior predictions.
///
/// Implement this to back the predictor with a shared store; the default is
/// [`InMemoryPredictionCache`].
pub trait PredictionCache: Send + Sync {
    /// Fresh entry for `pet_id`, or `None` if absent or older than the TTL.
    fn get(&self, pet_id: &str, now: DateTime<Utc>) -> Option<Arc<BehaviorPrediction>>;

    /// Store `prediction`, stamped with `now`.
    fn insert(&self, pet_id: &str, prediction: Arc<BehaviorPrediction>, now: DateTime<Utc>);

    /// Drop any entry for `pet_id`.
    fn invalidate(&self, pet_id: &str);
}

#[derive(Debug)]
struct CacheEntry {
    prediction: Arc<BehaviorPrediction>,
    stored_at: DateTime<Utc>,
}

/// In-process TTL map.
#[derive(Debug)]
pub struct InMemoryPredictionCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl InMemoryPredictionCache {
    /// Create a cache whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored entries, including expired ones not yet overwritten.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryPredictionCache {
    fn default() -> Self {
        Self::new(Duration::minutes(5))
    }
}

impl PredictionCache for InMemoryPredictionCache {
    fn get(&self, pet_id: &str, now: DateTime<Utc>) -> Option<Arc<BehaviorPrediction>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let entry = entries.get(pet_id)?;
        if now - entry.stored_at < self.ttl {
            Some(Arc::clone(&entry.prediction))
        } else {
            debug!("[PredictionCache] entry for {} expired", pet_id);
            None
        }
    }

    fn insert(&self, pet_id: &str, prediction: Arc<BehaviorPrediction>, now: DateTime<Utc>) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(pet_id.to_string(), CacheEntry { prediction, stored_at: now });
    }

    fn invalidate(&self, pet_id: &str) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(pet_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn prediction(at: DateTime<Utc>) -> Arc<BehaviorPrediction> {
        Arc::new(BehaviorPrediction {
            predicted_locations: vec![],
            overall_confidence: 0.5,
            search_strategy: vec![],
            last_updated: at,
        })
    }

    #[test]
    fn test_hit_within_ttl() {
        let cache = InMemoryPredictionCache::default();
        let t0 = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
        let p = prediction(t0);
        cache.insert("pet", Arc::clone(&p), t0);

        let hit = cache.get("pet", t0 + Duration::minutes(4)).unwrap();
        assert!(Arc::ptr_eq(&hit, &p));
        assert!(cache.get("other", t0).is_none());
    }

    #[test]
    fn test_miss_after_ttl() {
        let cache = InMemoryPredictionCache::default();
        let t0 = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
        cache.insert("pet", prediction(t0), t0);

        assert!(cache.get("pet", t0 + Duration::minutes(5)).is_none());
        // Expired entries stay until overwritten
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalidate() {
        let cache = InMemoryPredictionCache::new(Duration::hours(1));
        let t0 = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
        cache.insert("pet", prediction(t0), t0);
        cache.invalidate("pet");
        assert!(cache.get("pet", t0).is_none());
        assert!(cache.is_empty());
    }
}
