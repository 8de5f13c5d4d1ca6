//! In-memory query cache keyed by logical resource name.
//!
//! Each key holds any number of cached variants (one per URL/query combination)
//! and a generation counter that observers can watch. Invalidation is coarse:
//! it drops every variant of a key and bumps the generation so observers refetch.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tokio::sync::watch;

#[derive(Debug)]
struct Slot {
    variants: HashMap<String, CachedValue>,
    generation: watch::Sender<u64>,
}

impl Slot {
    fn new() -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            variants: HashMap::new(),
            generation,
        }
    }

    fn bump(&self) {
        self.generation.send_modify(|g| *g += 1);
    }
}

#[derive(Debug, Clone)]
struct CachedValue {
    value: Value,
    cached_at: DateTime<Utc>,
}

/// Process-wide query cache handle.
///
/// Cheap to clone; all clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct QueryCache {
    slots: Arc<Mutex<HashMap<String, Slot>>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_slots<R>(&self, f: impl FnOnce(&mut HashMap<String, Slot>) -> R) -> R {
        let mut guard = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }

    /// Observe invalidations of `key`. The value is a generation counter.
    pub fn subscribe(&self, key: &str) -> watch::Receiver<u64> {
        self.with_slots(|slots| {
            slots
                .entry(key.to_string())
                .or_insert_with(Slot::new)
                .generation
                .subscribe()
        })
    }

    pub fn put(&self, key: &str, variant: &str, value: Value) {
        self.with_slots(|slots| {
            slots
                .entry(key.to_string())
                .or_insert_with(Slot::new)
                .variants
                .insert(
                    variant.to_string(),
                    CachedValue {
                        value,
                        cached_at: Utc::now(),
                    },
                );
        })
    }

    /// Cached value, unless older than `max_age`.
    pub fn get(&self, key: &str, variant: &str, max_age: Option<Duration>) -> Option<Value> {
        self.with_slots(|slots| {
            let cached = slots.get(key)?.variants.get(variant)?;
            if let Some(max) = max_age {
                if Utc::now().signed_duration_since(cached.cached_at) > max {
                    return None;
                }
            }
            Some(cached.value.clone())
        })
    }

    /// Drop everything cached under `key` and notify its observers.
    ///
    /// Unknown keys and keys without observers are a no-op.
    pub fn invalidate(&self, key: &str) {
        self.with_slots(|slots| {
            if let Some(slot) = slots.get_mut(key) {
                slot.variants.clear();
                slot.bump();
                tracing::debug!(key, observers = slot.generation.receiver_count(), "query invalidated");
            }
        })
    }

    pub fn generation(&self, key: &str) -> u64 {
        self.with_slots(|slots| slots.get(key).map(|s| *s.generation.borrow()).unwrap_or(0))
    }

    pub fn observer_count(&self, key: &str) -> usize {
        self.with_slots(|slots| {
            slots
                .get(key)
                .map(|s| s.generation.receiver_count())
                .unwrap_or(0)
        })
    }

    /// Drop all cached data (logout / shutdown). Observers are notified and
    /// keys nobody observes are forgotten.
    pub fn clear(&self) {
        self.with_slots(|slots| {
            for slot in slots.values_mut() {
                slot.variants.clear();
                slot.bump();
            }
            slots.retain(|_, slot| slot.generation.receiver_count() > 0);
        })
    }
}
