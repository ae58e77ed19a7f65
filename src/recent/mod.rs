//! Recency-ranked item cache.
//!
//! Every recorded use decays all priorities by a constant factor, drops the
//! ones that fell below the floor and adds one to the used item. Decay only
//! happens on use; nothing here runs on a clock. The map is capped at
//! `max_entries`, evicting the lowest priorities first.
//!
//! The map is loaded from the store on first access and written back after
//! every mutation. Store failures are logged and otherwise ignored: the
//! in-memory map stays authoritative for the session.

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use serde_json::{Map, Number, Value};

use crate::config::RecentOptions;

pub mod store;

pub use store::{JsonFileStore, KeyValueStore, MemoryStore};

pub type Priorities = IndexMap<String, f64>;

pub type RecencyHandle = Arc<RecencyCache>;

pub struct RecencyCache {
    store: Arc<dyn KeyValueStore>,
    options: RecentOptions,
    entries: OnceCell<Mutex<Priorities>>,
}

impl std::fmt::Debug for RecencyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecencyCache")
            .field("options", &self.options)
            .field("loaded", &self.entries.get().is_some())
            .finish()
    }
}

impl RecencyCache {
    pub fn new(store: Arc<dyn KeyValueStore>, options: RecentOptions) -> Self {
        Self {
            store,
            options,
            entries: OnceCell::new(),
        }
    }

    pub fn handle(store: Arc<dyn KeyValueStore>, options: RecentOptions) -> RecencyHandle {
        Arc::new(Self::new(store, options))
    }

    pub fn is_loaded(&self) -> bool {
        self.entries.get().is_some()
    }

    fn entries(&self) -> &Mutex<Priorities> {
        self.entries
            .get_or_init(|| Mutex::new(self.read_store()))
    }

    pub fn priority(&self, code: &str) -> f64 {
        self.entries().lock().get(code).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.entries().lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> Vec<(String, f64)> {
        let entries = self.entries().lock();
        let mut ranked: Vec<_> = entries.iter().map(|(k, v)| (k.clone(), *v)).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }

    pub fn record_use(&self, code: &str) {
        let mut entries = self.entries().lock();
        let floor = self.options.priority_floor;
        let decay = self.options.decay_factor;

        entries.retain(|_, priority| {
            *priority *= decay;
            *priority >= floor
        });
        *entries.entry(code.to_string()).or_insert(0.0) += 1.0;

        if entries.len() > self.options.max_entries {
            let mut ranked: Vec<(&String, f64)> = entries.iter().map(|(k, v)| (k, *v)).collect();
            // stable: among equal priorities the earlier inserted entry survives
            ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
            let evicted: HashSet<String> = ranked[self.options.max_entries..]
                .iter()
                .map(|(code, _)| (*code).clone())
                .collect();
            tracing::debug!(count = evicted.len(), "evicting low priority recent items");
            entries.retain(|code, _| !evicted.contains(code));
        }

        self.write_store(&entries);
    }

    /// Called by the host when the store changed outside this session (another
    /// tab). Ignored for other keys or while the cache has not been loaded.
    pub fn apply_external_change(&self, key: &str) {
        if key != self.options.storage_key || !self.is_loaded() {
            return;
        }
        let fresh = self.read_store();
        self.merge_snapshot(fresh);
    }

    pub fn merge_snapshot(&self, fresh: Priorities) {
        let mut entries = self.entries().lock();
        for (code, priority) in &fresh {
            entries.insert(code.clone(), *priority);
        }
        entries.retain(|code, _| fresh.contains_key(code));
    }

    fn read_store(&self) -> Priorities {
        let raw = match self.store.get(&self.options.storage_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Priorities::new(),
            Err(err) => {
                tracing::warn!(?err, "failed to load recent items");
                return Priorities::new();
            }
        };
        parse_priorities(&raw)
    }

    fn write_store(&self, entries: &Priorities) {
        let serialized = serialize_priorities(entries);
        if let Err(err) = self.store.set(&self.options.storage_key, &serialized) {
            tracing::warn!(?err, "failed to save recent items");
        }
    }
}

fn parse_priorities(raw: &str) -> Priorities {
    let object = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(object)) => object,
        Ok(other) => {
            tracing::warn!(kind = ?other, "recent items are not a JSON object");
            return Priorities::new();
        }
        Err(err) => {
            tracing::warn!(?err, "failed to parse recent items");
            return Priorities::new();
        }
    };
    object
        .into_iter()
        .filter_map(|(code, value)| value.as_f64().map(|priority| (code, priority)))
        .collect()
}

fn serialize_priorities(entries: &Priorities) -> String {
    let object: Map<String, Value> = entries
        .iter()
        .filter_map(|(code, priority)| {
            let truncated = (priority * 100.0).trunc() / 100.0;
            Number::from_f64(truncated).map(|n| (code.clone(), Value::Number(n)))
        })
        .collect();
    Value::Object(object).to_string()
}
