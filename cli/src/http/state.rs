//! Shared state of the progress receiver

use chrono::{DateTime, Local};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Key for batch-level payloads that carry no envelope id.
pub const LATEST_BATCH_KEY: &str = "latest_batch";
/// Key for the end-of-run message.
pub const TERMINATED_KEY: &str = "terminated";

/// Last payload seen per envelope (or per batch-level key).
#[derive(Default)]
pub struct ProgressStore {
    entries: RwLock<BTreeMap<String, Value>>,
}

impl ProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Value>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Value>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Where a payload is filed: its `envelope_id`, else a batch-level key.
    pub fn key_for(payload: &Value) -> String {
        if let Some(id) = payload.get("envelope_id").and_then(Value::as_str) {
            return id.to_string();
        }
        let terminated = payload.get("type").and_then(Value::as_str) == Some("terminate")
            || payload.get("terminate").and_then(Value::as_bool) == Some(true);
        if terminated {
            TERMINATED_KEY.to_string()
        } else {
            LATEST_BATCH_KEY.to_string()
        }
    }

    /// Stores the payload, replacing any earlier one under the same key.
    pub fn insert(&self, payload: Value) -> String {
        let key = Self::key_for(&payload);
        self.write().insert(key.clone(), payload);
        key
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.read().get(key).cloned()
    }

    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

/// Shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub session_id: String,
    pub store: Arc<ProgressStore>,
    pub stats: Arc<RwLock<ServerStats>>,
}

impl AppState {
    pub fn new(session_id: String) -> Self {
        Self {
            session_id,
            store: Arc::new(ProgressStore::new()),
            stats: Arc::new(RwLock::new(ServerStats::new())),
        }
    }

    pub fn record_request(&self, endpoint: &str) {
        self.stats
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .increment_request(endpoint);
    }
}

pub struct ServerStats {
    pub requests_total: u64,
    pub requests_by_endpoint: HashMap<String, u64>,
    pub start_time: DateTime<Local>,
}

impl ServerStats {
    pub fn new() -> Self {
        Self {
            requests_total: 0,
            requests_by_endpoint: HashMap::new(),
            start_time: Local::now(),
        }
    }

    pub fn increment_request(&mut self, endpoint: &str) {
        self.requests_total += 1;
        *self
            .requests_by_endpoint
            .entry(endpoint.to_string())
            .or_insert(0) += 1;
    }

    pub fn uptime_seconds(&self) -> f64 {
        let now = Local::now();
        (now - self.start_time).num_milliseconds() as f64 / 1000.0
    }
}

impl Default for ServerStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_for_payloads() {
        assert_eq!(
            ProgressStore::key_for(&json!({"type": "individual", "envelope_id": "env-1"})),
            "env-1"
        );
        assert_eq!(
            ProgressStore::key_for(&json!({"type": "batch", "status": "batch_progress"})),
            LATEST_BATCH_KEY
        );
        assert_eq!(
            ProgressStore::key_for(&json!({"type": "terminate", "terminate": true})),
            TERMINATED_KEY
        );
    }

    #[test]
    fn test_insert_replaces_previous_payload() {
        let store = ProgressStore::new();
        store.insert(json!({"envelope_id": "env-1", "status": "started"}));
        store.insert(json!({"envelope_id": "env-1", "status": "completed"}));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("env-1").unwrap()["status"], "completed");
    }

    #[test]
    fn test_increment_request() {
        let mut stats = ServerStats::new();
        stats.increment_request("/webhook/progress");
        stats.increment_request("/webhook/progress");
        stats.increment_request("/health");

        assert_eq!(stats.requests_total, 3);
        assert_eq!(stats.requests_by_endpoint["/webhook/progress"], 2);
        assert!(stats.uptime_seconds() < 1.0);
    }
}
