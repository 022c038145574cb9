//! In-process session-scoped key-value area.

use std::collections::HashMap;

use serde_json::Value;

/// Session-scoped key-value store.
///
/// Lives only as long as the owning process, which matches the host
/// contract: session storage is cleared at browser-session boundaries by
/// the host, not by this system. The per-tab speed map lives here under a
/// single key.
#[derive(Debug, Default)]
pub struct SessionArea {
    entries: HashMap<String, Value>,
}

impl SessionArea {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.entries.insert(key.to_string(), value);
    }

    pub fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}
