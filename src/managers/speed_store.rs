//! Per-Tab Speed Store.
//!
//! The background process's single source of truth for each tab's current
//! playback speed. Backed by the session storage area under one key, so the
//! whole map is cleared by the host at browser-session boundaries.

use serde_json::{Map, Value};

use crate::services::settings_engine::{clamp_speed, clamp_speed_value};
use crate::storage::SessionArea;
use crate::types::settings::DEFAULT_SPEED;
use crate::types::TabId;

/// Session storage key holding the tabId → speed map.
const SESSION_KEY: &str = "tabSpeeds";

/// Trait defining the per-tab speed store interface.
pub trait SpeedStoreTrait {
    fn get_tab_speed(&self, tab_id: TabId) -> u32;
    fn set_tab_speed(&mut self, tab_id: TabId, speed: u32) -> u32;
    fn evict(&mut self, tab_id: TabId);
    fn tracked_tabs(&self) -> Vec<TabId>;
}

/// Speed store over the session area. Writes are last-write-wins; there is
/// no merging and no versioning.
pub struct SpeedStore {
    session: SessionArea,
}

impl SpeedStore {
    pub fn new() -> Self {
        Self {
            session: SessionArea::new(),
        }
    }

    fn speeds(&self) -> Map<String, Value> {
        self.session
            .get(SESSION_KEY)
            .and_then(|v| v.as_object())
            .cloned()
            .unwrap_or_default()
    }

    fn store_speeds(&mut self, map: Map<String, Value>) {
        self.session.set(SESSION_KEY, Value::Object(map));
    }
}

impl Default for SpeedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeedStoreTrait for SpeedStore {
    /// Reads a tab's current speed. Absent or unreadable entries yield the
    /// default (100); stored values are clamped into [1, 2000] on the way
    /// out since the session area may hold stale shapes.
    fn get_tab_speed(&self, tab_id: TabId) -> u32 {
        let map = self.speeds();
        clamp_speed(map.get(&tab_id.to_string()), DEFAULT_SPEED)
    }

    /// Overwrites a tab's speed, clamped into [1, 2000]. Returns the value
    /// actually stored. Notification of the tab and UI listeners is the
    /// background process's job (commit-then-notify), not the store's.
    fn set_tab_speed(&mut self, tab_id: TabId, speed: u32) -> u32 {
        let clamped = clamp_speed_value(i64::from(speed));
        let mut map = self.speeds();
        map.insert(tab_id.to_string(), Value::from(clamped));
        self.store_speeds(map);
        clamped
    }

    /// Removes a tab's entry on tab close. The map is only written back when
    /// the entry was present.
    fn evict(&mut self, tab_id: TabId) {
        let mut map = self.speeds();
        if map.remove(&tab_id.to_string()).is_some() {
            self.store_speeds(map);
        }
    }

    /// Tabs currently holding a stored speed.
    fn tracked_tabs(&self) -> Vec<TabId> {
        self.speeds()
            .keys()
            .filter_map(|k| k.parse::<TabId>().ok())
            .collect()
    }
}
