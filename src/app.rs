//! Background process core for SpeedGear.
//!
//! Central struct holding the per-tab stores and the outbox, with the
//! commit-then-notify write path and the toggle operation.

use serde_json::{json, Value};

use crate::bus::Outbox;
use crate::managers::media_registry::{MediaRegistry, MediaRegistryTrait};
use crate::managers::speed_store::{SpeedStore, SpeedStoreTrait};
use crate::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use crate::services::toggle_engine;
use crate::storage::SyncStore;
use crate::types::errors::StorageError;
use crate::types::TabId;

/// Central background struct: the synced store, the per-tab speed store,
/// the media status registry, and the outbox toward content and UI
/// contexts.
///
/// The settings engine borrows the synced store, so it is created on demand
/// via [`SettingsEngine::new`] rather than stored here.
pub struct App {
    pub sync: SyncStore,
    pub speed_store: SpeedStore,
    pub media_registry: MediaRegistry,
    pub outbox: Box<dyn Outbox>,
    active_tab: Option<TabId>,
}

impl App {
    /// Creates an App over a synced store at the given path, or an
    /// in-memory one when no path is given.
    pub fn new(sync_path: Option<&str>, outbox: Box<dyn Outbox>) -> Result<Self, StorageError> {
        let sync = match sync_path {
            Some(path) => SyncStore::open(path)?,
            None => SyncStore::open_in_memory()?,
        };
        Ok(Self {
            sync,
            speed_store: SpeedStore::new(),
            media_registry: MediaRegistry::new(),
            outbox,
            active_tab: None,
        })
    }

    /// Install-time hook: seeds the synced defaults, but only when the
    /// store is entirely empty. Safe to run on every startup.
    pub fn startup(&mut self) {
        let _ = SettingsEngine::new(&self.sync).install_defaults();
    }

    /// Host notification of which tab is focused; the global toggle command
    /// resolves against it.
    pub fn set_active_tab(&mut self, tab_id: Option<TabId>) {
        self.active_tab = tab_id;
    }

    pub fn active_tab(&self) -> Option<TabId> {
        self.active_tab
    }

    /// Commits a tab's new speed, then notifies best-effort: `apply-speed`
    /// to the tab's content script and `tab-speed-updated` to any listening
    /// UI. Both outcomes are deliberately discarded — a missing receiver
    /// never rolls back the committed value. Returns the stored (clamped)
    /// speed.
    pub fn set_tab_speed(&mut self, tab_id: TabId, speed: u32) -> u32 {
        let stored = self.speed_store.set_tab_speed(tab_id, speed);
        let _ = self.outbox.send_to_tab(
            tab_id,
            json!({ "action": "apply-speed", "speed": stored }),
        );
        let _ = self.outbox.broadcast(json!({
            "action": "tab-speed-updated",
            "tabId": tab_id,
            "speed": stored,
        }));
        stored
    }

    /// Toggles a tab between the default speed and the resolved target: an
    /// explicit requested speed wins over the configured toggle speed.
    pub fn toggle_tab(&mut self, tab_id: TabId, requested: Option<&Value>) {
        let configured = SettingsEngine::new(&self.sync).load_settings().toggle_speed;
        let target = toggle_engine::resolve_target(requested, configured);
        let current = self.speed_store.get_tab_speed(tab_id);
        let next = toggle_engine::transition(current, target);
        self.set_tab_speed(tab_id, next);
    }

    /// The global toggle command: toggles the active tab. No active tab is
    /// a no-op.
    pub fn toggle_active_tab(&mut self, requested: Option<&Value>) {
        if let Some(tab_id) = self.active_tab {
            self.toggle_tab(tab_id, requested);
        }
    }

    /// Host command hook.
    pub fn on_command(&mut self, command: &str) {
        if command == "toggle-speed" {
            self.toggle_active_tab(None);
        }
    }

    /// Tab-close eviction: removes the tab's speed entry and media status
    /// exactly once each.
    pub fn on_tab_removed(&mut self, tab_id: TabId) {
        self.speed_store.evict(tab_id);
        self.media_registry.evict(tab_id);
        if self.active_tab == Some(tab_id) {
            self.active_tab = None;
        }
    }
}
