//! Media status registry.
//!
//! Ephemeral background map from tab to the last media status the tab's
//! content controller reported. Overwritten on each report, never merged;
//! evicted together with the speed entry on tab close; not persisted across
//! background restarts.

use std::collections::HashMap;

use crate::types::media::MediaStatus;
use crate::types::TabId;

/// Trait defining the media status registry interface.
pub trait MediaRegistryTrait {
    fn report(&mut self, tab_id: TabId, status: MediaStatus);
    fn get(&self, tab_id: TabId) -> Option<&MediaStatus>;
    fn evict(&mut self, tab_id: TabId);
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool;
}

/// In-memory media status registry.
#[derive(Debug, Default)]
pub struct MediaRegistry {
    statuses: HashMap<TabId, MediaStatus>,
}

impl MediaRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MediaRegistryTrait for MediaRegistry {
    /// Stores a tab's latest status, replacing any previous one.
    fn report(&mut self, tab_id: TabId, status: MediaStatus) {
        self.statuses.insert(tab_id, status);
    }

    fn get(&self, tab_id: TabId) -> Option<&MediaStatus> {
        self.statuses.get(&tab_id)
    }

    /// Drops a tab's status on tab close. Absent entries are a no-op.
    fn evict(&mut self, tab_id: TabId) {
        self.statuses.remove(&tab_id);
    }

    fn len(&self) -> usize {
        self.statuses.len()
    }

    fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}
