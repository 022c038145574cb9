//! SpeedGear storage layer.
//!
//! Two key-value areas back the coordination core, mirroring the host's
//! storage model:
//!
//! - the **synced area** ([`SyncStore`]): durable, SQLite-backed, shared by
//!   all contexts, last-write-wins. Holds the user configuration keys.
//! - the **session area** ([`SessionArea`]): in-process, cleared when the
//!   browser session ends. Holds the per-tab speed map.
//!
//! Values in both areas are raw `serde_json::Value`s: stored data may be
//! stale or corrupted, and consumers are expected to route every read
//! through the settings normalizer.

pub mod session_area;
pub mod sync_store;

pub use session_area::SessionArea;
pub use sync_store::SyncStore;
