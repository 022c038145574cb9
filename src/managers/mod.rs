// SpeedGear state managers
// Managers own the background process's per-tab state: current speeds and
// last-reported media status.

pub mod media_registry;
pub mod speed_store;
