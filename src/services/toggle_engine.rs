// SpeedGear Toggle Engine
// The per-tab speed toggle state machine.
//
// A tab is observably in one of two states: DEFAULT (speed == 100) or
// BOOSTED (speed == the resolved target). Toggling from DEFAULT jumps to the
// target; toggling from any other speed returns to exactly 100, regardless
// of what the non-default value was. The store holds a single current value,
// not a history stack.

use serde_json::Value;

use crate::services::settings_engine::clamp_speed;
use crate::types::settings::{DEFAULT_SPEED, DEFAULT_TOGGLE_SPEED};

/// Resolves the speed a toggle should jump to.
///
/// An explicit requested speed (a specific shortcut fired) wins, clamped;
/// otherwise the globally configured toggle speed is used.
pub fn resolve_target(requested: Option<&Value>, configured_toggle_speed: u32) -> u32 {
    match requested {
        Some(value) => clamp_speed(Some(value), DEFAULT_TOGGLE_SPEED),
        None => configured_toggle_speed,
    }
}

/// The toggle transition: DEFAULT goes to the target, everything else goes
/// back to DEFAULT.
pub fn transition(current: u32, target: u32) -> u32 {
    if current == DEFAULT_SPEED {
        target
    } else {
        DEFAULT_SPEED
    }
}
