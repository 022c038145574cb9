use serde::{Deserialize, Serialize};

/// Canonical, bounded extension settings.
///
/// Produced exclusively by the settings normalizer — raw storage values never
/// reach other components directly. Field names mirror the synced storage
/// keys so a normalized settings struct serializes back to the same keys it
/// was read from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub speed_step: u32,
    pub speed_min: u32,
    pub speed_max: u32,
    pub presets: [u32; 6],
    pub toggle_speed: u32,
    pub toggle_key_code: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            speed_step: DEFAULT_STEP,
            speed_min: DEFAULT_MIN,
            speed_max: DEFAULT_MAX,
            presets: DEFAULT_PRESETS,
            toggle_speed: DEFAULT_TOGGLE_SPEED,
            toggle_key_code: DEFAULT_TOGGLE_KEY.to_string(),
        }
    }
}

/// The popup's view of the speed configuration: slider bounds, step size,
/// preset buttons, and the display language passthrough.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpeedConfig {
    pub step: u32,
    pub min: u32,
    pub max: u32,
    pub presets: [u32; 6],
    pub current_lang: String,
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            step: DEFAULT_STEP,
            min: DEFAULT_MIN,
            max: DEFAULT_MAX,
            presets: DEFAULT_PRESETS,
            current_lang: DEFAULT_LANG.to_string(),
        }
    }
}

/// One key-triggered toggle shortcut: pressing `key_code` toggles the tab
/// between the default speed and `speed`.
///
/// Duplicate key codes are permitted in a shortcut list; the first match wins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ToggleShortcut {
    pub key_code: String,
    pub speed: u32,
}

/// The speed every tab starts at and toggles back to.
pub const DEFAULT_SPEED: u32 = 100;

/// Hard bounds on any stored speed percentage.
pub const SPEED_FLOOR: u32 = 1;
pub const SPEED_CEIL: u32 = 2000;

pub const DEFAULT_STEP: u32 = 10;
pub const DEFAULT_MIN: u32 = 50;
pub const DEFAULT_MAX: u32 = 250;
pub const DEFAULT_PRESETS: [u32; 6] = [50, 100, 125, 150, 175, 200];
pub const DEFAULT_TOGGLE_SPEED: u32 = 200;
pub const DEFAULT_TOGGLE_KEY: &str = "F13";
pub const DEFAULT_LANG: &str = "JP";
