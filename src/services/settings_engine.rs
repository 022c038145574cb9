// SpeedGear Settings Engine
// Normalizes untrusted stored values into canonical bounded settings and
// reads/writes the synced storage keys.
//
// The normalization functions are pure and total: they never fail, they
// coerce invalid input to defaults. They are the only gate between raw
// storage and every other component — all consumers route raw reads
// through them.

use serde_json::{json, Value};

use crate::storage::SyncStore;
use crate::types::errors::StorageError;
use crate::types::settings::{
    Settings, SpeedConfig, ToggleShortcut, DEFAULT_LANG, DEFAULT_MAX, DEFAULT_MIN,
    DEFAULT_PRESETS, DEFAULT_STEP, DEFAULT_TOGGLE_KEY, DEFAULT_TOGGLE_SPEED, SPEED_CEIL,
    SPEED_FLOOR,
};

/// Parses an arbitrary stored value to an integer.
///
/// Numbers truncate toward zero, strings parse as decimal integers after
/// trimming; everything else yields the fallback.
pub fn to_int(value: Option<&Value>, fallback: i64) -> i64 {
    match value {
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                i
            } else if let Some(f) = n.as_f64() {
                if f.is_finite() {
                    f.trunc() as i64
                } else {
                    fallback
                }
            } else {
                fallback
            }
        }
        Some(Value::String(s)) => s.trim().parse::<i64>().unwrap_or(fallback),
        _ => fallback,
    }
}

fn clamp_int(value: i64, min: i64, max: i64) -> i64 {
    value.max(min).min(max)
}

/// Parses and clamps a stored speed percentage into [1, 2000].
pub fn clamp_speed(value: Option<&Value>, fallback: u32) -> u32 {
    clamp_int(
        to_int(value, i64::from(fallback)),
        i64::from(SPEED_FLOOR),
        i64::from(SPEED_CEIL),
    ) as u32
}

/// Clamps an already-numeric speed into [1, 2000].
pub fn clamp_speed_value(value: i64) -> u32 {
    clamp_int(value, i64::from(SPEED_FLOOR), i64::from(SPEED_CEIL)) as u32
}

/// Resolves the slider range: each bound parsed and clamped into [1, 2000],
/// then swapped if inverted so min ≤ max always holds.
fn normalize_range(
    min_raw: Option<&Value>,
    max_raw: Option<&Value>,
    min_fallback: u32,
    max_fallback: u32,
) -> (u32, u32) {
    let min = clamp_speed(min_raw, min_fallback);
    let max = clamp_speed(max_raw, max_fallback);
    (min.min(max), min.max(max))
}

/// Resolves the six preset speeds: missing or unparseable entries fall back
/// to the built-in defaults per index, then each is clamped into [min, max].
fn normalize_presets(raw: Option<&Value>, min: u32, max: u32) -> [u32; 6] {
    let source = raw.and_then(|v| v.as_array());
    let mut presets = [0u32; 6];
    for (index, fallback) in DEFAULT_PRESETS.iter().enumerate() {
        let entry = source.and_then(|arr| arr.get(index));
        let parsed = to_int(entry, i64::from(*fallback));
        presets[index] = clamp_int(parsed, i64::from(min), i64::from(max)) as u32;
    }
    presets
}

/// Normalizes raw stored values into canonical [`Settings`].
///
/// Pure and total: any JSON shape is accepted and coerced field by field.
pub fn normalize_settings(raw: &Value) -> Settings {
    let (min, max) = normalize_range(
        raw.get("speedMin"),
        raw.get("speedMax"),
        DEFAULT_MIN,
        DEFAULT_MAX,
    );
    Settings {
        speed_step: clamp_int(to_int(raw.get("speedStep"), i64::from(DEFAULT_STEP)), 1, 100)
            as u32,
        speed_min: min,
        speed_max: max,
        presets: normalize_presets(raw.get("presets"), min, max),
        toggle_speed: clamp_speed(raw.get("toggleSpeed"), DEFAULT_TOGGLE_SPEED),
        toggle_key_code: raw
            .get("toggleKeyCode")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_TOGGLE_KEY.to_string()),
    }
}

/// Normalizes raw stored values into the popup's [`SpeedConfig`].
pub fn normalize_speed_config(raw: &Value) -> SpeedConfig {
    let (min, max) = normalize_range(
        raw.get("speedMin"),
        raw.get("speedMax"),
        DEFAULT_MIN,
        DEFAULT_MAX,
    );
    SpeedConfig {
        step: clamp_int(to_int(raw.get("speedStep"), i64::from(DEFAULT_STEP)), 1, 100) as u32,
        min,
        max,
        presets: normalize_presets(raw.get("presets"), min, max),
        current_lang: raw
            .get("lang")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_LANG)
            .to_string(),
    }
}

/// Normalizes a stored secondary shortcut list for persistence: entries
/// without a key code are dropped, speeds are clamped with the configured
/// toggle speed as fallback.
pub fn normalize_shortcut_list(raw: Option<&Value>, fallback_speed: u32) -> Vec<ToggleShortcut> {
    let Some(items) = raw.and_then(|v| v.as_array()) else {
        return Vec::new();
    };
    items
        .iter()
        .map(|item| ToggleShortcut {
            speed: clamp_speed(item.get("speed"), fallback_speed),
            key_code: item
                .get("keyCode")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string(),
        })
        .filter(|shortcut| !shortcut.key_code.is_empty())
        .collect()
}

/// Builds the content controller's active shortcut list: the primary toggle
/// shortcut first (skipped when its key is empty), then the stored secondary
/// entries. Entries whose key code is not a string are skipped; duplicate key
/// codes are permitted and the first match wins.
pub fn build_shortcut_list(
    stored: Option<&Value>,
    primary_key: &str,
    primary_speed: u32,
) -> Vec<ToggleShortcut> {
    let mut shortcuts = Vec::new();
    if !primary_key.is_empty() {
        shortcuts.push(ToggleShortcut {
            key_code: primary_key.to_string(),
            speed: primary_speed,
        });
    }
    if let Some(items) = stored.and_then(|v| v.as_array()) {
        for item in items {
            let Some(key_code) = item.get("keyCode").and_then(|v| v.as_str()) else {
                continue;
            };
            shortcuts.push(ToggleShortcut {
                key_code: key_code.to_string(),
                speed: clamp_speed(item.get("speed"), primary_speed),
            });
        }
    }
    shortcuts
}

/// Trait defining the settings engine interface.
pub trait SettingsEngineTrait {
    fn load_settings(&self) -> Settings;
    fn load_speed_config(&self) -> SpeedConfig;
    fn shortcut_list(&self) -> Vec<ToggleShortcut>;
    fn save_settings(
        &self,
        settings: &Settings,
        shortcuts: &[ToggleShortcut],
    ) -> Result<(), StorageError>;
    fn install_defaults(&self) -> Result<(), StorageError>;
}

/// Settings engine over the synced storage area.
///
/// Borrows the store per use, so it is created on demand the way the
/// background and options surfaces need it.
pub struct SettingsEngine<'a> {
    sync: &'a SyncStore,
}

impl<'a> SettingsEngine<'a> {
    pub fn new(sync: &'a SyncStore) -> Self {
        Self { sync }
    }

    /// Collects the raw stored values for the given keys into one object,
    /// skipping absent keys.
    fn raw_object(&self, keys: &[&str]) -> Value {
        let mut map = serde_json::Map::new();
        for key in keys {
            if let Some(value) = self.sync.get(key) {
                map.insert((*key).to_string(), value);
            }
        }
        Value::Object(map)
    }
}

impl SettingsEngineTrait for SettingsEngine<'_> {
    /// Reads and normalizes the full settings. Stored values may be stale,
    /// missing, or corrupted; the result is always canonical.
    fn load_settings(&self) -> Settings {
        let raw = self.raw_object(&[
            "speedStep",
            "speedMin",
            "speedMax",
            "presets",
            "toggleKeyCode",
            "toggleSpeed",
        ]);
        normalize_settings(&raw)
    }

    /// Reads and normalizes the popup-facing speed configuration.
    fn load_speed_config(&self) -> SpeedConfig {
        let raw = self.raw_object(&["speedStep", "speedMin", "speedMax", "presets", "lang"]);
        normalize_speed_config(&raw)
    }

    /// Builds the active shortcut list from the stored primary toggle key,
    /// toggle speed, and secondary shortcut entries.
    fn shortcut_list(&self) -> Vec<ToggleShortcut> {
        let settings = self.load_settings();
        build_shortcut_list(
            self.sync.get("toggleShortcuts").as_ref(),
            &settings.toggle_key_code,
            settings.toggle_speed,
        )
    }

    /// Persists normalized settings and the secondary shortcut list as
    /// individual synced keys, overwriting previous values.
    fn save_settings(
        &self,
        settings: &Settings,
        shortcuts: &[ToggleShortcut],
    ) -> Result<(), StorageError> {
        self.sync.set("speedStep", &json!(settings.speed_step))?;
        self.sync.set("speedMin", &json!(settings.speed_min))?;
        self.sync.set("speedMax", &json!(settings.speed_max))?;
        self.sync.set("presets", &json!(settings.presets))?;
        self.sync
            .set("toggleKeyCode", &json!(settings.toggle_key_code))?;
        self.sync.set("toggleSpeed", &json!(settings.toggle_speed))?;
        self.sync.set("toggleShortcuts", &json!(shortcuts))?;
        Ok(())
    }

    /// Writes the built-in defaults, but only into an entirely empty store —
    /// a partially-configured store is never overwritten.
    fn install_defaults(&self) -> Result<(), StorageError> {
        if !self.sync.is_empty() {
            return Ok(());
        }
        let defaults = Settings::default();
        self.save_settings(&defaults, &[])
    }
}
