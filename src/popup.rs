//! Popup-side controller.
//!
//! Coordinates the popup surface against the background process: the
//! initial speed and media-status queries, slider/step/preset/reset speed
//! edits with clamping, out-of-range display handling, and the "no media
//! found" warning with its 2-second cancellable fallback probe. Rendering
//! itself is the UI layer's job; this controller owns the state and the
//! outbound messages.

use std::time::{Duration, Instant};

use serde_json::{json, Value};

use crate::services::settings_engine::{normalize_speed_config, to_int};
use crate::types::settings::{SpeedConfig, DEFAULT_SPEED};
use crate::types::TabId;

/// How long the popup waits for a media status before probing the tab
/// directly for a media count.
const NO_MEDIA_PROBE_DELAY: Duration = Duration::from_secs(2);

/// Visibility of the "no media found" warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoMediaNotice {
    Hidden,
    Visible,
}

/// A message the popup wants sent, with its destination.
#[derive(Debug, Clone, PartialEq)]
pub enum PopupOutbound {
    /// Runtime message to the background process.
    ToBackground(Value),
    /// Direct message to a tab's content script.
    ToTab(TabId, Value),
    /// Write one synced storage key.
    Persist { key: String, value: Value },
}

/// Popup controller state machine.
pub struct PopupController {
    config: SpeedConfig,
    active_tab: Option<TabId>,
    display_speed: i64,
    slider_value: u32,
    display_out_of_range: bool,
    media_status_received: bool,
    notice: NoMediaNotice,
    probe_deadline: Option<Instant>,
}

impl PopupController {
    /// Builds the controller from the raw synced configuration keys; the
    /// stored values are normalized before use.
    pub fn new(raw_config: &Value) -> Self {
        let config = normalize_speed_config(raw_config);
        let mut controller = Self {
            config,
            active_tab: None,
            display_speed: i64::from(DEFAULT_SPEED),
            slider_value: DEFAULT_SPEED,
            display_out_of_range: false,
            media_status_received: false,
            notice: NoMediaNotice::Hidden,
            probe_deadline: None,
        };
        controller.set_display(i64::from(DEFAULT_SPEED), true);
        controller
    }

    /// The popup opened over the given active tab. Returns the initial
    /// queries to send; with no active tab there is nothing to ask.
    pub fn open(&mut self, tab_id: Option<TabId>) -> Vec<PopupOutbound> {
        self.active_tab = tab_id;
        self.notice = NoMediaNotice::Hidden;
        let Some(tab) = tab_id else {
            return Vec::new();
        };
        vec![
            PopupOutbound::ToBackground(json!({ "action": "get-tab-speed", "tabId": tab })),
            PopupOutbound::ToBackground(json!({ "action": "get-media-status", "tabId": tab })),
        ]
    }

    /// Updates the displayed speed.
    ///
    /// With `allow_out_of_range`, a stored speed outside the configured
    /// slider range is shown numerically as-is while the slider pins to the
    /// nearest bound. Otherwise the value is clamped into the range first.
    /// Returns the value shown.
    fn set_display(&mut self, speed: i64, allow_out_of_range: bool) -> i64 {
        let min = i64::from(self.config.min);
        let max = i64::from(self.config.max);
        if allow_out_of_range {
            self.display_out_of_range = speed < min || speed > max;
            self.display_speed = speed;
            self.slider_value = speed.clamp(min, max) as u32;
            return speed;
        }
        let normalized = speed.clamp(min, max);
        self.display_out_of_range = false;
        self.display_speed = normalized;
        self.slider_value = normalized as u32;
        normalized
    }

    /// Clamps, displays, and persists a speed for the active tab.
    fn save_speed(&mut self, speed: i64) -> Option<PopupOutbound> {
        let normalized = self.set_display(speed, false);
        let tab = self.active_tab?;
        Some(PopupOutbound::ToBackground(json!({
            "action": "set-tab-speed",
            "tabId": tab,
            "speed": normalized,
        })))
    }

    /// Clamps, displays, and pushes a speed straight to the page without
    /// persisting it (live slider drag).
    fn apply_to_page(&mut self, speed: i64) -> Option<PopupOutbound> {
        let normalized = self.set_display(speed, false);
        let tab = self.active_tab?;
        Some(PopupOutbound::ToTab(
            tab,
            json!({ "action": "apply-speed", "speed": normalized }),
        ))
    }

    /// Live slider movement. While the display is out of range, the first
    /// drag snaps to the bound nearest the displayed speed.
    pub fn slider_input(&mut self, value: &Value) -> Option<PopupOutbound> {
        if self.display_out_of_range {
            let snapped = if self.display_speed > i64::from(self.config.max) {
                i64::from(self.config.max)
            } else {
                i64::from(self.config.min)
            };
            return self.apply_to_page(snapped);
        }
        self.apply_to_page(to_int(Some(value), i64::from(DEFAULT_SPEED)))
    }

    /// Slider released: persist, unless the display is still out of range.
    pub fn slider_commit(&mut self, value: &Value) -> Option<PopupOutbound> {
        if self.display_out_of_range {
            return None;
        }
        self.save_speed(to_int(Some(value), i64::from(DEFAULT_SPEED)))
    }

    /// Step button: one step up from the slider position, clamped.
    pub fn step_up(&mut self) -> Option<PopupOutbound> {
        let next = i64::from(self.slider_value) + i64::from(self.config.step);
        self.save_speed(next)
    }

    /// Step button: one step down from the slider position, clamped.
    pub fn step_down(&mut self) -> Option<PopupOutbound> {
        let next = i64::from(self.slider_value) - i64::from(self.config.step);
        self.save_speed(next)
    }

    /// Reset button: back to the default speed.
    pub fn reset(&mut self) -> Option<PopupOutbound> {
        self.save_speed(i64::from(DEFAULT_SPEED))
    }

    /// Preset button by index.
    pub fn select_preset(&mut self, index: usize) -> Option<PopupOutbound> {
        let preset = *self.config.presets.get(index)?;
        self.save_speed(i64::from(preset))
    }

    /// Language toggle; the new value is persisted to the synced area.
    pub fn toggle_lang(&mut self) -> PopupOutbound {
        self.config.current_lang = if self.config.current_lang == "JP" {
            "EN".to_string()
        } else {
            "JP".to_string()
        };
        PopupOutbound::Persist {
            key: "lang".to_string(),
            value: json!(self.config.current_lang),
        }
    }

    /// Push message from the background. A speed update for the active tab
    /// refreshes the display; a media status cancels the no-media probe and
    /// hides the warning.
    pub fn on_message(&mut self, message: &Value) {
        match message.get("action").and_then(|v| v.as_str()) {
            Some("tab-speed-updated") => {
                let tab = message.get("tabId").and_then(|v| v.as_u64()).map(|t| t as TabId);
                if self.active_tab.is_some() && tab == self.active_tab {
                    let speed = to_int(message.get("speed"), i64::from(DEFAULT_SPEED));
                    self.set_display(speed, true);
                }
            }
            Some("mediaStatus") if message.get("mediaStatus").is_some() => {
                self.media_status_received = true;
                self.notice = NoMediaNotice::Hidden;
                self.probe_deadline = None;
            }
            _ => {}
        }
    }

    /// Answer to the initial `get-tab-speed` query.
    pub fn on_speed_response(&mut self, response: &Value) {
        let success = response
            .get("success")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        if success {
            if let Some(speed) = response.get("speed").and_then(|v| v.as_i64()) {
                self.set_display(speed, true);
            }
        }
    }

    /// Answer to the initial `get-media-status` query. A cached status
    /// settles the question; otherwise the 2-second probe timer is armed.
    pub fn on_status_response(&mut self, response: &Value, now: Instant) {
        let success = response
            .get("success")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        let has_status = response
            .get("mediaStatus")
            .is_some_and(|s| !s.is_null());
        if success && has_status {
            self.media_status_received = true;
            self.notice = NoMediaNotice::Hidden;
            return;
        }
        self.probe_deadline = Some(now + NO_MEDIA_PROBE_DELAY);
    }

    /// Drives the probe timer. When the deadline passes without a media
    /// status having arrived, the tab is asked directly for its media
    /// count; a status that arrived in the meantime cancels the probe.
    pub fn poll(&mut self, now: Instant) -> Option<PopupOutbound> {
        let deadline = self.probe_deadline?;
        if now < deadline {
            return None;
        }
        self.probe_deadline = None;
        if self.media_status_received {
            return None;
        }
        let tab = self.active_tab?;
        Some(PopupOutbound::ToTab(
            tab,
            json!({ "action": "get-media-count" }),
        ))
    }

    /// Answer to the fallback probe: any media hides the warning, an
    /// explicit zero shows it, anything else changes nothing.
    pub fn on_media_count(&mut self, response: &Value) {
        match response.get("count").and_then(|v| v.as_i64()) {
            Some(count) if count > 0 => self.notice = NoMediaNotice::Hidden,
            Some(0) => self.notice = NoMediaNotice::Visible,
            _ => {}
        }
    }

    pub fn notice(&self) -> NoMediaNotice {
        self.notice
    }

    pub fn display_speed(&self) -> i64 {
        self.display_speed
    }

    pub fn slider_value(&self) -> u32 {
        self.slider_value
    }

    pub fn display_out_of_range(&self) -> bool {
        self.display_out_of_range
    }

    pub fn config(&self) -> &SpeedConfig {
        &self.config
    }

    pub fn probe_pending(&self) -> bool {
        self.probe_deadline.is_some()
    }
}
