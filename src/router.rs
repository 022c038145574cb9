//! Message router for the background process.
//!
//! Dispatches the fixed message vocabulary flowing between popup,
//! background, and content contexts. Every handler answers exactly once;
//! actions outside the vocabulary are declined with
//! [`Handled::NotHandled`] so other listeners or default behavior can
//! proceed.

use std::sync::Mutex;

use serde_json::{json, Value};

use crate::app::App;
use crate::managers::media_registry::MediaRegistryTrait;
use crate::managers::speed_store::SpeedStoreTrait;
use crate::services::settings_engine::clamp_speed;
use crate::types::media::MediaStatus;
use crate::types::settings::DEFAULT_SPEED;
use crate::types::TabId;

/// Outcome of offering a message to a handler.
#[derive(Debug, Clone, PartialEq)]
pub enum Handled {
    /// The handler owned the message and produced this response.
    Response(Value),
    /// Not in this handler's vocabulary; offer it elsewhere.
    NotHandled,
}

impl Handled {
    /// The response value, when the message was handled.
    pub fn response(&self) -> Option<&Value> {
        match self {
            Handled::Response(value) => Some(value),
            Handled::NotHandled => None,
        }
    }
}

/// Resolves the tab a request concerns: an explicit `tabId` in the payload
/// wins, else the sending tab. Zero is the host's "no tab" marker and
/// counts as missing.
fn resolve_tab(payload: &Value, sender_tab: Option<TabId>) -> Option<TabId> {
    payload
        .get("tabId")
        .and_then(|v| v.as_u64())
        .map(|t| t as TabId)
        .filter(|&t| t != 0)
        .or(sender_tab)
}

/// Dispatches one background-bound message.
///
/// `sender_tab` is the tab of the sending content script, when the message
/// came from one; popup messages carry no sender tab and address tabs
/// explicitly in the payload.
pub fn handle_message(
    app: &Mutex<App>,
    action: &str,
    payload: &Value,
    sender_tab: Option<TabId>,
) -> Handled {
    match action {
        "toggle-speed" => {
            let Ok(mut a) = app.lock() else {
                return Handled::Response(json!({ "success": false }));
            };
            match sender_tab {
                // A content script toggles its own tab, possibly with a
                // shortcut-specific speed.
                Some(tab) => a.toggle_tab(tab, payload.get("speed")),
                // No sender tab: the global command path, resolved against
                // the active tab with the configured toggle speed.
                None => a.toggle_active_tab(None),
            }
            Handled::Response(json!({ "success": true }))
        }
        "get-tab-speed" => {
            let Some(tab) = resolve_tab(payload, sender_tab) else {
                return Handled::Response(json!({ "success": false }));
            };
            let Ok(a) = app.lock() else {
                return Handled::Response(json!({ "success": false }));
            };
            let speed = a.speed_store.get_tab_speed(tab);
            Handled::Response(json!({ "success": true, "speed": speed }))
        }
        "set-tab-speed" => {
            let Some(tab) = resolve_tab(payload, sender_tab) else {
                return Handled::Response(json!({ "success": false }));
            };
            let next = clamp_speed(payload.get("speed"), DEFAULT_SPEED);
            let Ok(mut a) = app.lock() else {
                return Handled::Response(json!({ "success": false }));
            };
            let stored = a.set_tab_speed(tab, next);
            Handled::Response(json!({ "success": true, "speed": stored }))
        }
        "mediaStatus" => {
            let reported = payload.get("mediaStatus");
            let tab = sender_tab.or_else(|| {
                reported
                    .and_then(|s| s.get("tabId"))
                    .and_then(|v| v.as_u64())
                    .map(|t| t as TabId)
                    .filter(|&t| t != 0)
            });
            let Some(tab) = tab else {
                return Handled::Response(json!({ "success": false }));
            };
            // Malformed shapes degrade to defaults; see taxonomy in the
            // settings normalizer.
            let status: MediaStatus = reported
                .cloned()
                .map(|v| serde_json::from_value(v).unwrap_or_default())
                .unwrap_or_default();
            let Ok(mut a) = app.lock() else {
                return Handled::Response(json!({ "success": false }));
            };
            a.media_registry.report(tab, status);
            Handled::Response(json!({ "success": true }))
        }
        "get-media-status" => {
            let Some(tab) = resolve_tab(payload, sender_tab) else {
                return Handled::Response(json!({ "success": false }));
            };
            let Ok(a) = app.lock() else {
                return Handled::Response(json!({ "success": false }));
            };
            let status = a
                .media_registry
                .get(tab)
                .map(|s| json!(s))
                .unwrap_or(Value::Null);
            Handled::Response(json!({ "success": true, "mediaStatus": status }))
        }
        _ => Handled::NotHandled,
    }
}
