//! Per-frame media controller.
//!
//! Discovers media elements (including inside shadow DOM), enforces the
//! tab's current playback rate on them, detects externally-driven rate
//! changes, reports media presence upstream, and intercepts configured
//! keyboard shortcuts. One controller instance runs per frame.

use std::collections::HashSet;
use std::rc::Rc;
use std::time::{Duration, Instant};

use serde_json::{json, Value};

use crate::bus::Uplink;
use crate::content::dom::{DomNode, DomRoot, KeyDisposition, KeyEvent, MediaHandle};
use crate::content::timers::{RescanDebouncer, StatusThrottle};
use crate::router::Handled;
use crate::services::settings_engine::{build_shortcut_list, clamp_speed};
use crate::types::media::{MediaStatus, MAX_RATE, MIN_RATE, RATE_EPSILON};
use crate::types::settings::{
    ToggleShortcut, DEFAULT_TOGGLE_KEY, DEFAULT_TOGGLE_SPEED,
};

/// Debounce window for mutation-driven rescans.
const RESCAN_WINDOW: Duration = Duration::from_millis(500);
/// Suppression window for identical upstream status reports.
const STATUS_WINDOW: Duration = Duration::from_millis(500);

/// The frame's default playback rate (100%).
const DEFAULT_RATE: f64 = 1.0;

/// Clamps a rate into the hardware-supported range, falling back when the
/// input is not finite.
fn to_rate(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(MIN_RATE, MAX_RATE)
    } else {
        fallback
    }
}

/// Parses a message payload field to a rate factor.
fn value_to_number(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

/// Per-frame media controller.
pub struct MediaController {
    document: Rc<dyn DomRoot>,
    uplink: Box<dyn Uplink>,

    /// True playback rate currently enforced on every tracked element.
    current_rate: f64,

    toggle_key_code: String,
    toggle_speed: u32,
    /// Raw stored secondary shortcut list, kept for rebuilds when a single
    /// synced key changes.
    stored_shortcuts: Value,
    shortcuts: Vec<ToggleShortcut>,

    tracked_media: HashSet<u64>,
    observed_roots: HashSet<u64>,
    key_roots: HashSet<u64>,
    shadow_roots: Vec<Rc<dyn DomRoot>>,

    debouncer: RescanDebouncer,
    throttle: StatusThrottle,

    /// Set when a keydown matched a shortcut; the next keyup is suppressed
    /// exactly once.
    block_key_up: bool,
}

impl MediaController {
    pub fn new(document: Rc<dyn DomRoot>, uplink: Box<dyn Uplink>) -> Self {
        Self {
            document,
            uplink,
            current_rate: DEFAULT_RATE,
            toggle_key_code: DEFAULT_TOGGLE_KEY.to_string(),
            toggle_speed: DEFAULT_TOGGLE_SPEED,
            stored_shortcuts: Value::Null,
            shortcuts: Vec::new(),
            tracked_media: HashSet::new(),
            observed_roots: HashSet::new(),
            key_roots: HashSet::new(),
            shadow_roots: Vec::new(),
            debouncer: RescanDebouncer::new(RESCAN_WINDOW),
            throttle: StatusThrottle::new(STATUS_WINDOW),
            block_key_up: false,
        }
    }

    /// Starts observation of the frame's document and asks the background
    /// for the tab's current speed. The speed answer arrives later via
    /// [`MediaController::adopt_tab_speed`]; until then the default rate
    /// applies.
    pub fn start(&mut self) {
        self.observe_root(self.document.clone());
        let _ = self.uplink.send(json!({ "action": "get-tab-speed" }));
    }

    /// Applies synced settings (initial read or a change notification):
    /// updates the toggle key, toggle speed, and secondary shortcut list,
    /// then rebuilds the active shortcut list.
    pub fn apply_settings(&mut self, raw: &Value) {
        if let Some(key) = raw.get("toggleKeyCode").and_then(|v| v.as_str()) {
            if !key.is_empty() {
                self.toggle_key_code = key.to_string();
            }
        }
        if raw.get("toggleSpeed").is_some() {
            self.toggle_speed = clamp_speed(raw.get("toggleSpeed"), self.toggle_speed);
        }
        if let Some(list) = raw.get("toggleShortcuts") {
            self.stored_shortcuts = list.clone();
        }
        self.shortcuts = build_shortcut_list(
            Some(&self.stored_shortcuts),
            &self.toggle_key_code,
            self.toggle_speed,
        );
    }

    /// Adopts a stored tab speed (integer percentage) as the current rate
    /// and enforces it on every known media element.
    pub fn adopt_tab_speed(&mut self, speed_percent: i64) {
        self.current_rate = to_rate(speed_percent as f64 / 100.0, DEFAULT_RATE);
        self.apply_to_all();
    }

    pub fn current_rate(&self) -> f64 {
        self.current_rate
    }

    pub fn shortcuts(&self) -> &[ToggleShortcut] {
        &self.shortcuts
    }

    // ─── Discovery ───

    /// Begins observing a document or shadow root: arms key listeners and
    /// mutation observation once per root, remembers shadow roots for later
    /// scans, and tracks the media already under the root. Idempotent.
    pub fn observe_root(&mut self, root: Rc<dyn DomRoot>) {
        if !self.observed_roots.insert(root.root_id()) {
            return;
        }
        if self.key_roots.insert(root.root_id()) {
            root.watch_keys();
        }
        root.watch_mutations();
        if root.host_id().is_some() {
            self.shadow_roots.push(root.clone());
        }
        for media in root.query_media() {
            self.track(media);
        }
    }

    /// UNTRACKED → TRACKED, idempotent. On first observation the element is
    /// subscribed and the current rate enforced immediately.
    pub fn track(&mut self, media: Rc<dyn MediaHandle>) {
        if !self.tracked_media.insert(media.media_id()) {
            return;
        }
        self.enforce_rate(media.as_ref());
        media.watch_events();
    }

    /// Mutation callback: newly added nodes are scanned incrementally (the
    /// node itself, its descendants, and recursively any shadow root it
    /// hosts), and a coalesced full rescan is scheduled.
    pub fn on_nodes_added(&mut self, nodes: &[Rc<dyn DomNode>], now: Instant) {
        for node in nodes {
            if let Some(media) = node.as_media() {
                self.track(media);
            } else {
                for media in node.query_media() {
                    self.track(media);
                }
            }
            if let Some(shadow) = node.shadow_root() {
                self.observe_root(shadow);
            }
        }
        self.debouncer.schedule(now);
    }

    /// Drives pending timers; the embedder calls this when the debounce
    /// deadline passes.
    pub fn tick(&mut self, now: Instant) {
        if self.debouncer.poll(now) {
            self.rescan();
        }
    }

    pub fn rescan_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Full scan over the document and every known shadow root.
    fn rescan(&mut self) {
        for media in self.all_media() {
            self.track(media);
        }
    }

    /// Every media element under the document or a known shadow root,
    /// deduplicated by identity.
    fn all_media(&self) -> Vec<Rc<dyn MediaHandle>> {
        let mut seen = HashSet::new();
        let mut media = Vec::new();
        for handle in self
            .document
            .query_media()
            .into_iter()
            .chain(self.shadow_roots.iter().flat_map(|root| root.query_media()))
        {
            if seen.insert(handle.media_id()) {
                media.push(handle);
            }
        }
        media
    }

    /// Media element count used by the popup's fallback probe. Counts the
    /// light DOM of the document only.
    pub fn media_count(&self) -> usize {
        self.document.query_media().len()
    }

    // ─── Rate enforcement ───

    /// Writes the current rate to one element, within tolerance. Pitch
    /// preservation is forced on every enforcement pass; the actual and
    /// default rates are each written only when they differ from the target
    /// by more than the tolerance, so a forced write cannot re-trigger the
    /// handler.
    fn enforce_rate(&self, media: &dyn MediaHandle) {
        let target = to_rate(self.current_rate, DEFAULT_RATE);
        media.set_preserves_pitch(true);
        if (media.playback_rate() - target).abs() > RATE_EPSILON {
            media.set_playback_rate(target);
        }
        if (media.default_playback_rate() - target).abs() > RATE_EPSILON {
            media.set_default_playback_rate(target);
        }
    }

    fn apply_to_all(&self) {
        for media in self.all_media() {
            self.enforce_rate(media.as_ref());
        }
    }

    /// Handler for tracked media events (rate change, metadata load, play,
    /// pause). An element already within tolerance of the desired rate is
    /// left alone; otherwise the rate is re-enforced and a status report
    /// goes upstream.
    pub fn on_media_event(&mut self, media: &Rc<dyn MediaHandle>, now: Instant) {
        if (media.playback_rate() - self.current_rate).abs() <= RATE_EPSILON {
            return;
        }
        self.enforce_rate(media.as_ref());
        self.send_status(media.as_ref(), now);
    }

    // ─── Status reporting ───

    fn media_status(&self, media: &dyn MediaHandle) -> MediaStatus {
        let duration = media.duration();
        MediaStatus {
            tab_id: 0,
            has_video: media.is_video(),
            domain: self.document.domain(),
            duration: if duration.is_finite() { duration } else { 0.0 },
            title: self.document.title(),
            playing: !media.paused(),
        }
    }

    /// Sends a media status upstream, throttled per document: an identical
    /// status (by composite key) within the window is suppressed, a changed
    /// one always goes out.
    fn send_status(&mut self, media: &dyn MediaHandle, now: Instant) {
        let status = self.media_status(media);
        let key = format!(
            "{}|{}|{:.2}|{}|{}",
            u8::from(status.playing),
            u8::from(status.has_video),
            status.duration,
            status.domain,
            status.title
        );
        if !self.throttle.admit(&key, now) {
            return;
        }
        let _ = self.uplink.send(json!({
            "action": "mediaStatus",
            "mediaStatus": status,
        }));
    }

    // ─── Keyboard shortcuts ───

    /// The innermost focused element, walking through nested shadow-root
    /// active elements.
    fn leaf_active_element(&self, root: &Rc<dyn DomRoot>) -> Option<Rc<dyn DomNode>> {
        let active = root.active_element()?;
        if let Some(shadow) = self.shadow_root_for(&active) {
            if shadow.active_element().is_some() {
                return self.leaf_active_element(&shadow);
            }
        }
        Some(active)
    }

    /// A node's shadow root, falling back to the known shadow roots whose
    /// host is the node (covers roots discovered before the host exposed
    /// them).
    fn shadow_root_for(&self, node: &Rc<dyn DomNode>) -> Option<Rc<dyn DomRoot>> {
        node.shadow_root().or_else(|| {
            self.shadow_roots
                .iter()
                .find(|root| root.host_id() == Some(node.node_id()))
                .cloned()
        })
    }

    /// Keydown interception. When focus is not in an editable control and
    /// the key code matches a configured shortcut (first match wins), the
    /// toggle request is sent upstream, the event is suppressed, and the
    /// matching keyup will be suppressed exactly once.
    pub fn on_key_down(&mut self, event: &KeyEvent) -> KeyDisposition {
        self.block_key_up = false;
        if event
            .target
            .as_ref()
            .is_some_and(|target| target.is_editable())
        {
            return KeyDisposition::Pass;
        }
        if self
            .leaf_active_element(&self.document.clone())
            .is_some_and(|active| active.is_editable())
        {
            return KeyDisposition::Pass;
        }
        let Some(matched) = self
            .shortcuts
            .iter()
            .find(|shortcut| shortcut.key_code == event.code)
        else {
            return KeyDisposition::Pass;
        };
        self.block_key_up = true;
        let _ = self.uplink.send(json!({
            "action": "toggle-speed",
            "speed": matched.speed,
        }));
        KeyDisposition::Suppress
    }

    /// Keyup interception: suppressed once after a matched keydown, then
    /// the guard clears so unrelated keyups pass through.
    pub fn on_key_up(&mut self) -> KeyDisposition {
        if !self.block_key_up {
            return KeyDisposition::Pass;
        }
        self.block_key_up = false;
        KeyDisposition::Suppress
    }

    // ─── Message handling ───

    /// Dispatches a message addressed to this frame. Unrecognized actions
    /// are declined so other listeners can handle them.
    pub fn handle_message(&mut self, action: &str, payload: &Value) -> Handled {
        match action {
            "getSpeed" => Handled::Response(json!({ "speed": self.current_rate })),
            "apply-speed" => {
                let next = value_to_number(payload.get("speed")) / 100.0;
                if next.is_finite() {
                    self.current_rate = to_rate(next, self.current_rate);
                    self.apply_to_all();
                }
                Handled::Response(json!({ "success": true }))
            }
            "get-media-count" => Handled::Response(json!({ "count": self.media_count() })),
            _ => Handled::NotHandled,
        }
    }
}
