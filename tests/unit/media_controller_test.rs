//! Unit tests for the content-side media controller, driven through a fake
//! DOM tree implementing the capability traits.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{Duration, Instant};

use serde_json::{json, Value};

use speedgear::bus::{SendOutcome, Uplink};
use speedgear::content::dom::{DomNode, DomRoot, KeyDisposition, KeyEvent, MediaHandle};
use speedgear::content::MediaController;
use speedgear::router::Handled;

// ─── Fake DOM ───

struct FakeMedia {
    id: u64,
    video: bool,
    duration: Cell<f64>,
    paused: Cell<bool>,
    rate: Cell<f64>,
    default_rate: Cell<f64>,
    pitch: Cell<bool>,
    rate_writes: Cell<u32>,
    watch_count: Cell<u32>,
}

impl FakeMedia {
    fn new(id: u64) -> Rc<Self> {
        Rc::new(Self {
            id,
            video: true,
            duration: Cell::new(120.0),
            paused: Cell::new(false),
            rate: Cell::new(1.0),
            default_rate: Cell::new(1.0),
            pitch: Cell::new(false),
            rate_writes: Cell::new(0),
            watch_count: Cell::new(0),
        })
    }
}

impl MediaHandle for FakeMedia {
    fn media_id(&self) -> u64 {
        self.id
    }
    fn is_video(&self) -> bool {
        self.video
    }
    fn duration(&self) -> f64 {
        self.duration.get()
    }
    fn paused(&self) -> bool {
        self.paused.get()
    }
    fn playback_rate(&self) -> f64 {
        self.rate.get()
    }
    fn set_playback_rate(&self, rate: f64) {
        self.rate.set(rate);
        self.rate_writes.set(self.rate_writes.get() + 1);
    }
    fn default_playback_rate(&self) -> f64 {
        self.default_rate.get()
    }
    fn set_default_playback_rate(&self, rate: f64) {
        self.default_rate.set(rate);
    }
    fn set_preserves_pitch(&self, preserve: bool) {
        self.pitch.set(preserve);
    }
    fn watch_events(&self) {
        self.watch_count.set(self.watch_count.get() + 1);
    }
}

struct FakeRoot {
    id: u64,
    host: Option<u64>,
    media: RefCell<Vec<Rc<FakeMedia>>>,
    active: RefCell<Option<Rc<FakeNode>>>,
    title: RefCell<String>,
    mutations_armed: Cell<bool>,
    keys_armed: Cell<u32>,
}

impl FakeRoot {
    fn document() -> Rc<Self> {
        Rc::new(Self {
            id: 1,
            host: None,
            media: RefCell::new(Vec::new()),
            active: RefCell::new(None),
            title: RefCell::new("A Page".to_string()),
            mutations_armed: Cell::new(false),
            keys_armed: Cell::new(0),
        })
    }

    fn shadow(id: u64, host: u64) -> Rc<Self> {
        Rc::new(Self {
            id,
            host: Some(host),
            media: RefCell::new(Vec::new()),
            active: RefCell::new(None),
            title: RefCell::new(String::new()),
            mutations_armed: Cell::new(false),
            keys_armed: Cell::new(0),
        })
    }
}

impl DomRoot for FakeRoot {
    fn root_id(&self) -> u64 {
        self.id
    }
    fn query_media(&self) -> Vec<Rc<dyn MediaHandle>> {
        self.media
            .borrow()
            .iter()
            .map(|m| m.clone() as Rc<dyn MediaHandle>)
            .collect()
    }
    fn watch_mutations(&self) {
        self.mutations_armed.set(true);
    }
    fn watch_keys(&self) {
        self.keys_armed.set(self.keys_armed.get() + 1);
    }
    fn active_element(&self) -> Option<Rc<dyn DomNode>> {
        self.active
            .borrow()
            .clone()
            .map(|n| n as Rc<dyn DomNode>)
    }
    fn host_id(&self) -> Option<u64> {
        self.host
    }
    fn title(&self) -> String {
        self.title.borrow().clone()
    }
    fn domain(&self) -> String {
        "media.example".to_string()
    }
}

struct FakeNode {
    id: u64,
    media: Option<Rc<FakeMedia>>,
    descendants: Vec<Rc<FakeMedia>>,
    shadow: Option<Rc<FakeRoot>>,
    editable: bool,
}

impl FakeNode {
    fn plain(id: u64) -> Rc<Self> {
        Rc::new(Self {
            id,
            media: None,
            descendants: Vec::new(),
            shadow: None,
            editable: false,
        })
    }

    fn media(id: u64, media: Rc<FakeMedia>) -> Rc<Self> {
        Rc::new(Self {
            id,
            media: Some(media),
            descendants: Vec::new(),
            shadow: None,
            editable: false,
        })
    }

    fn with_descendants(id: u64, descendants: Vec<Rc<FakeMedia>>) -> Rc<Self> {
        Rc::new(Self {
            id,
            media: None,
            descendants,
            shadow: None,
            editable: false,
        })
    }

    fn with_shadow(id: u64, shadow: Rc<FakeRoot>) -> Rc<Self> {
        Rc::new(Self {
            id,
            media: None,
            descendants: Vec::new(),
            shadow: Some(shadow),
            editable: false,
        })
    }

    fn editable(id: u64) -> Rc<Self> {
        Rc::new(Self {
            id,
            media: None,
            descendants: Vec::new(),
            shadow: None,
            editable: true,
        })
    }
}

impl DomNode for FakeNode {
    fn node_id(&self) -> u64 {
        self.id
    }
    fn as_media(&self) -> Option<Rc<dyn MediaHandle>> {
        self.media.clone().map(|m| m as Rc<dyn MediaHandle>)
    }
    fn query_media(&self) -> Vec<Rc<dyn MediaHandle>> {
        self.descendants
            .iter()
            .map(|m| m.clone() as Rc<dyn MediaHandle>)
            .collect()
    }
    fn shadow_root(&self) -> Option<Rc<dyn DomRoot>> {
        self.shadow.clone().map(|r| r as Rc<dyn DomRoot>)
    }
    fn is_editable(&self) -> bool {
        self.editable
    }
}

/// Uplink that records everything the controller sends.
#[derive(Clone, Default)]
struct RecordingUplink {
    sent: Rc<RefCell<Vec<Value>>>,
}

impl Uplink for RecordingUplink {
    fn send(&self, message: Value) -> SendOutcome {
        self.sent.borrow_mut().push(message);
        SendOutcome::Delivered
    }
}

fn setup() -> (Rc<FakeRoot>, MediaController, Rc<RefCell<Vec<Value>>>) {
    let document = FakeRoot::document();
    let uplink = RecordingUplink::default();
    let sent = uplink.sent.clone();
    let controller = MediaController::new(document.clone(), Box::new(uplink));
    (document, controller, sent)
}

fn statuses(sent: &RefCell<Vec<Value>>) -> Vec<Value> {
    sent.borrow()
        .iter()
        .filter(|m| m["action"] == json!("mediaStatus"))
        .cloned()
        .collect()
}

// ─── Discovery and tracking ───

#[test]
fn test_start_tracks_existing_media_and_queries_speed() {
    let (document, mut controller, sent) = setup();
    let media = FakeMedia::new(10);
    document.media.borrow_mut().push(media.clone());

    controller.start();

    assert_eq!(media.watch_count.get(), 1);
    assert!(media.pitch.get());
    assert!(document.mutations_armed.get());
    assert_eq!(document.keys_armed.get(), 1);
    assert_eq!(sent.borrow()[0]["action"], json!("get-tab-speed"));
}

#[test]
fn test_tracking_is_idempotent() {
    let (document, mut controller, _sent) = setup();
    let media = FakeMedia::new(10);
    document.media.borrow_mut().push(media.clone());

    controller.start();
    let now = Instant::now();
    controller.on_nodes_added(&[FakeNode::media(50, media.clone()) as Rc<dyn DomNode>], now);
    controller.tick(now + Duration::from_secs(1));

    // Still subscribed exactly once.
    assert_eq!(media.watch_count.get(), 1);
}

#[test]
fn test_added_shadow_roots_are_observed_recursively() {
    let (_document, mut controller, _sent) = setup();
    controller.start();
    controller.adopt_tab_speed(150);

    // A host node carrying a shadow root that already contains media.
    let inner = FakeMedia::new(20);
    let shadow = FakeRoot::shadow(2, 100);
    shadow.media.borrow_mut().push(inner.clone());
    let host = FakeNode::with_shadow(100, shadow.clone());

    controller.on_nodes_added(&[host as Rc<dyn DomNode>], Instant::now());

    assert!(shadow.mutations_armed.get());
    assert_eq!(shadow.keys_armed.get(), 1);
    assert_eq!(inner.watch_count.get(), 1);
    assert!((inner.rate.get() - 1.5).abs() < 1e-9);

    // Media added later inside the shadow root is picked up by the
    // coalesced rescan.
    let late = FakeMedia::new(21);
    shadow.media.borrow_mut().push(late.clone());
    let now = Instant::now();
    controller.on_nodes_added(&[FakeNode::plain(101) as Rc<dyn DomNode>], now);
    controller.tick(now + Duration::from_millis(500));
    assert_eq!(late.watch_count.get(), 1);
}

#[test]
fn test_rescan_is_debounced_and_coalesced() {
    let (document, mut controller, _sent) = setup();
    controller.start();

    let media = FakeMedia::new(30);
    document.media.borrow_mut().push(media.clone());

    let t0 = Instant::now();
    // A burst of mutations within one window collapses to one rescan.
    controller.on_nodes_added(&[FakeNode::plain(60) as Rc<dyn DomNode>], t0);
    controller.on_nodes_added(&[FakeNode::plain(61) as Rc<dyn DomNode>], t0 + Duration::from_millis(100));
    controller.on_nodes_added(&[FakeNode::plain(62) as Rc<dyn DomNode>], t0 + Duration::from_millis(200));
    assert!(controller.rescan_pending());

    // Before the deadline nothing has been scanned.
    controller.tick(t0 + Duration::from_millis(400));
    assert_eq!(media.watch_count.get(), 0);

    // The window opened at the first schedule, not the last.
    controller.tick(t0 + Duration::from_millis(500));
    assert_eq!(media.watch_count.get(), 1);
    assert!(!controller.rescan_pending());
}

#[test]
fn test_media_count_ignores_shadow_roots() {
    let (document, mut controller, _sent) = setup();
    controller.start();

    document.media.borrow_mut().push(FakeMedia::new(40));
    let shadow = FakeRoot::shadow(2, 100);
    shadow.media.borrow_mut().push(FakeMedia::new(41));
    controller.on_nodes_added(
        &[FakeNode::with_shadow(100, shadow) as Rc<dyn DomNode>],
        Instant::now(),
    );

    // The popup's fallback probe counts the document's light DOM only.
    assert_eq!(controller.media_count(), 1);
}

// ─── Rate enforcement ───

#[test]
fn test_adopt_tab_speed_enforces_on_all_media() {
    let (document, mut controller, _sent) = setup();
    let media = FakeMedia::new(10);
    document.media.borrow_mut().push(media.clone());
    controller.start();

    controller.adopt_tab_speed(150);
    assert!((media.rate.get() - 1.5).abs() < 1e-9);
    assert!((media.default_rate.get() - 1.5).abs() < 1e-9);
    assert!((controller.current_rate() - 1.5).abs() < 1e-9);
}

#[test]
fn test_adopted_speed_is_clamped_to_rate_range() {
    let (_document, mut controller, _sent) = setup();
    controller.adopt_tab_speed(2000);
    assert!((controller.current_rate() - 20.0).abs() < 1e-9);
    controller.adopt_tab_speed(1);
    assert!((controller.current_rate() - 0.01).abs() < 1e-9);
}

#[test]
fn test_write_within_tolerance_is_skipped() {
    let (document, mut controller, _sent) = setup();
    let media = FakeMedia::new(10);
    document.media.borrow_mut().push(media.clone());
    controller.start();
    controller.adopt_tab_speed(150);

    let writes = media.rate_writes.get();
    // Drift within the tolerance must not re-issue a write.
    media.rate.set(1.5005);
    let handle: Rc<dyn MediaHandle> = media.clone();
    controller.on_media_event(&handle, Instant::now());
    assert_eq!(media.rate_writes.get(), writes);
}

#[test]
fn test_external_rate_change_is_reverted_and_reported() {
    let (document, mut controller, sent) = setup();
    let media = FakeMedia::new(10);
    document.media.borrow_mut().push(media.clone());
    controller.start();
    controller.adopt_tab_speed(150);

    media.rate.set(2.0);
    let handle: Rc<dyn MediaHandle> = media.clone();
    controller.on_media_event(&handle, Instant::now());

    assert!((media.rate.get() - 1.5).abs() < 1e-9);
    assert_eq!(statuses(&sent).len(), 1);
}

// ─── Status throttling ───

#[test]
fn test_identical_status_within_window_is_suppressed() {
    let (document, mut controller, sent) = setup();
    let media = FakeMedia::new(10);
    document.media.borrow_mut().push(media.clone());
    controller.start();

    let t0 = Instant::now();
    let handle: Rc<dyn MediaHandle> = media.clone();

    media.rate.set(2.0);
    controller.on_media_event(&handle, t0);
    media.rate.set(2.0);
    controller.on_media_event(&handle, t0 + Duration::from_millis(100));
    assert_eq!(statuses(&sent).len(), 1);

    // The same status goes out again once the window has passed.
    media.rate.set(2.0);
    controller.on_media_event(&handle, t0 + Duration::from_millis(600));
    assert_eq!(statuses(&sent).len(), 2);
}

#[test]
fn test_changed_status_always_sends() {
    let (document, mut controller, sent) = setup();
    let media = FakeMedia::new(10);
    document.media.borrow_mut().push(media.clone());
    controller.start();

    let t0 = Instant::now();
    let handle: Rc<dyn MediaHandle> = media.clone();

    media.rate.set(2.0);
    controller.on_media_event(&handle, t0);

    // A title change alters the composite key; the report goes out
    // immediately despite the window.
    *document.title.borrow_mut() = "Another Page".to_string();
    media.rate.set(2.0);
    controller.on_media_event(&handle, t0 + Duration::from_millis(100));

    let reports = statuses(&sent);
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[1]["mediaStatus"]["title"], json!("Another Page"));
}

#[test]
fn test_status_maps_non_finite_duration_to_zero() {
    let (document, mut controller, sent) = setup();
    let media = FakeMedia::new(10);
    media.duration.set(f64::NAN);
    media.paused.set(true);
    document.media.borrow_mut().push(media.clone());
    controller.start();

    media.rate.set(2.0);
    let handle: Rc<dyn MediaHandle> = media.clone();
    controller.on_media_event(&handle, Instant::now());

    let report = &statuses(&sent)[0]["mediaStatus"];
    assert_eq!(report["duration"], json!(0.0));
    assert_eq!(report["playing"], json!(false));
    assert_eq!(report["hasVideo"], json!(true));
    assert_eq!(report["domain"], json!("media.example"));
}

// ─── Keyboard shortcuts ───

fn configured(controller: &mut MediaController) {
    controller.apply_settings(&json!({
        "toggleKeyCode": "F13",
        "toggleSpeed": 200,
        "toggleShortcuts": [
            {"keyCode": "KeyS", "speed": 300},
            {"keyCode": "KeyS", "speed": 400}
        ]
    }));
}

#[test]
fn test_matching_keydown_sends_toggle_and_suppresses() {
    let (_document, mut controller, sent) = setup();
    controller.start();
    configured(&mut controller);

    let event = KeyEvent {
        code: "F13".to_string(),
        target: None,
    };
    assert_eq!(controller.on_key_down(&event), KeyDisposition::Suppress);

    let toggles: Vec<Value> = sent
        .borrow()
        .iter()
        .filter(|m| m["action"] == json!("toggle-speed"))
        .cloned()
        .collect();
    assert_eq!(toggles.len(), 1);
    assert_eq!(toggles[0]["speed"], json!(200));
}

#[test]
fn test_duplicate_key_codes_first_match_wins() {
    let (_document, mut controller, sent) = setup();
    controller.start();
    configured(&mut controller);

    let event = KeyEvent {
        code: "KeyS".to_string(),
        target: None,
    };
    controller.on_key_down(&event);

    let toggles: Vec<Value> = sent
        .borrow()
        .iter()
        .filter(|m| m["action"] == json!("toggle-speed"))
        .cloned()
        .collect();
    assert_eq!(toggles[0]["speed"], json!(300));
}

#[test]
fn test_unmatched_key_passes_through() {
    let (_document, mut controller, _sent) = setup();
    controller.start();
    configured(&mut controller);

    let event = KeyEvent {
        code: "KeyZ".to_string(),
        target: None,
    };
    assert_eq!(controller.on_key_down(&event), KeyDisposition::Pass);
    assert_eq!(controller.on_key_up(), KeyDisposition::Pass);
}

#[test]
fn test_keyup_suppressed_exactly_once_after_match() {
    let (_document, mut controller, _sent) = setup();
    controller.start();
    configured(&mut controller);

    let event = KeyEvent {
        code: "F13".to_string(),
        target: None,
    };
    controller.on_key_down(&event);
    assert_eq!(controller.on_key_up(), KeyDisposition::Suppress);
    // The guard does not leak onto unrelated subsequent keyups.
    assert_eq!(controller.on_key_up(), KeyDisposition::Pass);
}

#[test]
fn test_editable_target_disables_shortcut() {
    let (_document, mut controller, sent) = setup();
    controller.start();
    configured(&mut controller);

    let event = KeyEvent {
        code: "F13".to_string(),
        target: Some(FakeNode::editable(70) as Rc<dyn DomNode>),
    };
    assert_eq!(controller.on_key_down(&event), KeyDisposition::Pass);
    assert!(sent
        .borrow()
        .iter()
        .all(|m| m["action"] != json!("toggle-speed")));
}

#[test]
fn test_focus_walk_reaches_nested_shadow_editable() {
    let (document, mut controller, _sent) = setup();
    controller.start();
    configured(&mut controller);

    // Focus chain: document → host node → shadow root → editable field.
    let shadow = FakeRoot::shadow(2, 100);
    *shadow.active.borrow_mut() = Some(FakeNode::editable(71));
    let host = FakeNode::with_shadow(100, shadow);
    *document.active.borrow_mut() = Some(host);

    let event = KeyEvent {
        code: "F13".to_string(),
        target: None,
    };
    assert_eq!(controller.on_key_down(&event), KeyDisposition::Pass);
}

#[test]
fn test_focus_walk_uses_known_shadow_roots_for_hosts() {
    let (document, mut controller, _sent) = setup();
    controller.start();
    configured(&mut controller);

    // The shadow root was discovered through a mutation; the focused host
    // node itself does not expose it.
    let shadow = FakeRoot::shadow(2, 100);
    *shadow.active.borrow_mut() = Some(FakeNode::editable(72));
    controller.on_nodes_added(
        &[FakeNode::with_shadow(100, shadow) as Rc<dyn DomNode>],
        Instant::now(),
    );
    *document.active.borrow_mut() = Some(FakeNode::plain(100));

    let event = KeyEvent {
        code: "F13".to_string(),
        target: None,
    };
    assert_eq!(controller.on_key_down(&event), KeyDisposition::Pass);
}

// ─── Message handling ───

#[test]
fn test_get_speed_reports_current_rate() {
    let (_document, mut controller, _sent) = setup();
    controller.adopt_tab_speed(150);
    let res = controller.handle_message("getSpeed", &json!({}));
    assert_eq!(res.response().unwrap(), &json!({"speed": 1.5}));
}

#[test]
fn test_apply_speed_updates_rate_and_media() {
    let (document, mut controller, _sent) = setup();
    let media = FakeMedia::new(10);
    document.media.borrow_mut().push(media.clone());
    controller.start();

    let res = controller.handle_message("apply-speed", &json!({"speed": 150}));
    assert_eq!(res.response().unwrap(), &json!({"success": true}));
    assert!((media.rate.get() - 1.5).abs() < 1e-9);

    // String payloads parse the way form inputs arrive.
    controller.handle_message("apply-speed", &json!({"speed": "75"}));
    assert!((media.rate.get() - 0.75).abs() < 1e-9);
}

#[test]
fn test_apply_speed_ignores_unparseable_payload() {
    let (_document, mut controller, _sent) = setup();
    controller.adopt_tab_speed(150);
    controller.handle_message("apply-speed", &json!({"speed": "garbage"}));
    assert!((controller.current_rate() - 1.5).abs() < 1e-9);
}

#[test]
fn test_get_media_count_message() {
    let (document, mut controller, _sent) = setup();
    document.media.borrow_mut().push(FakeMedia::new(10));
    document.media.borrow_mut().push(FakeMedia::new(11));
    controller.start();

    let res = controller.handle_message("get-media-count", &json!({}));
    assert_eq!(res.response().unwrap(), &json!({"count": 2}));
}

#[test]
fn test_unknown_action_is_declined() {
    let (_document, mut controller, _sent) = setup();
    let res = controller.handle_message("bookmark.add", &json!({}));
    assert_eq!(res, Handled::NotHandled);
}
