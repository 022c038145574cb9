//! SpeedGear — per-tab media playback speed control for a browser extension.
//!
//! Entry point: runs an interactive console demo walking every component.
//! The real extension host drives the library through the `speedgear-bus`
//! binary instead.

fn main() {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               SpeedGear v{} — Demo Mode                   ║", env!("CARGO_PKG_VERSION"));
    println!("║     Per-tab media playback speed coordination core         ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    demo_normalizer();
    demo_sync_store();
    demo_speed_store();
    demo_toggle_engine();
    demo_app_and_router();
    demo_media_controller();
    demo_popup();
    demo_bus();

    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("  ✅ All 8 components demonstrated successfully!");
    println!("═══════════════════════════════════════════════════════════════");
}

fn section(name: &str) {
    println!("───────────────────────────────────────────────────────────────");
    println!("  📦 {}", name);
    println!("───────────────────────────────────────────────────────────────");
}

fn demo_normalizer() {
    use speedgear::services::settings_engine::{normalize_settings, normalize_speed_config};
    section("Settings Normalizer");

    let settings = normalize_settings(&serde_json::json!({
        "speedMin": 300,
        "speedMax": 100,
        "speedStep": "25",
        "presets": [10, 9999, "garbage"],
        "toggleSpeed": 5000,
        "toggleKeyCode": 42
    }));
    println!("  Inverted range swapped: min={} max={}", settings.speed_min, settings.speed_max);
    println!("  Step parsed from string: {}", settings.speed_step);
    println!("  Presets clamped into range: {:?}", settings.presets);
    println!("  Toggle speed clamped: {}", settings.toggle_speed);
    println!("  Toggle key fell back: {}", settings.toggle_key_code);

    let config = normalize_speed_config(&serde_json::json!({}));
    println!("  Empty store yields defaults: step={} range={}..{} lang={}",
        config.step, config.min, config.max, config.current_lang);
    println!("  ✓ Normalizer OK");
    println!();
}

fn demo_sync_store() {
    use speedgear::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
    use speedgear::storage::SyncStore;
    section("Synced Store + Settings Engine");

    let store = SyncStore::open_in_memory().expect("Failed to open store");
    println!("  Fresh store empty: {}", store.is_empty());

    let engine = SettingsEngine::new(&store);
    engine.install_defaults().unwrap();
    println!("  Installed defaults: {} keys", store.keys().len());

    store.set("toggleSpeed", &serde_json::json!(350)).unwrap();
    engine.install_defaults().unwrap();
    let settings = engine.load_settings();
    println!("  Re-install skipped (store not empty): toggleSpeed={}", settings.toggle_speed);

    let shortcuts = engine.shortcut_list();
    println!("  Shortcut list: primary {} @ {}%", shortcuts[0].key_code, shortcuts[0].speed);

    let config = engine.load_speed_config();
    println!("  Popup config: step={} range={}..{}", config.step, config.min, config.max);
    println!("  ✓ SyncStore + SettingsEngine OK");
    println!();
}

fn demo_speed_store() {
    use speedgear::managers::speed_store::{SpeedStore, SpeedStoreTrait};
    section("Per-Tab Speed Store");

    let mut store = SpeedStore::new();
    println!("  Unknown tab defaults: {}", store.get_tab_speed(7));

    let stored = store.set_tab_speed(7, 5000);
    println!("  set(7, 5000) stored clamped: {}", stored);
    println!("  get(7) = {}", store.get_tab_speed(7));

    store.set_tab_speed(9, 150);
    println!("  Tracked tabs: {:?}", {
        let mut tabs = store.tracked_tabs();
        tabs.sort_unstable();
        tabs
    });

    store.evict(7);
    println!("  After evict(7): get(7) = {} (default)", store.get_tab_speed(7));
    println!("  ✓ SpeedStore OK");
    println!();
}

fn demo_toggle_engine() {
    use speedgear::services::toggle_engine::{resolve_target, transition};
    section("Toggle Engine");

    println!("  100 → {}", transition(100, 200));
    println!("  200 → {}", transition(200, 200));
    println!("  175 → {} (any non-default returns to default)", transition(175, 200));
    println!("  Explicit request wins: {}", resolve_target(Some(&serde_json::json!(300)), 200));
    println!("  Out-of-range request clamped: {}", resolve_target(Some(&serde_json::json!(9000)), 200));
    println!("  ✓ ToggleEngine OK");
    println!();
}

fn demo_app_and_router() {
    use std::sync::Mutex;
    use speedgear::app::App;
    use speedgear::bus::NullOutbox;
    use speedgear::router::{handle_message, Handled};
    section("Background App + Message Router");

    let mut app = App::new(None, Box::new(NullOutbox)).expect("Failed to init App");
    app.startup();
    let app = Mutex::new(app);

    let res = handle_message(&app, "get-tab-speed", &serde_json::json!({"tabId": 7}), None);
    println!("  get-tab-speed(7): {}", res.response().unwrap());

    let res = handle_message(&app, "toggle-speed", &serde_json::json!({}), Some(7));
    println!("  toggle-speed from tab 7: {}", res.response().unwrap());
    let res = handle_message(&app, "get-tab-speed", &serde_json::json!({"tabId": 7}), None);
    println!("  after toggle: {}", res.response().unwrap());

    let res = handle_message(&app, "set-tab-speed", &serde_json::json!({"tabId": 7, "speed": 5000}), None);
    println!("  set-tab-speed(7, 5000): {}", res.response().unwrap());

    let res = handle_message(&app, "get-media-status", &serde_json::json!({"tabId": 7}), None);
    println!("  get-media-status(7): {}", res.response().unwrap());

    let res = handle_message(&app, "some-other-extension-action", &serde_json::json!({}), None);
    println!("  foreign action declined: {}", matches!(res, Handled::NotHandled));

    app.lock().unwrap().on_tab_removed(7);
    let res = handle_message(&app, "get-tab-speed", &serde_json::json!({"tabId": 7}), None);
    println!("  after tab close: {}", res.response().unwrap());
    println!("  ✓ App + Router OK");
    println!();
}

fn demo_media_controller() {
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Instant;
    use speedgear::bus::NullUplink;
    use speedgear::content::dom::{DomNode, DomRoot, MediaHandle};
    use speedgear::content::MediaController;
    section("Media Controller (fake DOM)");

    struct DemoMedia {
        id: u64,
        rate: Cell<f64>,
        default_rate: Cell<f64>,
        pitch: Cell<bool>,
    }
    impl MediaHandle for DemoMedia {
        fn media_id(&self) -> u64 {
            self.id
        }
        fn is_video(&self) -> bool {
            true
        }
        fn duration(&self) -> f64 {
            120.0
        }
        fn paused(&self) -> bool {
            false
        }
        fn playback_rate(&self) -> f64 {
            self.rate.get()
        }
        fn set_playback_rate(&self, rate: f64) {
            self.rate.set(rate);
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
        fn watch_events(&self) {}
    }

    struct DemoDocument {
        media: Vec<Rc<DemoMedia>>,
    }
    impl DomRoot for DemoDocument {
        fn root_id(&self) -> u64 {
            1
        }
        fn query_media(&self) -> Vec<Rc<dyn MediaHandle>> {
            self.media
                .iter()
                .map(|m| m.clone() as Rc<dyn MediaHandle>)
                .collect()
        }
        fn watch_mutations(&self) {}
        fn watch_keys(&self) {}
        fn active_element(&self) -> Option<Rc<dyn DomNode>> {
            None
        }
        fn host_id(&self) -> Option<u64> {
            None
        }
        fn title(&self) -> String {
            "Demo Page".to_string()
        }
        fn domain(&self) -> String {
            "demo.example".to_string()
        }
    }

    let media = Rc::new(DemoMedia {
        id: 1,
        rate: Cell::new(1.0),
        default_rate: Cell::new(1.0),
        pitch: Cell::new(false),
    });
    let document = Rc::new(DemoDocument {
        media: vec![media.clone()],
    });

    let mut controller = MediaController::new(document, Box::new(NullUplink));
    controller.start();
    println!("  Tracked {} media element(s)", controller.media_count());

    controller.adopt_tab_speed(150);
    println!("  Adopted 150%: rate={} pitch preserved={}", media.rate.get(), media.pitch.get());

    media.rate.set(2.5);
    let handle: Rc<dyn MediaHandle> = media.clone();
    controller.on_media_event(&handle, Instant::now());
    println!("  External change to 2.5 re-enforced: rate={}", media.rate.get());

    controller.apply_settings(&serde_json::json!({
        "toggleKeyCode": "F13",
        "toggleSpeed": 200,
        "toggleShortcuts": [{"keyCode": "KeyS", "speed": 300}]
    }));
    println!("  Shortcut list: {} entries", controller.shortcuts().len());

    let res = controller.handle_message("getSpeed", &serde_json::json!({}));
    println!("  getSpeed: {}", res.response().unwrap());
    println!("  ✓ MediaController OK");
    println!();
}

fn demo_popup() {
    use std::time::{Duration, Instant};
    use speedgear::popup::{NoMediaNotice, PopupController};
    section("Popup Controller");

    let mut popup = PopupController::new(&serde_json::json!({
        "speedMin": 50, "speedMax": 250, "speedStep": 10,
        "presets": [50, 100, 125, 150, 175, 200]
    }));
    let queries = popup.open(Some(7));
    println!("  Open over tab 7: {} initial queries", queries.len());

    popup.on_speed_response(&serde_json::json!({"success": true, "speed": 400}));
    println!("  Stored 400% shown as {} (slider pinned at {})",
        popup.display_speed(), popup.slider_value());

    let out = popup.step_up();
    println!("  Step up saves: {:?}", out.is_some());

    let now = Instant::now();
    popup.on_status_response(&serde_json::json!({"success": true, "mediaStatus": null}), now);
    println!("  No cached status: probe pending={}", popup.probe_pending());

    let probe = popup.poll(now + Duration::from_secs(2));
    println!("  Probe fired after 2s: {}", probe.is_some());
    popup.on_media_count(&serde_json::json!({"count": 0}));
    println!("  Zero media: notice = {:?}", popup.notice());
    assert_eq!(popup.notice(), NoMediaNotice::Visible);
    println!("  ✓ PopupController OK");
    println!();
}

fn demo_bus() {
    use speedgear::bus::{ChannelBus, Outbox, SendOutcome};
    section("Channel Bus");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("Failed to build runtime");
    runtime.block_on(async {
        let bus = ChannelBus::new();
        let outcome = bus.send_to_tab(7, serde_json::json!({"action": "apply-speed", "speed": 150}));
        println!("  Send to unregistered tab: {:?}", outcome);
        assert_eq!(outcome, SendOutcome::NoReceiver);

        let mut rx = bus.register_tab(7);
        let outcome = bus.send_to_tab(7, serde_json::json!({"action": "apply-speed", "speed": 150}));
        println!("  Send to registered tab: {:?}", outcome);
        let delivered = rx.recv().await.unwrap();
        println!("  Tab received: {}", delivered);

        let mut ui = bus.register_ui();
        bus.broadcast(serde_json::json!({"action": "tab-speed-updated", "tabId": 7, "speed": 150}));
        println!("  UI received: {}", ui.recv().await.unwrap());
    });
    println!("  ✓ ChannelBus OK");
}
