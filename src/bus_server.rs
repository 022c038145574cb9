//! SpeedGear bus server — newline-delimited JSON over stdin/stdout.
//!
//! The host process drives the background router through this loop.
//! Request:  {"id":1, "action":"set-tab-speed", "payload":{"tabId":7,"speed":150}, "tabId":7}
//! Response: {"id":1, "result":{...}} or {"id":1, "error":"..."}
//!
//! The optional top-level `tabId` identifies the sending content script;
//! popup-originated requests omit it. Lifecycle events use `event` instead
//! of `action`: {"event":"tab-removed","tabId":7} and
//! {"event":"active-tab","tabId":7}.

use std::io::{self, BufRead, Write};
use std::sync::Mutex;

use serde_json::{json, Value};

use speedgear::app::App;
use speedgear::bus::NullOutbox;
use speedgear::router::{handle_message, Handled};
use speedgear::types::TabId;

fn main() {
    let sync_path = std::env::var("SPEEDGEAR_DATA_DIR")
        .map(|dir| std::path::PathBuf::from(dir).join("speedgear-sync.db"))
        .ok();
    let app = {
        let path = sync_path.as_ref().and_then(|p| p.to_str());
        let mut app = App::new(path, Box::new(NullOutbox)).expect("Failed to open synced store");
        app.startup();
        Mutex::new(app)
    };

    // Signal ready
    let ready = json!({ "event": "ready", "version": env!("CARGO_PKG_VERSION") });
    println!("{}", ready);
    io::stdout().flush().unwrap();

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                let err = json!({ "id": null, "error": format!("parse error: {}", e) });
                println!("{}", err);
                io::stdout().flush().unwrap();
                continue;
            }
        };

        let id = req.get("id").cloned().unwrap_or(Value::Null);
        let sender_tab = req
            .get("tabId")
            .and_then(|v| v.as_u64())
            .map(|t| t as TabId)
            .filter(|&t| t != 0);

        // Lifecycle events have no response beyond an acknowledgement.
        if let Some(event) = req.get("event").and_then(|v| v.as_str()) {
            match event {
                "tab-removed" => {
                    if let (Some(tab), Ok(mut a)) = (sender_tab, app.lock()) {
                        a.on_tab_removed(tab);
                    }
                }
                "active-tab" => {
                    if let Ok(mut a) = app.lock() {
                        a.set_active_tab(sender_tab);
                    }
                }
                "command" => {
                    let name = req.get("name").and_then(|v| v.as_str()).unwrap_or("");
                    if let Ok(mut a) = app.lock() {
                        a.on_command(name);
                    }
                }
                _ => {}
            }
            println!("{}", json!({ "id": id, "result": { "ok": true } }));
            io::stdout().flush().unwrap();
            continue;
        }

        let action = req.get("action").and_then(|v| v.as_str()).unwrap_or("");
        let payload = req.get("payload").cloned().unwrap_or(json!({}));

        let response = match handle_message(&app, action, &payload, sender_tab) {
            Handled::Response(result) => json!({ "id": id, "result": result }),
            Handled::NotHandled => {
                json!({ "id": id, "error": format!("unknown action: {}", action) })
            }
        };
        println!("{}", response);
        io::stdout().flush().unwrap();
    }
}
