//! Cross-context message fabric.
//!
//! The three runtime contexts (background, per-tab content, popup) share no
//! memory; they communicate only by sending JSON messages. Delivery is
//! best-effort: a closed tab, an unloaded frame, or an absent popup simply
//! has no receiver, and the send degrades to a silent no-op. Every send
//! therefore returns a [`SendOutcome`] that calling code explicitly
//! discards — the contract is fire-and-forget, not retry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::types::TabId;

/// Result of a best-effort cross-context send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// A receiver existed and the message was queued to it.
    Delivered,
    /// No receiver was registered (closed tab, unloaded frame, no popup).
    NoReceiver,
}

impl SendOutcome {
    pub fn delivered(self) -> bool {
        matches!(self, SendOutcome::Delivered)
    }
}

/// Background-side sender: addresses a tab's content context or broadcasts
/// to whatever UI surface is currently listening.
pub trait Outbox: Send {
    fn send_to_tab(&self, tab_id: TabId, message: Value) -> SendOutcome;
    fn broadcast(&self, message: Value) -> SendOutcome;
}

/// Content-side sender: messages flow up to the background context.
pub trait Uplink {
    fn send(&self, message: Value) -> SendOutcome;
}

/// In-process channel bus standing in for the host's message passing.
///
/// Each content context registers a per-tab endpoint; at most one UI surface
/// (the popup) registers the broadcast endpoint. Receivers that have been
/// dropped count as missing.
#[derive(Clone, Default)]
pub struct ChannelBus {
    tabs: Arc<Mutex<HashMap<TabId, UnboundedSender<Value>>>>,
    ui: Arc<Mutex<Option<UnboundedSender<Value>>>>,
}

impl ChannelBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tab's content endpoint, replacing any previous one for
    /// the same tab. Dropping the receiver makes the tab unreachable again.
    pub fn register_tab(&self, tab_id: TabId) -> UnboundedReceiver<Value> {
        let (tx, rx) = unbounded_channel();
        self.tabs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(tab_id, tx);
        rx
    }

    /// Removes a tab's endpoint, typically on tab close.
    pub fn unregister_tab(&self, tab_id: TabId) {
        self.tabs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&tab_id);
    }

    /// Registers the UI broadcast endpoint, replacing any previous one.
    pub fn register_ui(&self) -> UnboundedReceiver<Value> {
        let (tx, rx) = unbounded_channel();
        *self.ui.lock().unwrap_or_else(PoisonError::into_inner) = Some(tx);
        rx
    }

    /// Drops the UI endpoint, typically when the popup closes.
    pub fn unregister_ui(&self) {
        *self.ui.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl Outbox for ChannelBus {
    fn send_to_tab(&self, tab_id: TabId, message: Value) -> SendOutcome {
        let mut tabs = self.tabs.lock().unwrap_or_else(PoisonError::into_inner);
        match tabs.get(&tab_id) {
            Some(tx) => {
                if tx.send(message).is_ok() {
                    SendOutcome::Delivered
                } else {
                    // Receiver dropped without unregistering; treat as closed.
                    tabs.remove(&tab_id);
                    SendOutcome::NoReceiver
                }
            }
            None => SendOutcome::NoReceiver,
        }
    }

    fn broadcast(&self, message: Value) -> SendOutcome {
        let mut ui = self.ui.lock().unwrap_or_else(PoisonError::into_inner);
        match ui.as_ref() {
            Some(tx) => {
                if tx.send(message).is_ok() {
                    SendOutcome::Delivered
                } else {
                    *ui = None;
                    SendOutcome::NoReceiver
                }
            }
            None => SendOutcome::NoReceiver,
        }
    }
}

/// Outbox with no receivers at all; every send is a no-op.
///
/// Used by the bus server binary and by tests that only exercise state.
pub struct NullOutbox;

impl Outbox for NullOutbox {
    fn send_to_tab(&self, _tab_id: TabId, _message: Value) -> SendOutcome {
        SendOutcome::NoReceiver
    }

    fn broadcast(&self, _message: Value) -> SendOutcome {
        SendOutcome::NoReceiver
    }
}

/// Uplink that drops everything, for content controllers under test.
pub struct NullUplink;

impl Uplink for NullUplink {
    fn send(&self, _message: Value) -> SendOutcome {
        SendOutcome::NoReceiver
    }
}

/// Uplink backed by an unbounded channel into the background loop.
pub struct ChannelUplink {
    tx: UnboundedSender<Value>,
}

impl ChannelUplink {
    /// Creates the uplink plus the receiving half the background loop drains.
    pub fn pair() -> (Self, UnboundedReceiver<Value>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Uplink for ChannelUplink {
    fn send(&self, message: Value) -> SendOutcome {
        if self.tx.send(message).is_ok() {
            SendOutcome::Delivered
        } else {
            SendOutcome::NoReceiver
        }
    }
}
