//! Timer-state machines for the content controller.
//!
//! Both machines take the current instant as a parameter instead of reading
//! a clock, so their behavior is deterministic under test.

use std::time::{Duration, Instant};

/// Coalescing one-shot debouncer for media rescans.
///
/// `schedule` while idle arms a deadline one window ahead; `schedule` while
/// pending does nothing — a burst of mutations collapses to at most one
/// rescan per window start. `poll` reports (and consumes) an elapsed
/// deadline.
#[derive(Debug)]
pub struct RescanDebouncer {
    window: Duration,
    deadline: Option<Instant>,
}

impl RescanDebouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    /// Requests a rescan. Returns true when this call armed the timer.
    pub fn schedule(&mut self, now: Instant) -> bool {
        if self.deadline.is_some() {
            return false;
        }
        self.deadline = Some(now + self.window);
        true
    }

    /// True when the deadline has passed; resets to idle when it fires.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }
}

/// Keyed suppression window for upstream status reports.
///
/// An identical key within the window is suppressed; a changed key is always
/// admitted and restarts the window.
#[derive(Debug)]
pub struct StatusThrottle {
    window: Duration,
    last_key: Option<String>,
    last_at: Option<Instant>,
}

impl StatusThrottle {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_key: None,
            last_at: None,
        }
    }

    /// Returns true when a report with this key should go out now.
    pub fn admit(&mut self, key: &str, now: Instant) -> bool {
        if let (Some(last_key), Some(last_at)) = (self.last_key.as_deref(), self.last_at) {
            if last_key == key && now.duration_since(last_at) < self.window {
                return false;
            }
        }
        self.last_key = Some(key.to_string());
        self.last_at = Some(now);
        true
    }
}
