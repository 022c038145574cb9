//! Content-script side of the extension: per-frame media discovery and
//! playback-rate enforcement.
//!
//! The concrete DOM is reached only through the capability traits in
//! [`dom`], so the controller is testable against a fake tree.

pub mod controller;
pub mod dom;
pub mod timers;

pub use controller::MediaController;
