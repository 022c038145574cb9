use serde::{Deserialize, Serialize};

/// Snapshot of a tab's media state, reported by the content controller and
/// cached per tab in the background process.
///
/// Every field carries a serde default so a stale or hand-edited report
/// degrades to harmless values instead of failing deserialization.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MediaStatus {
    #[serde(default)]
    pub tab_id: u32,
    #[serde(default)]
    pub has_video: bool,
    #[serde(default)]
    pub domain: String,
    /// Seconds; 0 when the element has no finite duration yet.
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub playing: bool,
}

/// Hardware-supported playback rate range enforced on media elements.
pub const MIN_RATE: f64 = 0.01;
pub const MAX_RATE: f64 = 20.0;

/// A rate write is skipped when the element is already within this distance
/// of the desired rate; the check doubles as re-entrancy protection for
/// rate-change handlers.
pub const RATE_EPSILON: f64 = 0.001;
