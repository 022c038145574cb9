//! Capability interface over the page's DOM.
//!
//! The media controller never touches a concrete DOM; the embedding layer
//! implements these traits over real elements, and tests implement them
//! over a fake tree. Identity is by numeric id: handles to the same
//! underlying element must report the same id.

use std::rc::Rc;

/// Handle to one media element (video or audio).
pub trait MediaHandle {
    /// Stable identity of the underlying element.
    fn media_id(&self) -> u64;
    fn is_video(&self) -> bool;
    /// Seconds; may be NaN or infinite before metadata loads.
    fn duration(&self) -> f64;
    fn paused(&self) -> bool;
    fn playback_rate(&self) -> f64;
    fn set_playback_rate(&self, rate: f64);
    fn default_playback_rate(&self) -> f64;
    fn set_default_playback_rate(&self, rate: f64);
    /// Forces pitch preservation across rate changes. Implementations
    /// swallow platform-specific failures.
    fn set_preserves_pitch(&self, preserve: bool);
    /// Subscribes the controller to rate-change, metadata, play, and pause
    /// events for this element. Idempotence is the controller's job.
    fn watch_events(&self);
}

/// A document or shadow root the controller can observe.
pub trait DomRoot {
    /// Stable identity of the root.
    fn root_id(&self) -> u64;
    /// All media elements currently under this root (light DOM of the root
    /// only; nested shadow roots are separate roots).
    fn query_media(&self) -> Vec<Rc<dyn MediaHandle>>;
    /// Arms child-list mutation observation over the whole subtree.
    fn watch_mutations(&self);
    /// Arms capture-phase keyboard listeners on this root.
    fn watch_keys(&self);
    /// The currently focused element within this root, if any.
    fn active_element(&self) -> Option<Rc<dyn DomNode>>;
    /// For a shadow root, the id of its host element; `None` for documents.
    fn host_id(&self) -> Option<u64>;
    /// The page title, for status reports. Shadow roots defer to their
    /// document.
    fn title(&self) -> String;
    /// The page's hostname, for status reports.
    fn domain(&self) -> String;
}

/// A node delivered by a mutation observation or focus walk.
pub trait DomNode {
    /// Stable identity of the node.
    fn node_id(&self) -> u64;
    /// The node itself, when it is a media element.
    fn as_media(&self) -> Option<Rc<dyn MediaHandle>>;
    /// Media elements among the node's light-DOM descendants.
    fn query_media(&self) -> Vec<Rc<dyn MediaHandle>>;
    /// The node's own shadow root, when it hosts one.
    fn shadow_root(&self) -> Option<Rc<dyn DomRoot>>;
    /// True for text inputs, text areas, and content-editable elements.
    fn is_editable(&self) -> bool;
}

/// One keyboard event as seen by the controller.
pub struct KeyEvent {
    /// The physical key code (`event.code`), e.g. `"F13"` or `"KeyS"`.
    pub code: String,
    /// The event's target node, when the embedder can resolve one.
    pub target: Option<Rc<dyn DomNode>>,
}

/// What the embedder should do with the event after the controller has
/// seen it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDisposition {
    /// Prevent default handling and stop propagation.
    Suppress,
    /// Let the event through untouched.
    Pass,
}
