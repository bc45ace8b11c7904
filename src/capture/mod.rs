//! Request capture
//!
//! The pieces the listener composes for every inbound request: a classifier
//! that maps the request target onto a logical upstream, a redaction policy
//! for display, a bounded store that keeps the captures, and the diagnostic
//! rendering emitted to the log.

pub mod classifier;
pub mod redaction;
pub mod render;
pub mod store;
pub mod types;

pub use classifier::{ClassificationRule, RequestClassifier};
pub use redaction::RedactionPolicy;
pub use render::render_capture;
pub use store::{CaptureStore, StoreState};
pub use types::{CaptureSummary, CapturedRequest, TargetKind};
