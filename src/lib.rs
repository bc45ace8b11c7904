pub mod capture;
pub mod config;
pub mod error;
pub mod listener;
pub mod metrics;

pub use capture::{CaptureStore, CapturedRequest, TargetKind};
pub use listener::{CaptureListener, ListenerHandle};
