// src/sources/mod.rs
//! Capture sources
//!
//! Each source owns one pipeline and feeds it from the host surface:
//!
//! - **DOM**: typed page-view and click records
//! - **Replay**: opaque events from the lazily loaded screen recorder
//! - **Selector**: structural shaping of clicked-element descriptions
//! - **Recorder**: the external recorder seam and its memoized resolution

pub mod dom;
pub mod recorder;
pub mod replay;
pub mod selector;

pub use dom::{DomCaptureSource, TrackedEvent, CLICK_EVENT, PAGE_VIEW_EVENT};
pub use recorder::{EmitFn, RecorderCapability, RecorderLoader, RecordingHandle, ScreenRecorder};
pub use replay::ReplayCaptureSource;
