// src/capture/mod.rs
//! Capture buffer + flush scheduler
//!
//! The shared engine behind both capture instances:
//!
//! - **Buffer**: ordered in-memory queue with byte-size accounting
//! - **Pipeline**: lifecycle state machine, periodic tick, threshold and
//!   teardown flushes, auth-token gating, pre-auth buffering cap
//! - **Batch**: envelope composition for the two wire shapes
//! - **Resources**: acquisition set released in reverse order on stop
//!
//! # Flow
//!
//! ```text
//! Source → push() → EventBuffer ──threshold──▶ spawned flush
//!                        ▲                          │
//!                   tick (timer)                    ▼
//!                 token refresh &           swap buffer, compose
//!                 logout wipe                batch, deliver once
//! ```
//!
//! Delivery is best-effort: a batch leaves the buffer exactly once and is
//! never redelivered, whatever the transport reports.

pub mod batch;
pub mod buffer;
pub mod pipeline;
pub mod resources;

pub use batch::BatchShape;
pub use buffer::{BufferStats, EventBuffer};
pub use pipeline::{CapturePipeline, LifecycleState, PipelineContext};
pub use resources::ResourceSet;
