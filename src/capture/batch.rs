// src/capture/batch.rs
//! Outgoing batch envelopes

use crate::session::store::StoredSession;
use crate::utils::errors::Result;
use serde::Serialize;
use serde_json::Value;

/// Which envelope a capture instance sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchShape {
    /// Typed behavior events (page views, clicks)
    DomEvents,
    /// Opaque screen recorder events
    Replay,
}

/// Everything a flush knows when composing an envelope.
pub struct BatchContext<'a> {
    pub segment_id: &'a str,
    pub batch_id: &'a str,
    pub sent_at_ms: i64,
    pub session: &'a StoredSession,
}

#[derive(Serialize)]
struct EventBatch<'a> {
    session_replay_segment_id: &'a str,
    batch_id: &'a str,
    sent_at_ms: i64,
    events: &'a [Value],
}

#[derive(Serialize)]
struct ReplayBatch<'a> {
    browser_session_id: &'a str,
    session_replay_segment_id: &'a str,
    batch_id: &'a str,
    started_at_ms: i64,
    sent_at_ms: i64,
    events: &'a [Value],
}

/// Serialize a finished batch for delivery.
pub fn compose(shape: BatchShape, ctx: &BatchContext<'_>, events: &[Value]) -> Result<String> {
    let body = match shape {
        BatchShape::DomEvents => serde_json::to_string(&EventBatch {
            session_replay_segment_id: ctx.segment_id,
            batch_id: ctx.batch_id,
            sent_at_ms: ctx.sent_at_ms,
            events,
        })?,
        BatchShape::Replay => serde_json::to_string(&ReplayBatch {
            browser_session_id: &ctx.session.session_id,
            session_replay_segment_id: ctx.segment_id,
            batch_id: ctx.batch_id,
            started_at_ms: ctx.session.created_at_ms,
            sent_at_ms: ctx.sent_at_ms,
            events,
        })?,
    };
    Ok(body)
}
