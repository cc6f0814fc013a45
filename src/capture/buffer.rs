// src/capture/buffer.rs
//! Ordered capture buffer with byte-size accounting
//!
//! Events wait here between capture and flush, in capture order. The
//! buffer tracks an estimate of its serialized weight so threshold checks
//! are O(1); a flush swaps the whole contents out in one move.

use serde_json::Value;

/// In-memory buffer of captured events awaiting flush.
#[derive(Default)]
pub struct EventBuffer {
    events: Vec<Value>,
    approx_bytes: usize,
    captured_count: u64,
    dropped_count: u64,
}

impl EventBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event, accounting its serialized size.
    pub fn push(&mut self, event: Value) {
        self.approx_bytes += serialized_size(&event);
        self.events.push(event);
        self.captured_count += 1;
    }

    /// Swap the contents for an empty buffer, returning the drained events
    /// in capture order. Events pushed during an in-flight delivery land in
    /// the fresh buffer.
    pub fn take(&mut self) -> Vec<Value> {
        self.approx_bytes = 0;
        std::mem::take(&mut self.events)
    }

    /// Drop everything currently buffered, returning how many events went.
    pub fn clear(&mut self) -> usize {
        let dropped = self.events.len();
        self.dropped_count += dropped as u64;
        self.events.clear();
        self.approx_bytes = 0;
        dropped
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Estimated serialized weight of the buffered events.
    pub fn approx_bytes(&self) -> usize {
        self.approx_bytes
    }

    /// Get buffer statistics
    pub fn stats(&self) -> BufferStats {
        BufferStats {
            captured_count: self.captured_count,
            dropped_count: self.dropped_count,
            current_len: self.events.len(),
            approx_bytes: self.approx_bytes,
        }
    }
}

/// Buffer statistics
#[derive(Debug, Clone)]
pub struct BufferStats {
    /// Total events ever pushed
    pub captured_count: u64,

    /// Total events dropped without delivery
    pub dropped_count: u64,

    /// Events currently buffered
    pub current_len: usize,

    /// Estimated serialized weight currently buffered
    pub approx_bytes: usize,
}

fn serialized_size(event: &Value) -> usize {
    serde_json::to_string(event).map_or(0, |s| s.len())
}
