// src/transport/mod.rs
//! Batch delivery
//!
//! The engine decides *when* to ship a batch; a `BatchTransport` owns *how*,
//! including attaching credentials. Transports never panic and never return
//! errors — every failure mode is a value the caller logs and moves past,
//! because telemetry loss must not affect the host application.

pub mod http;

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

pub use http::HttpTransport;

/// What came back from one delivery attempt.
#[derive(Debug, Clone)]
pub enum DeliveryOutcome {
    /// The endpoint responded, with any status.
    Delivered { status: u16 },
    /// No response was obtained (connection, DNS, timeout).
    NoResponse { reason: String },
}

impl DeliveryOutcome {
    /// Whether the endpoint acknowledged the batch with a 2xx status.
    pub fn is_accepted(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { status } if (200..300).contains(status))
    }
}

/// Ships one serialized batch to the ingestion endpoint.
#[async_trait]
pub trait BatchTransport: Send + Sync {
    /// Deliver a serialized batch body. `keepalive` marks a send racing
    /// page teardown, which should be attempted but never allowed to hang.
    async fn deliver(&self, body: String, keepalive: bool) -> DeliveryOutcome;
}

/// One delivery a `MemoryTransport` recorded.
#[derive(Debug, Clone)]
pub struct RecordedDelivery {
    pub body: String,
    pub keepalive: bool,
}

/// In-memory transport recording every delivered batch.
///
/// Useful in tests and embedding dry-runs; the outcome handed back to the
/// engine is configurable.
pub struct MemoryTransport {
    deliveries: Mutex<Vec<RecordedDelivery>>,
    outcome: Mutex<DeliveryOutcome>,
}

impl MemoryTransport {
    /// A transport that accepts everything with a 200.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            deliveries: Mutex::new(Vec::new()),
            outcome: Mutex::new(DeliveryOutcome::Delivered { status: 200 }),
        })
    }

    /// Change the outcome reported for subsequent deliveries.
    pub fn respond_with(&self, outcome: DeliveryOutcome) {
        *self.outcome.lock() = outcome;
    }

    /// Everything delivered so far, in order.
    pub fn deliveries(&self) -> Vec<RecordedDelivery> {
        self.deliveries.lock().clone()
    }

    pub fn delivery_count(&self) -> usize {
        self.deliveries.lock().len()
    }
}

#[async_trait]
impl BatchTransport for MemoryTransport {
    async fn deliver(&self, body: String, keepalive: bool) -> DeliveryOutcome {
        self.deliveries.lock().push(RecordedDelivery { body, keepalive });
        self.outcome.lock().clone()
    }
}
