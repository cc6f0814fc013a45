// src/capture/pipeline.rs
//! Shared capture buffer + flush scheduler
//!
//! One pipeline backs one capture instance. It owns the buffer, the cached
//! access token, the periodic tick task, and the teardown path. Capture
//! sources only ever call `push`; everything that can suspend (token
//! refresh, delivery) happens on background tasks that re-check the
//! cancellation flag before doing anything else.

use crate::auth::AccessTokenProvider;
use crate::capture::batch::{compose, BatchContext, BatchShape};
use crate::capture::buffer::{BufferStats, EventBuffer};
use crate::capture::resources::ResourceSet;
use crate::config::FlushProfile;
use crate::session::store::SessionStore;
use crate::transport::{BatchTransport, DeliveryOutcome};
use crate::utils::ids::random_id;
use crate::utils::time::Clock;
use metrics::counter;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Lifecycle of one capture instance. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    NotStarted,
    Running,
    Stopped,
}

/// Shared collaborators a pipeline needs besides its profile.
#[derive(Clone)]
pub struct PipelineContext {
    pub session: Arc<SessionStore>,
    pub tokens: Arc<dyn AccessTokenProvider>,
    pub transport: Arc<dyn BatchTransport>,
    pub clock: Arc<dyn Clock>,
}

struct PipelineInner {
    profile: FlushProfile,
    shape: BatchShape,
    /// Whether the host can capture at all; a non-capable pipeline never
    /// leaves `NotStarted`.
    capable: bool,
    segment_id: String,
    ctx: PipelineContext,
    state: Mutex<LifecycleState>,
    cancelled: AtomicBool,
    buffer: Mutex<EventBuffer>,
    /// Token as of the last tick; flushes ship only while this is present
    token: Mutex<Option<String>>,
    was_authenticated: AtomicBool,
    resources: Mutex<ResourceSet>,
}

/// Capture buffer + flush scheduler shared by both capture instances.
#[derive(Clone)]
pub struct CapturePipeline {
    inner: Arc<PipelineInner>,
}

impl CapturePipeline {
    pub fn new(
        profile: FlushProfile,
        shape: BatchShape,
        capable: bool,
        ctx: PipelineContext,
    ) -> Self {
        Self {
            inner: Arc::new(PipelineInner {
                profile,
                shape,
                capable,
                segment_id: random_id(),
                ctx,
                state: Mutex::new(LifecycleState::NotStarted),
                cancelled: AtomicBool::new(false),
                buffer: Mutex::new(EventBuffer::new()),
                token: Mutex::new(None),
                was_authenticated: AtomicBool::new(false),
                resources: Mutex::new(ResourceSet::new()),
            }),
        }
    }

    /// Random id grouping every event this instance emits. Never persisted.
    pub fn segment_id(&self) -> &str {
        &self.inner.segment_id
    }

    pub fn state(&self) -> LifecycleState {
        *self.inner.state.lock()
    }

    /// Events currently buffered.
    pub fn buffered(&self) -> usize {
        self.inner.buffer.lock().len()
    }

    pub fn buffer_stats(&self) -> BufferStats {
        self.inner.buffer.lock().stats()
    }

    /// Start the flush scheduler. Idempotent; a no-op on a non-capable
    /// host. Returns whether this call performed the transition.
    pub fn start(&self) -> bool {
        self.start_with(|_, _| {})
    }

    /// Start, letting a capture source acquire its subscriptions into the
    /// resource set torn down by `stop()`.
    pub(crate) fn start_with(
        &self,
        attach: impl FnOnce(&CapturePipeline, &mut ResourceSet),
    ) -> bool {
        if !self.inner.capable {
            debug!("Host is not interactive, capture stays disabled");
            return false;
        }
        {
            let mut state = self.inner.state.lock();
            if *state != LifecycleState::NotStarted {
                return false;
            }
            *state = LifecycleState::Running;
        }

        let mut resources = self.inner.resources.lock();
        attach(self, &mut resources);

        let inner = Arc::clone(&self.inner);
        let interval = Duration::from_millis(self.inner.profile.flush_interval_ms);
        resources.track_task(tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            loop {
                ticker.tick().await;
                PipelineInner::run_tick(&inner).await;
            }
        }));
        drop(resources);

        info!(
            segment_id = %self.inner.segment_id,
            interval_ms = self.inner.profile.flush_interval_ms,
            "Capture instance started"
        );
        true
    }

    /// Append one captured event. Never blocks on I/O and never fails; a
    /// threshold crossing spawns a flush without waiting on it.
    pub fn push(&self, event: Value) {
        if self.inner.cancelled.load(Ordering::Acquire) {
            return;
        }

        let authenticated = self.inner.token.lock().is_some();
        let (len, bytes) = {
            let mut buffer = self.inner.buffer.lock();
            buffer.push(event);
            (buffer.len(), buffer.approx_bytes())
        };
        counter!("beacon_events_captured_total").increment(1);

        if len >= self.inner.profile.max_events_per_batch
            || bytes >= self.inner.profile.max_batch_bytes
        {
            self.spawn_flush(false);
        }

        // Unauthenticated capture is bounded by a hard cap; crossing it
        // drops the whole buffer rather than trimming it.
        if !authenticated
            && (len > self.inner.profile.preauth_max_events
                || bytes > self.inner.profile.preauth_max_bytes)
        {
            let dropped = self.inner.buffer.lock().clear();
            counter!("beacon_events_dropped_total").increment(dropped as u64);
            warn!(dropped, "Pre-auth buffer cap exceeded, discarding buffered events");
        }
    }

    /// One scheduler tick: refresh the cached token, wipe the buffer on a
    /// sign-out, flush when authenticated with work pending. The timer task
    /// drives this; tests may call it directly.
    pub async fn tick(&self) {
        PipelineInner::run_tick(&self.inner).await;
    }

    /// Flush the current buffer, if a token is cached and work is pending.
    pub async fn flush(&self, keepalive: bool) {
        if self.inner.cancelled.load(Ordering::Acquire) {
            return;
        }
        PipelineInner::flush_now(&self.inner, keepalive).await;
    }

    /// Stop this instance permanently: no tick or flush started after this
    /// point proceeds, except the single keepalive flush issued here.
    /// Resources acquired in `start()` are released in reverse order.
    pub async fn stop(&self) {
        {
            let mut state = self.inner.state.lock();
            match *state {
                LifecycleState::Stopped => return,
                LifecycleState::NotStarted => {
                    *state = LifecycleState::Stopped;
                    self.inner.cancelled.store(true, Ordering::Release);
                    return;
                }
                LifecycleState::Running => *state = LifecycleState::Stopped,
            }
        }
        self.inner.cancelled.store(true, Ordering::Release);

        // The one flush allowed past the cancellation flag
        PipelineInner::flush_now(&self.inner, true).await;

        // Anything the teardown flush could not ship goes with the instance
        let dropped = self.inner.buffer.lock().clear();
        if dropped > 0 {
            counter!("beacon_events_dropped_total").increment(dropped as u64);
        }

        let mut resources = std::mem::take(&mut *self.inner.resources.lock());
        resources.release_all();

        info!(segment_id = %self.inner.segment_id, "Capture instance stopped");
    }

    /// Spawn a fire-and-forget flush. The task re-checks cancellation as
    /// its first action; it may run after `stop()` has returned.
    pub(crate) fn spawn_flush(&self, keepalive: bool) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            if inner.cancelled.load(Ordering::Acquire) {
                return;
            }
            PipelineInner::flush_now(&inner, keepalive).await;
        });
    }

    pub(crate) fn clock(&self) -> &Arc<dyn Clock> {
        &self.inner.ctx.clock
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Record session activity without blocking the caller; the write is
    /// skipped entirely while the throttle window is closed.
    pub(crate) fn note_activity(&self, now_ms: i64) {
        if !self.inner.ctx.session.persist_due(now_ms) {
            return;
        }
        let session = Arc::clone(&self.inner.ctx.session);
        tokio::spawn(async move {
            session.persist_activity(now_ms).await;
        });
    }

    /// Add a late-acquired release action (e.g. a recording handle that
    /// finished starting after `start()` returned). Hands the action back
    /// when the instance already stopped, so the caller can release it
    /// directly.
    pub(crate) fn try_track_release(
        &self,
        release: Box<dyn FnOnce() + Send>,
    ) -> Result<(), Box<dyn FnOnce() + Send>> {
        let mut resources = self.inner.resources.lock();
        if self.inner.cancelled.load(Ordering::Acquire) {
            return Err(release);
        }
        resources.on_release(release);
        Ok(())
    }

    #[cfg(test)]
    fn resource_count(&self) -> usize {
        self.inner.resources.lock().len()
    }
}

impl PipelineInner {
    /// Tick body. Cancellation is the first check: the timer task may race
    /// `stop()`.
    async fn run_tick(inner: &Arc<PipelineInner>) {
        if inner.cancelled.load(Ordering::Acquire) {
            return;
        }

        let refreshed = inner.ctx.tokens.access_token().await;
        let authenticated = refreshed.is_some();
        *inner.token.lock() = refreshed;

        let was_authenticated = inner
            .was_authenticated
            .swap(authenticated, Ordering::AcqRel);
        if was_authenticated && !authenticated {
            // Sign-out: anything captured for the previous user must never
            // ride along in a batch sent for the next one
            let dropped = inner.buffer.lock().clear();
            if dropped > 0 {
                counter!("beacon_events_dropped_total").increment(dropped as u64);
                info!(dropped, "Auth revoked, discarded buffered events");
            }
        }

        if authenticated && !inner.buffer.lock().is_empty() {
            let inner = Arc::clone(inner);
            tokio::spawn(async move {
                if inner.cancelled.load(Ordering::Acquire) {
                    return;
                }
                PipelineInner::flush_now(&inner, false).await;
            });
        }
    }

    /// Flush body, past all cancellation checks. No-op without a cached
    /// token or without buffered work; otherwise the buffer is swapped out
    /// in one move so capture continues into the next batch while this one
    /// is in flight. The batch is gone after one attempt no matter what.
    async fn flush_now(inner: &Arc<PipelineInner>, keepalive: bool) {
        if inner.token.lock().is_none() {
            return;
        }
        let events = {
            let mut buffer = inner.buffer.lock();
            if buffer.is_empty() {
                return;
            }
            buffer.take()
        };

        let now_ms = inner.ctx.clock.now_ms();
        let session = inner.ctx.session.persist_activity(now_ms).await;
        let batch_id = random_id();

        let body = match compose(
            inner.shape,
            &BatchContext {
                segment_id: &inner.segment_id,
                batch_id: &batch_id,
                sent_at_ms: now_ms,
                session: &session,
            },
            &events,
        ) {
            Ok(body) => body,
            Err(e) => {
                warn!(events = events.len(), "Batch serialization failed, discarding: {}", e);
                return;
            }
        };

        debug!(
            batch_id = %batch_id,
            events = events.len(),
            bytes = body.len(),
            keepalive,
            "Delivering batch"
        );

        match inner.ctx.transport.deliver(body, keepalive).await {
            outcome if outcome.is_accepted() => {
                counter!("beacon_batches_flushed_total").increment(1);
            }
            DeliveryOutcome::Delivered { status } => {
                counter!("beacon_batches_failed_total").increment(1);
                warn!(batch_id = %batch_id, status, "Ingestion rejected batch, discarding");
            }
            DeliveryOutcome::NoResponse { reason } => {
                counter!("beacon_batches_failed_total").increment(1);
                warn!(batch_id = %batch_id, reason = %reason, "Batch delivery got no response, discarding");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticTokenProvider;
    use crate::session::storage::{MemoryStorage, SessionStorage};
    use crate::transport::MemoryTransport;
    use crate::utils::time::ManualClock;
    use serde_json::json;

    struct Rig {
        pipeline: CapturePipeline,
        tokens: Arc<StaticTokenProvider>,
        transport: Arc<MemoryTransport>,
        clock: Arc<ManualClock>,
    }

    fn rig(profile: FlushProfile, shape: BatchShape) -> Rig {
        let tokens = Arc::new(StaticTokenProvider::anonymous());
        let transport = MemoryTransport::new();
        let clock = Arc::new(ManualClock::new(1_000_000));
        let session = Arc::new(SessionStore::new(
            "proj_test",
            Arc::new(MemoryStorage::new()) as Arc<dyn SessionStorage>,
        ));
        let pipeline = CapturePipeline::new(
            profile,
            shape,
            true,
            PipelineContext {
                session,
                tokens: Arc::clone(&tokens) as Arc<dyn AccessTokenProvider>,
                transport: Arc::clone(&transport) as Arc<dyn BatchTransport>,
                clock: Arc::clone(&clock) as Arc<dyn Clock>,
            },
        );
        Rig {
            pipeline,
            tokens,
            transport,
            clock,
        }
    }

    fn dom_rig() -> Rig {
        rig(FlushProfile::events(), BatchShape::DomEvents)
    }

    /// Let spawned fire-and-forget tasks run to completion.
    async fn settle() {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }

    fn events_in(body: &str) -> usize {
        let parsed: Value = serde_json::from_str(body).unwrap();
        parsed["events"].as_array().unwrap().len()
    }

    #[tokio::test]
    async fn test_no_flush_until_tick_sees_token_and_events() {
        let rig = dom_rig();
        rig.pipeline.push(json!({"n": 1}));
        rig.pipeline.push(json!({"n": 2}));
        rig.pipeline.push(json!({"n": 3}));

        // No token yet: nothing ships
        rig.pipeline.tick().await;
        settle().await;
        assert_eq!(rig.transport.delivery_count(), 0);
        assert_eq!(rig.pipeline.buffered(), 3);

        // Token appears: next tick flushes everything buffered
        rig.tokens.set_token(Some("tok".to_string()));
        rig.pipeline.tick().await;
        settle().await;
        assert_eq!(rig.transport.delivery_count(), 1);
        assert_eq!(events_in(&rig.transport.deliveries()[0].body), 3);
        assert_eq!(rig.pipeline.buffered(), 0);
    }

    #[tokio::test]
    async fn test_tick_with_empty_buffer_does_not_flush() {
        let rig = dom_rig();
        rig.tokens.set_token(Some("tok".to_string()));
        rig.pipeline.tick().await;
        settle().await;
        assert_eq!(rig.transport.delivery_count(), 0);
    }

    #[tokio::test]
    async fn test_count_threshold_triggers_exactly_one_flush() {
        let rig = dom_rig();
        rig.tokens.set_token(Some("tok".to_string()));
        rig.pipeline.tick().await;

        // ~100 bytes apiece: 50 of them stay far below the 64 KB cap
        let filler = "x".repeat(60);
        for n in 0..50 {
            rig.pipeline.push(json!({"event_type": "$click", "n": n, "data": filler}));
        }
        settle().await;

        assert_eq!(rig.transport.delivery_count(), 1);
        let delivery = &rig.transport.deliveries()[0];
        assert_eq!(events_in(&delivery.body), 50);
        assert!(!delivery.keepalive);
    }

    #[tokio::test]
    async fn test_byte_threshold_triggers_flush() {
        let rig = dom_rig();
        rig.tokens.set_token(Some("tok".to_string()));
        rig.pipeline.tick().await;

        let heavy = "y".repeat(30_000);
        rig.pipeline.push(json!({"data": heavy.clone()}));
        rig.pipeline.push(json!({"data": heavy.clone()}));
        settle().await;
        assert_eq!(rig.transport.delivery_count(), 0);

        // Third push crosses 64 KB
        rig.pipeline.push(json!({"data": heavy}));
        settle().await;
        assert_eq!(rig.transport.delivery_count(), 1);
    }

    #[tokio::test]
    async fn test_sign_out_wipes_buffer_without_flushing() {
        let rig = dom_rig();
        rig.tokens.set_token(Some("tok".to_string()));
        rig.pipeline.tick().await;
        settle().await;

        rig.pipeline.push(json!({"n": 1}));
        rig.pipeline.push(json!({"n": 2}));
        rig.pipeline.push(json!({"n": 3}));

        rig.tokens.set_token(None);
        rig.pipeline.tick().await;
        settle().await;

        assert_eq!(rig.pipeline.buffered(), 0);
        assert_eq!(rig.transport.delivery_count(), 0);

        // A later sign-in must not resurrect the wiped events
        rig.tokens.set_token(Some("tok2".to_string()));
        rig.pipeline.tick().await;
        settle().await;
        assert_eq!(rig.transport.delivery_count(), 0);
    }

    #[tokio::test]
    async fn test_stop_flushes_once_with_keepalive() {
        let rig = dom_rig();
        rig.pipeline.start();
        rig.tokens.set_token(Some("tok".to_string()));
        rig.pipeline.tick().await;

        rig.pipeline.push(json!({"n": 1}));
        rig.pipeline.push(json!({"n": 2}));
        rig.pipeline.push(json!({"n": 3}));

        rig.pipeline.stop().await;
        settle().await;

        assert_eq!(rig.transport.delivery_count(), 1);
        let delivery = &rig.transport.deliveries()[0];
        assert!(delivery.keepalive);
        assert_eq!(events_in(&delivery.body), 3);
        assert_eq!(rig.pipeline.state(), LifecycleState::Stopped);

        // A straggling timer fire changes nothing
        rig.pipeline.push(json!({"n": 4}));
        rig.pipeline.tick().await;
        rig.pipeline.flush(false).await;
        settle().await;
        assert_eq!(rig.transport.delivery_count(), 1);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent_and_terminal() {
        let rig = dom_rig();
        assert!(rig.pipeline.start());
        rig.pipeline.stop().await;
        rig.pipeline.stop().await;

        assert!(!rig.pipeline.start());
        assert_eq!(rig.pipeline.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let rig = dom_rig();
        assert!(rig.pipeline.start());
        let acquired = rig.pipeline.resource_count();
        assert!(!rig.pipeline.start());
        assert_eq!(rig.pipeline.resource_count(), acquired);
        rig.pipeline.stop().await;
    }

    #[tokio::test]
    async fn test_non_capable_host_never_starts() {
        let tokens = Arc::new(StaticTokenProvider::anonymous());
        let transport = MemoryTransport::new();
        let session = Arc::new(SessionStore::new(
            "proj_test",
            Arc::new(MemoryStorage::new()) as Arc<dyn SessionStorage>,
        ));
        let pipeline = CapturePipeline::new(
            FlushProfile::events(),
            BatchShape::DomEvents,
            false,
            PipelineContext {
                session,
                tokens,
                transport: Arc::clone(&transport) as Arc<dyn BatchTransport>,
                clock: Arc::new(ManualClock::new(0)),
            },
        );

        assert!(!pipeline.start());
        assert_eq!(pipeline.state(), LifecycleState::NotStarted);
    }

    #[tokio::test]
    async fn test_preauth_cap_drops_whole_buffer() {
        let rig = rig(FlushProfile::replay(), BatchShape::Replay);

        for n in 0..10_000u32 {
            rig.pipeline.push(json!({"n": n}));
        }
        assert_eq!(rig.pipeline.buffered(), 10_000);

        // Crossing the cap resets to empty in one move
        rig.pipeline.push(json!({"n": 10_000}));
        assert_eq!(rig.pipeline.buffered(), 0);

        settle().await;
        assert_eq!(rig.transport.delivery_count(), 0);
        assert_eq!(rig.pipeline.buffer_stats().dropped_count, 10_001);
    }

    #[tokio::test]
    async fn test_rejected_batch_is_discarded_not_retried() {
        let rig = dom_rig();
        rig.transport
            .respond_with(DeliveryOutcome::Delivered { status: 500 });
        rig.tokens.set_token(Some("tok".to_string()));
        rig.pipeline.tick().await;

        rig.pipeline.push(json!({"n": 1}));
        rig.pipeline.flush(false).await;
        assert_eq!(rig.transport.delivery_count(), 1);
        assert_eq!(rig.pipeline.buffered(), 0);

        // Nothing left to resend
        rig.pipeline.tick().await;
        settle().await;
        assert_eq!(rig.transport.delivery_count(), 1);
    }

    #[tokio::test]
    async fn test_flush_timestamps_come_from_the_clock() {
        let rig = dom_rig();
        rig.tokens.set_token(Some("tok".to_string()));
        rig.pipeline.tick().await;
        rig.clock.set(7_777_000);

        rig.pipeline.push(json!({"n": 1}));
        rig.pipeline.flush(false).await;

        let parsed: Value =
            serde_json::from_str(&rig.transport.deliveries()[0].body).unwrap();
        assert_eq!(parsed["sent_at_ms"], 7_777_000);
        assert_eq!(
            parsed["session_replay_segment_id"],
            rig.pipeline.segment_id()
        );
    }
}
