// src/sources/replay.rs
//! Full-session screen replay capture
//!
//! Wraps the external recorder behind the memoized capability and feeds
//! its emit stream through the shared pipeline with the wider replay
//! profile. Replay segments commonly end by tab close rather than an
//! explicit `stop()`, so page-hide/visibility signals force a keepalive
//! flush independently of the scheduler's teardown flush.

use crate::capture::batch::BatchShape;
use crate::capture::pipeline::{CapturePipeline, PipelineContext};
use crate::config::{FlushProfile, ReplayOptions};
use crate::host::environment::HostEnvironment;
use crate::sources::recorder::{EmitFn, RecorderCapability, RecorderLoader};
use std::sync::Arc;
use tracing::{debug, warn};

/// Capture instance for screen recordings.
pub struct ReplayCaptureSource {
    pipeline: CapturePipeline,
    host: Arc<dyn HostEnvironment>,
    capability: Arc<RecorderCapability>,
    options: ReplayOptions,
}

impl ReplayCaptureSource {
    pub fn new(
        host: Arc<dyn HostEnvironment>,
        loader: Arc<dyn RecorderLoader>,
        options: ReplayOptions,
        profile: FlushProfile,
        ctx: PipelineContext,
    ) -> Self {
        let capable = host.is_interactive();
        Self {
            pipeline: CapturePipeline::new(profile, BatchShape::Replay, capable, ctx),
            host,
            capability: Arc::new(RecorderCapability::new(loader)),
            options,
        }
    }

    /// The underlying pipeline, for direct scheduler access.
    pub fn pipeline(&self) -> &CapturePipeline {
        &self.pipeline
    }

    /// Begin recording. Idempotent; a no-op on a non-interactive host.
    /// The recorder resolves in the background — a load failure leaves
    /// this instance permanently non-recording without surfacing anywhere.
    pub fn start(&self) {
        let host = Arc::clone(&self.host);

        let started = self.pipeline.start_with(|pipeline, resources| {
            let transition_sub = host.page_transitions().subscribe({
                let pipeline = pipeline.clone();
                move |_| pipeline.spawn_flush(true)
            });
            resources.on_release(move || transition_sub.cancel());
        });
        if !started {
            return;
        }

        let pipeline = self.pipeline.clone();
        let capability = Arc::clone(&self.capability);
        let options = self.options.clone();
        tokio::spawn(async move {
            attach_recorder(pipeline, capability, options).await;
        });
    }

    /// Stop recording permanently, flushing once with keepalive.
    pub async fn stop(&self) {
        self.pipeline.stop().await;
    }
}

async fn attach_recorder(
    pipeline: CapturePipeline,
    capability: Arc<RecorderCapability>,
    options: ReplayOptions,
) {
    let Some(recorder) = capability.resolve().await else {
        return;
    };
    // Resolution suspended; the instance may have stopped meanwhile
    if pipeline.is_cancelled() {
        return;
    }

    let emit: EmitFn = Arc::new({
        let pipeline = pipeline.clone();
        move |event| {
            let now_ms = pipeline.clock().now_ms();
            pipeline.note_activity(now_ms);
            pipeline.push(event);
        }
    });

    match recorder.start_recording(&options, emit) {
        Ok(handle) => {
            debug!(segment_id = %pipeline.segment_id(), "Screen recording attached");
            if let Err(release) = pipeline.try_track_release(Box::new(move || handle.stop())) {
                // Stopped while the recorder was starting up
                release();
            }
        }
        Err(e) => warn!("Screen recording failed to start: {}", e),
    }
}
