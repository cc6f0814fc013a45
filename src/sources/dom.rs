// src/sources/dom.rs
//! DOM behavior capture: page views and clicks
//!
//! One subscription each on the host's navigation, click, and page
//! transition dispatchers, plus one synthetic "initial" page view at
//! start. Consecutive page views of the same URL are suppressed, guarding
//! against frameworks that re-issue a replace-navigation to an unchanged
//! URL.

use crate::capture::batch::BatchShape;
use crate::capture::pipeline::{CapturePipeline, PipelineContext};
use crate::config::FlushProfile;
use crate::host::environment::{
    ClickObservation, HostEnvironment, NavigationKind, PageContext,
};
use crate::sources::selector::{build_selector, nearest_link_target, visible_text};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

pub const PAGE_VIEW_EVENT: &str = "$page-view";
pub const CLICK_EVENT: &str = "$click";

/// A typed behavior record, as it appears inside a batch.
#[derive(Debug, Clone, Serialize)]
pub struct TrackedEvent {
    pub event_type: &'static str,
    pub event_at_ms: i64,
    pub data: Value,
}

/// Capture instance for page views and clicks.
pub struct DomCaptureSource {
    pipeline: CapturePipeline,
    host: Arc<dyn HostEnvironment>,
    last_url: Arc<Mutex<Option<String>>>,
}

impl DomCaptureSource {
    pub fn new(host: Arc<dyn HostEnvironment>, profile: FlushProfile, ctx: PipelineContext) -> Self {
        let capable = host.is_interactive();
        Self {
            pipeline: CapturePipeline::new(profile, BatchShape::DomEvents, capable, ctx),
            host,
            last_url: Arc::new(Mutex::new(None)),
        }
    }

    /// The underlying pipeline, for direct scheduler access.
    pub fn pipeline(&self) -> &CapturePipeline {
        &self.pipeline
    }

    /// Begin capturing. Idempotent; a no-op on a non-interactive host.
    /// Emits the "initial" page view synchronously before anything else can
    /// race it.
    pub fn start(&self) {
        let host = Arc::clone(&self.host);
        let last_url = Arc::clone(&self.last_url);

        let started = self.pipeline.start_with(|pipeline, resources| {
            let navigation_sub = host.navigations().subscribe({
                let pipeline = pipeline.clone();
                let last_url = Arc::clone(&last_url);
                move |event: &crate::host::environment::NavigationEvent| {
                    record_page_view(&pipeline, &last_url, event.kind, &event.page);
                }
            });
            resources.on_release(move || navigation_sub.cancel());

            let click_sub = host.clicks().subscribe({
                let pipeline = pipeline.clone();
                let host = Arc::clone(&host);
                move |observation: &ClickObservation| {
                    record_click(&pipeline, &host.current_page(), observation);
                }
            });
            resources.on_release(move || click_sub.cancel());

            // A segment commonly ends by tab close rather than stop();
            // ship what we have on the way out
            let transition_sub = host.page_transitions().subscribe({
                let pipeline = pipeline.clone();
                move |_| pipeline.spawn_flush(true)
            });
            resources.on_release(move || transition_sub.cancel());
        });

        if started {
            record_page_view(
                &self.pipeline,
                &self.last_url,
                NavigationKind::Initial,
                &self.host.current_page(),
            );
        }
    }

    /// Stop capturing permanently, flushing once with keepalive.
    pub async fn stop(&self) {
        self.pipeline.stop().await;
    }
}

fn record_page_view(
    pipeline: &CapturePipeline,
    last_url: &Mutex<Option<String>>,
    kind: NavigationKind,
    page: &PageContext,
) {
    {
        let mut last = last_url.lock();
        if kind != NavigationKind::Initial && last.as_deref() == Some(page.url.as_str()) {
            debug!(url = %page.url, "Suppressing repeated page view");
            return;
        }
        *last = Some(page.url.clone());
    }

    push_tracked(
        pipeline,
        PAGE_VIEW_EVENT,
        json!({
            "url": page.url,
            "path": page.path,
            "referrer": page.referrer,
            "title": page.title,
            "entry_type": kind.as_str(),
            "viewport_width": page.viewport_width,
            "viewport_height": page.viewport_height,
            "screen_width": page.screen_width,
            "screen_height": page.screen_height,
        }),
    );
}

fn record_click(pipeline: &CapturePipeline, page: &PageContext, observation: &ClickObservation) {
    let Some(target) = observation.target_path.first() else {
        return;
    };

    push_tracked(
        pipeline,
        CLICK_EVENT,
        json!({
            "tag_name": target.tag,
            "text": visible_text(target),
            "href": nearest_link_target(&observation.target_path),
            "selector": build_selector(&observation.target_path),
            "x": observation.client_x,
            "y": observation.client_y,
            "page_x": observation.page_x,
            "page_y": observation.page_y,
            "viewport_width": page.viewport_width,
            "viewport_height": page.viewport_height,
        }),
    );
}

fn push_tracked(pipeline: &CapturePipeline, event_type: &'static str, data: Value) {
    let event = TrackedEvent {
        event_type,
        event_at_ms: pipeline.clock().now_ms(),
        data,
    };
    match serde_json::to_value(&event) {
        Ok(value) => pipeline.push(value),
        Err(e) => warn!(event_type, "Dropping unserializable event: {}", e),
    }
}
