// src/client.rs
//! Composition facade for embedders
//!
//! Wires the two capture instances to one shared session identity and one
//! transport. Most embedders construct this once per page load, call
//! `start()`, and `stop()` on teardown; everything in between is
//! background work.

use crate::auth::AccessTokenProvider;
use crate::capture::pipeline::PipelineContext;
use crate::config::CaptureConfig;
use crate::host::environment::HostEnvironment;
use crate::session::storage::SessionStorage;
use crate::session::store::SessionStore;
use crate::sources::dom::DomCaptureSource;
use crate::sources::recorder::RecorderLoader;
use crate::sources::replay::ReplayCaptureSource;
use crate::transport::http::HttpTransport;
use crate::transport::BatchTransport;
use crate::utils::errors::Result;
use crate::utils::time::{Clock, SystemClock};
use std::sync::Arc;

/// One capture embedding: DOM events plus (when opted in) screen replay,
/// sharing a session identity for grouping.
pub struct CaptureClient {
    events: DomCaptureSource,
    replay: Option<ReplayCaptureSource>,
}

impl CaptureClient {
    /// Compose a client from explicit collaborators.
    ///
    /// The replay instance only exists when `config.replays.enabled`; a
    /// disabled embedder never touches the recorder loader.
    pub fn new(
        config: CaptureConfig,
        host: Arc<dyn HostEnvironment>,
        storage: Arc<dyn SessionStorage>,
        tokens: Arc<dyn AccessTokenProvider>,
        transport: Arc<dyn BatchTransport>,
        recorder: Arc<dyn RecorderLoader>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;

        let session = Arc::new(SessionStore::new(&config.project_id, storage));
        let ctx = PipelineContext {
            session,
            tokens,
            transport,
            clock,
        };

        let events = DomCaptureSource::new(Arc::clone(&host), config.events.clone(), ctx.clone());
        let replay = config.replays.enabled.then(|| {
            ReplayCaptureSource::new(
                host,
                recorder,
                config.replays.clone(),
                config.replay.clone(),
                ctx,
            )
        });

        Ok(Self { events, replay })
    }

    /// Compose a client shipping over HTTP to `config.endpoint`, with the
    /// wall clock.
    pub fn with_http_transport(
        config: CaptureConfig,
        host: Arc<dyn HostEnvironment>,
        storage: Arc<dyn SessionStorage>,
        tokens: Arc<dyn AccessTokenProvider>,
        recorder: Arc<dyn RecorderLoader>,
    ) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(
            config.endpoint.clone(),
            config.project_id.clone(),
            Arc::clone(&tokens),
        ));
        Self::new(
            config,
            host,
            storage,
            tokens,
            transport,
            recorder,
            Arc::new(SystemClock),
        )
    }

    /// Start every enabled capture instance. Idempotent.
    pub fn start(&self) {
        self.events.start();
        if let Some(replay) = &self.replay {
            replay.start();
        }
    }

    /// Stop every instance permanently, each flushing once with keepalive.
    pub async fn stop(&self) {
        self.events.stop().await;
        if let Some(replay) = &self.replay {
            replay.stop().await;
        }
    }

    pub fn events(&self) -> &DomCaptureSource {
        &self.events
    }

    pub fn replay(&self) -> Option<&ReplayCaptureSource> {
        self.replay.as_ref()
    }
}
