// src/sources/recorder.rs
//! External screen recorder seam
//!
//! The recorder is a separately shipped dependency that many embedders
//! never enable, so it is resolved lazily through `RecorderCapability`:
//! at most one load attempt per capture instance, with a failure cached
//! as permanently unavailable.

use crate::config::ReplayOptions;
use crate::utils::errors::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::warn;

/// Callback a recorder invokes for every recorded event.
pub type EmitFn = Arc<dyn Fn(Value) + Send + Sync>;

/// Handle that stops an active recording when released.
pub trait RecordingHandle: Send {
    fn stop(self: Box<Self>);
}

/// External full-session screen recorder.
pub trait ScreenRecorder: Send + Sync {
    /// Begin recording, delivering opaque events through `emit`.
    fn start_recording(
        &self,
        options: &ReplayOptions,
        emit: EmitFn,
    ) -> Result<Box<dyn RecordingHandle>>;
}

/// Loads the recorder implementation on first use.
#[async_trait]
pub trait RecorderLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn ScreenRecorder>>;
}

/// Memoized recorder resolution.
///
/// The first `resolve` runs the loader; every later call returns the
/// cached result. A load failure is logged once and never retried.
pub struct RecorderCapability {
    loader: Arc<dyn RecorderLoader>,
    resolved: OnceCell<Option<Arc<dyn ScreenRecorder>>>,
}

impl RecorderCapability {
    pub fn new(loader: Arc<dyn RecorderLoader>) -> Self {
        Self {
            loader,
            resolved: OnceCell::new(),
        }
    }

    /// The recorder, or `None` when this instance is permanently
    /// non-recording.
    pub async fn resolve(&self) -> Option<Arc<dyn ScreenRecorder>> {
        self.resolved
            .get_or_init(|| async {
                match self.loader.load().await {
                    Ok(recorder) => Some(recorder),
                    Err(e) => {
                        warn!("Screen recorder unavailable, replay capture disabled: {}", e);
                        None
                    }
                }
            })
            .await
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::errors::CaptureError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NullRecorder;

    impl ScreenRecorder for NullRecorder {
        fn start_recording(
            &self,
            _options: &ReplayOptions,
            _emit: EmitFn,
        ) -> Result<Box<dyn RecordingHandle>> {
            struct Handle;
            impl RecordingHandle for Handle {
                fn stop(self: Box<Self>) {}
            }
            Ok(Box::new(Handle))
        }
    }

    struct CountingLoader {
        attempts: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl RecorderLoader for CountingLoader {
        async fn load(&self) -> Result<Arc<dyn ScreenRecorder>> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(CaptureError::Recorder("module missing".to_string()))
            } else {
                Ok(Arc::new(NullRecorder))
            }
        }
    }

    #[tokio::test]
    async fn test_loader_runs_at_most_once() {
        let loader = Arc::new(CountingLoader {
            attempts: AtomicUsize::new(0),
            fail: false,
        });
        let capability = RecorderCapability::new(Arc::clone(&loader) as Arc<dyn RecorderLoader>);

        assert!(capability.resolve().await.is_some());
        assert!(capability.resolve().await.is_some());
        assert!(capability.resolve().await.is_some());
        assert_eq!(loader.attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_is_cached_not_retried() {
        let loader = Arc::new(CountingLoader {
            attempts: AtomicUsize::new(0),
            fail: true,
        });
        let capability = RecorderCapability::new(Arc::clone(&loader) as Arc<dyn RecorderLoader>);

        assert!(capability.resolve().await.is_none());
        assert!(capability.resolve().await.is_none());
        assert_eq!(loader.attempts.load(Ordering::SeqCst), 1);
    }
}
