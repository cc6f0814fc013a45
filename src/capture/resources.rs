// src/capture/resources.rs
//! Owned resource set released in reverse acquisition order

use tokio::task::JoinHandle;

enum Resource {
    /// Background task aborted on release
    Task(JoinHandle<()>),
    /// Arbitrary release action (subscription cancel, recorder stop, ...)
    Release(Box<dyn FnOnce() + Send>),
}

/// Everything a capture instance acquires in `start()`.
///
/// `stop()` tears the set down in reverse acquisition order, so later
/// acquisitions that depend on earlier ones go first.
#[derive(Default)]
pub struct ResourceSet {
    acquired: Vec<Resource>,
}

impl ResourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a background task; releasing aborts it.
    pub fn track_task(&mut self, handle: JoinHandle<()>) {
        self.acquired.push(Resource::Task(handle));
    }

    /// Track an arbitrary release action.
    pub fn on_release(&mut self, release: impl FnOnce() + Send + 'static) {
        self.acquired.push(Resource::Release(Box::new(release)));
    }

    pub fn len(&self) -> usize {
        self.acquired.len()
    }

    pub fn is_empty(&self) -> bool {
        self.acquired.is_empty()
    }

    /// Release everything, newest first.
    pub fn release_all(&mut self) {
        while let Some(resource) = self.acquired.pop() {
            match resource {
                Resource::Task(handle) => handle.abort(),
                Resource::Release(release) => release(),
            }
        }
    }
}
