// src/host/simulated.rs
//! In-process host for tests and headless embeddings

use crate::host::dispatcher::Dispatcher;
use crate::host::environment::{
    ClickObservation, HostEnvironment, NavigationEvent, NavigationKind, PageContext,
    PageTransition,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// A host whose surface is driven programmatically.
///
/// Tests use it to script navigations, clicks, and teardown signals; a
/// server-side embedding can hand the engine a headless one, in which case
/// capture instances never start.
pub struct SimulatedHost {
    interactive: bool,
    navigations: Arc<Dispatcher<NavigationEvent>>,
    clicks: Arc<Dispatcher<ClickObservation>>,
    page_transitions: Arc<Dispatcher<PageTransition>>,
    page: Mutex<PageContext>,
}

impl SimulatedHost {
    /// An interactive host presenting `page`.
    pub fn interactive(page: PageContext) -> Arc<Self> {
        Arc::new(Self {
            interactive: true,
            navigations: Dispatcher::new(),
            clicks: Dispatcher::new(),
            page_transitions: Dispatcher::new(),
            page: Mutex::new(page),
        })
    }

    /// A host that cannot present pages; capture never starts on it.
    pub fn headless() -> Arc<Self> {
        Arc::new(Self {
            interactive: false,
            navigations: Dispatcher::new(),
            clicks: Dispatcher::new(),
            page_transitions: Dispatcher::new(),
            page: Mutex::new(PageContext::default()),
        })
    }

    /// Replace the presented page and announce the navigation.
    pub fn navigate(&self, kind: NavigationKind, page: PageContext) {
        *self.page.lock() = page.clone();
        self.navigations.emit(&NavigationEvent { kind, page });
    }

    /// Announce a pointer activation.
    pub fn click(&self, observation: ClickObservation) {
        self.clicks.emit(&observation);
    }

    /// Announce a page-hide or visibility signal.
    pub fn transition(&self, transition: PageTransition) {
        self.page_transitions.emit(&transition);
    }

    /// Replace the presented page without announcing anything.
    pub fn set_page(&self, page: PageContext) {
        *self.page.lock() = page;
    }
}

impl HostEnvironment for SimulatedHost {
    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn navigations(&self) -> Arc<Dispatcher<NavigationEvent>> {
        Arc::clone(&self.navigations)
    }

    fn clicks(&self) -> Arc<Dispatcher<ClickObservation>> {
        Arc::clone(&self.clicks)
    }

    fn page_transitions(&self) -> Arc<Dispatcher<PageTransition>> {
        Arc::clone(&self.page_transitions)
    }

    fn current_page(&self) -> PageContext {
        self.page.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn page(url: &str) -> PageContext {
        PageContext {
            url: url.to_string(),
            path: "/".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_navigate_updates_page_and_emits() {
        let host = SimulatedHost::interactive(page("https://app.example.com/"));
        let seen = Arc::new(AtomicUsize::new(0));

        let sub = host.navigations().subscribe({
            let seen = Arc::clone(&seen);
            move |event: &NavigationEvent| {
                assert_eq!(event.kind, NavigationKind::Push);
                seen.fetch_add(1, Ordering::SeqCst);
            }
        });

        host.navigate(NavigationKind::Push, page("https://app.example.com/settings"));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(host.current_page().url, "https://app.example.com/settings");
        sub.cancel();
    }

    #[test]
    fn test_headless_host_is_not_interactive() {
        let host = SimulatedHost::headless();
        assert!(!host.is_interactive());
    }
}
