// src/host/environment.rs
//! The capture surface a host embedding provides

use crate::host::dispatcher::Dispatcher;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Snapshot of the page a host is currently presenting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageContext {
    pub url: String,
    pub path: String,
    pub referrer: String,
    pub title: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub screen_width: u32,
    pub screen_height: u32,
}

/// How a page view was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationKind {
    /// First view of a capture instance lifetime
    Initial,
    /// History entry pushed
    Push,
    /// Current history entry replaced
    Replace,
    /// Back/forward traversal
    Pop,
}

impl NavigationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NavigationKind::Initial => "initial",
            NavigationKind::Push => "push",
            NavigationKind::Replace => "replace",
            NavigationKind::Pop => "pop",
        }
    }
}

/// One history mutation or traversal observed by the host.
#[derive(Debug, Clone)]
pub struct NavigationEvent {
    pub kind: NavigationKind,
    /// Page state after the navigation completed
    pub page: PageContext,
}

/// One element in an ancestor chain, target first.
#[derive(Debug, Clone, Default)]
pub struct ElementNode {
    /// Tag name as the host reports it (typically uppercase)
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    /// Visible text content, untrimmed
    pub text: Option<String>,
    /// Link destination, for elements that navigate
    pub link_target: Option<String>,
}

/// A pointer activation observed by the host.
#[derive(Debug, Clone, Default)]
pub struct ClickObservation {
    /// Ancestor chain starting at the activated element
    pub target_path: Vec<ElementNode>,
    /// Pointer position relative to the viewport
    pub client_x: i32,
    pub client_y: i32,
    /// Pointer position relative to the full page
    pub page_x: i32,
    pub page_y: i32,
}

/// Page teardown signals that should force a keepalive flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageTransition {
    /// Page is being hidden or unloaded
    Hide,
    /// Document visibility changed
    VisibilityChange,
}

/// Capture surface a host embedding provides.
///
/// A host that cannot present pages or observe user input reports
/// `is_interactive() == false`; capture instances built on such a host
/// never start.
pub trait HostEnvironment: Send + Sync {
    /// Whether this host can present pages and observe user input.
    fn is_interactive(&self) -> bool;

    /// History mutations and traversals.
    fn navigations(&self) -> Arc<Dispatcher<NavigationEvent>>;

    /// Pointer activations anywhere in the page.
    fn clicks(&self) -> Arc<Dispatcher<ClickObservation>>;

    /// Page-hide and visibility-change signals.
    fn page_transitions(&self) -> Arc<Dispatcher<PageTransition>>;

    /// Snapshot of the currently presented page.
    fn current_page(&self) -> PageContext;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_kind_wire_names() {
        assert_eq!(NavigationKind::Initial.as_str(), "initial");
        assert_eq!(NavigationKind::Push.as_str(), "push");
        assert_eq!(NavigationKind::Replace.as_str(), "replace");
        assert_eq!(NavigationKind::Pop.as_str(), "pop");
    }

    #[test]
    fn test_navigation_kind_serde_matches_as_str() {
        for kind in [
            NavigationKind::Initial,
            NavigationKind::Push,
            NavigationKind::Replace,
            NavigationKind::Pop,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }
}
