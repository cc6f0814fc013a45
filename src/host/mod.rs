// src/host/mod.rs
//! Host environment surface
//!
//! The engine never touches host globals directly. Everything the capture
//! sources consume from the surrounding page arrives through this module:
//!
//! - **Dispatcher**: process-wide fan-out with an explicit subscriber list
//! - **HostEnvironment**: the trait a host embedding implements
//! - **SimulatedHost**: in-process host for tests and headless embeddings
//!
//! Navigation notifications in particular are routed through one dispatcher
//! per host rather than re-wrapped entry points per capture instance, so
//! starting and stopping an instance is a subscribe/unsubscribe pair.

pub mod dispatcher;
pub mod environment;
pub mod simulated;

pub use dispatcher::{Dispatcher, Subscription};
pub use environment::{
    ClickObservation, ElementNode, HostEnvironment, NavigationEvent, NavigationKind, PageContext,
    PageTransition,
};
pub use simulated::SimulatedHost;
