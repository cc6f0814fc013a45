// src/session/mod.rs
//! Session identity shared across capture instances
//!
//! One durable record per project groups everything a visitor does across
//! capture instances (and host tabs) under a rotating session id:
//!
//! - **SessionStorage**: durable key/value seam (file-backed or in-memory)
//! - **SessionStore**: idle-TTL rotation and throttled activity writes
//!
//! Writers race last-write-wins by design; the session id is a grouping
//! hint, not a correctness boundary.

pub mod storage;
pub mod store;

pub use storage::{FileStorage, MemoryStorage, SessionStorage};
pub use store::{storage_key, SessionStore, StoredSession, SESSION_IDLE_TTL_MS};
