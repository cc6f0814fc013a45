// src/utils/ids.rs
//! Random identifier generation

use uuid::Uuid;

/// Generate a random UUIDv4 string.
///
/// Used for session ids, per-instance segment ids, and batch ids. These are
/// grouping hints on the wire, not security tokens.
pub fn random_id() -> String {
    Uuid::new_v4().to_string()
}
