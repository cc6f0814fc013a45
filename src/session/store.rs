// src/session/store.rs
//! Rotating session identity with throttled activity writes

use crate::session::storage::SessionStorage;
use crate::utils::ids::random_id;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// A session rotates after this much idle time.
pub const SESSION_IDLE_TTL_MS: i64 = 3 * 60 * 1000;

/// Minimum spacing between `last_activity_ms` writes.
const ACTIVITY_WRITE_THROTTLE_MS: i64 = 5_000;

const STORAGE_KEY_PREFIX: &str = "beacon:session:v1";

/// Sentinel for "no activity write has happened yet".
const PERSIST_NEVER: i64 = i64::MIN;

/// Storage key for a project's session record.
pub fn storage_key(project_id: &str) -> String {
    format!("{}:{}", STORAGE_KEY_PREFIX, project_id)
}

/// The durable session record, one per project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub session_id: String,
    pub created_at_ms: i64,
    pub last_activity_ms: i64,
}

/// Parse a persisted record; anything malformed reads as absent.
pub fn parse_stored_session(raw: &str) -> Option<StoredSession> {
    let session: StoredSession = serde_json::from_str(raw).ok()?;
    if session.session_id.is_empty() {
        return None;
    }
    Some(session)
}

/// Whether a record is idle-expired at `now_ms`.
pub fn rotation_due(session: &StoredSession, now_ms: i64) -> bool {
    now_ms - session.last_activity_ms > SESSION_IDLE_TTL_MS
}

/// Session identity store shared by the capture instances of one project.
///
/// Storage failures are logged and swallowed; the store always hands back a
/// usable session, rotating a fresh one when the persisted record is
/// absent, corrupt, or idle-expired.
pub struct SessionStore {
    storage: Arc<dyn SessionStorage>,
    key: String,
    last_persist_ms: AtomicI64,
}

impl SessionStore {
    pub fn new(project_id: &str, storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            storage,
            key: storage_key(project_id),
            last_persist_ms: AtomicI64::new(PERSIST_NEVER),
        }
    }

    /// Load the current session, rotating a new one if the persisted record
    /// is absent, corrupt, or idle longer than the TTL. A live record is
    /// returned unchanged.
    pub async fn get_or_rotate(&self, now_ms: i64) -> StoredSession {
        let existing = match self.storage.load(&self.key).await {
            Ok(raw) => raw.as_deref().and_then(parse_stored_session),
            Err(e) => {
                warn!("Session record unreadable, rotating: {}", e);
                None
            }
        };

        if let Some(session) = existing {
            if !rotation_due(&session, now_ms) {
                return session;
            }
            debug!(
                session_id = %session.session_id,
                idle_ms = now_ms - session.last_activity_ms,
                "Session idle-expired, rotating"
            );
        }

        let next = StoredSession {
            session_id: random_id(),
            created_at_ms: now_ms,
            last_activity_ms: now_ms,
        };
        self.write(&next).await;
        next
    }

    /// Whether `persist_activity` would write at `now_ms`.
    pub fn persist_due(&self, now_ms: i64) -> bool {
        let last = self.last_persist_ms.load(Ordering::SeqCst);
        last == PERSIST_NEVER || now_ms - last >= ACTIVITY_WRITE_THROTTLE_MS
    }

    /// Record activity at `now_ms`, rotating first if the session is
    /// idle-expired. The write is skipped when the previous one happened
    /// under the throttle window; the returned session reflects what is
    /// persisted either way.
    pub async fn persist_activity(&self, now_ms: i64) -> StoredSession {
        let current = self.get_or_rotate(now_ms).await;

        if !self.persist_due(now_ms) {
            return current;
        }
        self.last_persist_ms.store(now_ms, Ordering::SeqCst);

        let updated = StoredSession {
            // last_activity_ms never goes backwards for a given session id
            last_activity_ms: now_ms.max(current.last_activity_ms),
            ..current
        };
        self.write(&updated).await;
        updated
    }

    async fn write(&self, session: &StoredSession) {
        let raw = match serde_json::to_string(session) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Session record serialization failed: {}", e);
                return;
            }
        };
        if let Err(e) = self.storage.store(&self.key, &raw).await {
            warn!("Session record write failed: {}", e);
        }
    }
}
