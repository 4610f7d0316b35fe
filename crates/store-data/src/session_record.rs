//! Persisted form of the session and the mirrored auth token.
//!
//! The session record is stored under [`SESSION_STORAGE_KEY`] as
//! `{"state": {user, authToken, isAuthenticated, sessionId, lastActivity}, "version": 0}`.
//! The token is mirrored as a bare string under [`AUTH_TOKEN_KEY`] so that
//! collaborators can read it without decoding the record.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use store_core::error::Result;
use store_core::models::SessionSnapshot;

use crate::storage::DurableStorage;

/// Namespace key of the persisted session record.
pub const SESSION_STORAGE_KEY: &str = "session-storage";

/// Key of the mirrored auth token.
pub const AUTH_TOKEN_KEY: &str = "authToken";

/// Version written into new records.
pub const RECORD_VERSION: u32 = 0;

/// Envelope around the persisted session fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub state: SessionSnapshot,
    #[serde(default)]
    pub version: u32,
}

impl SessionRecord {
    pub fn new(state: SessionSnapshot) -> Self {
        Self {
            state,
            version: RECORD_VERSION,
        }
    }

    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

// ── SessionPersistence ────────────────────────────────────────────────────────

/// Reads and writes the session record and the token mirror.
///
/// The record and the token may live in different backends (a per-session
/// store for the record, a longer-lived one for the token). Every write is
/// best-effort: failures are logged and swallowed so in-memory state stays
/// authoritative.
#[derive(Clone)]
pub struct SessionPersistence {
    session_storage: Arc<dyn DurableStorage>,
    token_storage: Arc<dyn DurableStorage>,
}

impl SessionPersistence {
    pub fn new(
        session_storage: Arc<dyn DurableStorage>,
        token_storage: Arc<dyn DurableStorage>,
    ) -> Self {
        Self {
            session_storage,
            token_storage,
        }
    }

    /// Use one backend for both the record and the token.
    pub fn shared(storage: Arc<dyn DurableStorage>) -> Self {
        Self::new(storage.clone(), storage)
    }

    /// Restore the persisted session, or the empty session when there is no
    /// usable record.
    pub fn load(&self) -> SessionSnapshot {
        let raw = match self.session_storage.get_item(SESSION_STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return SessionSnapshot::default(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read persisted session; starting empty");
                return SessionSnapshot::default();
            }
        };

        match SessionRecord::decode(&raw) {
            Ok(record) => {
                if record.version != RECORD_VERSION {
                    tracing::debug!(version = record.version, "restoring session record of another version");
                }
                record.state
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to deserialise persisted session; starting empty");
                SessionSnapshot::default()
            }
        }
    }

    /// Write the session record.
    pub fn save(&self, state: &SessionSnapshot) {
        let encoded = match SessionRecord::new(state.clone()).encode() {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialise session record");
                return;
            }
        };
        if let Err(e) = self.session_storage.set_item(SESSION_STORAGE_KEY, &encoded) {
            tracing::warn!(error = %e, "failed to persist session record");
        }
    }

    /// Remove the session record.
    pub fn clear(&self) {
        if let Err(e) = self.session_storage.remove_item(SESSION_STORAGE_KEY) {
            tracing::warn!(error = %e, "failed to remove session record");
        }
    }

    /// Mirror `token` under [`AUTH_TOKEN_KEY`].
    pub fn save_token(&self, token: &str) {
        if let Err(e) = self.token_storage.set_item(AUTH_TOKEN_KEY, token) {
            tracing::warn!(error = %e, "failed to persist auth token");
        }
    }

    /// Drop the mirrored token.
    pub fn clear_token(&self) {
        if let Err(e) = self.token_storage.remove_item(AUTH_TOKEN_KEY) {
            tracing::warn!(error = %e, "failed to remove auth token");
        }
    }
}

impl std::fmt::Debug for SessionPersistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionPersistence").finish_non_exhaustive()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
