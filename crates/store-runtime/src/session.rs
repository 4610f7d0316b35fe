//! Session lifecycle: login, logout, activity tracking and lazy expiry.
//!
//! [`SessionManager`] owns the five session fields and writes them through
//! [`SessionPersistence`] after every mutation. Expiry is never swept in the
//! background; readers call [`SessionManager::enforce_validity`] before
//! trusting the session.

use std::sync::Arc;

use store_core::clock::Clock;
use store_core::ids;
use store_core::models::{SessionSnapshot, User, UserPatch, SESSION_TIMEOUT_MS};
use store_data::session_record::SessionPersistence;

/// Owner of the authenticated-user context.
pub struct SessionManager {
    state: SessionSnapshot,
    persistence: SessionPersistence,
    clock: Arc<dyn Clock>,
    timeout_ms: i64,
}

impl SessionManager {
    /// Create a manager, restoring whatever session `persistence` holds.
    pub fn new(persistence: SessionPersistence, clock: Arc<dyn Clock>) -> Self {
        Self::with_timeout(persistence, clock, SESSION_TIMEOUT_MS)
    }

    /// Same as [`new`](Self::new) with a custom inactivity window.
    pub fn with_timeout(
        persistence: SessionPersistence,
        clock: Arc<dyn Clock>,
        timeout_ms: i64,
    ) -> Self {
        let state = persistence.load();
        if state.is_authenticated {
            tracing::debug!(session_id = ?state.session_id, "restored persisted session");
        }
        Self {
            state,
            persistence,
            clock,
            timeout_ms,
        }
    }

    // ── Actions ───────────────────────────────────────────────────────────

    /// Start a new session for `user`, replacing any existing one.
    pub fn login(&mut self, user: User, token: impl Into<String>) {
        let token = token.into();
        let now = self.clock.now_ms();
        let session_id = ids::session_id(now);

        tracing::info!(user_id = %user.id, session_id = %session_id, "login");

        self.state = SessionSnapshot {
            user: Some(user),
            auth_token: Some(token.clone()),
            is_authenticated: true,
            session_id: Some(session_id),
            last_activity: Some(now),
        };
        self.persistence.save(&self.state);
        self.persistence.save_token(&token);
    }

    /// Reset every field and drop the persisted record and token.
    pub fn logout(&mut self) {
        if !self.state.is_empty() {
            tracing::info!(session_id = ?self.state.session_id, "logout");
        }
        self.state = SessionSnapshot::default();
        self.persistence.clear();
        self.persistence.clear_token();
    }

    /// Merge `patch` into the current user. Without a user this is a no-op.
    pub fn update_user(&mut self, patch: &UserPatch) {
        match self.state.user.as_mut() {
            Some(user) => {
                patch.apply_to(user);
                self.persistence.save(&self.state);
            }
            None => tracing::debug!("update_user ignored: no user signed in"),
        }
    }

    /// Replace the token and persist it, whatever the login state.
    pub fn set_auth_token(&mut self, token: impl Into<String>) {
        let token = token.into();
        self.state.auth_token = Some(token.clone());
        self.persistence.save(&self.state);
        self.persistence.save_token(&token);
    }

    /// Record user activity now.
    pub fn update_last_activity(&mut self) {
        self.state.last_activity = Some(self.clock.now_ms());
        self.persistence.save(&self.state);
    }

    /// Overwrite the session id.
    pub fn set_session_id(&mut self, session_id: impl Into<String>) {
        self.state.session_id = Some(session_id.into());
        self.persistence.save(&self.state);
    }

    /// Log out when the session claims to be authenticated but has expired.
    ///
    /// Returns `true` when a logout happened.
    pub fn enforce_validity(&mut self) -> bool {
        if self.is_expired() {
            tracing::info!(
                session_id = ?self.state.session_id,
                last_activity = ?self.state.last_activity,
                "session expired; logging out"
            );
            self.logout();
            return true;
        }
        false
    }

    // ── Queries ───────────────────────────────────────────────────────────

    /// Authenticated and active within the timeout window.
    pub fn is_session_valid(&self) -> bool {
        self.state.is_valid_at(self.clock.now_ms(), self.timeout_ms)
    }

    /// Authenticated but outside the timeout window.
    pub fn is_expired(&self) -> bool {
        self.state.is_authenticated && !self.is_session_valid()
    }

    /// Milliseconds left before expiry; `0` when never active.
    pub fn time_until_expiry(&self) -> i64 {
        self.state
            .time_until_expiry_at(self.clock.now_ms(), self.timeout_ms)
    }

    pub fn snapshot(&self) -> &SessionSnapshot {
        &self.state
    }

    pub fn user(&self) -> Option<&User> {
        self.state.user.as_ref()
    }

    pub fn auth_token(&self) -> Option<&str> {
        self.state.auth_token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated
    }

    pub fn session_id(&self) -> Option<&str> {
        self.state.session_id.as_deref()
    }

    pub fn last_activity(&self) -> Option<i64> {
        self.state.last_activity
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use store_core::clock::ManualClock;
    use store_data::session_record::{AUTH_TOKEN_KEY, SESSION_STORAGE_KEY};
    use store_data::storage::{DurableStorage, MemoryStorage};

    const HOUR_MS: i64 = 60 * 60 * 1000;
    const START_MS: i64 = 1_700_000_000_000;

    // ── helpers ───────────────────────────────────────────────────────────

    struct Fixture {
        clock: Arc<ManualClock>,
        storage: Arc<MemoryStorage>,
        manager: SessionManager,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new(START_MS));
        let storage = Arc::new(MemoryStorage::new());
        let manager = SessionManager::new(
            SessionPersistence::shared(storage.clone()),
            clock.clone(),
        );
        Fixture {
            clock,
            storage,
            manager,
        }
    }

    fn ada() -> User {
        User::new("u1", "Ada", "ada@example.com")
    }

    // ── login / logout ────────────────────────────────────────────────────

    #[test]
    fn test_login_sets_all_fields() {
        let mut f = fixture();
        f.manager.login(ada(), "tok");

        assert_eq!(f.manager.user(), Some(&ada()));
        assert_eq!(f.manager.auth_token(), Some("tok"));
        assert!(f.manager.is_authenticated());
        assert_eq!(f.manager.last_activity(), Some(START_MS));
        assert!(f
            .manager
            .session_id()
            .is_some_and(|id| id.starts_with(&format!("session_{START_MS}_"))));
    }

    #[test]
    fn test_login_then_valid_then_logout_invalid() {
        let mut f = fixture();
        f.manager.login(ada(), "tok");
        assert!(f.manager.is_session_valid());

        f.manager.logout();
        assert!(!f.manager.is_session_valid());
        assert!(f.manager.snapshot().is_empty());
    }

    #[test]
    fn test_login_persists_record_and_token() {
        let mut f = fixture();
        f.manager.login(ada(), "tok");

        assert_eq!(
            f.storage.get_item(AUTH_TOKEN_KEY).unwrap().as_deref(),
            Some("tok")
        );
        let raw = f.storage.get_item(SESSION_STORAGE_KEY).unwrap().unwrap();
        assert!(raw.contains("\"isAuthenticated\":true"));
    }

    #[test]
    fn test_relogin_generates_new_session_id() {
        let mut f = fixture();
        f.manager.login(ada(), "tok");
        let first = f.manager.session_id().map(str::to_string);

        f.manager.login(User::new("u2", "Bob", "bob@example.com"), "tok2");
        assert_ne!(f.manager.session_id().map(str::to_string), first);
        assert_eq!(f.manager.user().map(|u| u.id.as_str()), Some("u2"));
        assert_eq!(f.manager.auth_token(), Some("tok2"));
    }

    #[test]
    fn test_logout_clears_storage() {
        let mut f = fixture();
        f.manager.login(ada(), "tok");
        f.manager.logout();

        assert!(f.storage.get_item(AUTH_TOKEN_KEY).unwrap().is_none());
        assert!(f.storage.get_item(SESSION_STORAGE_KEY).unwrap().is_none());
    }

    #[test]
    fn test_logout_is_idempotent() {
        let mut f = fixture();
        f.manager.logout();
        f.manager.logout();
        assert!(f.manager.snapshot().is_empty());
        assert!(f.storage.is_empty());
    }

    // ── update_user ───────────────────────────────────────────────────────

    #[test]
    fn test_update_user_without_user_is_noop() {
        let mut f = fixture();
        f.manager.update_user(&UserPatch {
            name: Some("X".to_string()),
            ..Default::default()
        });
        assert!(f.manager.user().is_none());
        assert!(f.storage.get_item(SESSION_STORAGE_KEY).unwrap().is_none());
    }

    #[test]
    fn test_update_user_merges_and_persists() {
        let mut f = fixture();
        f.manager.login(ada(), "tok");
        f.manager.update_user(&UserPatch {
            avatar: Some("ada.png".to_string()),
            ..Default::default()
        });

        let user = f.manager.user().unwrap();
        assert_eq!(user.name, "Ada");
        assert_eq!(user.avatar.as_deref(), Some("ada.png"));

        let raw = f.storage.get_item(SESSION_STORAGE_KEY).unwrap().unwrap();
        assert!(raw.contains("ada.png"));
    }

    // ── set_auth_token ────────────────────────────────────────────────────

    #[test]
    fn test_set_auth_token_without_login() {
        let mut f = fixture();
        f.manager.set_auth_token("abc");

        assert_eq!(f.manager.auth_token(), Some("abc"));
        assert!(!f.manager.is_authenticated());
        assert_eq!(
            f.storage.get_item(AUTH_TOKEN_KEY).unwrap().as_deref(),
            Some("abc")
        );
    }

    #[test]
    fn test_set_auth_token_keeps_session() {
        let mut f = fixture();
        f.manager.login(ada(), "old");
        let session_id = f.manager.session_id().map(str::to_string);

        f.manager.set_auth_token("new");
        assert_eq!(f.manager.auth_token(), Some("new"));
        assert_eq!(f.manager.session_id().map(str::to_string), session_id);
        assert!(f.manager.is_session_valid());
    }

    // ── activity / expiry ─────────────────────────────────────────────────

    #[test]
    fn test_expired_after_25_hours() {
        let mut f = fixture();
        f.manager.login(ada(), "tok");
        f.clock.advance(25 * HOUR_MS);

        assert!(!f.manager.is_session_valid());
        assert_eq!(f.manager.time_until_expiry(), 0);
        assert!(f.manager.is_expired());
    }

    #[test]
    fn test_update_last_activity_extends_session() {
        let mut f = fixture();
        f.manager.login(ada(), "tok");
        f.clock.advance(23 * HOUR_MS);
        f.manager.update_last_activity();
        f.clock.advance(2 * HOUR_MS);

        assert!(f.manager.is_session_valid());
        assert_eq!(f.manager.time_until_expiry(), 22 * HOUR_MS);
    }

    #[test]
    fn test_time_until_expiry_never_active() {
        let f = fixture();
        assert_eq!(f.manager.time_until_expiry(), 0);
    }

    #[test]
    fn test_enforce_validity_logs_out_expired_session() {
        let mut f = fixture();
        f.manager.login(ada(), "tok");
        f.clock.advance(SESSION_TIMEOUT_MS);

        assert!(f.manager.enforce_validity());
        assert!(f.manager.snapshot().is_empty());
        assert!(f.storage.get_item(AUTH_TOKEN_KEY).unwrap().is_none());
    }

    #[test]
    fn test_enforce_validity_keeps_live_session() {
        let mut f = fixture();
        f.manager.login(ada(), "tok");
        f.clock.advance(HOUR_MS);

        assert!(!f.manager.enforce_validity());
        assert!(f.manager.is_authenticated());
    }

    #[test]
    fn test_enforce_validity_ignores_unauthenticated_state() {
        let mut f = fixture();
        f.manager.set_auth_token("abc");
        assert!(!f.manager.enforce_validity());
        assert_eq!(f.manager.auth_token(), Some("abc"));
    }

    #[test]
    fn test_custom_timeout() {
        let clock = Arc::new(ManualClock::new(START_MS));
        let mut manager = SessionManager::with_timeout(
            SessionPersistence::shared(Arc::new(MemoryStorage::new())),
            clock.clone(),
            1_000,
        );
        manager.login(ada(), "tok");
        clock.advance(999);
        assert!(manager.is_session_valid());
        clock.advance(1);
        assert!(!manager.is_session_valid());
    }

    // ── persistence / restore ─────────────────────────────────────────────

    #[test]
    fn test_restore_from_storage() {
        let mut f = fixture();
        f.manager.login(ada(), "tok");
        f.manager.set_session_id("session_custom");

        let restored = SessionManager::new(
            SessionPersistence::shared(f.storage.clone()),
            f.clock.clone(),
        );
        assert_eq!(restored.snapshot(), f.manager.snapshot());
        assert_eq!(restored.session_id(), Some("session_custom"));
        assert!(restored.is_session_valid());
    }

    #[test]
    fn test_separate_token_storage() {
        let clock = Arc::new(ManualClock::new(START_MS));
        let sessions = Arc::new(MemoryStorage::new());
        let tokens = Arc::new(MemoryStorage::new());
        let mut manager = SessionManager::new(
            SessionPersistence::new(sessions.clone(), tokens.clone()),
            clock,
        );
        manager.login(ada(), "tok");

        assert!(sessions.get_item(SESSION_STORAGE_KEY).unwrap().is_some());
        assert!(sessions.get_item(AUTH_TOKEN_KEY).unwrap().is_none());
        assert_eq!(tokens.get_item(AUTH_TOKEN_KEY).unwrap().as_deref(), Some("tok"));
    }
}
