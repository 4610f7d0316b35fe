//! Convenience façade over [`AppStore`].
//!
//! Bundles the operations UI code reaches for most often and adds one-line
//! notification helpers. Holds nothing but a store handle.

use serde_json::Value;
use store_core::models::{
    Notification, NotificationDraft, NotificationKind, SessionSnapshot, User, UserPatch,
};

use crate::app_store::AppStore;

/// Build a draft the way a caller would spell it out positionally.
///
/// `duration` of `None` takes the store's default at insertion time.
pub fn create_notification(
    kind: NotificationKind,
    title: impl Into<String>,
    message: Option<String>,
    duration: Option<i64>,
) -> NotificationDraft {
    NotificationDraft {
        kind,
        title: title.into(),
        message,
        duration,
    }
}

/// Derived actions bound to one store.
#[derive(Debug, Clone)]
pub struct StoreActions {
    store: AppStore,
}

impl StoreActions {
    pub fn new(store: AppStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &AppStore {
        &self.store
    }

    // ── Session ───────────────────────────────────────────────────────────

    pub fn login(&self, user: User, token: impl Into<String>) {
        self.store.login(user, token);
    }

    pub fn logout(&self) {
        self.store.logout();
    }

    pub fn update_user(&self, patch: &UserPatch) {
        self.store.update_user(patch);
    }

    /// The current session, logged out first if it has expired.
    pub fn session(&self) -> SessionSnapshot {
        self.store.session()
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.session().is_authenticated
    }

    pub fn current_user(&self) -> Option<User> {
        self.store.session().user
    }

    // ── Data cache ────────────────────────────────────────────────────────

    pub fn set_cached_data(&self, key: impl Into<String>, value: Value) {
        self.store.set_cached_data(key, value);
    }

    pub fn get_cached_data(&self, key: &str) -> Option<Value> {
        self.store.get_cached_data(key)
    }

    /// Clear one key, or everything with `None`.
    pub fn clear_cached_data(&self, key: Option<&str>) {
        self.store.clear_cached_data(key);
    }

    // ── UI ────────────────────────────────────────────────────────────────

    pub fn set_loading(&self, loading: bool) {
        self.store.set_loading(loading);
    }

    pub fn toggle_sidebar(&self) -> bool {
        self.store.toggle_sidebar()
    }

    pub fn toggle_dark_mode(&self) -> bool {
        self.store.toggle_dark_mode()
    }

    // ── Notifications ─────────────────────────────────────────────────────

    pub fn add_notification(&self, draft: NotificationDraft) -> Notification {
        self.store.add_notification(draft)
    }

    pub fn remove_notification(&self, id: &str) {
        self.store.remove_notification(id);
    }

    pub fn show_success(&self, title: impl Into<String>, message: Option<String>) -> Notification {
        self.show(NotificationKind::Success, title, message)
    }

    pub fn show_error(&self, title: impl Into<String>, message: Option<String>) -> Notification {
        self.show(NotificationKind::Error, title, message)
    }

    pub fn show_warning(&self, title: impl Into<String>, message: Option<String>) -> Notification {
        self.show(NotificationKind::Warning, title, message)
    }

    pub fn show_info(&self, title: impl Into<String>, message: Option<String>) -> Notification {
        self.show(NotificationKind::Info, title, message)
    }

    fn show(
        &self,
        kind: NotificationKind,
        title: impl Into<String>,
        message: Option<String>,
    ) -> Notification {
        self.store
            .add_notification(create_notification(kind, title, message, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ManualScheduler;
    use serde_json::json;
    use std::sync::Arc;
    use store_core::clock::ManualClock;

    fn actions() -> (Arc<ManualScheduler>, StoreActions) {
        let clock = Arc::new(ManualClock::new(0));
        let scheduler = Arc::new(ManualScheduler::new(clock.clone()));
        let store = AppStore::builder()
            .clock(clock)
            .scheduler(scheduler.clone())
            .build();
        (scheduler, store.actions())
    }

    #[test]
    fn test_create_notification_fields() {
        let draft = create_notification(
            NotificationKind::Warning,
            "Disk",
            Some("almost full".to_string()),
            Some(0),
        );
        assert_eq!(draft.kind, NotificationKind::Warning);
        assert_eq!(draft.title, "Disk");
        assert_eq!(draft.message.as_deref(), Some("almost full"));
        assert_eq!(draft.duration, Some(0));
    }

    #[test]
    fn test_show_helpers_use_kind_and_default_duration() {
        let (_, a) = actions();
        let kinds = [
            a.show_success("s", None).kind,
            a.show_error("e", Some("why".to_string())).kind,
            a.show_warning("w", None).kind,
            a.show_info("i", None).kind,
        ];
        assert_eq!(
            kinds,
            [
                NotificationKind::Success,
                NotificationKind::Error,
                NotificationKind::Warning,
                NotificationKind::Info
            ]
        );
        assert!(a
            .store()
            .notifications()
            .iter()
            .all(|n| n.duration == Some(5000)));
    }

    #[test]
    fn test_show_helper_expires() {
        let (scheduler, a) = actions();
        a.show_error("Failed", Some("retry later".to_string()));
        scheduler.advance(5_000);
        assert!(a.store().notifications().is_empty());
    }

    #[test]
    fn test_session_shortcuts() {
        let (_, a) = actions();
        assert!(!a.is_authenticated());
        a.login(User::new("1", "Ada", "ada@example.com"), "t");
        assert!(a.is_authenticated());
        assert_eq!(a.current_user().map(|u| u.name), Some("Ada".to_string()));
        a.logout();
        assert!(a.current_user().is_none());
    }

    #[test]
    fn test_update_user_through_facade() {
        let (_, a) = actions();
        a.login(User::new("1", "Ada", "ada@example.com"), "t");
        a.update_user(&UserPatch {
            name: Some("Ada L.".to_string()),
            role: Some("admin".to_string()),
            ..Default::default()
        });

        let user = a.current_user().expect("signed in");
        assert_eq!(user.name, "Ada L.");
        assert_eq!(user.role.as_deref(), Some("admin"));
        assert_eq!(user.email, "ada@example.com");
    }

    #[test]
    fn test_cache_through_facade() {
        let (scheduler, a) = actions();
        a.set_cached_data("users", json!([1, 2]));
        a.set_cached_data("teams", json!({"n": 3}));
        assert_eq!(a.get_cached_data("users"), Some(json!([1, 2])));
        assert!(!a.store().is_data_stale_default("users"));

        a.clear_cached_data(Some("users"));
        assert!(a.get_cached_data("users").is_none());
        assert!(a.store().is_data_stale_default("users"));
        assert!(a.get_cached_data("teams").is_some());

        scheduler.advance(1);
        a.clear_cached_data(None);
        assert!(a.get_cached_data("teams").is_none());
        assert!(a.store().snapshot().last_data_fetch.is_empty());
    }

    #[test]
    fn test_facade_shares_store_state() {
        let (_, a) = actions();
        let other = a.store().actions();
        a.toggle_sidebar();
        a.set_loading(true);
        assert!(!other.store().ui().is_sidebar_open);
        assert!(other.store().ui().is_loading);
    }
}
