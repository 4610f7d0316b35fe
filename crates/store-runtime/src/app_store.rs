//! Process state aggregator.
//!
//! [`AppStore`] composes the session manager, the notification queue, the
//! data cache and the UI flags behind one lock and one observer channel.
//! It is a cheap cloneable handle: hand a clone to every collaborator
//! instead of reaching for a global.
//!
//! Every operation mutates state under the lock, releases it, and only then
//! broadcasts a [`StateChange`] carrying a full snapshot, so observers never
//! see a half-applied mutation.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

use store_core::clock::{Clock, SystemClock};
use store_core::config::StoreConfig;
use store_core::error::Result;
use store_core::models::{
    Notification, NotificationDraft, SessionSnapshot, UiFlags, User, UserPatch,
};
use store_data::session_record::SessionPersistence;
use store_data::storage::{DurableStorage, MemoryStorage};

use crate::actions::StoreActions;
use crate::cache::DataCache;
use crate::notifications::NotificationQueue;
use crate::presentation::{NoopPresentation, PresentationSink};
use crate::scheduler::{Scheduler, TokioScheduler};
use crate::session::SessionManager;

// ── Public types ──────────────────────────────────────────────────────────────

/// Name of the operation that produced a [`StateChange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreAction {
    Login,
    Logout,
    UpdateUser,
    SetAuthToken,
    UpdateLastActivity,
    SetSessionId,
    SetLoading,
    ToggleSidebar,
    SetSidebarOpen,
    ToggleDarkMode,
    SetDarkMode,
    AddNotification,
    RemoveNotification,
    ClearNotifications,
    SetCachedData,
    ClearCachedData,
    ClearAllCachedData,
}

impl StoreAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Logout => "logout",
            Self::UpdateUser => "updateUser",
            Self::SetAuthToken => "setAuthToken",
            Self::UpdateLastActivity => "updateLastActivity",
            Self::SetSessionId => "setSessionId",
            Self::SetLoading => "setLoading",
            Self::ToggleSidebar => "toggleSidebar",
            Self::SetSidebarOpen => "setSidebarOpen",
            Self::ToggleDarkMode => "toggleDarkMode",
            Self::SetDarkMode => "setDarkMode",
            Self::AddNotification => "addNotification",
            Self::RemoveNotification => "removeNotification",
            Self::ClearNotifications => "clearNotifications",
            Self::SetCachedData => "setCachedData",
            Self::ClearCachedData => "clearCachedData",
            Self::ClearAllCachedData => "clearAllCachedData",
        }
    }
}

impl std::fmt::Display for StoreAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full copy of the store state at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSnapshot {
    pub session: SessionSnapshot,
    pub notifications: Vec<Notification>,
    pub cached_data: BTreeMap<String, Value>,
    pub last_data_fetch: BTreeMap<String, i64>,
    pub ui: UiFlags,
}

/// One committed mutation, as seen by observers.
#[derive(Debug, Clone)]
pub struct StateChange {
    pub action: StoreAction,
    pub state: Arc<AppSnapshot>,
}

// ── Internal state ────────────────────────────────────────────────────────────

struct StoreState {
    session: SessionManager,
    notifications: NotificationQueue,
    cache: DataCache,
    ui: UiFlags,
}

impl StoreState {
    fn snapshot(&self) -> AppSnapshot {
        AppSnapshot {
            session: self.session.snapshot().clone(),
            notifications: self.notifications.items().to_vec(),
            cached_data: self.cache.data(),
            last_data_fetch: self.cache.fetch_times(),
            ui: self.ui,
        }
    }
}

struct StoreInner {
    state: Mutex<StoreState>,
    scheduler: Arc<dyn Scheduler>,
    presentation: Arc<dyn PresentationSink>,
    events: broadcast::Sender<StateChange>,
    config: StoreConfig,
}

// ── AppStore ──────────────────────────────────────────────────────────────────

/// Observable client state container.
///
/// # Example
///
/// ```no_run
/// use store_core::models::{NotificationDraft, User};
/// use store_runtime::app_store::AppStore;
///
/// # async fn demo() {
/// let store = AppStore::new();
/// let mut changes = store.subscribe();
///
/// store.login(User::new("u1", "Ada", "ada@example.com"), "token");
/// store.add_notification(NotificationDraft::success("Signed in"));
///
/// while let Ok(change) = changes.recv().await {
///     println!("{} -> {} notifications", change.action, change.state.notifications.len());
/// }
/// # }
/// ```
#[derive(Clone)]
pub struct AppStore {
    inner: Arc<StoreInner>,
}

impl AppStore {
    /// A store with default config, real time, tokio timers and in-memory
    /// storage.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> AppStoreBuilder {
        AppStoreBuilder::default()
    }

    /// Receive every committed state change from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.inner.events.subscribe()
    }

    /// Full state, without enforcing session expiry.
    pub fn snapshot(&self) -> AppSnapshot {
        self.lock().snapshot()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// The derived convenience façade.
    pub fn actions(&self) -> StoreActions {
        StoreActions::new(self.clone())
    }

    // ── Session ───────────────────────────────────────────────────────────

    pub fn login(&self, user: User, token: impl Into<String>) {
        let token = token.into();
        self.mutate(StoreAction::Login, |st| st.session.login(user, token));
    }

    pub fn logout(&self) {
        self.mutate(StoreAction::Logout, |st| st.session.logout());
    }

    pub fn update_user(&self, patch: &UserPatch) {
        self.mutate(StoreAction::UpdateUser, |st| st.session.update_user(patch));
    }

    pub fn set_auth_token(&self, token: impl Into<String>) {
        let token = token.into();
        self.mutate(StoreAction::SetAuthToken, |st| st.session.set_auth_token(token));
    }

    pub fn update_last_activity(&self) {
        self.mutate(StoreAction::UpdateLastActivity, |st| {
            st.session.update_last_activity()
        });
    }

    pub fn set_session_id(&self, session_id: impl Into<String>) {
        let session_id = session_id.into();
        self.mutate(StoreAction::SetSessionId, |st| {
            st.session.set_session_id(session_id)
        });
    }

    pub fn is_session_valid(&self) -> bool {
        self.lock().session.is_session_valid()
    }

    pub fn time_until_expiry(&self) -> i64 {
        self.lock().session.time_until_expiry()
    }

    /// Consult the session: an authenticated session that has expired is
    /// logged out first, then the current fields are returned.
    pub fn session(&self) -> SessionSnapshot {
        let (session, snapshot) = {
            let mut state = self.lock();
            let logged_out = state.session.enforce_validity();
            let snapshot = logged_out.then(|| self.snapshot_for_observers(&state));
            (state.session.snapshot().clone(), snapshot)
        };
        if let Some(snapshot) = snapshot {
            self.publish(StoreAction::Logout, snapshot);
        }
        session
    }

    /// The session fields as they are, expired or not.
    pub fn session_unchecked(&self) -> SessionSnapshot {
        self.lock().session.snapshot().clone()
    }

    // ── UI flags ──────────────────────────────────────────────────────────

    pub fn set_loading(&self, loading: bool) {
        self.mutate(StoreAction::SetLoading, |st| st.ui.is_loading = loading);
    }

    /// Flip the sidebar and return the new value.
    pub fn toggle_sidebar(&self) -> bool {
        self.mutate(StoreAction::ToggleSidebar, |st| {
            st.ui.is_sidebar_open = !st.ui.is_sidebar_open;
            st.ui.is_sidebar_open
        })
    }

    pub fn set_sidebar_open(&self, open: bool) {
        self.mutate(StoreAction::SetSidebarOpen, |st| st.ui.is_sidebar_open = open);
    }

    /// Flip dark mode, apply it to the presentation sink, and return the new
    /// value.
    pub fn toggle_dark_mode(&self) -> bool {
        self.mutate(StoreAction::ToggleDarkMode, |st| {
            let next = !st.ui.is_dark_mode;
            self.inner.presentation.apply_dark_mode(next);
            st.ui.is_dark_mode = next;
            next
        })
    }

    pub fn set_dark_mode(&self, dark: bool) {
        self.mutate(StoreAction::SetDarkMode, |st| {
            self.inner.presentation.apply_dark_mode(dark);
            st.ui.is_dark_mode = dark;
        });
    }

    pub fn ui(&self) -> UiFlags {
        self.lock().ui
    }

    // ── Notifications ─────────────────────────────────────────────────────

    /// Queue a notification and schedule its removal when it has a positive
    /// duration. Returns the stored record.
    pub fn add_notification(&self, draft: NotificationDraft) -> Notification {
        let notification = self.mutate(StoreAction::AddNotification, |st| {
            st.notifications.add(draft)
        });

        if let Some(duration) = notification.duration.filter(|d| *d > 0) {
            self.schedule_removal(notification.id.clone(), duration);
        }
        notification
    }

    /// Remove by id; absent ids are ignored.
    pub fn remove_notification(&self, id: &str) {
        self.mutate(StoreAction::RemoveNotification, |st| {
            st.notifications.remove(id)
        });
    }

    pub fn clear_notifications(&self) {
        self.mutate(StoreAction::ClearNotifications, |st| st.notifications.clear());
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.lock().notifications.items().to_vec()
    }

    // ── Data cache ────────────────────────────────────────────────────────

    pub fn set_cached_data(&self, key: impl Into<String>, value: Value) {
        let key = key.into();
        self.mutate(StoreAction::SetCachedData, |st| st.cache.set(key, value));
    }

    /// Serialize and cache `value`. Only a payload that cannot become JSON
    /// is an error.
    pub fn set_cached_typed<T: Serialize>(&self, key: impl Into<String>, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.set_cached_data(key, value);
        Ok(())
    }

    pub fn get_cached_data(&self, key: &str) -> Option<Value> {
        self.lock().cache.get(key).cloned()
    }

    pub fn get_cached_typed<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.lock().cache.get_typed(key)
    }

    /// Clear one key, or the whole cache with `None`.
    pub fn clear_cached_data(&self, key: Option<&str>) {
        let action = match key {
            Some(_) => StoreAction::ClearCachedData,
            None => StoreAction::ClearAllCachedData,
        };
        self.mutate(action, |st| st.cache.clear(key));
    }

    /// When `key` was last written, if it is cached.
    pub fn last_data_fetch(&self, key: &str) -> Option<i64> {
        self.lock().cache.last_fetch(key)
    }

    pub fn is_data_stale(&self, key: &str, max_age_ms: i64) -> bool {
        self.lock().cache.is_stale(key, max_age_ms)
    }

    pub fn is_data_stale_default(&self, key: &str) -> bool {
        self.lock().cache.is_stale_default(key)
    }

    // ── Private helpers ───────────────────────────────────────────────────

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Apply `f` under the lock, then broadcast the resulting state.
    fn mutate<R>(&self, action: StoreAction, f: impl FnOnce(&mut StoreState) -> R) -> R {
        let (result, snapshot) = {
            let mut state = self.lock();
            let result = f(&mut state);
            (result, self.snapshot_for_observers(&state))
        };
        self.publish(action, snapshot);
        result
    }

    /// A snapshot only when someone is listening.
    fn snapshot_for_observers(&self, state: &StoreState) -> Option<AppSnapshot> {
        (self.inner.events.receiver_count() > 0).then(|| state.snapshot())
    }

    /// Call with the state lock released.
    fn publish(&self, action: StoreAction, snapshot: Option<AppSnapshot>) {
        tracing::debug!(action = %action, "state change committed");
        if let Some(snapshot) = snapshot {
            // No receivers left between the check and the send is fine.
            let _ = self.inner.events.send(StateChange {
                action,
                state: Arc::new(snapshot),
            });
        }
    }

    fn schedule_removal(&self, id: String, duration_ms: i64) {
        let weak: Weak<StoreInner> = Arc::downgrade(&self.inner);
        let delay = Duration::from_millis(duration_ms.unsigned_abs());
        self.inner.scheduler.schedule(
            delay,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    tracing::debug!(id = %id, "notification expired");
                    AppStore { inner }.remove_notification(&id);
                }
            }),
        );
    }
}

impl Default for AppStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AppStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppStore")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

// ── AppStoreBuilder ───────────────────────────────────────────────────────────

/// Wires the collaborators of an [`AppStore`].
#[derive(Default)]
pub struct AppStoreBuilder {
    config: StoreConfig,
    clock: Option<Arc<dyn Clock>>,
    scheduler: Option<Arc<dyn Scheduler>>,
    presentation: Option<Arc<dyn PresentationSink>>,
    session_storage: Option<Arc<dyn DurableStorage>>,
    token_storage: Option<Arc<dyn DurableStorage>>,
}

impl AppStoreBuilder {
    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn presentation(mut self, presentation: Arc<dyn PresentationSink>) -> Self {
        self.presentation = Some(presentation);
        self
    }

    /// Backend for the session record. Also used for the token unless
    /// [`token_storage`](Self::token_storage) is set.
    pub fn storage(mut self, storage: Arc<dyn DurableStorage>) -> Self {
        self.session_storage = Some(storage);
        self
    }

    pub fn token_storage(mut self, storage: Arc<dyn DurableStorage>) -> Self {
        self.token_storage = Some(storage);
        self
    }

    /// Restore the persisted session and assemble the store.
    pub fn build(self) -> AppStore {
        let config = self.config;
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let scheduler = self.scheduler.unwrap_or_else(|| Arc::new(TokioScheduler));
        let presentation = self
            .presentation
            .unwrap_or_else(|| Arc::new(NoopPresentation));
        let session_storage = self
            .session_storage
            .unwrap_or_else(|| Arc::new(MemoryStorage::new()));
        let token_storage = self
            .token_storage
            .unwrap_or_else(|| session_storage.clone());

        let persistence = SessionPersistence::new(session_storage, token_storage);
        let session =
            SessionManager::with_timeout(persistence, clock.clone(), config.session_timeout_ms);
        let notifications = NotificationQueue::with_default_duration(
            clock.clone(),
            config.default_notification_duration_ms,
        );
        let cache = DataCache::with_default_max_age(clock, config.default_cache_max_age_ms);

        let ui = UiFlags {
            is_dark_mode: config.dark_mode,
            ..UiFlags::default()
        };
        presentation.apply_dark_mode(ui.is_dark_mode);

        let (events, _) = broadcast::channel(config.event_capacity.max(1));

        AppStore {
            inner: Arc::new(StoreInner {
                state: Mutex::new(StoreState {
                    session,
                    notifications,
                    cache,
                    ui,
                }),
                scheduler,
                presentation,
                events,
                config,
            }),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
