//! Data model shared by every store crate.
//!
//! Field names serialize in camelCase because the persisted session record
//! and the observer snapshots are read by collaborators that expect the
//! browser-era wire shape (`authToken`, `isAuthenticated`, ...).

use serde::{Deserialize, Serialize};

// ── Constants ─────────────────────────────────────────────────────────────────

/// Inactivity window after which a session is no longer valid (24 hours).
pub const SESSION_TIMEOUT_MS: i64 = 24 * 60 * 60 * 1000;

/// Lifetime of a notification when the caller does not pick one.
pub const DEFAULT_NOTIFICATION_DURATION_MS: i64 = 5_000;

/// Freshness threshold used by staleness checks without an explicit max age.
pub const DEFAULT_CACHE_MAX_AGE_MS: i64 = 5 * 60 * 1000;

// ── User ──────────────────────────────────────────────────────────────────────

/// Identity record of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl User {
    pub fn new(id: impl Into<String>, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            avatar: None,
            role: None,
        }
    }
}

/// Partial update for a [`User`]; only the `Some` fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl UserPatch {
    /// `true` when the patch carries no field at all.
    pub fn is_empty(&self) -> bool {
        self.id.is_none()
            && self.name.is_none()
            && self.email.is_none()
            && self.avatar.is_none()
            && self.role.is_none()
    }

    /// Merge the present fields into `user`.
    pub fn apply_to(&self, user: &mut User) {
        if let Some(id) = &self.id {
            user.id = id.clone();
        }
        if let Some(name) = &self.name {
            user.name = name.clone();
        }
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
        if let Some(avatar) = &self.avatar {
            user.avatar = Some(avatar.clone());
        }
        if let Some(role) = &self.role {
            user.role = Some(role.clone());
        }
    }
}

// ── SessionSnapshot ───────────────────────────────────────────────────────────

/// The five session fields, as held in memory and as persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default)]
    pub is_authenticated: bool,
    #[serde(default)]
    pub session_id: Option<String>,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub last_activity: Option<i64>,
}

impl SessionSnapshot {
    /// `true` when authenticated and active within `timeout_ms` of `now_ms`.
    pub fn is_valid_at(&self, now_ms: i64, timeout_ms: i64) -> bool {
        match self.last_activity {
            Some(last) if self.is_authenticated => now_ms - last < timeout_ms,
            _ => false,
        }
    }

    /// Milliseconds left before the session expires, clamped at zero.
    ///
    /// Returns `0` when there has never been any activity.
    pub fn time_until_expiry_at(&self, now_ms: i64, timeout_ms: i64) -> i64 {
        match self.last_activity {
            Some(last) => (timeout_ms - (now_ms - last)).max(0),
            None => 0,
        }
    }

    /// `true` when every field is at its logged-out default.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ── Notifications ─────────────────────────────────────────────────────────────

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
    Info,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "success" => Ok(Self::Success),
            "error" => Ok(Self::Error),
            "warning" => Ok(Self::Warning),
            "info" => Ok(Self::Info),
            other => Err(format!("unknown notification kind: {other}")),
        }
    }
}

/// A queued notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Creation time, milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Lifetime in milliseconds; non-positive means sticky.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
}

impl Notification {
    /// `true` when the notification is only removed by explicit action.
    pub fn is_sticky(&self) -> bool {
        !matches!(self.duration, Some(d) if d > 0)
    }
}

/// Caller-supplied part of a notification; id and timestamp are assigned
/// when it is queued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationDraft {
    pub kind: NotificationKind,
    pub title: String,
    pub message: Option<String>,
    /// `None` takes the queue's default duration.
    pub duration: Option<i64>,
}

impl NotificationDraft {
    pub fn new(kind: NotificationKind, title: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            message: None,
            duration: None,
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Override the lifetime; `0` or negative keeps the notification until
    /// it is removed.
    pub fn duration(mut self, duration_ms: i64) -> Self {
        self.duration = Some(duration_ms);
        self
    }

    pub fn success(title: impl Into<String>) -> Self {
        Self::new(NotificationKind::Success, title)
    }

    pub fn error(title: impl Into<String>) -> Self {
        Self::new(NotificationKind::Error, title)
    }

    pub fn warning(title: impl Into<String>) -> Self {
        Self::new(NotificationKind::Warning, title)
    }

    pub fn info(title: impl Into<String>) -> Self {
        Self::new(NotificationKind::Info, title)
    }
}

// ── UiFlags ───────────────────────────────────────────────────────────────────

/// Simple presentation flags owned by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiFlags {
    pub is_loading: bool,
    pub is_sidebar_open: bool,
    pub is_dark_mode: bool,
}

impl Default for UiFlags {
    fn default() -> Self {
        Self {
            is_loading: false,
            is_sidebar_open: true,
            is_dark_mode: false,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
