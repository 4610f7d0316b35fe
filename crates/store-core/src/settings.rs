use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::config::StoreConfig;
use crate::models::NotificationKind;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Drive the client session store from the command line
#[derive(Parser, Debug, Clone)]
#[command(
    name = "client-store",
    about = "Drive the client session store from the command line",
    version
)]
pub struct Settings {
    /// Directory holding durable storage and config (defaults to ~/.client-store)
    #[arg(long, env = "CLIENT_STORE_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Presentation mode
    #[arg(long, default_value = "auto", value_parser = ["light", "dark", "auto"], global = true)]
    pub theme: String,

    /// Logging level
    #[arg(long, default_value = "WARNING", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"], global = true)]
    pub log_level: String,

    /// Log file path
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Store operations exposed on the command line.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Validate credentials and start a session with a provider-issued token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Token issued by the identity provider
        #[arg(long)]
        token: String,
        /// User id (defaults to the email)
        #[arg(long)]
        id: Option<String>,
        /// Display name (defaults to the email's local part)
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        avatar: Option<String>,
        #[arg(long)]
        role: Option<String>,
    },
    /// End the current session
    Logout,
    /// Print the session, enforcing expiry first
    Status {
        /// Print the raw JSON snapshot
        #[arg(long)]
        json: bool,
    },
    /// Record user activity now
    Touch,
    /// Replace the auth token (token refresh)
    SetToken { token: String },
    /// Merge fields into the signed-in user
    UpdateUser {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        avatar: Option<String>,
        #[arg(long)]
        role: Option<String>,
    },
    /// Show a notification and follow the queue until it empties
    Notify {
        #[arg(long, default_value = "info", value_parser = parse_kind)]
        kind: NotificationKind,
        title: String,
        #[arg(long)]
        message: Option<String>,
        /// Lifetime in milliseconds (non-positive is sticky)
        #[arg(long, allow_negative_numbers = true)]
        duration: Option<i64>,
    },
    /// Exercise the data cache with a JSON payload
    Cache {
        key: String,
        /// JSON value to store
        value: String,
        /// Max age in milliseconds for the staleness report
        #[arg(long)]
        max_age: Option<i64>,
    },
}

fn parse_kind(s: &str) -> Result<NotificationKind, String> {
    s.parse()
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments and resolve `"auto"` values.
    pub fn load() -> Self {
        Self::resolve(Settings::parse())
    }

    /// Same as [`load`] but accepts an explicit argument list.
    pub fn load_from_args<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::resolve(Settings::parse_from(args))
    }

    /// Resolve the data directory, the `"auto"` theme and the `--debug` flag.
    fn resolve(mut settings: Settings) -> Settings {
        if settings.data_dir.is_none() {
            settings.data_dir = Some(default_data_dir());
        }

        if settings.theme == "auto" {
            settings.theme = match detect_background() {
                BackgroundType::Light => "light".to_string(),
                BackgroundType::Dark => "dark".to_string(),
            };
        }

        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }

        settings
    }

    /// Resolved data directory.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }

    /// Load the store config from the data directory, with the theme choice
    /// applied to the initial dark-mode flag.
    pub fn store_config(&self) -> StoreConfig {
        self.store_config_in(&self.data_dir())
    }

    /// Same as [`store_config`] rooted at an explicit directory.
    pub fn store_config_in(&self, data_dir: &Path) -> StoreConfig {
        let mut config = StoreConfig::load_from(&StoreConfig::config_path_in(data_dir));
        match self.theme.as_str() {
            "dark" => config.dark_mode = true,
            "light" => config.dark_mode = false,
            _ => {}
        }
        config
    }
}

/// `~/.client-store`, or `./.client-store` without a home directory.
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".client-store")
}

// ── Background detection ──────────────────────────────────────────────────────

/// Terminal background type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundType {
    Dark,
    Light,
}

/// Detect the terminal background from the `COLORFGBG` environment variable.
pub fn detect_background() -> BackgroundType {
    background_from_colorfgbg(std::env::var("COLORFGBG").ok().as_deref())
}

/// The variable has the format `"foreground;background"`. Background values
/// 0–6 are dark, 7–15 light; absent or unparseable values count as dark.
pub fn background_from_colorfgbg(value: Option<&str>) -> BackgroundType {
    let bg = value
        .and_then(|v| v.split(';').next_back())
        .and_then(|bg| bg.parse::<u8>().ok());
    match bg {
        Some(n) if n > 6 => BackgroundType::Light,
        _ => BackgroundType::Dark,
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
