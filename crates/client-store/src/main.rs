mod bootstrap;
mod login_form;

use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;
use store_core::clock::{format_remaining, to_datetime};
use store_core::models::{NotificationDraft, User, UserPatch};
use store_core::settings::{Command, Settings};
use store_data::storage::FileStorage;
use store_runtime::app_store::{AppStore, StoreAction};
use store_runtime::presentation::LogPresentation;

use crate::login_form::LoginForm;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load();
    let data_dir = settings.data_dir();

    let storage_dir = bootstrap::ensure_directories(&data_dir)?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("client-store v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Data dir: {}, Theme: {}",
        data_dir.display(),
        settings.theme
    );

    let config = settings.store_config();
    config.validate()?;

    let store = AppStore::builder()
        .config(config)
        .presentation(Arc::new(LogPresentation))
        .storage(Arc::new(FileStorage::new(storage_dir)))
        .build();

    run(&store, settings.command).await
}

async fn run(store: &AppStore, command: Command) -> Result<()> {
    match command {
        Command::Login {
            email,
            password,
            token,
            id,
            name,
            avatar,
            role,
        } => {
            LoginForm::new(email.clone(), password).validate()?;

            let name = name.unwrap_or_else(|| {
                email
                    .split('@')
                    .next()
                    .unwrap_or(email.as_str())
                    .to_string()
            });
            let user = User {
                avatar,
                role,
                ..User::new(id.unwrap_or_else(|| email.clone()), name, email)
            };
            store.login(user, token);

            let session = store.session();
            println!(
                "Logged in as {} (session {})",
                session.user.map(|u| u.email).unwrap_or_default(),
                session.session_id.unwrap_or_default()
            );
        }

        Command::Logout => {
            store.logout();
            println!("Logged out");
        }

        Command::Status { json } => {
            let session = store.session();
            if json {
                println!("{}", serde_json::to_string_pretty(&session)?);
                return Ok(());
            }
            if !session.is_authenticated {
                println!("No active session");
                if let Some(token) = session.auth_token {
                    println!("Stored token: {token}");
                }
                return Ok(());
            }

            if let Some(user) = &session.user {
                println!("User:        {} <{}>", user.name, user.email);
                if let Some(role) = &user.role {
                    println!("Role:        {role}");
                }
            }
            println!(
                "Session:     {}",
                session.session_id.as_deref().unwrap_or("-")
            );
            let last = session
                .last_activity
                .and_then(to_datetime)
                .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "-".to_string());
            println!("Last active: {last}");
            println!(
                "Expires in:  {}",
                format_remaining(store.time_until_expiry())
            );
        }

        Command::Touch => {
            if store.session().is_authenticated {
                store.update_last_activity();
                println!(
                    "Activity recorded; expires in {}",
                    format_remaining(store.time_until_expiry())
                );
            } else {
                println!("No active session");
            }
        }

        Command::SetToken { token } => {
            store.set_auth_token(token);
            println!("Token updated");
        }

        Command::UpdateUser {
            name,
            email,
            avatar,
            role,
        } => {
            let patch = UserPatch {
                name,
                email,
                avatar,
                role,
                ..Default::default()
            };
            if store.session().user.is_none() {
                tracing::warn!("update-user without a signed-in user; nothing changed");
                println!("No signed-in user");
                return Ok(());
            }
            store.update_user(&patch);
            println!("User updated");
        }

        Command::Notify {
            kind,
            title,
            message,
            duration,
        } => {
            let mut changes = store.subscribe();

            let mut draft = NotificationDraft::new(kind, title);
            draft.message = message;
            draft.duration = duration;
            let notification = store.add_notification(draft);
            println!(
                "[{}] {}{}",
                notification.kind,
                notification.title,
                notification
                    .message
                    .as_deref()
                    .map(|m| format!(": {m}"))
                    .unwrap_or_default()
            );

            if notification.is_sticky() {
                println!("Sticky notification {}; not waiting", notification.id);
                return Ok(());
            }

            loop {
                tokio::select! {
                    change = changes.recv() => match change {
                        Ok(change) if change.action == StoreAction::RemoveNotification
                            && !change.state.notifications.iter().any(|n| n.id == notification.id) => {
                            println!("Notification {} expired", notification.id);
                            break;
                        }
                        Ok(_) => {}
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            tracing::debug!(skipped = n, "observer lagged");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    },
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("Ctrl+C received; leaving notification queue");
                        break;
                    }
                }
            }
        }

        Command::Cache {
            key,
            value,
            max_age,
        } => {
            let value: Value =
                serde_json::from_str(&value).unwrap_or_else(|_| Value::String(value));
            store.set_cached_data(key.clone(), value);

            let max_age = max_age.unwrap_or(store.config().default_cache_max_age_ms);
            println!(
                "{} = {}",
                key,
                store.get_cached_data(&key).unwrap_or(Value::Null)
            );
            let fetched = store
                .last_data_fetch(&key)
                .and_then(to_datetime)
                .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "-".to_string());
            println!("fetched at {fetched}");
            println!(
                "stale after {} ms: {}",
                max_age,
                store.is_data_stale(&key, max_age)
            );
        }
    }

    Ok(())
}
