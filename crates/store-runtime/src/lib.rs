//! Runtime layer of the client store.
//!
//! Owns the live state: session manager, notification queue, data cache and
//! the [`app_store::AppStore`] aggregator that composes them and broadcasts
//! every change.

pub mod actions;
pub mod app_store;
pub mod cache;
pub mod notifications;
pub mod presentation;
pub mod scheduler;
pub mod session;

pub use store_core as core;
pub use store_data as data;
