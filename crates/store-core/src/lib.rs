//! Core types for the client store.
//!
//! Holds the session, user and notification data model, the shared error
//! type, the clock abstraction used for every timestamp, id generation and
//! the configuration layer consumed by the runtime and the binary.

pub mod clock;
pub mod config;
pub mod error;
pub mod ids;
pub mod models;
pub mod settings;
