//! Durable storage layer for the client store.
//!
//! Provides the key/value [`storage::DurableStorage`] contract with an
//! in-memory and a file-backed backend, plus the codec for the persisted
//! session record and the mirrored auth token.

pub mod session_record;
pub mod storage;

pub use store_core as core;
