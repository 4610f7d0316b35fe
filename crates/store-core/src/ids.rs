//! Identifier generation for sessions and notifications.
//!
//! Ids take the form `<prefix>_<millis>_<suffix>` where the suffix is nine
//! random base-36 characters.

use rand::Rng;

const SUFFIX_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Build a fresh session id for a login at `now_ms`.
pub fn session_id(now_ms: i64) -> String {
    prefixed_id("session", now_ms)
}

/// Build a fresh notification id for a notification created at `now_ms`.
pub fn notification_id(now_ms: i64) -> String {
    prefixed_id("notification", now_ms)
}

fn prefixed_id(prefix: &str, now_ms: i64) -> String {
    format!("{prefix}_{now_ms}_{}", random_suffix())
}

fn random_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect()
}
