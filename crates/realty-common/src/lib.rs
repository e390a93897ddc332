//! Realty Common
//!
//! Small building blocks shared by every crate in the workspace.

pub mod logging;

use rand::{distributions::Alphanumeric, Rng};

pub use logging::{init as init_logging, LogFormat};

/// Generate a random alphanumeric string (`[A-Za-z0-9]`) of `length` characters.
pub fn random_string(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Join a prefix and its parts into a `:`-separated cache key.
///
/// ```
/// assert_eq!(realty_common::cache_key("user", &["123"]), "user:123");
/// ```
pub fn cache_key(prefix: &str, parts: &[&str]) -> String {
    let mut key = String::from(prefix);
    for part in parts {
        key.push(':');
        key.push_str(part);
    }
    key
}
