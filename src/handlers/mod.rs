pub mod analysis;
pub mod config;
pub mod info;
pub mod results;

pub use analysis::*;
pub use config::*;
pub use info::*;
pub use results::*;

use crate::error::{AppError, AppResult};

/// Longest accepted session id.
pub const MAX_SESSION_ID_LEN: usize = 128;

/// Session ids are opaque, but they end up in cache keys and log lines, so
/// only `[A-Za-z0-9_-]{1,128}` is accepted.
pub fn validate_session_id(session_id: &str) -> AppResult<()> {
    let valid = !session_id.is_empty()
        && session_id.len() <= MAX_SESSION_ID_LEN
        && session_id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');

    if valid {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "Invalid session id: use 1-{} characters from A-Z, a-z, 0-9, '_' and '-'",
            MAX_SESSION_ID_LEN
        )))
    }
}
