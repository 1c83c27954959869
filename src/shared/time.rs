//! Clock helpers.

use chrono::Utc;

/// Current wall-clock time as Unix seconds.
pub fn now_unix_secs() -> i64 {
    Utc::now().timestamp()
}
