// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Timestamp helpers.
//!
//! All persisted timestamps are UTC RFC 3339 strings with millisecond
//! precision, so they sort lexicographically in SQL.

use std::time::Duration;

use chrono::{SecondsFormat, Utc};

/// Current time as a fixed-width RFC 3339 string.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Time `delay` from now, in the same format as [`now_timestamp`].
pub fn timestamp_after(delay: Duration) -> String {
    let delta = chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::MAX);
    let at = Utc::now()
        .checked_add_signed(delta)
        .unwrap_or(chrono::DateTime::<Utc>::MAX_UTC);
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
