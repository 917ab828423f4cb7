// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic resource names derived from a user id.

/// Default prefix of per-user memory collections.
pub const DEFAULT_COLLECTION_PREFIX: &str = "user_memories_";

/// Payload field every memory point is indexed and filtered on.
pub const USER_ID_FIELD: &str = "userId";

/// Name of the memory collection belonging to `user_id`.
pub fn collection_name(prefix: &str, user_id: &str) -> String {
    format!("{prefix}{user_id}")
}

/// Thread id of a user's interview conversation.
pub fn interview_thread_id(user_id: &str) -> String {
    format!("session-{user_id}")
}

/// Thread id of a user's summary pass.
pub fn summary_thread_id(user_id: &str) -> String {
    format!("summary-{user_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_follow_user_id() {
        assert_eq!(
            collection_name(DEFAULT_COLLECTION_PREFIX, "u1"),
            "user_memories_u1"
        );
        assert_eq!(interview_thread_id("u1"), "session-u1");
        assert_eq!(summary_thread_id("u1"), "summary-u1");
    }
}
