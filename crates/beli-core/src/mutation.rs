//! # Mutation Types
//!
//! Writes made while offline, queued for later replay against the remote
//! backend.
//!
//! ## Mutation Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   enqueue ──► QUEUED ──► APPLYING ──┬─ ok ─────────────► REMOVED        │
//! │                 ▲                   │                                   │
//! │                 │                   ├─ error, retries left             │
//! │                 └───────────────────┘  (retry_count + 1)                │
//! │                                     │                                   │
//! │                                     └─ error, ceiling ──► DROPPED       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::CoreError;

/// Mutation payload: a JSON object.
pub type Payload = Map<String, Value>;

// =============================================================================
// Mutation Kind
// =============================================================================

/// Every kind of write the clients can queue while offline.
///
/// The set is closed: each kind gets a handler at startup, and a handler
/// lookup is a map probe on this enum rather than on free-form strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    LikeActivity,
    UnlikeActivity,
    BookmarkActivity,
    UnbookmarkActivity,
    AddComment,
    FollowUser,
    UnfollowUser,
    AddToList,
    RemoveFromList,
    CreateList,
    AddReview,
    BookmarkPost,
    UnbookmarkPost,
    LikePost,
    UnlikePost,
    MarkNotificationRead,
    MarkBeen,
    MarkWantToTry,
    UpdateRating,
    RemoveRelation,
}

impl MutationKind {
    /// All kinds, in declaration order.
    pub const ALL: [MutationKind; 20] = [
        MutationKind::LikeActivity,
        MutationKind::UnlikeActivity,
        MutationKind::BookmarkActivity,
        MutationKind::UnbookmarkActivity,
        MutationKind::AddComment,
        MutationKind::FollowUser,
        MutationKind::UnfollowUser,
        MutationKind::AddToList,
        MutationKind::RemoveFromList,
        MutationKind::CreateList,
        MutationKind::AddReview,
        MutationKind::BookmarkPost,
        MutationKind::UnbookmarkPost,
        MutationKind::LikePost,
        MutationKind::UnlikePost,
        MutationKind::MarkNotificationRead,
        MutationKind::MarkBeen,
        MutationKind::MarkWantToTry,
        MutationKind::UpdateRating,
        MutationKind::RemoveRelation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::LikeActivity => "like_activity",
            MutationKind::UnlikeActivity => "unlike_activity",
            MutationKind::BookmarkActivity => "bookmark_activity",
            MutationKind::UnbookmarkActivity => "unbookmark_activity",
            MutationKind::AddComment => "add_comment",
            MutationKind::FollowUser => "follow_user",
            MutationKind::UnfollowUser => "unfollow_user",
            MutationKind::AddToList => "add_to_list",
            MutationKind::RemoveFromList => "remove_from_list",
            MutationKind::CreateList => "create_list",
            MutationKind::AddReview => "add_review",
            MutationKind::BookmarkPost => "bookmark_post",
            MutationKind::UnbookmarkPost => "unbookmark_post",
            MutationKind::LikePost => "like_post",
            MutationKind::UnlikePost => "unlike_post",
            MutationKind::MarkNotificationRead => "mark_notification_read",
            MutationKind::MarkBeen => "mark_been",
            MutationKind::MarkWantToTry => "mark_want_to_try",
            MutationKind::UpdateRating => "update_rating",
            MutationKind::RemoveRelation => "remove_relation",
        }
    }
}

impl std::fmt::Display for MutationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MutationKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        MutationKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == needle)
            .ok_or_else(|| CoreError::UnknownMutationKind(s.to_string()))
    }
}

// =============================================================================
// Pending Mutation
// =============================================================================

/// A queued write awaiting replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PendingMutation {
    #[ts(as = "String")]
    pub id: Uuid,

    #[serde(rename = "type")]
    pub kind: MutationKind,

    #[ts(type = "Record<string, unknown>")]
    pub payload: Payload,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    /// Failed attempts so far.
    pub retry_count: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl PendingMutation {
    /// Creates a fresh mutation with a new id and zero retries.
    pub fn new(kind: MutationKind, payload: Payload) -> Self {
        PendingMutation {
            id: Uuid::new_v4(),
            kind,
            payload,
            created_at: Utc::now(),
            retry_count: 0,
            last_error: None,
        }
    }

    /// Records one failed attempt.
    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.retry_count = self.retry_count.saturating_add(1);
        self.last_error = Some(error.into());
    }
}

// =============================================================================
// Persisted Queue
// =============================================================================

/// The durable part of the queue state.
///
/// `is_syncing` and `last_sync_error` are process-local and never written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedQueue {
    #[serde(default)]
    pub pending_mutations: Vec<PendingMutation>,

    #[serde(default)]
    pub last_sync_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Payload {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_kind_string_forms_round_trip() {
        for kind in MutationKind::ALL {
            let parsed: MutationKind = kind.as_str().parse().unwrap();
            assert_eq!(parsed, kind);

            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, Value::String(kind.as_str().to_string()));
        }
        assert!("poke_user".parse::<MutationKind>().is_err());
    }

    #[test]
    fn test_new_mutation_has_unique_id_and_no_retries() {
        let a = PendingMutation::new(MutationKind::FollowUser, Payload::new());
        let b = PendingMutation::new(MutationKind::FollowUser, Payload::new());
        assert_ne!(a.id, b.id);
        assert_eq!(a.retry_count, 0);
        assert!(a.last_error.is_none());
    }

    #[test]
    fn test_record_failure() {
        let mut m = PendingMutation::new(MutationKind::LikePost, Payload::new());
        m.record_failure("timeout");
        m.record_failure("503");
        assert_eq!(m.retry_count, 2);
        assert_eq!(m.last_error.as_deref(), Some("503"));
    }

    #[test]
    fn test_persisted_shape() {
        let m = PendingMutation::new(
            MutationKind::FollowUser,
            payload(json!({ "userId": "a", "targetUserId": "b" })),
        );
        let queue = PersistedQueue {
            pending_mutations: vec![m.clone()],
            last_sync_at: None,
        };

        let value = serde_json::to_value(&queue).unwrap();
        let first = &value["pendingMutations"][0];
        assert_eq!(first["type"], "follow_user");
        assert_eq!(first["retryCount"], 0);
        assert_eq!(first["payload"]["targetUserId"], "b");
        assert!(first.get("lastError").is_none());
        assert!(value["lastSyncAt"].is_null());

        let restored: PersistedQueue = serde_json::from_value(value).unwrap();
        assert_eq!(restored.pending_mutations[0], m);
    }
}
