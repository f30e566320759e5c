/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 */

//! Room membership data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One participant as seen by the rest of the room.
///
/// `connection_id` is unique per physical transport connection and is the
/// routing key for targeted envelopes. A user who reconnects keeps their
/// `user_id` but gets a fresh `connection_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantInfo {
    pub user_id: String,
    pub display_name: String,
    pub connection_id: String,
    pub joined_at: DateTime<Utc>,
}

/// Point-in-time view of a room, returned by registry operations and
/// carried inside `participants-update` broadcasts. Participants are in
/// join order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub room_id: String,
    pub created_at: DateTime<Utc>,
    pub recording: bool,
    pub participants: Vec<ParticipantInfo>,
}

impl RoomSnapshot {
    pub fn contains_connection(&self, connection_id: &str) -> bool {
        self.participants
            .iter()
            .any(|p| p.connection_id == connection_id)
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            room_id: self.room_id.clone(),
            participant_count: self.participants.len(),
            recording: self.recording,
            created_at: self.created_at,
        }
    }
}

/// Room activity summary emitted toward the CRUD layer's dashboards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub room_id: String,
    pub participant_count: usize,
    pub recording: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participant(conn: &str) -> ParticipantInfo {
        ParticipantInfo {
            user_id: format!("{conn}@example.com"),
            display_name: conn.to_string(),
            connection_id: conn.to_string(),
            joined_at: Utc::now(),
        }
    }

    #[test]
    fn snapshot_membership_lookup() {
        let snap = RoomSnapshot {
            room_id: "r1".into(),
            created_at: Utc::now(),
            recording: false,
            participants: vec![participant("a"), participant("b")],
        };
        assert!(snap.contains_connection("a"));
        assert!(!snap.contains_connection("c"));
        let summary = snap.summary();
        assert_eq!(summary.participant_count, 2);
        assert!(!summary.recording);
    }
}
