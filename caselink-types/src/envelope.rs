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

//! The JSON signaling wire protocol.
//!
//! Every frame exchanged over the signaling transport is one
//! [`SignalEnvelope`]. The relay treats the `payload` as opaque — it routes
//! on `kind`, `to`, and `room_id` only. The typed payload structs in this
//! module are a convenience for the client side; the relay never parses them.

use crate::participant::ParticipantInfo;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope discriminator. Serialized in kebab-case (`"ice-candidate"` etc.).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalKind {
    Join,
    Leave,
    Offer,
    Answer,
    IceCandidate,
    ChatMessage,
    RecordingStarted,
    RecordingStopped,
    ParticipantsUpdate,
}

impl SignalKind {
    /// Critical envelopes must survive outbound backpressure: a dropped
    /// `leave` or `participants-update` would leave ghost participants on
    /// the receiving side.
    pub fn is_critical(self) -> bool {
        matches!(
            self,
            SignalKind::Leave | SignalKind::ParticipantsUpdate | SignalKind::Join
        )
    }

    /// Negotiation envelopes are meaningless without a specific target.
    pub fn requires_target(self) -> bool {
        matches!(
            self,
            SignalKind::Offer | SignalKind::Answer | SignalKind::IceCandidate
        )
    }
}

/// One signaling frame.
///
/// `from` is stamped by the relay from the authenticated session; a value
/// supplied by the client is discarded. Relay-originated envelopes
/// (`participants-update`, synthesized `leave`) carry `from: None`.
/// `to` absent means broadcast to the room (excluding the sender).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalEnvelope {
    #[serde(rename = "type")]
    pub kind: SignalKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    pub room_id: String,
    #[serde(default)]
    pub payload: Value,
}

impl SignalEnvelope {
    /// An envelope addressed to the whole room.
    pub fn broadcast(kind: SignalKind, room_id: impl Into<String>, payload: Value) -> Self {
        SignalEnvelope {
            kind,
            from: None,
            to: None,
            room_id: room_id.into(),
            payload,
        }
    }

    /// An envelope addressed to exactly one connection.
    pub fn targeted(
        kind: SignalKind,
        room_id: impl Into<String>,
        to: impl Into<String>,
        payload: Value,
    ) -> Self {
        SignalEnvelope {
            kind,
            from: None,
            to: Some(to.into()),
            room_id: room_id.into(),
            payload,
        }
    }
}

/// SDP description type for offer/answer payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
}

/// Payload of `offer` and `answer` envelopes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDescription {
    pub sdp_type: SdpType,
    pub sdp: String,
}

/// Payload of `ice-candidate` envelopes — one candidate per envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidatePayload {
    pub candidate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_m_line_index: Option<u32>,
}

/// Payload of `chat-message` envelopes (the relay fallback path; chat
/// normally travels the peer data channel).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatPayload {
    pub text: String,
    /// Sender-side timestamp, milliseconds since the Unix epoch.
    pub sent_at_ms: u64,
}

/// Payload of `participants-update` envelopes: the authoritative room
/// membership plus the recording flag, so receivers can reconcile both in
/// one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantsUpdate {
    pub participants: Vec<ParticipantInfo>,
    pub recording: bool,
}
