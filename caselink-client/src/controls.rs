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

//! Recording mirror and control-envelope builders.
//!
//! Recording is fire-and-forget: the initiator broadcasts
//! `recording-started`/`recording-stopped` and every client keeps a local
//! mirror. The authoritative reconciliation is whatever the next
//! `participants-update` says, so the mirror accepts both sources and only
//! reports actual changes.

use caselink_types::{SignalEnvelope, SignalKind};
use serde_json::json;

/// Local mirror of the room-wide recording flag.
#[derive(Debug, Default)]
pub struct RecordingMirror {
    recording: bool,
}

impl RecordingMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Fold in an observed value (from a recording broadcast or a
    /// `participants-update`). Returns the new value when it changed.
    pub fn observe(&mut self, recording: bool) -> Option<bool> {
        if self.recording == recording {
            None
        } else {
            self.recording = recording;
            Some(recording)
        }
    }
}

/// The broadcast an initiating client sends to toggle recording. The relay
/// forwards it verbatim; the payload stays empty.
pub fn recording_envelope(room_id: &str, start: bool) -> SignalEnvelope {
    let kind = if start {
        SignalKind::RecordingStarted
    } else {
        SignalKind::RecordingStopped
    };
    SignalEnvelope::broadcast(kind, room_id, json!({}))
}

/// Room-wide chat broadcast (relay path).
pub fn chat_broadcast(room_id: &str, text: &str, sent_at_ms: u64) -> SignalEnvelope {
    SignalEnvelope::broadcast(
        SignalKind::ChatMessage,
        room_id,
        json!({ "text": text, "sentAtMs": sent_at_ms }),
    )
}

/// Chat relayed to a single peer whose data channel is not open yet.
pub fn chat_fallback(room_id: &str, to: &str, text: &str, sent_at_ms: u64) -> SignalEnvelope {
    SignalEnvelope::targeted(
        SignalKind::ChatMessage,
        room_id,
        to,
        json!({ "text": text, "sentAtMs": sent_at_ms }),
    )
}
