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

//! Framework-agnostic events emitted by the call orchestrator.
//!
//! Any frontend can subscribe through the orchestrator's callback; none of
//! these carry media.

use crate::quality::LinkQuality;
use std::time::Duration;

/// Whether the client is live on the relay or degraded to local preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallMode {
    /// Relay reachable, peers expected.
    Live,
    /// Relay unreachable: local camera/microphone preview keeps rendering,
    /// no remote tracks are expected. Deliberate, user-visible degradation.
    LocalOnly,
}

#[derive(Debug, Clone)]
pub enum CallEvent {
    /// The relay acknowledged our join and assigned our connection id.
    SelfAssigned { connection_id: String },

    /// A new remote peer link was created.
    PeerAdded { connection_id: String },

    /// A remote peer went away and its link was torn down.
    PeerRemoved { connection_id: String },

    /// Negotiation with one peer failed; the link is torn down and will be
    /// rebuilt on the next membership update. Other peers are unaffected.
    NegotiationFailed {
        connection_id: String,
        reason: String,
    },

    /// Chat text arrived (data channel or relay fallback).
    ChatReceived { from: String, text: String },

    /// The room-wide recording flag changed.
    RecordingChanged(bool),

    /// A peer's link quality tier changed.
    QualityChanged {
        connection_id: String,
        quality: LinkQuality,
    },

    /// The client switched between live and local-only mode.
    ModeChanged(CallMode),

    /// Local-only mode scheduled its next reconnect attempt.
    ReconnectScheduled { attempt: u32, delay: Duration },
}

/// Event callback installed by the embedding application.
pub type EventCallback = Box<dyn Fn(CallEvent)>;
