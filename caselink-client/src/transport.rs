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

//! Seams between the orchestrator and the platform.
//!
//! The orchestrator is pure state machine; everything that touches the
//! network or a media engine goes through these traits. The embedding
//! application implements [`SignalSink`] over its WebSocket (or any
//! ordered reliable transport) and [`MediaSession`] over its WebRTC
//! engine. Tests implement both in memory.

use caselink_types::{IceCandidatePayload, SessionDescription, SignalEnvelope};
use std::fmt;

/// Where outbound signaling envelopes go.
pub trait SignalSink {
    fn send(&mut self, envelope: &SignalEnvelope) -> Result<(), SinkError>;
}

/// The relay transport is down; the orchestrator degrades to local-only
/// mode when it sees this.
#[derive(Debug)]
pub struct SinkError(pub String);

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "signaling transport error: {}", self.0)
    }
}

impl std::error::Error for SinkError {}

/// Outbound video source for the shared local media.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoSource {
    Camera,
    ScreenShare,
}

/// Errors from the underlying media engine.
#[derive(Debug)]
pub enum MediaSessionError {
    /// SDP could not be created or applied (no compatible media, parse
    /// failure).
    Negotiation(String),
    /// ICE processing failed.
    Ice(String),
    /// The data channel is not open.
    ChannelClosed,
}

impl fmt::Display for MediaSessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaSessionError::Negotiation(msg) => write!(f, "negotiation failed: {msg}"),
            MediaSessionError::Ice(msg) => write!(f, "ice failure: {msg}"),
            MediaSessionError::ChannelClosed => write!(f, "data channel not open"),
        }
    }
}

impl std::error::Error for MediaSessionError {}

/// One peer media session (the platform's RTCPeerConnection equivalent).
///
/// The orchestrator drives negotiation through this trait and never sees
/// SDP internals.
pub trait MediaSession {
    fn create_offer(&mut self) -> Result<SessionDescription, MediaSessionError>;

    /// Apply a remote offer and produce the matching answer.
    fn create_answer(
        &mut self,
        remote: &SessionDescription,
    ) -> Result<SessionDescription, MediaSessionError>;

    /// Apply the remote answer to our outstanding offer.
    fn apply_answer(&mut self, remote: &SessionDescription) -> Result<(), MediaSessionError>;

    fn add_ice_candidate(&mut self, candidate: &IceCandidatePayload)
        -> Result<(), MediaSessionError>;

    /// Swap the outbound video track (camera <-> screen share) without
    /// tearing the session down.
    fn replace_video_track(&mut self, source: VideoSource) -> Result<(), MediaSessionError>;

    fn data_channel_open(&self) -> bool;

    fn send_data(&mut self, text: &str) -> Result<(), MediaSessionError>;

    /// Last RTT sample from transport statistics, if any.
    fn rtt_ms(&self) -> Option<f64>;

    fn close(&mut self);
}

/// Creates one [`MediaSession`] per remote peer.
pub trait MediaSessionFactory {
    type Session: MediaSession;

    fn create(&mut self, remote_connection_id: &str) -> Self::Session;
}

impl<S: MediaSession, F: FnMut(&str) -> S> MediaSessionFactory for F {
    type Session = S;

    fn create(&mut self, remote_connection_id: &str) -> S {
        self(remote_connection_id)
    }
}
