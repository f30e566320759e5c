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

//! Shared types for the CaseLink real-time meeting and collaboration core.
//!
//! This crate defines the JSON signaling wire protocol ([`SignalEnvelope`]),
//! the room/participant data model, presence notification records, and the
//! room access token claims. It carries no I/O — both the relay server and
//! the client library build on these types.

pub mod envelope;
pub mod notification;
pub mod participant;
pub mod token;

pub use envelope::{
    ChatPayload, IceCandidatePayload, ParticipantsUpdate, SdpType, SessionDescription,
    SignalEnvelope, SignalKind,
};
pub use notification::{NotificationPriority, NotificationRecord};
pub use participant::{ParticipantInfo, RoomSnapshot, RoomSummary};
pub use token::RoomTokenClaims;
