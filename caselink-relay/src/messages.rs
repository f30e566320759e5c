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

//! Actix message types exchanged between the session, room, and registry
//! actors.
//!
//! Sessions talk to the registry only to join; after that they hold the
//! room actor's address and relay to it directly, so per-envelope traffic
//! never serializes through the registry.

use crate::actors::room::RoomActor;
use actix::{Addr, MailboxError, Message as ActixMessage, Recipient};
use caselink_types::{ParticipantInfo, RoomSnapshot, SignalEnvelope};
use std::sync::Arc;

pub type RoomId = String;
pub type ConnectionId = String;

/// An envelope to be written out to one client.
#[derive(ActixMessage, Clone)]
#[rtype(result = "()")]
pub struct Deliver {
    pub envelope: Arc<SignalEnvelope>,
}

/// Successful join: the snapshot to reconcile against plus the room actor
/// address for direct relaying.
pub struct JoinedRoom {
    pub snapshot: RoomSnapshot,
    pub room: Addr<RoomActor>,
}

/// Registry: attach a session to a room, creating the room on first join
/// and cancelling any pending grace-period deletion.
#[derive(ActixMessage)]
#[rtype(result = "Result<JoinedRoom, MailboxError>")]
pub struct JoinRoom {
    pub room_id: RoomId,
    pub participant: ParticipantInfo,
    pub addr: Recipient<Deliver>,
}

/// Registry: fetch the snapshot of a room, if it exists.
#[derive(ActixMessage)]
#[rtype(result = "Option<RoomSnapshot>")]
pub struct GetSnapshot {
    pub room_id: RoomId,
}

/// Registry: set the recording flag of a room (dashboard/REST path; the
/// in-band path is a relayed `recording-started`/`recording-stopped`).
#[derive(ActixMessage)]
#[rtype(result = "()")]
pub struct SetRecording {
    pub room_id: RoomId,
    pub recording: bool,
}

/// Room actor -> registry: the room has become empty; start the grace
/// timer.
#[derive(ActixMessage)]
#[rtype(result = "()")]
pub struct RoomEmpty {
    pub room_id: RoomId,
}

/// Room: add a participant. Returns the post-join snapshot.
#[derive(ActixMessage)]
#[rtype(result = "RoomSnapshot")]
pub struct RoomJoin {
    pub participant: ParticipantInfo,
    pub addr: Recipient<Deliver>,
}

/// Room: remove a participant, explicitly or on transport close.
/// Idempotent: a second leave for the same connection is a no-op.
#[derive(ActixMessage)]
#[rtype(result = "()")]
pub struct RoomLeave {
    pub connection_id: ConnectionId,
}

/// Room: relay one client envelope. `from` has already been stamped by the
/// session from its authenticated identity.
#[derive(ActixMessage)]
#[rtype(result = "()")]
pub struct RoomRelay {
    pub from_connection: ConnectionId,
    pub envelope: SignalEnvelope,
}

/// Room: snapshot request (forwarded by the registry).
#[derive(ActixMessage)]
#[rtype(result = "RoomSnapshot")]
pub struct RoomSnapshotReq;

/// Room: set the recording flag out-of-band.
#[derive(ActixMessage)]
#[rtype(result = "()")]
pub struct RoomSetRecording {
    pub recording: bool,
}

/// Registry -> room after the grace period: stop if still empty.
/// The reply tells the registry whether the room actually shut down
/// (a join may have raced the timer).
#[derive(ActixMessage)]
#[rtype(result = "bool")]
pub struct ConfirmShutdown;
