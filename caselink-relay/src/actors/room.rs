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
 *
 * Unless you explicitly state otherwise, any contribution intentionally
 * submitted for inclusion in the work by you, as defined in the Apache-2.0
 * license, shall be dual licensed as above, without any additional terms or
 * conditions.
 */

//! One actor per meeting room.
//!
//! All membership mutation and broadcast fan-out for a room happens inside
//! this actor's mailbox, which gives the single-writer-per-room discipline:
//! unrelated rooms never contend. The registry owns room lifecycle; this
//! actor reports [`RoomEmpty`] and answers [`ConfirmShutdown`].

use crate::actors::registry::RoomRegistry;
use crate::messages::{
    ConfirmShutdown, Deliver, RoomEmpty, RoomJoin, RoomLeave, RoomRelay, RoomSetRecording,
    RoomSnapshotReq,
};
use crate::metrics::{ENVELOPES_DROPPED_TOTAL, ENVELOPES_RELAYED_TOTAL};
use actix::{Actor, ActorContext, Addr, Context, Handler, MessageResult, Recipient};
use caselink_types::{
    ParticipantInfo, ParticipantsUpdate, RoomSnapshot, SignalEnvelope, SignalKind,
};
use chrono::{DateTime, Utc};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

struct Member {
    info: ParticipantInfo,
    addr: Recipient<Deliver>,
}

pub struct RoomActor {
    room_id: String,
    created_at: DateTime<Utc>,
    recording: bool,
    registry: Addr<RoomRegistry>,
    /// Join order is preserved; `participants-update` lists members in this
    /// order.
    members: Vec<Member>,
}

impl RoomActor {
    pub fn new(room_id: String, registry: Addr<RoomRegistry>) -> Self {
        RoomActor {
            room_id,
            created_at: Utc::now(),
            recording: false,
            registry,
            members: Vec::new(),
        }
    }

    fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            room_id: self.room_id.clone(),
            created_at: self.created_at,
            recording: self.recording,
            participants: self.members.iter().map(|m| m.info.clone()).collect(),
        }
    }

    /// Deliver one envelope to a member. Critical kinds (join, leave,
    /// participants-update) bypass the mailbox capacity check so membership
    /// state always reaches a slow receiver; non-critical kinds are dropped
    /// when the member's mailbox is full or gone.
    fn deliver(&self, member: &Member, envelope: Arc<SignalEnvelope>) {
        let kind = envelope.kind;
        if kind.is_critical() {
            member.addr.do_send(Deliver { envelope });
        } else if member.addr.try_send(Deliver { envelope }).is_err() {
            ENVELOPES_DROPPED_TOTAL.inc();
            trace!(
                "room {} dropped {:?} for saturated or departed member {}",
                self.room_id,
                kind,
                member.info.connection_id
            );
            return;
        }
        ENVELOPES_RELAYED_TOTAL
            .with_label_values(&[kind_label(kind)])
            .inc();
    }

    /// Broadcast to every member except `exclude` (the sender, if any).
    fn broadcast(&self, envelope: SignalEnvelope, exclude: Option<&str>) {
        let envelope = Arc::new(envelope);
        for member in &self.members {
            if Some(member.info.connection_id.as_str()) == exclude {
                continue;
            }
            self.deliver(member, envelope.clone());
        }
    }

    /// Broadcast the authoritative membership + recording flag to everyone,
    /// including the participant that triggered the change.
    fn broadcast_participants_update(&self) {
        let update = ParticipantsUpdate {
            participants: self.members.iter().map(|m| m.info.clone()).collect(),
            recording: self.recording,
        };
        let payload = serde_json::to_value(&update).unwrap_or(serde_json::Value::Null);
        self.broadcast(
            SignalEnvelope::broadcast(SignalKind::ParticipantsUpdate, self.room_id.clone(), payload),
            None,
        );
    }

    fn member_index(&self, connection_id: &str) -> Option<usize> {
        self.members
            .iter()
            .position(|m| m.info.connection_id == connection_id)
    }
}

impl Actor for RoomActor {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        info!("room {} created", self.room_id);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        info!("room {} destroyed", self.room_id);
    }
}

impl Handler<RoomJoin> for RoomActor {
    type Result = MessageResult<RoomJoin>;

    fn handle(&mut self, msg: RoomJoin, _ctx: &mut Self::Context) -> Self::Result {
        let RoomJoin { participant, addr } = msg;

        // A reconnect can reuse a connection id only if the old session
        // never finished leaving; replace its address in that case.
        if let Some(idx) = self.member_index(&participant.connection_id) {
            warn!(
                "room {}: duplicate join for connection {}, replacing transport",
                self.room_id, participant.connection_id
            );
            self.members[idx] = Member {
                info: participant,
                addr,
            };
            self.broadcast_participants_update();
            return MessageResult(self.snapshot());
        }

        let connection_id = participant.connection_id.clone();
        let user_id = participant.user_id.clone();

        // Tell existing members who arrived, then give everyone (the joiner
        // included) the authoritative membership list.
        self.broadcast(
            SignalEnvelope {
                kind: SignalKind::Join,
                from: Some(connection_id.clone()),
                to: None,
                room_id: self.room_id.clone(),
                payload: serde_json::to_value(&participant).unwrap_or(serde_json::Value::Null),
            },
            Some(connection_id.as_str()),
        );

        let member = Member {
            info: participant,
            addr,
        };
        // Join acknowledgement: tells the client its own connection id.
        self.deliver(
            &member,
            Arc::new(SignalEnvelope::targeted(
                SignalKind::Join,
                self.room_id.clone(),
                connection_id.clone(),
                json!({ "connectionId": connection_id }),
            )),
        );
        self.members.push(member);
        self.broadcast_participants_update();

        info!(
            "room {}: {} joined as {} ({} members)",
            self.room_id,
            user_id,
            connection_id,
            self.members.len()
        );
        MessageResult(self.snapshot())
    }
}

impl Handler<RoomLeave> for RoomActor {
    type Result = ();

    fn handle(&mut self, msg: RoomLeave, _ctx: &mut Self::Context) -> Self::Result {
        let Some(idx) = self.member_index(&msg.connection_id) else {
            // Duplicate leave (explicit leave followed by transport close
            // runs this path twice). Must stay silent.
            debug!(
                "room {}: leave for unknown connection {}",
                self.room_id, msg.connection_id
            );
            return;
        };

        let member = self.members.remove(idx);
        info!(
            "room {}: {} left ({} members)",
            self.room_id,
            member.info.connection_id,
            self.members.len()
        );

        self.broadcast(
            SignalEnvelope {
                kind: SignalKind::Leave,
                from: Some(member.info.connection_id.clone()),
                to: None,
                room_id: self.room_id.clone(),
                payload: json!({ "connectionId": member.info.connection_id }),
            },
            None,
        );
        self.broadcast_participants_update();

        if self.members.is_empty() {
            self.registry.do_send(RoomEmpty {
                room_id: self.room_id.clone(),
            });
        }
    }
}

impl Handler<RoomRelay> for RoomActor {
    type Result = ();

    fn handle(&mut self, msg: RoomRelay, _ctx: &mut Self::Context) -> Self::Result {
        let RoomRelay {
            from_connection,
            envelope,
        } = msg;

        if self.member_index(&from_connection).is_none() {
            // Sender already left (cleanup raced the relay); drop.
            trace!(
                "room {}: relay from departed connection {}",
                self.room_id,
                from_connection
            );
            return;
        }

        // The recording flag is room state; mirror it before fanning out so
        // late joiners converge via participants-update.
        match envelope.kind {
            SignalKind::RecordingStarted => self.recording = true,
            SignalKind::RecordingStopped => self.recording = false,
            _ => {}
        }

        match envelope.to.clone() {
            Some(target) => {
                match self.member_index(&target) {
                    Some(idx) => self.deliver(&self.members[idx], Arc::new(envelope)),
                    // Target already left: drop silently, no feedback to
                    // the sender.
                    None => trace!(
                        "room {}: dropping {:?} for departed connection {}",
                        self.room_id,
                        envelope.kind,
                        target
                    ),
                }
            }
            None => self.broadcast(envelope, Some(from_connection.as_str())),
        }
    }
}

impl Handler<RoomSetRecording> for RoomActor {
    type Result = ();

    fn handle(&mut self, msg: RoomSetRecording, _ctx: &mut Self::Context) -> Self::Result {
        if self.recording == msg.recording {
            return;
        }
        self.recording = msg.recording;
        let kind = if msg.recording {
            SignalKind::RecordingStarted
        } else {
            SignalKind::RecordingStopped
        };
        self.broadcast(
            SignalEnvelope::broadcast(kind, self.room_id.clone(), serde_json::Value::Null),
            None,
        );
        self.broadcast_participants_update();
    }
}

impl Handler<RoomSnapshotReq> for RoomActor {
    type Result = MessageResult<RoomSnapshotReq>;

    fn handle(&mut self, _msg: RoomSnapshotReq, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.snapshot())
    }
}

impl Handler<ConfirmShutdown> for RoomActor {
    type Result = bool;

    fn handle(&mut self, _msg: ConfirmShutdown, ctx: &mut Self::Context) -> Self::Result {
        if self.members.is_empty() {
            ctx.stop();
            true
        } else {
            // A join raced the grace timer; the room lives on.
            false
        }
    }
}

fn kind_label(kind: SignalKind) -> &'static str {
    match kind {
        SignalKind::Join => "join",
        SignalKind::Leave => "leave",
        SignalKind::Offer => "offer",
        SignalKind::Answer => "answer",
        SignalKind::IceCandidate => "ice-candidate",
        SignalKind::ChatMessage => "chat-message",
        SignalKind::RecordingStarted => "recording-started",
        SignalKind::RecordingStopped => "recording-stopped",
        SignalKind::ParticipantsUpdate => "participants-update",
    }
}
