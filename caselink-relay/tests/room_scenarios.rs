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

//! End-to-end scenarios against the room registry and room actors,
//! using collector actors in place of WebSocket sessions.

use actix::{Actor, Addr, Arbiter, AsyncContext, Context, Handler, Message};
use caselink_relay::actors::registry::RoomRegistry;
use caselink_relay::actors::room::RoomActor;
use caselink_relay::messages::{Deliver, GetSnapshot, JoinRoom, RoomLeave, RoomRelay, SetRecording};
use caselink_types::{ParticipantInfo, ParticipantsUpdate, SignalEnvelope, SignalKind};
use chrono::Utc;
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct FakeSession {
    inbox: Arc<Mutex<Vec<SignalEnvelope>>>,
}

impl Actor for FakeSession {
    type Context = Context<Self>;
}

impl Handler<Deliver> for FakeSession {
    type Result = ();

    fn handle(&mut self, msg: Deliver, _ctx: &mut Self::Context) -> Self::Result {
        self.inbox.lock().unwrap().push((*msg.envelope).clone());
    }
}

/// Parks the actor inside a message handler until the sender side of the
/// channel is dropped, so everything sent afterwards piles up in its mailbox.
#[derive(Message)]
#[rtype(result = "()")]
struct Stall(std::sync::mpsc::Receiver<()>);

struct StallableSession {
    inbox: Arc<Mutex<Vec<SignalEnvelope>>>,
}

impl Actor for StallableSession {
    type Context = Context<Self>;
}

impl Handler<Stall> for StallableSession {
    type Result = ();

    fn handle(&mut self, msg: Stall, _ctx: &mut Self::Context) -> Self::Result {
        let _ = msg.0.recv();
    }
}

impl Handler<Deliver> for StallableSession {
    type Result = ();

    fn handle(&mut self, msg: Deliver, _ctx: &mut Self::Context) -> Self::Result {
        self.inbox.lock().unwrap().push((*msg.envelope).clone());
    }
}

struct Client {
    connection_id: String,
    inbox: Arc<Mutex<Vec<SignalEnvelope>>>,
    room: Addr<RoomActor>,
}

impl Client {
    fn envelopes(&self) -> Vec<SignalEnvelope> {
        self.inbox.lock().unwrap().clone()
    }

    fn updates(&self) -> Vec<ParticipantsUpdate> {
        self.envelopes()
            .iter()
            .filter(|e| e.kind == SignalKind::ParticipantsUpdate)
            .map(|e| serde_json::from_value(e.payload.clone()).unwrap())
            .collect()
    }

    fn relay(&self, envelope: SignalEnvelope) {
        self.room.do_send(RoomRelay {
            from_connection: self.connection_id.clone(),
            envelope,
        });
    }

    fn leave(&self) {
        self.room.do_send(RoomLeave {
            connection_id: self.connection_id.clone(),
        });
    }
}

async fn join(registry: &Addr<RoomRegistry>, room_id: &str, name: &str) -> Client {
    let inbox = Arc::new(Mutex::new(Vec::new()));
    let session = FakeSession {
        inbox: inbox.clone(),
    }
    .start();
    let connection_id = format!("conn-{name}");
    let joined = registry
        .send(JoinRoom {
            room_id: room_id.to_string(),
            participant: ParticipantInfo {
                user_id: format!("{name}@firm.example"),
                display_name: name.to_string(),
                connection_id: connection_id.clone(),
                joined_at: Utc::now(),
            },
            addr: session.recipient(),
        })
        .await
        .unwrap()
        .unwrap();
    Client {
        connection_id,
        inbox,
        room: joined.room,
    }
}

async fn settle() {
    actix_rt::time::sleep(Duration::from_millis(60)).await;
}

#[actix_rt::test]
async fn each_joiner_sees_all_prior_members() {
    let registry = RoomRegistry::new(Duration::from_secs(30)).start();
    let x = join(&registry, "r1", "x").await;
    let y = join(&registry, "r1", "y").await;
    let z = join(&registry, "r1", "z").await;
    settle().await;

    // Every joiner's first participants-update lists all members present at
    // the time, themselves included.
    let first_y: Vec<_> = y.updates()[0]
        .participants
        .iter()
        .map(|p| p.connection_id.clone())
        .collect();
    assert_eq!(first_y, vec!["conn-x", "conn-y"]);

    let first_z: Vec<_> = z.updates()[0]
        .participants
        .iter()
        .map(|p| p.connection_id.clone())
        .collect();
    assert_eq!(first_z, vec!["conn-x", "conn-y", "conn-z"]);

    // Existing members saw join notices for the newcomers.
    let x_joins: Vec<_> = x
        .envelopes()
        .iter()
        .filter(|e| e.kind == SignalKind::Join && e.to.is_none())
        .map(|e| e.from.clone().unwrap())
        .collect();
    assert_eq!(x_joins, vec!["conn-y", "conn-z"]);
}

#[actix_rt::test]
async fn unclean_disconnect_yields_exactly_one_exclusion_update() {
    let registry = RoomRegistry::new(Duration::from_secs(30)).start();
    let x = join(&registry, "r1", "x").await;
    let y = join(&registry, "r1", "y").await;
    let z = join(&registry, "r1", "z").await;
    settle().await;
    let before = [x.updates().len(), z.updates().len()];

    // Y's socket drops without a leave envelope; the session cleanup path
    // issues the same RoomLeave. A duplicate (explicit leave + transport
    // close) must be a no-op.
    y.leave();
    y.leave();
    settle().await;

    for (client, seen) in [(&x, before[0]), (&z, before[1])] {
        let updates = client.updates();
        let after = &updates[seen..];
        assert_eq!(after.len(), 1, "exactly one update after Y left");
        assert!(!after[0]
            .participants
            .iter()
            .any(|p| p.connection_id == "conn-y"));
    }

    // Leave notice delivered once to each remaining member.
    let x_leaves = x
        .envelopes()
        .iter()
        .filter(|e| e.kind == SignalKind::Leave)
        .count();
    assert_eq!(x_leaves, 1);
}

#[actix_rt::test]
async fn broadcasts_never_echo_to_sender() {
    let registry = RoomRegistry::new(Duration::from_secs(30)).start();
    let x = join(&registry, "r1", "x").await;
    let y = join(&registry, "r1", "y").await;
    settle().await;

    x.relay(SignalEnvelope {
        kind: SignalKind::ChatMessage,
        from: Some(x.connection_id.clone()),
        to: None,
        room_id: "r1".into(),
        payload: json!({"text": "hello", "sentAtMs": 0}),
    });
    settle().await;

    assert!(y
        .envelopes()
        .iter()
        .any(|e| e.kind == SignalKind::ChatMessage));
    assert!(!x
        .envelopes()
        .iter()
        .any(|e| e.kind == SignalKind::ChatMessage));
}

#[actix_rt::test]
async fn targeted_envelope_reaches_only_target() {
    let registry = RoomRegistry::new(Duration::from_secs(30)).start();
    let x = join(&registry, "r1", "x").await;
    let y = join(&registry, "r1", "y").await;
    let z = join(&registry, "r1", "z").await;
    settle().await;

    x.relay(SignalEnvelope {
        kind: SignalKind::Offer,
        from: Some(x.connection_id.clone()),
        to: Some(z.connection_id.clone()),
        room_id: "r1".into(),
        payload: json!({"sdpType": "offer", "sdp": "v=0"}),
    });
    settle().await;

    assert!(z.envelopes().iter().any(|e| e.kind == SignalKind::Offer));
    assert!(!y.envelopes().iter().any(|e| e.kind == SignalKind::Offer));
}

#[actix_rt::test]
async fn offer_to_departed_connection_is_dropped_silently() {
    let registry = RoomRegistry::new(Duration::from_secs(30)).start();
    let x = join(&registry, "r1", "x").await;
    let y = join(&registry, "r1", "y").await;
    settle().await;

    y.leave();
    settle().await;
    let x_count_before = x.envelopes().len();

    x.relay(SignalEnvelope {
        kind: SignalKind::Offer,
        from: Some(x.connection_id.clone()),
        to: Some(y.connection_id.clone()),
        room_id: "r1".into(),
        payload: json!({"sdpType": "offer", "sdp": "v=0"}),
    });
    settle().await;

    // No error came back to the sender and nothing reached Y.
    assert_eq!(x.envelopes().len(), x_count_before);
    assert!(!y.envelopes().iter().any(|e| e.kind == SignalKind::Offer));

    // Room is still functional.
    let snapshot = registry
        .send(GetSnapshot {
            room_id: "r1".into(),
        })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(snapshot.participants.len(), 1);
}

#[actix_rt::test]
async fn recording_flag_converges_room_wide() {
    let registry = RoomRegistry::new(Duration::from_secs(30)).start();
    let x = join(&registry, "r1", "x").await;
    let y = join(&registry, "r1", "y").await;
    settle().await;

    x.relay(SignalEnvelope {
        kind: SignalKind::RecordingStarted,
        from: Some(x.connection_id.clone()),
        to: None,
        room_id: "r1".into(),
        payload: json!(null),
    });
    settle().await;

    assert!(y
        .envelopes()
        .iter()
        .any(|e| e.kind == SignalKind::RecordingStarted));
    let snapshot = registry
        .send(GetSnapshot {
            room_id: "r1".into(),
        })
        .await
        .unwrap()
        .unwrap();
    assert!(snapshot.recording);

    // A late joiner reconciles from its first participants-update.
    let z = join(&registry, "r1", "z").await;
    settle().await;
    assert!(z.updates()[0].recording);
}

#[actix_rt::test]
async fn out_of_band_recording_toggle_notifies_everyone() {
    let registry = RoomRegistry::new(Duration::from_secs(30)).start();
    let x = join(&registry, "r1", "x").await;
    let y = join(&registry, "r1", "y").await;
    settle().await;

    // The REST layer flips the flag without any participant envelope.
    registry.do_send(SetRecording {
        room_id: "r1".into(),
        recording: true,
    });
    settle().await;

    for client in [&x, &y] {
        assert!(client
            .envelopes()
            .iter()
            .any(|e| e.kind == SignalKind::RecordingStarted));
        assert!(client.updates().last().unwrap().recording);
    }

    // Setting the same value again is silent.
    let y_count = y.envelopes().len();
    registry.do_send(SetRecording {
        room_id: "r1".into(),
        recording: true,
    });
    settle().await;
    assert_eq!(y.envelopes().len(), y_count);
}

#[actix_rt::test]
async fn empty_room_deleted_after_grace_period() {
    let registry = RoomRegistry::new(Duration::from_millis(50)).start();
    let x = join(&registry, "r1", "x").await;
    settle().await;
    x.leave();
    actix_rt::time::sleep(Duration::from_millis(200)).await;

    let snapshot = registry
        .send(GetSnapshot {
            room_id: "r1".into(),
        })
        .await
        .unwrap();
    assert!(snapshot.is_none());
}

#[actix_rt::test]
async fn rejoin_within_grace_period_cancels_deletion() {
    let registry = RoomRegistry::new(Duration::from_millis(200)).start();
    let x = join(&registry, "r1", "x").await;
    settle().await;
    x.leave();
    actix_rt::time::sleep(Duration::from_millis(50)).await;

    // Reconnect (fresh connection id) before the grace period fires.
    let _x2 = join(&registry, "r1", "x2").await;
    actix_rt::time::sleep(Duration::from_millis(400)).await;

    let snapshot = registry
        .send(GetSnapshot {
            room_id: "r1".into(),
        })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(snapshot.participants.len(), 1);
    assert_eq!(snapshot.participants[0].connection_id, "conn-x2");
}

#[actix_rt::test]
async fn membership_matches_join_leave_history() {
    let registry = RoomRegistry::new(Duration::from_secs(30)).start();
    let _a = join(&registry, "r1", "a").await;
    let b = join(&registry, "r1", "b").await;
    let _c = join(&registry, "r1", "c").await;
    b.leave();
    let _d = join(&registry, "r1", "d").await;
    settle().await;

    let snapshot = registry
        .send(GetSnapshot {
            room_id: "r1".into(),
        })
        .await
        .unwrap()
        .unwrap();
    let ids: Vec<_> = snapshot
        .participants
        .iter()
        .map(|p| p.connection_id.clone())
        .collect();
    assert_eq!(ids, vec!["conn-a", "conn-c", "conn-d"]);
}

#[actix_rt::test]
async fn slow_member_still_receives_membership_envelopes() {
    let registry = RoomRegistry::new(Duration::from_secs(30)).start();
    let x = join(&registry, "r1", "x").await;
    settle().await;

    // A member whose session cannot keep up: mailbox capacity 1, and the
    // actor blocked inside a handler on its own arbiter thread.
    let inbox = Arc::new(Mutex::new(Vec::new()));
    let arbiter = Arbiter::new();
    let slow_inbox = inbox.clone();
    let slow = StallableSession::start_in_arbiter(&arbiter.handle(), move |ctx| {
        ctx.set_mailbox_capacity(1);
        StallableSession { inbox: slow_inbox }
    });
    let (release, gate) = std::sync::mpsc::channel::<()>();
    slow.do_send(Stall(gate));

    registry
        .send(JoinRoom {
            room_id: "r1".to_string(),
            participant: ParticipantInfo {
                user_id: "slow@firm.example".into(),
                display_name: "slow".into(),
                connection_id: "conn-slow".into(),
                joined_at: Utc::now(),
            },
            addr: slow.clone().recipient(),
        })
        .await
        .unwrap()
        .unwrap();
    settle().await;

    // The join ack and participants-update already sit in the stalled
    // mailbox, so every chat below finds it over capacity and is shed.
    for i in 0..10 {
        x.relay(SignalEnvelope {
            kind: SignalKind::ChatMessage,
            from: Some(x.connection_id.clone()),
            to: None,
            room_id: "r1".into(),
            payload: json!({"text": format!("msg {i}"), "sentAtMs": 0}),
        });
    }
    settle().await;
    x.leave();
    settle().await;

    drop(release);
    actix_rt::time::sleep(Duration::from_millis(200)).await;

    let seen = inbox.lock().unwrap().clone();
    // Membership traffic got through despite the full mailbox.
    assert!(seen
        .iter()
        .any(|e| e.kind == SignalKind::Leave && e.from.as_deref() == Some("conn-x")));
    let last_update: ParticipantsUpdate = seen
        .iter()
        .rev()
        .find(|e| e.kind == SignalKind::ParticipantsUpdate)
        .map(|e| serde_json::from_value(e.payload.clone()).unwrap())
        .unwrap();
    assert!(!last_update
        .participants
        .iter()
        .any(|p| p.connection_id == "conn-x"));
    // The bulk traffic was shed, not queued behind the stall.
    assert!(!seen.iter().any(|e| e.kind == SignalKind::ChatMessage));

    arbiter.stop();
}

#[actix_rt::test]
async fn rooms_are_independent() {
    let registry = RoomRegistry::new(Duration::from_secs(30)).start();
    let x = join(&registry, "r1", "x").await;
    let other = join(&registry, "r2", "other").await;
    settle().await;

    x.relay(SignalEnvelope {
        kind: SignalKind::ChatMessage,
        from: Some(x.connection_id.clone()),
        to: None,
        room_id: "r1".into(),
        payload: json!({"text": "r1 only", "sentAtMs": 0}),
    });
    settle().await;

    assert!(!other
        .envelopes()
        .iter()
        .any(|e| e.kind == SignalKind::ChatMessage));
}
