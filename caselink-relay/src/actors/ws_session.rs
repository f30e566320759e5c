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

//! WebSocket signaling session actor.
//!
//! A thin transport adapter: protocol rules live in [`SessionGuard`],
//! fan-out lives in the room actor. This actor owns the heartbeat, the
//! bounded outbound queue, and the single cleanup path — an abrupt
//! transport close and an explicit `leave` both end in `stopping()`, so
//! ghost participants cannot survive either.

use crate::actors::registry::RoomRegistry;
use crate::actors::room::RoomActor;
use crate::config::AppConfig;
use crate::constants::{CLIENT_TIMEOUT, FLUSH_BATCH, HEARTBEAT_INTERVAL};
use crate::messages::{Deliver, JoinRoom, RoomLeave, RoomRelay};
use crate::metrics::{CONNECTIONS_ACTIVE, ENVELOPES_DROPPED_TOTAL, PROTOCOL_VIOLATIONS_TOTAL};
use crate::presence::{PresenceHub, UserOffline, UserOnline};
use crate::rate_limit::RateLimiter;
use crate::send_queue::SendQueue;
use crate::session_guard::{Inbound, SessionGuard, Violation};
use actix::{
    fut, Actor, ActorContext, ActorFutureExt, Addr, AsyncContext, ContextFutureSpawner, Handler,
    Running, StreamHandler, WrapFuture,
};
use actix_http::ws::CloseCode;
use actix_web_actors::ws::{self, WebsocketContext};
use caselink_types::ParticipantInfo;
use chrono::Utc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use uuid::Uuid;

pub struct WsSession {
    connection_id: String,
    user_id: String,
    display_name: String,
    guard: SessionGuard,
    registry: Addr<RoomRegistry>,
    presence: Addr<PresenceHub>,
    /// Set once the join handshake completes; all relay traffic goes here.
    room: Option<Addr<RoomActor>>,
    queue: SendQueue,
    heartbeat: Instant,
}

impl WsSession {
    pub fn new(
        user_id: String,
        display_name: String,
        authorized_room: String,
        registry: Addr<RoomRegistry>,
        presence: Addr<PresenceHub>,
        config: &AppConfig,
    ) -> Self {
        let connection_id = Uuid::new_v4().to_string();
        info!(
            "new session: connection={} user={} room={}",
            connection_id, user_id, authorized_room
        );
        WsSession {
            guard: SessionGuard::new(
                connection_id.clone(),
                authorized_room,
                RateLimiter::new(config.rate_limit_per_sec, config.rate_limit_burst),
            ),
            connection_id,
            user_id,
            display_name,
            registry,
            presence,
            room: None,
            queue: SendQueue::new(config.send_queue_cap),
            heartbeat: Instant::now(),
        }
    }

    fn start_heartbeat(&self, ctx: &mut WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.heartbeat) > CLIENT_TIMEOUT {
                error!(
                    "session {}: heartbeat timeout, disconnecting",
                    act.connection_id
                );
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn close_for_violation(&self, violation: Violation, ctx: &mut WebsocketContext<Self>) {
        PROTOCOL_VIOLATIONS_TOTAL
            .with_label_values(&[violation.metric_label()])
            .inc();
        warn!(
            "session {}: protocol violation: {}",
            self.connection_id, violation
        );
        ctx.close(Some(ws::CloseReason {
            code: CloseCode::Policy,
            description: Some(violation.to_string()),
        }));
        ctx.stop();
    }

    fn join_room(&mut self, ctx: &mut WebsocketContext<Self>) {
        let participant = ParticipantInfo {
            user_id: self.user_id.clone(),
            display_name: self.display_name.clone(),
            connection_id: self.connection_id.clone(),
            joined_at: Utc::now(),
        };
        let join = self.registry.send(JoinRoom {
            room_id: self.guard.room().to_string(),
            participant,
            addr: ctx.address().recipient(),
        });
        // Block the mailbox until the join resolves so no relay envelope
        // can overtake it.
        join.into_actor(self)
            .then(|res, act, ctx| {
                match res {
                    Ok(Ok(joined)) => {
                        act.room = Some(joined.room);
                    }
                    Ok(Err(e)) => {
                        error!("session {}: join failed: {e}", act.connection_id);
                        ctx.stop();
                    }
                    Err(e) => {
                        error!("session {}: registry unreachable: {e}", act.connection_id);
                        ctx.stop();
                    }
                }
                fut::ready(())
            })
            .wait(ctx);
    }

    fn leave_room(&mut self) {
        if let Some(room) = self.room.take() {
            room.do_send(RoomLeave {
                connection_id: self.connection_id.clone(),
            });
        }
    }

    /// Drain the outbound queue onto the socket, at most [`FLUSH_BATCH`]
    /// envelopes per event-loop turn. Inbound `Deliver`s interleave with
    /// the continuation, so a burst accumulates in the queue where the
    /// shed policy applies instead of being written out unboundedly.
    fn flush(&mut self, ctx: &mut WebsocketContext<Self>) {
        for _ in 0..FLUSH_BATCH {
            let Some(envelope) = self.queue.pop() else {
                return;
            };
            match serde_json::to_string(&*envelope) {
                Ok(text) => ctx.text(text),
                Err(e) => error!(
                    "session {}: failed to serialize outbound envelope: {e}",
                    self.connection_id
                ),
            }
        }
        if !self.queue.is_empty() {
            ctx.run_later(Duration::ZERO, |act, ctx| act.flush(ctx));
        }
    }
}

impl Actor for WsSession {
    type Context = WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        CONNECTIONS_ACTIVE.inc();
        self.start_heartbeat(ctx);
        self.presence.do_send(UserOnline {
            user_id: self.user_id.clone(),
            display_name: self.display_name.clone(),
            connection_id: self.connection_id.clone(),
        });
    }

    fn stopping(&mut self, _ctx: &mut Self::Context) -> Running {
        // Same cleanup whether the client said `leave` or just vanished.
        self.leave_room();
        self.presence.do_send(UserOffline {
            user_id: self.user_id.clone(),
            connection_id: self.connection_id.clone(),
        });
        CONNECTIONS_ACTIVE.dec();
        Running::Stop
    }
}

impl Handler<Deliver> for WsSession {
    type Result = ();

    fn handle(&mut self, msg: Deliver, ctx: &mut Self::Context) -> Self::Result {
        if self.queue.push(msg.envelope) {
            ENVELOPES_DROPPED_TOTAL.inc();
        }
        self.flush(ctx);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, item: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        let msg = match item {
            Ok(msg) => msg,
            Err(err) => {
                error!("session {}: protocol error: {err}", self.connection_id);
                ctx.stop();
                return;
            }
        };

        match msg {
            ws::Message::Text(text) => match self.guard.accept(&text, Instant::now()) {
                Inbound::Join => self.join_room(ctx),
                Inbound::Relay(envelope) => {
                    if let Some(room) = &self.room {
                        room.do_send(RoomRelay {
                            from_connection: self.connection_id.clone(),
                            envelope,
                        });
                    }
                }
                Inbound::Leave => {
                    self.leave_room();
                    ctx.close(Some(ws::CloseReason {
                        code: CloseCode::Normal,
                        description: None,
                    }));
                    ctx.stop();
                }
                Inbound::Ignored => {}
                Inbound::Violation(v) => self.close_for_violation(v, ctx),
            },
            ws::Message::Binary(_) => {
                self.close_for_violation(
                    Violation::Malformed("binary frames are not part of the protocol".into()),
                    ctx,
                );
            }
            ws::Message::Ping(payload) => {
                self.heartbeat = Instant::now();
                ctx.pong(&payload);
            }
            ws::Message::Pong(_) => {
                self.heartbeat = Instant::now();
            }
            ws::Message::Close(reason) => {
                ctx.close(reason);
                ctx.stop();
            }
            _ => (),
        }
    }

    fn finished(&mut self, ctx: &mut Self::Context) {
        ctx.stop()
    }
}
