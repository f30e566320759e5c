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

//! The room registry.
//!
//! Maps room ids to room actors. Joins, grace-period expiry, and room
//! creation are serialized here (they are rare); per-envelope relay traffic
//! goes straight from the session to the room actor and never touches this
//! actor. Empty rooms are deleted only after a grace period so reconnect
//! races land in the room they left, state intact.

use crate::actors::room::RoomActor;
use crate::messages::{
    ConfirmShutdown, GetSnapshot, JoinRoom, JoinedRoom, RoomEmpty, RoomJoin, RoomSetRecording,
    RoomSnapshotReq, SetRecording,
};
use crate::metrics::ROOMS_ACTIVE;
use actix::{
    Actor, ActorFutureExt, Addr, AsyncContext, Context, Handler, ResponseFuture, SpawnHandle,
    WrapFuture,
};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

struct RoomEntry {
    addr: Addr<RoomActor>,
    /// Grace-period deletion timer, present only while the room is empty.
    pending_delete: Option<SpawnHandle>,
}

pub struct RoomRegistry {
    rooms: HashMap<String, RoomEntry>,
    grace: Duration,
}

impl RoomRegistry {
    pub fn new(grace: Duration) -> Self {
        RoomRegistry {
            rooms: HashMap::new(),
            grace,
        }
    }
}

impl Actor for RoomRegistry {
    type Context = Context<Self>;
}

impl Handler<JoinRoom> for RoomRegistry {
    type Result = ResponseFuture<<JoinRoom as actix::Message>::Result>;

    fn handle(&mut self, msg: JoinRoom, ctx: &mut Self::Context) -> Self::Result {
        let JoinRoom {
            room_id,
            participant,
            addr,
        } = msg;

        let room = match self.rooms.get_mut(&room_id) {
            Some(entry) => {
                if let Some(handle) = entry.pending_delete.take() {
                    debug!("room {room_id}: join cancelled pending deletion");
                    ctx.cancel_future(handle);
                }
                entry.addr.clone()
            }
            None => {
                let room = RoomActor::new(room_id.clone(), ctx.address()).start();
                self.rooms.insert(
                    room_id.clone(),
                    RoomEntry {
                        addr: room.clone(),
                        pending_delete: None,
                    },
                );
                ROOMS_ACTIVE.set(self.rooms.len() as i64);
                room
            }
        };

        Box::pin(async move {
            let snapshot = room.send(RoomJoin { participant, addr }).await?;
            Ok(JoinedRoom { snapshot, room })
        })
    }
}

impl Handler<RoomEmpty> for RoomRegistry {
    type Result = ();

    fn handle(&mut self, msg: RoomEmpty, ctx: &mut Self::Context) -> Self::Result {
        let RoomEmpty { room_id } = msg;
        let grace = self.grace;
        let Some(entry) = self.rooms.get_mut(&room_id) else {
            return;
        };
        if entry.pending_delete.is_some() {
            return;
        }
        debug!("room {room_id}: empty, deleting in {grace:?}");
        let handle = ctx.run_later(grace, move |act, ctx| {
            let Some(entry) = act.rooms.get_mut(&room_id) else {
                return;
            };
            entry.pending_delete = None;
            let room = entry.addr.clone();
            // The room may have been rejoined between RoomEmpty and now;
            // it only stops if it is still empty.
            ctx.spawn(
                async move { room.send(ConfirmShutdown).await.unwrap_or(true) }
                    .into_actor(act)
                    .map(move |expired, act, _ctx| {
                        if expired {
                            act.rooms.remove(&room_id);
                            ROOMS_ACTIVE.set(act.rooms.len() as i64);
                            info!("room {room_id}: deleted after grace period");
                        }
                    }),
            );
        });
        entry.pending_delete = Some(handle);
    }
}

impl Handler<GetSnapshot> for RoomRegistry {
    type Result = ResponseFuture<Option<caselink_types::RoomSnapshot>>;

    fn handle(&mut self, msg: GetSnapshot, _ctx: &mut Self::Context) -> Self::Result {
        let room = self.rooms.get(&msg.room_id).map(|e| e.addr.clone());
        Box::pin(async move {
            match room {
                Some(room) => room.send(RoomSnapshotReq).await.ok(),
                None => None,
            }
        })
    }
}

impl Handler<SetRecording> for RoomRegistry {
    type Result = ();

    fn handle(&mut self, msg: SetRecording, _ctx: &mut Self::Context) -> Self::Result {
        if let Some(entry) = self.rooms.get(&msg.room_id) {
            entry.addr.do_send(RoomSetRecording {
                recording: msg.recording,
            });
        }
    }
}
