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

//! Transport-agnostic inbound protocol enforcement for one session.
//!
//! The WebSocket actor stays a thin adapter; every rule about what a
//! connection may send lives here: join-first handshake, room
//! authorization, sender stamping, and the per-connection envelope budget.

use crate::rate_limit::RateLimiter;
use caselink_types::{SignalEnvelope, SignalKind};
use std::fmt;
use std::time::Instant;

/// Why a connection is being closed. All of these are fatal to the
/// offending connection, never retried.
#[derive(Debug)]
pub enum Violation {
    Malformed(String),
    /// An envelope for a room other than the one this session joined
    /// (or is authorized to join).
    CrossRoom {
        expected: String,
        got: String,
    },
    /// Any non-`join` envelope before the join handshake.
    EnvelopeBeforeJoin,
    /// Per-connection envelope budget exceeded.
    BudgetExceeded,
}

impl Violation {
    pub fn metric_label(&self) -> &'static str {
        match self {
            Violation::Malformed(_) => "malformed",
            Violation::CrossRoom { .. } => "cross-room",
            Violation::EnvelopeBeforeJoin => "before-join",
            Violation::BudgetExceeded => "budget-exceeded",
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::Malformed(msg) => write!(f, "malformed envelope: {msg}"),
            Violation::CrossRoom { expected, got } => {
                write!(f, "envelope for room '{got}' on a session bound to '{expected}'")
            }
            Violation::EnvelopeBeforeJoin => write!(f, "envelope received before join"),
            Violation::BudgetExceeded => write!(f, "envelope budget exceeded"),
        }
    }
}

/// What the transport should do with an inbound frame.
#[derive(Debug)]
pub enum Inbound {
    /// Valid `join` handshake; attach to the room.
    Join,
    /// Valid post-join envelope, `from` stamped; hand to the room actor.
    Relay(SignalEnvelope),
    /// Explicit `leave`; run the shared cleanup path and close.
    Leave,
    /// Dropped without feedback (duplicate join).
    Ignored,
    /// Fatal; close the connection.
    Violation(Violation),
}

pub struct SessionGuard {
    connection_id: String,
    /// The room the token authorizes; also the only room this session may
    /// ever reference once joined.
    authorized_room: String,
    joined: bool,
    limiter: RateLimiter,
}

impl SessionGuard {
    pub fn new(connection_id: String, authorized_room: String, limiter: RateLimiter) -> Self {
        SessionGuard {
            connection_id,
            authorized_room,
            joined: false,
            limiter,
        }
    }

    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    pub fn room(&self) -> &str {
        &self.authorized_room
    }

    pub fn joined(&self) -> bool {
        self.joined
    }

    /// Classify one inbound text frame.
    pub fn accept(&mut self, raw: &str, now: Instant) -> Inbound {
        if !self.limiter.try_acquire(now) {
            return Inbound::Violation(Violation::BudgetExceeded);
        }

        let mut envelope: SignalEnvelope = match serde_json::from_str(raw) {
            Ok(env) => env,
            Err(e) => return Inbound::Violation(Violation::Malformed(e.to_string())),
        };

        if envelope.room_id != self.authorized_room {
            return Inbound::Violation(Violation::CrossRoom {
                expected: self.authorized_room.clone(),
                got: envelope.room_id,
            });
        }

        if !self.joined {
            return match envelope.kind {
                SignalKind::Join => {
                    self.joined = true;
                    Inbound::Join
                }
                _ => Inbound::Violation(Violation::EnvelopeBeforeJoin),
            };
        }

        match envelope.kind {
            SignalKind::Join => Inbound::Ignored,
            SignalKind::Leave => Inbound::Leave,
            kind => {
                // SDP and ICE are pairwise; broadcasting them is malformed.
                if kind.requires_target() && envelope.to.is_none() {
                    return Inbound::Violation(Violation::Malformed(format!(
                        "{kind:?} envelope without a target"
                    )));
                }
                // Never trust a client-supplied sender.
                envelope.from = Some(self.connection_id.clone());
                Inbound::Relay(envelope)
            }
        }
    }
}
