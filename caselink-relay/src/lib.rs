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

//! Signaling relay and presence hub for the CaseLink meeting core.
//!
//! The relay accepts authenticated WebSocket connections, attaches each to
//! a meeting room, and forwards session-negotiation envelopes between room
//! members. Room membership is the relay's ground truth for the lifetime
//! of the process; the presence hub tracks who is active on which case or
//! document independently of any meeting.

pub mod actors;
pub mod config;
pub mod constants;
pub mod lobby;
pub mod messages;
pub mod metrics;
pub mod presence;
pub mod rate_limit;
pub mod send_queue;
pub mod session_guard;
pub mod token_validator;
