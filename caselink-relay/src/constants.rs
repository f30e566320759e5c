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

use std::time::Duration;

/// How often the relay pings each WebSocket session.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

/// A session that has not ponged within this window is disconnected.
pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Empty rooms linger this long before deletion so that a reconnecting
/// participant does not land in a freshly-recreated room.
pub const DEFAULT_ROOM_GRACE: Duration = Duration::from_secs(30);

/// Per-connection envelope budget (steady-state envelopes per second).
pub const DEFAULT_RATE_LIMIT_PER_SEC: u32 = 50;

/// Per-connection envelope budget (burst capacity).
pub const DEFAULT_RATE_LIMIT_BURST: u32 = 100;

/// Cap on a session's outbound queue before non-critical envelopes are shed.
pub const DEFAULT_SEND_QUEUE_CAP: usize = 256;

/// Outbound envelopes written to the socket per event-loop turn.
pub const FLUSH_BATCH: usize = 16;

/// Largest accepted WebSocket frame.
pub const MAX_FRAME_SIZE: usize = 1_000_000;
