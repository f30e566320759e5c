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

//! Process configuration, read once from the environment at startup.

use crate::constants::{
    DEFAULT_RATE_LIMIT_BURST, DEFAULT_RATE_LIMIT_PER_SEC, DEFAULT_ROOM_GRACE,
    DEFAULT_SEND_QUEUE_CAP,
};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address the HTTP/WebSocket server binds to.
    pub listen_addr: String,
    /// HMAC secret for room access tokens. Empty means misconfigured;
    /// the lobby refuses connections.
    pub jwt_secret: String,
    /// Steady-state per-connection envelope budget.
    pub rate_limit_per_sec: u32,
    /// Burst allowance on top of the steady-state budget.
    pub rate_limit_burst: u32,
    /// How long an empty room survives before deletion.
    pub room_grace: Duration,
    /// Outbound queue cap per session.
    pub send_queue_cap: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        AppConfig {
            listen_addr: env_or("LISTEN_ADDR", "0.0.0.0:8080"),
            jwt_secret: std::env::var("JWT_SECRET").unwrap_or_default(),
            rate_limit_per_sec: env_parsed("RELAY_RATE_LIMIT", DEFAULT_RATE_LIMIT_PER_SEC),
            rate_limit_burst: env_parsed("RELAY_RATE_BURST", DEFAULT_RATE_LIMIT_BURST),
            room_grace: Duration::from_secs(env_parsed(
                "ROOM_GRACE_SECS",
                DEFAULT_ROOM_GRACE.as_secs(),
            )),
            send_queue_cap: env_parsed("SEND_QUEUE_CAP", DEFAULT_SEND_QUEUE_CAP),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            listen_addr: "0.0.0.0:8080".to_string(),
            jwt_secret: String::new(),
            rate_limit_per_sec: DEFAULT_RATE_LIMIT_PER_SEC,
            rate_limit_burst: DEFAULT_RATE_LIMIT_BURST,
            room_grace: DEFAULT_ROOM_GRACE,
            send_queue_cap: DEFAULT_SEND_QUEUE_CAP,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
