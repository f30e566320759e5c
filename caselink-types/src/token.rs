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

//! Room access token (JWT) claims.
//!
//! The practice-management backend signs a short-lived JWT (HMAC-SHA256)
//! when it admits a user to a meeting; the relay validates the signature
//! and takes identity and room from the claims. This core never issues
//! tokens.

use serde::{Deserialize, Serialize};

/// JWT payload for a room access token.
///
/// # Example payload
///
/// ```json
/// {
///   "sub": "attorney@firm.example",
///   "room": "case-4821-hearing-prep",
///   "room_join": true,
///   "display_name": "Dana Ruiz",
///   "exp": 1707004800,
///   "iss": "caselink-backend"
/// }
/// ```
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RoomTokenClaims {
    /// User identity (unique within the tenant).
    pub sub: String,

    /// The room the bearer is authorized to join.
    pub room: String,

    /// Must be `true` for the relay to accept the connection.
    pub room_join: bool,

    /// Display name shown to other participants.
    pub display_name: String,

    /// Expiration timestamp (Unix seconds).
    pub exp: i64,

    /// Issuer identifier. Always [`Self::ISSUER`].
    pub iss: String,
}

impl RoomTokenClaims {
    /// The expected issuer value for tokens produced by the backend.
    pub const ISSUER: &'static str = "caselink-backend";
}
