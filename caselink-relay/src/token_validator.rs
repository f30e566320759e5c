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

//! JWT room access token validation.
//!
//! Validates tokens issued by the practice-management backend before
//! allowing a client to connect to the relay: parse JWT, verify HMAC
//! signature, check `room_join == true`. Identity and room come from the
//! claims — nothing identity-bearing is ever taken from the URL.

use caselink_types::RoomTokenClaims;
use jsonwebtoken::{DecodingKey, Validation};
use std::fmt;
use tracing::warn;

/// Errors that can occur during room token validation.
#[derive(Debug)]
pub enum TokenError {
    /// No token was provided but one is required.
    Missing,
    /// Token could not be decoded or signature is invalid.
    Invalid(String),
    /// Token has expired (`exp` claim is in the past).
    Expired,
    /// The `room_join` claim is `false`; bearer may not join.
    RoomJoinDenied,
}

impl TokenError {
    /// A retryable failure means the client should fetch a fresh token and
    /// try again; a non-retryable one means it was never authorized.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TokenError::Expired | TokenError::Missing)
    }

    /// Message safe to return to the client (no secret material).
    pub fn client_message(&self) -> &'static str {
        match self {
            TokenError::Missing => "room access token is required",
            TokenError::Invalid(_) => "invalid room access token",
            TokenError::Expired => "room access token has expired",
            TokenError::RoomJoinDenied => "token does not grant room join permission",
        }
    }

    pub fn log(&self, transport: &str) {
        warn!("[{transport}] token rejected: {self}");
    }
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::Missing => write!(f, "room access token is required"),
            TokenError::Invalid(msg) => write!(f, "invalid token: {msg}"),
            TokenError::Expired => write!(f, "token has expired"),
            TokenError::RoomJoinDenied => write!(f, "token does not grant room join permission"),
        }
    }
}

impl std::error::Error for TokenError {}

/// Decode and validate a room access token, extracting claims.
///
/// Checks:
/// 1. Signature is valid (HMAC-SHA256)
/// 2. Token is not expired (`exp`)
/// 3. Issuer matches [`RoomTokenClaims::ISSUER`]
/// 4. `room_join` is `true`
pub fn decode_room_token(secret: &str, token: &str) -> Result<RoomTokenClaims, TokenError> {
    if token.is_empty() {
        return Err(TokenError::Missing);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::default();
    validation.set_required_spec_claims(&["exp", "sub"]);
    validation.set_issuer(&[RoomTokenClaims::ISSUER]);
    validation.validate_exp = true;

    let token_data = jsonwebtoken::decode::<RoomTokenClaims>(token, &decoding_key, &validation)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid(e.to_string()),
        })?;

    let claims = token_data.claims;

    if !claims.room_join {
        return Err(TokenError::RoomJoinDenied);
    }

    Ok(claims)
}
