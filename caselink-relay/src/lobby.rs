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

//! HTTP surface of the relay.
//!
//! - **`GET /relay?token=<JWT>`**: validates the room access token and
//!   upgrades to a WebSocket signaling session. Identity and room come
//!   from the token claims, never from the URL.
//! - **`GET /rooms/{room_id}/summary`**: room activity summary for the
//!   practice-management dashboards.
//! - **`GET /metrics`**: Prometheus exposition.

use crate::actors::registry::RoomRegistry;
use crate::actors::ws_session::WsSession;
use crate::config::AppConfig;
use crate::constants::MAX_FRAME_SIZE;
use crate::messages::GetSnapshot;
use crate::presence::PresenceHub;
use crate::token_validator;
use actix::prelude::Stream;
use actix::{Actor, Addr, StreamHandler};
use actix_http::error::PayloadError;
use actix_http::ws::{Codec, Message, ProtocolError};
use actix_web::web::Bytes;
use actix_web::{get, web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws::{handshake, WebsocketContext};
use prometheus::{Encoder, TextEncoder};
use tracing::{debug, error};

/// Shared handles for the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Addr<RoomRegistry>,
    pub presence: Addr<PresenceHub>,
    pub config: AppConfig,
}

/// Query parameters for the relay endpoint.
#[derive(Debug, serde::Deserialize)]
pub struct RelayQuery {
    /// JWT room access token. Identity and room are extracted from the
    /// claims.
    pub token: String,
}

/// Start a WebSocket connection with a custom codec.
fn start_with_codec<A, S>(
    actor: A,
    req: &HttpRequest,
    stream: S,
    codec: Codec,
) -> Result<HttpResponse, Error>
where
    A: Actor<Context = WebsocketContext<A>> + StreamHandler<Result<Message, ProtocolError>>,
    S: Stream<Item = Result<Bytes, PayloadError>> + 'static,
{
    let mut res = handshake(req)?;
    Ok(res.streaming(WebsocketContext::with_codec(actor, stream, codec)))
}

/// WebSocket signaling connection endpoint (token-based).
#[get("/relay")]
pub async fn ws_connect(
    query: web::Query<RelayQuery>,
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    if state.config.jwt_secret.is_empty() {
        error!("JWT_SECRET not set");
        return Ok(HttpResponse::InternalServerError().body("Server misconfigured"));
    }

    let claims = match token_validator::decode_room_token(&state.config.jwt_secret, &query.token) {
        Ok(c) => c,
        Err(e) => {
            e.log("WS");
            let body = e.client_message().to_string();
            return if e.is_retryable() {
                Ok(HttpResponse::Unauthorized().body(body))
            } else {
                Ok(HttpResponse::Forbidden().body(body))
            };
        }
    };

    debug!(
        "socket connected for user={}, room={}",
        claims.sub, claims.room
    );
    let actor = WsSession::new(
        claims.sub,
        claims.display_name,
        claims.room,
        state.registry.clone(),
        state.presence.clone(),
        &state.config,
    );
    let codec = Codec::new().max_size(MAX_FRAME_SIZE);
    start_with_codec(actor, &req, stream, codec)
}

/// Room activity summary for dashboards.
#[get("/rooms/{room_id}/summary")]
pub async fn room_summary(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let room_id = path.into_inner();
    let snapshot = state
        .registry
        .send(GetSnapshot { room_id })
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;
    match snapshot {
        Some(snapshot) => Ok(HttpResponse::Ok().json(snapshot.summary())),
        None => Ok(HttpResponse::NotFound().body("no such room")),
    }
}

/// Prometheus metrics exposition.
#[get("/metrics")]
pub async fn metrics() -> Result<HttpResponse, Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(actix_web::error::ErrorInternalServerError)?;
    Ok(HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer))
}
