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

use actix::Actor;
use actix_web::{web, App, HttpServer};
use caselink_relay::actors::registry::RoomRegistry;
use caselink_relay::config::AppConfig;
use caselink_relay::lobby::{metrics, room_summary, ws_connect, AppState};
use caselink_relay::presence::PresenceHub;
use tracing::info;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = AppConfig::from_env();
    info!("starting relay on {}", config.listen_addr);

    let registry = RoomRegistry::new(config.room_grace).start();
    let presence = PresenceHub::new().start();
    let state = AppState {
        registry,
        presence,
        config: config.clone(),
    };

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .service(ws_connect)
            .service(room_summary)
            .service(metrics)
    })
    .bind(&config.listen_addr)?
    .run()
    .await?;

    Ok(())
}
