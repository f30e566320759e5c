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

pub mod registry;
pub mod room;
pub mod ws_session;

pub use registry::RoomRegistry;
pub use room::RoomActor;
pub use ws_session::WsSession;
