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

//! Client-side meeting orchestration for CaseLink.
//!
//! This crate is transport- and UI-framework-agnostic: the embedding
//! application supplies a [`SignalSink`] over its WebSocket connection and a
//! [`MediaSessionFactory`] over its WebRTC engine, pumps inbound
//! [`SignalEnvelope`]s into the [`CallClient`], and renders the
//! [`CallEvent`]s it emits.
//!
//! ```no_run
//! # use caselink_client::*;
//! # use caselink_types::SignalEnvelope;
//! # fn wire<S: SignalSink, F: MediaSessionFactory>(sink: S, factory: F) {
//! let mut call = CallClient::new("room-42", sink, factory, Box::new(|event| {
//!     log::info!("call event: {event:?}");
//! }));
//! call.join();
//! # }
//! ```
//!
//! [`SignalEnvelope`]: caselink_types::SignalEnvelope

pub mod backoff;
pub mod controls;
pub mod events;
pub mod media;
pub mod orchestrator;
pub mod peer_link;
pub mod quality;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;

pub use backoff::Backoff;
pub use controls::RecordingMirror;
pub use events::{CallEvent, CallMode, EventCallback};
pub use media::{LocalMedia, MediaAccessError};
pub use orchestrator::CallClient;
pub use peer_link::{LinkState, NegotiationError, PeerLink};
pub use quality::LinkQuality;
pub use transport::{
    MediaSession, MediaSessionError, MediaSessionFactory, SignalSink, SinkError, VideoSource,
};
