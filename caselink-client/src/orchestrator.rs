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
 *
 * Unless you explicitly state otherwise, any contribution intentionally
 * submitted for inclusion in the work by you, as defined in the Apache-2.0
 * license, shall be dual licensed as above, without any additional terms or
 * conditions.
 */

//! The call orchestrator: one [`PeerLink`] per remote connection id,
//! reconciled against every `participants-update` from the relay.
//!
//! Offer direction is deterministic: the participant with the later
//! `joined_at` (connection id breaks ties) initiates toward each earlier
//! participant. Both sides apply the same rule to the same roster, so
//! exactly one side offers and glare cannot arise in the steady state.
//!
//! The orchestrator is synchronous and single-threaded by design; the
//! embedding application pumps inbound envelopes into
//! [`CallClient::handle_envelope`] and drives timers (quality sampling,
//! reconnect) from its own event loop.

use crate::backoff::Backoff;
use crate::controls::{self, RecordingMirror};
use crate::events::{CallEvent, CallMode, EventCallback};
use crate::media::LocalMedia;
use crate::peer_link::{NegotiationError, PeerLink};
use crate::transport::{MediaSession, MediaSessionFactory, SignalSink, VideoSource};
use caselink_types::{
    ChatPayload, IceCandidatePayload, ParticipantInfo, ParticipantsUpdate, SessionDescription,
    SignalEnvelope, SignalKind,
};
use log::{debug, warn};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

// Serialization of our own payload structs cannot fail; Null would only
// appear if it somehow did, and the receiver treats that as malformed.
fn to_payload<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

pub struct CallClient<S: SignalSink, F: MediaSessionFactory> {
    room_id: String,
    sink: S,
    factory: F,
    media: LocalMedia,
    links: HashMap<String, PeerLink<F::Session>>,
    self_connection_id: Option<String>,
    /// Latest authoritative roster, kept for forced resyncs.
    last_update: Option<ParticipantsUpdate>,
    /// An update that arrived before the relay told us our own id.
    pending_update: Option<ParticipantsUpdate>,
    recording: RecordingMirror,
    mode: CallMode,
    backoff: Backoff,
    callback: EventCallback,
}

impl<S: SignalSink, F: MediaSessionFactory> CallClient<S, F> {
    pub fn new(room_id: impl Into<String>, sink: S, factory: F, callback: EventCallback) -> Self {
        CallClient {
            room_id: room_id.into(),
            sink,
            factory,
            media: LocalMedia::new(),
            links: HashMap::new(),
            self_connection_id: None,
            last_update: None,
            pending_update: None,
            recording: RecordingMirror::new(),
            mode: CallMode::Live,
            backoff: Backoff::new(),
            callback,
        }
    }

    pub fn mode(&self) -> CallMode {
        self.mode
    }

    pub fn is_recording(&self) -> bool {
        self.recording.is_recording()
    }

    pub fn self_connection_id(&self) -> Option<&str> {
        self.self_connection_id.as_deref()
    }

    pub fn media(&self) -> &LocalMedia {
        &self.media
    }

    pub fn connected_peers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .links
            .iter()
            .filter(|(_, l)| l.is_connected())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    fn emit(&self, event: CallEvent) {
        (self.callback)(event);
    }

    fn send(&mut self, envelope: SignalEnvelope) -> bool {
        match self.sink.send(&envelope) {
            Ok(()) => true,
            Err(e) => {
                warn!("relay send failed: {e}");
                self.enter_local_only();
                false
            }
        }
    }

    /// Send the join envelope that opens the relay handshake.
    pub fn join(&mut self) {
        let env = SignalEnvelope::broadcast(SignalKind::Join, self.room_id.clone(), Value::Null);
        self.send(env);
    }

    /// Explicit leave: notify the room and drop every link.
    pub fn leave(&mut self) {
        let env = SignalEnvelope::broadcast(SignalKind::Leave, self.room_id.clone(), Value::Null);
        self.send(env);
        for link in self.links.values_mut() {
            link.close();
        }
        self.links.clear();
        self.self_connection_id = None;
    }

    /// Route one inbound envelope from the relay.
    pub fn handle_envelope(&mut self, envelope: SignalEnvelope) {
        match envelope.kind {
            SignalKind::Join => self.handle_join(envelope),
            SignalKind::ParticipantsUpdate => {
                match serde_json::from_value::<ParticipantsUpdate>(envelope.payload) {
                    Ok(update) => self.sync_roster(update),
                    Err(e) => warn!("malformed participants-update: {e}"),
                }
            }
            SignalKind::Offer => self.handle_offer(envelope),
            SignalKind::Answer => self.handle_answer(envelope),
            SignalKind::IceCandidate => self.handle_candidate(envelope),
            SignalKind::ChatMessage => {
                let Some(from) = envelope.from else { return };
                match serde_json::from_value::<ChatPayload>(envelope.payload) {
                    Ok(chat) => self.emit(CallEvent::ChatReceived {
                        from,
                        text: chat.text,
                    }),
                    Err(e) => warn!("malformed chat payload from {from}: {e}"),
                }
            }
            SignalKind::RecordingStarted => {
                if let Some(v) = self.recording.observe(true) {
                    self.emit(CallEvent::RecordingChanged(v));
                }
            }
            SignalKind::RecordingStopped => {
                if let Some(v) = self.recording.observe(false) {
                    self.emit(CallEvent::RecordingChanged(v));
                }
            }
            SignalKind::Leave => {
                // Early teardown; the reconciling participants-update
                // follows right behind.
                if let Some(from) = envelope.from {
                    if let Some(mut link) = self.links.remove(&from) {
                        link.close();
                        self.emit(CallEvent::PeerRemoved {
                            connection_id: from,
                        });
                    }
                }
            }
        }
    }

    fn handle_join(&mut self, envelope: SignalEnvelope) {
        // The relay's targeted ack carries our assigned connection id;
        // join notices from peers carry `from` and need no action here.
        if envelope.from.is_some() || envelope.to.is_none() {
            return;
        }
        let Some(id) = envelope.payload.get("connectionId").and_then(Value::as_str) else {
            warn!("join ack without connectionId");
            return;
        };
        self.self_connection_id = Some(id.to_string());
        self.emit(CallEvent::SelfAssigned {
            connection_id: id.to_string(),
        });
        if let Some(update) = self.pending_update.take() {
            self.sync_roster(update);
        }
    }

    /// Full reconciliation of links against the authoritative roster.
    /// Every update is treated as a resync, never a patch.
    fn sync_roster(&mut self, update: ParticipantsUpdate) {
        if let Some(v) = self.recording.observe(update.recording) {
            self.emit(CallEvent::RecordingChanged(v));
        }
        let Some(self_id) = self.self_connection_id.clone() else {
            self.pending_update = Some(update);
            return;
        };
        let self_info = update
            .participants
            .iter()
            .find(|p| p.connection_id == self_id)
            .cloned();

        let gone: Vec<String> = self
            .links
            .keys()
            .filter(|id| !update.participants.iter().any(|p| &p.connection_id == *id))
            .cloned()
            .collect();
        for id in gone {
            if let Some(mut link) = self.links.remove(&id) {
                link.close();
            }
            self.emit(CallEvent::PeerRemoved { connection_id: id });
        }

        for peer in update.participants.iter() {
            if peer.connection_id == self_id || self.links.contains_key(&peer.connection_id) {
                continue;
            }
            let session = self.factory.create(&peer.connection_id);
            let mut link = PeerLink::new(peer.connection_id.clone(), session);
            self.emit(CallEvent::PeerAdded {
                connection_id: peer.connection_id.clone(),
            });
            if let Some(me) = &self_info {
                if Self::initiates_toward(me, peer) {
                    match link.start_offer() {
                        Ok(offer) => {
                            self.links.insert(peer.connection_id.clone(), link);
                            let env = SignalEnvelope::targeted(
                                SignalKind::Offer,
                                self.room_id.clone(),
                                peer.connection_id.clone(),
                                to_payload(&offer),
                            );
                            if !self.send(env) {
                                return;
                            }
                            continue;
                        }
                        Err(e) => {
                            link.close();
                            self.emit(CallEvent::NegotiationFailed {
                                connection_id: peer.connection_id.clone(),
                                reason: e.to_string(),
                            });
                            continue;
                        }
                    }
                }
            }
            self.links.insert(peer.connection_id.clone(), link);
        }
        self.last_update = Some(update);
    }

    /// The later joiner offers; connection id breaks joined-at ties. Both
    /// sides evaluate the same roster, so exactly one direction holds.
    fn initiates_toward(me: &ParticipantInfo, peer: &ParticipantInfo) -> bool {
        (peer.joined_at, peer.connection_id.as_str())
            < (me.joined_at, me.connection_id.as_str())
    }

    /// Re-reconcile against the last known roster. Used when the caller
    /// detects drift between links and membership out of band.
    pub fn force_resync(&mut self) {
        if let Some(update) = self.last_update.clone() {
            self.sync_roster(update);
        }
    }

    fn handle_offer(&mut self, envelope: SignalEnvelope) {
        let Some(from) = envelope.from else { return };
        let desc: SessionDescription = match serde_json::from_value(envelope.payload) {
            Ok(d) => d,
            Err(e) => {
                warn!("malformed offer from {from}: {e}");
                return;
            }
        };
        // An offer can beat the participants-update that introduces its
        // sender; create the link on demand.
        if !self.links.contains_key(&from) {
            let session = self.factory.create(&from);
            self.links
                .insert(from.clone(), PeerLink::new(from.clone(), session));
            self.emit(CallEvent::PeerAdded {
                connection_id: from.clone(),
            });
        }
        let result = match self.links.get_mut(&from) {
            Some(link) => link.handle_remote_offer(&desc),
            None => return,
        };
        match result {
            Ok(answer) => {
                let env = SignalEnvelope::targeted(
                    SignalKind::Answer,
                    self.room_id.clone(),
                    from.clone(),
                    to_payload(&answer),
                );
                if self.send(env) {
                    if let Some(link) = self.links.get_mut(&from) {
                        link.answer_sent();
                    }
                }
            }
            Err(e) => self.fail_link(&from, e),
        }
    }

    fn handle_answer(&mut self, envelope: SignalEnvelope) {
        let Some(from) = envelope.from else { return };
        let desc: SessionDescription = match serde_json::from_value(envelope.payload) {
            Ok(d) => d,
            Err(e) => {
                warn!("malformed answer from {from}: {e}");
                return;
            }
        };
        let result = match self.links.get_mut(&from) {
            Some(link) => link.handle_remote_answer(&desc),
            None => {
                debug!("answer from unknown peer {from}");
                return;
            }
        };
        if let Err(e) = result {
            self.fail_link(&from, e);
        }
    }

    fn handle_candidate(&mut self, envelope: SignalEnvelope) {
        let Some(from) = envelope.from else { return };
        let candidate: IceCandidatePayload = match serde_json::from_value(envelope.payload) {
            Ok(c) => c,
            Err(e) => {
                warn!("malformed ice candidate from {from}: {e}");
                return;
            }
        };
        let result = match self.links.get_mut(&from) {
            Some(link) => link.add_remote_candidate(candidate),
            None => {
                debug!("ice candidate from unknown peer {from}");
                return;
            }
        };
        if let Err(e) = result {
            self.fail_link(&from, e);
        }
    }

    /// Tear one link down after a negotiation failure; it is rebuilt from
    /// the next `participants-update`. Other peers are unaffected.
    fn fail_link(&mut self, connection_id: &str, err: NegotiationError) {
        if let Some(mut link) = self.links.remove(connection_id) {
            link.close();
        }
        self.emit(CallEvent::NegotiationFailed {
            connection_id: connection_id.to_string(),
            reason: err.to_string(),
        });
    }

    /// Send chat to the room: data channel per connected peer, relay
    /// fallback addressed to each peer still negotiating.
    pub fn send_chat(&mut self, text: &str, sent_at_ms: u64) {
        let mut fallback: Vec<String> = Vec::new();
        for (id, link) in self.links.iter_mut() {
            if !link.send_chat(text) {
                fallback.push(id.clone());
            }
        }
        fallback.sort();
        for id in fallback {
            let env = controls::chat_fallback(&self.room_id, &id, text, sent_at_ms);
            if !self.send(env) {
                return;
            }
        }
    }

    /// Broadcast a recording toggle and update the local mirror.
    pub fn set_recording(&mut self, start: bool) {
        let env = controls::recording_envelope(&self.room_id, start);
        if self.send(env) {
            if let Some(v) = self.recording.observe(start) {
                self.emit(CallEvent::RecordingChanged(v));
            }
        }
    }

    /// Toggle screen share: swap the outbound track on every connected
    /// link inside the shared media lock, then renegotiate each of them.
    pub fn set_screen_share(&mut self, enabled: bool) {
        let source = if enabled {
            VideoSource::ScreenShare
        } else {
            VideoSource::Camera
        };
        let links = &mut self.links;
        let mut swap_failures: Vec<String> = Vec::new();
        let swapped = self.media.swap_video_source(source, |_| {
            for (id, link) in links.iter_mut() {
                if !link.is_connected() {
                    continue;
                }
                if let Err(e) = link.session_mut().replace_video_track(source) {
                    warn!("track swap failed for {id}: {e}");
                    swap_failures.push(id.clone());
                }
            }
        });
        if swapped.is_none() {
            return;
        }

        let mut offers: Vec<(String, SessionDescription)> = Vec::new();
        let mut failures: Vec<(String, NegotiationError)> = Vec::new();
        for (id, link) in self.links.iter_mut() {
            if !link.is_connected() || swap_failures.contains(id) {
                continue;
            }
            match link.start_offer() {
                Ok(offer) => offers.push((id.clone(), offer)),
                Err(e) => failures.push((id.clone(), e)),
            }
        }
        offers.sort_by(|a, b| a.0.cmp(&b.0));
        for (id, offer) in offers {
            let env = SignalEnvelope::targeted(
                SignalKind::Offer,
                self.room_id.clone(),
                id,
                to_payload(&offer),
            );
            if !self.send(env) {
                return;
            }
        }
        for (id, e) in failures {
            self.fail_link(&id, e);
        }
    }

    /// Sample RTT on every link and report tier changes.
    pub fn sample_link_quality(&mut self) {
        let mut changes: Vec<(String, crate::quality::LinkQuality)> = Vec::new();
        for (id, link) in self.links.iter_mut() {
            if let Some(q) = link.sample_quality() {
                changes.push((id.clone(), q));
            }
        }
        for (id, quality) in changes {
            self.emit(CallEvent::QualityChanged {
                connection_id: id,
                quality,
            });
        }
    }

    /// The transport reported heartbeat silence or a hard error.
    pub fn relay_lost(&mut self) {
        self.enter_local_only();
    }

    fn enter_local_only(&mut self) {
        if self.mode == CallMode::LocalOnly {
            return;
        }
        self.mode = CallMode::LocalOnly;
        let ids: Vec<String> = self.links.keys().cloned().collect();
        for id in &ids {
            if let Some(mut link) = self.links.remove(id) {
                link.close();
            }
        }
        for id in ids {
            self.emit(CallEvent::PeerRemoved { connection_id: id });
        }
        self.self_connection_id = None;
        self.emit(CallEvent::ModeChanged(CallMode::LocalOnly));
    }

    /// Next reconnect delay while in local-only mode. The embedding app
    /// owns the timer; this only advances the backoff and reports it.
    pub fn next_reconnect_delay(&mut self) -> Duration {
        let delay = self.backoff.next_delay();
        self.emit(CallEvent::ReconnectScheduled {
            attempt: self.backoff.attempt(),
            delay,
        });
        delay
    }

    /// The transport is back up: go live and redo the join handshake. All
    /// links rebuild from the fresh `participants-update`.
    pub fn reconnected(&mut self) {
        self.backoff.reset();
        self.mode = CallMode::Live;
        self.emit(CallEvent::ModeChanged(CallMode::Live));
        self.join();
    }
}
