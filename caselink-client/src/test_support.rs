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

//! In-memory [`SignalSink`] and [`MediaSession`] doubles for unit tests.

use crate::transport::{
    MediaSession, MediaSessionError, MediaSessionFactory, SignalSink, SinkError, VideoSource,
};
use caselink_types::{IceCandidatePayload, SdpType, SessionDescription, SignalEnvelope};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Default)]
pub struct SessionState {
    pub offers_created: u32,
    pub answers_created: u32,
    pub answers_applied: u32,
    pub candidates: Vec<String>,
    pub sent: Vec<String>,
    pub channel_open: bool,
    pub rtt_ms: Option<f64>,
    pub closed: bool,
    pub video_source: Option<VideoSource>,
    pub fail_next_offer: bool,
    pub fail_next_answer: bool,
}

/// Scripted media session; state is shared so tests can inspect a session
/// after it has moved into a `PeerLink`.
#[derive(Clone)]
pub struct MockSession {
    state: Rc<RefCell<SessionState>>,
}

impl MockSession {
    pub fn new() -> Self {
        MockSession {
            state: Rc::new(RefCell::new(SessionState::default())),
        }
    }

    pub fn handle(&self) -> Rc<RefCell<SessionState>> {
        Rc::clone(&self.state)
    }

    pub fn applied_candidates(&self) -> Vec<String> {
        self.state.borrow().candidates.clone()
    }

    pub fn sent_data(&self) -> Vec<String> {
        self.state.borrow().sent.clone()
    }

    pub fn set_channel_open(&mut self, open: bool) {
        self.state.borrow_mut().channel_open = open;
    }

    pub fn set_rtt(&mut self, rtt_ms: Option<f64>) {
        self.state.borrow_mut().rtt_ms = rtt_ms;
    }

    pub fn closed(&self) -> bool {
        self.state.borrow().closed
    }
}

impl MediaSession for MockSession {
    fn create_offer(&mut self) -> Result<SessionDescription, MediaSessionError> {
        let mut s = self.state.borrow_mut();
        if s.fail_next_offer {
            s.fail_next_offer = false;
            return Err(MediaSessionError::Negotiation("scripted failure".into()));
        }
        s.offers_created += 1;
        Ok(SessionDescription {
            sdp_type: SdpType::Offer,
            sdp: format!("v=0 mock-offer-{}", s.offers_created),
        })
    }

    fn create_answer(
        &mut self,
        _remote: &SessionDescription,
    ) -> Result<SessionDescription, MediaSessionError> {
        let mut s = self.state.borrow_mut();
        if s.fail_next_answer {
            s.fail_next_answer = false;
            return Err(MediaSessionError::Negotiation("scripted failure".into()));
        }
        s.answers_created += 1;
        Ok(SessionDescription {
            sdp_type: SdpType::Answer,
            sdp: format!("v=0 mock-answer-{}", s.answers_created),
        })
    }

    fn apply_answer(&mut self, _remote: &SessionDescription) -> Result<(), MediaSessionError> {
        self.state.borrow_mut().answers_applied += 1;
        Ok(())
    }

    fn add_ice_candidate(
        &mut self,
        candidate: &IceCandidatePayload,
    ) -> Result<(), MediaSessionError> {
        self.state
            .borrow_mut()
            .candidates
            .push(candidate.candidate.clone());
        Ok(())
    }

    fn replace_video_track(&mut self, source: VideoSource) -> Result<(), MediaSessionError> {
        self.state.borrow_mut().video_source = Some(source);
        Ok(())
    }

    fn data_channel_open(&self) -> bool {
        self.state.borrow().channel_open
    }

    fn send_data(&mut self, text: &str) -> Result<(), MediaSessionError> {
        let mut s = self.state.borrow_mut();
        if !s.channel_open {
            return Err(MediaSessionError::ChannelClosed);
        }
        s.sent.push(text.to_string());
        Ok(())
    }

    fn rtt_ms(&self) -> Option<f64> {
        self.state.borrow().rtt_ms
    }

    fn close(&mut self) {
        self.state.borrow_mut().closed = true;
    }
}

/// Factory that remembers every session it handed out, keyed by remote
/// connection id.
#[derive(Clone, Default)]
pub struct MockFactory {
    pub created: Rc<RefCell<HashMap<String, Rc<RefCell<SessionState>>>>>,
}

impl MockFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self, remote: &str) -> Rc<RefCell<SessionState>> {
        self.created
            .borrow()
            .get(remote)
            .cloned()
            .unwrap_or_else(|| panic!("no session was created for {remote}"))
    }

    pub fn created_for(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.created.borrow().keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl MediaSessionFactory for MockFactory {
    type Session = MockSession;

    fn create(&mut self, remote_connection_id: &str) -> MockSession {
        let session = MockSession::new();
        self.created
            .borrow_mut()
            .insert(remote_connection_id.to_string(), session.handle());
        session
    }
}

/// Signaling sink that records envelopes and can be flipped into a failing
/// state to simulate relay loss.
#[derive(Clone, Default)]
pub struct MockSink {
    pub sent: Rc<RefCell<Vec<SignalEnvelope>>>,
    pub down: Rc<RefCell<bool>>,
}

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent_of_kind(&self, kind: caselink_types::SignalKind) -> Vec<SignalEnvelope> {
        self.sent
            .borrow()
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }

    pub fn set_down(&self, down: bool) {
        *self.down.borrow_mut() = down;
    }
}

impl SignalSink for MockSink {
    fn send(&mut self, envelope: &SignalEnvelope) -> Result<(), SinkError> {
        if *self.down.borrow() {
            return Err(SinkError("transport down".into()));
        }
        self.sent.borrow_mut().push(envelope.clone());
        Ok(())
    }
}
