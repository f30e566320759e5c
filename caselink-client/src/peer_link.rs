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

//! Per-peer negotiation state machine.
//!
//! One `PeerLink` per remote connection id, with named states and guarded
//! transitions. The link never talks to the network itself — the
//! orchestrator sends whatever descriptions the link produces.
//!
//! ```text
//! stable --start_offer--> have-local-offer --remote answer--> connected
//! stable --remote offer--> have-remote-offer --answer sent--> connected
//! connected --renegotiate--> connected      (fresh offer/answer, no teardown)
//! any --close/error--> closed
//! ```

use crate::quality::LinkQuality;
use crate::transport::{MediaSession, MediaSessionError};
use caselink_types::{IceCandidatePayload, SessionDescription};
use log::{debug, trace};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Stable,
    HaveLocalOffer,
    HaveRemoteOffer,
    Connected,
    Closed,
}

#[derive(Debug)]
pub enum NegotiationError {
    /// A remote offer arrived in a state that cannot accept one (offer
    /// glare or a stale peer). The link is torn down and rebuilt on the
    /// next membership update.
    UnexpectedOffer(LinkState),
    /// A remote answer arrived with no outstanding local offer.
    UnexpectedAnswer(LinkState),
    Media(MediaSessionError),
}

impl fmt::Display for NegotiationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NegotiationError::UnexpectedOffer(s) => write!(f, "unexpected offer in state {s:?}"),
            NegotiationError::UnexpectedAnswer(s) => write!(f, "unexpected answer in state {s:?}"),
            NegotiationError::Media(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for NegotiationError {}

impl From<MediaSessionError> for NegotiationError {
    fn from(e: MediaSessionError) -> Self {
        NegotiationError::Media(e)
    }
}

pub struct PeerLink<S: MediaSession> {
    remote_connection_id: String,
    state: LinkState,
    session: S,
    /// Candidates that arrived before the remote description; applied in
    /// arrival order once it is set.
    pending_candidates: Vec<IceCandidatePayload>,
    remote_description_set: bool,
    renegotiating: bool,
    last_quality: Option<LinkQuality>,
}

impl<S: MediaSession> PeerLink<S> {
    pub fn new(remote_connection_id: impl Into<String>, session: S) -> Self {
        PeerLink {
            remote_connection_id: remote_connection_id.into(),
            state: LinkState::Stable,
            session,
            pending_candidates: Vec::new(),
            remote_description_set: false,
            renegotiating: false,
            last_quality: None,
        }
    }

    pub fn remote_connection_id(&self) -> &str {
        &self.remote_connection_id
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == LinkState::Connected
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    /// Create a local offer. From `Stable` this starts negotiation; from
    /// `Connected` it starts a renegotiation (screen-share swap) without
    /// leaving `Connected`.
    pub fn start_offer(&mut self) -> Result<SessionDescription, NegotiationError> {
        match self.state {
            LinkState::Stable => {
                let offer = self.session.create_offer()?;
                self.state = LinkState::HaveLocalOffer;
                Ok(offer)
            }
            LinkState::Connected => {
                let offer = self.session.create_offer()?;
                self.renegotiating = true;
                debug!("renegotiating with {}", self.remote_connection_id);
                Ok(offer)
            }
            state => Err(NegotiationError::UnexpectedOffer(state)),
        }
    }

    /// Apply a remote offer and produce the answer the orchestrator must
    /// send. Accepted from `Stable` (initial negotiation) and `Connected`
    /// (incoming renegotiation).
    pub fn handle_remote_offer(
        &mut self,
        remote: &SessionDescription,
    ) -> Result<SessionDescription, NegotiationError> {
        match self.state {
            LinkState::Stable => {
                let answer = self.session.create_answer(remote)?;
                self.state = LinkState::HaveRemoteOffer;
                self.remote_description_set = true;
                self.flush_candidates()?;
                Ok(answer)
            }
            LinkState::Connected => {
                let answer = self.session.create_answer(remote)?;
                self.remote_description_set = true;
                self.flush_candidates()?;
                Ok(answer)
            }
            state => Err(NegotiationError::UnexpectedOffer(state)),
        }
    }

    /// The orchestrator has handed our answer to the transport; the link
    /// is now connected.
    pub fn answer_sent(&mut self) {
        if self.state == LinkState::HaveRemoteOffer {
            self.state = LinkState::Connected;
        }
    }

    /// Apply the remote answer to our outstanding offer.
    pub fn handle_remote_answer(
        &mut self,
        remote: &SessionDescription,
    ) -> Result<(), NegotiationError> {
        match self.state {
            LinkState::HaveLocalOffer => {
                self.session.apply_answer(remote)?;
                self.state = LinkState::Connected;
                self.remote_description_set = true;
                self.flush_candidates()?;
                Ok(())
            }
            LinkState::Connected if self.renegotiating => {
                self.session.apply_answer(remote)?;
                self.renegotiating = false;
                Ok(())
            }
            state => Err(NegotiationError::UnexpectedAnswer(state)),
        }
    }

    /// Buffer or apply one remote ICE candidate. Candidates that beat the
    /// remote description are held in arrival order and applied when it
    /// lands; none are lost.
    pub fn add_remote_candidate(
        &mut self,
        candidate: IceCandidatePayload,
    ) -> Result<(), NegotiationError> {
        if self.state == LinkState::Closed {
            trace!(
                "discarding candidate for closed link {}",
                self.remote_connection_id
            );
            return Ok(());
        }
        if self.remote_description_set {
            self.session.add_ice_candidate(&candidate)?;
        } else {
            self.pending_candidates.push(candidate);
        }
        Ok(())
    }

    fn flush_candidates(&mut self) -> Result<(), NegotiationError> {
        for candidate in std::mem::take(&mut self.pending_candidates) {
            self.session.add_ice_candidate(&candidate)?;
        }
        Ok(())
    }

    /// Try to deliver chat over the data channel. `false` means the caller
    /// should fall back to the relay for this peer.
    pub fn send_chat(&mut self, text: &str) -> bool {
        if self.state == LinkState::Connected && self.session.data_channel_open() {
            match self.session.send_data(text) {
                Ok(()) => return true,
                Err(e) => debug!(
                    "data channel send to {} failed: {e}",
                    self.remote_connection_id
                ),
            }
        }
        false
    }

    /// Sample link quality; returns the tier only when it changed since
    /// the last sample.
    pub fn sample_quality(&mut self) -> Option<LinkQuality> {
        let quality = LinkQuality::from_rtt_ms(self.session.rtt_ms()?);
        if self.last_quality == Some(quality) {
            None
        } else {
            self.last_quality = Some(quality);
            Some(quality)
        }
    }

    pub fn close(&mut self) {
        if self.state != LinkState::Closed {
            self.session.close();
            self.state = LinkState::Closed;
        }
    }
}
