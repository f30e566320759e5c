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

//! Bounded outbound queue for one session.
//!
//! A slow receiver must not cause unbounded buffering. When the queue is
//! full, the oldest non-critical envelope (ICE chatter, chat fallback) is
//! shed first; critical membership envelopes (`join`/`leave`/
//! `participants-update`) are never dropped, even if that means exceeding
//! the cap.

use caselink_types::SignalEnvelope;
use std::collections::VecDeque;
use std::sync::Arc;

pub struct SendQueue {
    queue: VecDeque<Arc<SignalEnvelope>>,
    cap: usize,
    dropped: u64,
}

impl SendQueue {
    pub fn new(cap: usize) -> Self {
        SendQueue {
            queue: VecDeque::with_capacity(cap.min(64)),
            cap,
            dropped: 0,
        }
    }

    /// Enqueue an envelope, shedding the oldest droppable one on overflow.
    /// Returns `true` if something was shed.
    pub fn push(&mut self, envelope: Arc<SignalEnvelope>) -> bool {
        let mut shed = false;
        if self.queue.len() >= self.cap {
            if let Some(idx) = self.queue.iter().position(|e| !e.kind.is_critical()) {
                self.queue.remove(idx);
                self.dropped += 1;
                shed = true;
            } else if !envelope.kind.is_critical() {
                // Queue is all-critical; the incoming non-critical one loses.
                self.dropped += 1;
                return true;
            }
        }
        self.queue.push_back(envelope);
        shed
    }

    pub fn pop(&mut self) -> Option<Arc<SignalEnvelope>> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
