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

//! Network quality classification from round-trip-time samples.
//!
//! UI signaling only — quality tiers never alter protocol behavior.

/// Four-tier link quality derived from RTT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkQuality {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl LinkQuality {
    pub fn from_rtt_ms(rtt_ms: f64) -> Self {
        if rtt_ms < 100.0 {
            LinkQuality::Excellent
        } else if rtt_ms < 300.0 {
            LinkQuality::Good
        } else if rtt_ms < 500.0 {
            LinkQuality::Fair
        } else {
            LinkQuality::Poor
        }
    }
}
