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

//! Centralized Prometheus metrics for the relay.

use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, IntCounter, IntCounterVec,
    IntGauge,
};

lazy_static! {
    /// Currently connected signaling sessions.
    pub static ref CONNECTIONS_ACTIVE: IntGauge = register_int_gauge!(
        "caselink_connections_active",
        "Number of live signaling connections"
    )
    .expect("Failed to create connections_active metric");

    /// Rooms currently alive (including empty rooms in their grace period).
    pub static ref ROOMS_ACTIVE: IntGauge = register_int_gauge!(
        "caselink_rooms_active",
        "Number of live meeting rooms"
    )
    .expect("Failed to create rooms_active metric");

    /// Envelopes relayed, by envelope type.
    pub static ref ENVELOPES_RELAYED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "caselink_envelopes_relayed_total",
        "Total signaling envelopes relayed",
        &["type"]
    )
    .expect("Failed to create envelopes_relayed_total metric");

    /// Connections closed for protocol violations, by reason.
    pub static ref PROTOCOL_VIOLATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "caselink_protocol_violations_total",
        "Connections closed for protocol violations",
        &["reason"]
    )
    .expect("Failed to create protocol_violations_total metric");

    /// Non-critical envelopes shed under outbound backpressure.
    pub static ref ENVELOPES_DROPPED_TOTAL: IntCounter = register_int_counter!(
        "caselink_envelopes_dropped_total",
        "Non-critical envelopes dropped from full outbound queues"
    )
    .expect("Failed to create envelopes_dropped_total metric");

    /// Notification records created by the presence hub.
    pub static ref NOTIFICATIONS_CREATED_TOTAL: IntCounter = register_int_counter!(
        "caselink_notifications_created_total",
        "Notification records created"
    )
    .expect("Failed to create notifications_created_total metric");
}
