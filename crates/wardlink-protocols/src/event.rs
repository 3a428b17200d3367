//! Appointment event frame definitions.
//!
//! The notification gateway pushes JSON text frames of the shape
//! `{"type": "...", "payload": {...}}` where `type` tags one of the
//! appointment lifecycle events and `payload` carries the appointment
//! snapshot plus a human-readable message.
//!
//! Frames are ephemeral: decoded on receipt, handed to registered
//! listeners synchronously, then discarded. A frame that fails to decode
//! is dropped by the channel, never dispatched.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ChannelError;

/// Event kinds pushed by the notification gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// An appointment was created.
    NewAppointment,
    /// An appointment was rescheduled or otherwise modified.
    UpdateAppointment,
    /// An appointment was cancelled.
    CancelAppointment,
}

impl EventKind {
    /// Every kind, in wire-tag order.
    pub const ALL: [EventKind; 3] = [
        EventKind::NewAppointment,
        EventKind::UpdateAppointment,
        EventKind::CancelAppointment,
    ];
}

/// One decoded inbound push message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventFrame {
    /// Which lifecycle event this frame announces.
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// The event payload.
    pub payload: EventPayload,
}

impl EventFrame {
    /// Decode a frame from gateway JSON text.
    pub fn decode(text: &str) -> Result<Self, ChannelError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Encode a frame back to gateway JSON text.
    pub fn encode(&self) -> Result<String, ChannelError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Payload carried by every appointment event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventPayload {
    /// Snapshot of the appointment the event refers to.
    pub appointment: AppointmentSnapshot,
    /// Human-readable notification text, rendered verbatim by consumers.
    pub message: String,
    /// Related order, present when the event originated from an order flow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<Value>,
}

/// Appointment snapshot as the gateway serializes it.
///
/// Only the code is required; the remaining fields depend on which admin
/// flow produced the event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentSnapshot {
    /// Stable appointment code (e.g. "A1").
    pub appointment_code: String,
    /// Database id, when the gateway includes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appointment_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_slot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
