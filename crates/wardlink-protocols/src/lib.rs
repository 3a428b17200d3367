//! # Wardlink Protocols
//!
//! Shared protocol definitions for the Wardlink realtime notification
//! channel:
//!
//! - The inbound event frame wire model (`EventFrame`, `EventKind`,
//!   appointment payloads) pushed by the notification gateway.
//! - The channel error taxonomy (`ChannelError`).
//!
//! The transport and subscription machinery lives in `wardlink-notify`;
//! this crate is dependency-light so server-side producers can share the
//! same frame types.

pub mod error;
pub mod event;

pub use error::ChannelError;
pub use event::{AppointmentSnapshot, EventFrame, EventKind, EventPayload};

/// Clinician (doctor) identifier scoping which events a connection receives.
pub type ClinicianId = String;
