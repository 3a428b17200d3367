//! # Wardlink Notify
//!
//! Realtime appointment notification channel for the Wardlink admin
//! console.
//!
//! The channel:
//! - Maintains exactly one WebSocket link to the notification gateway,
//!   scoped to a single clinician (`doctor_id`)
//! - Recovers from transport loss with a bounded fixed-delay retry
//! - Decodes inbound frames and fans them out to a typed listener registry
//! - Hands consumers a `Subscription` binding that swaps handler closures
//!   without re-registering and tears down exactly what it registered
//!
//! ## Usage
//!
//! ```ignore
//! use wardlink_notify::{AppointmentHandlers, ChannelConfig, NotifyChannel};
//!
//! let channel = NotifyChannel::new(ChannelConfig::default());
//! channel.connect("dr-17");
//!
//! let sub = channel.subscribe(
//!     AppointmentHandlers::new()
//!         .on_new(|frame| println!("{}", frame.payload.message)),
//! );
//!
//! // Dropping `sub` removes exactly its listeners; disconnect tears the
//! // link down and clears the registry.
//! drop(sub);
//! channel.disconnect();
//! ```

mod channel;
mod registry;
mod subscription;
mod transport;

#[cfg(test)]
pub(crate) mod test_support;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

pub use channel::{ChannelState, NotifyChannel};
pub use registry::ListenerId;
pub use subscription::{AppointmentHandlers, EventHandler, Subscription};
pub use transport::{Connector, TransportEvent, TransportHandle, WsConnector};

// Re-export the wire model so consumers depend on one crate.
pub use wardlink_protocols::{
    AppointmentSnapshot, ChannelError, ClinicianId, EventFrame, EventKind, EventPayload,
};

/// Notification channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Gateway base URL (default: "ws://127.0.0.1:8080/notifications").
    /// The clinician id is appended as a `doctor_id` query parameter.
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,
    /// Automatic reconnection policy.
    #[serde(default)]
    pub reconnect: ReconnectPolicy,
}

fn default_gateway_url() -> String {
    "ws://127.0.0.1:8080/notifications".to_string()
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            gateway_url: default_gateway_url(),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl ChannelConfig {
    /// Build the transport endpoint for a clinician.
    ///
    /// Reconnection reuses the same endpoint, so the clinician id survives
    /// transport loss.
    pub fn endpoint(&self, clinician: &str) -> Result<Url, ChannelError> {
        let mut url = Url::parse(&self.gateway_url)
            .map_err(|e| ChannelError::InvalidEndpoint(format!("{}: {}", self.gateway_url, e)))?;
        url.query_pairs_mut().append_pair("doctor_id", clinician);
        Ok(url)
    }
}

/// Bounded-retry, fixed-delay reconnection policy.
///
/// The delay is uniform, not exponential, and applies regardless of why
/// the transport was lost.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectPolicy {
    /// Retries attempted after a transport loss before giving up (default: 5).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before each retry, in milliseconds (default: 3000).
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_retry_delay_ms() -> u64 {
    3000
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl ReconnectPolicy {
    /// The retry delay as a `Duration`.
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_config_default() {
        let config = ChannelConfig::default();
        assert_eq!(config.gateway_url, "ws://127.0.0.1:8080/notifications");
        assert_eq!(config.reconnect.max_attempts, 5);
        assert_eq!(config.reconnect.retry_delay_ms, 3000);
    }

    #[test]
    fn test_channel_config_deserialization_defaults() {
        let config: ChannelConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.gateway_url, default_gateway_url());
        assert_eq!(config.reconnect.max_attempts, 5);
    }

    #[test]
    fn test_channel_config_deserialization() {
        let json = r#"{
            "gateway_url": "wss://notify.clinic.example/push",
            "reconnect": { "max_attempts": 2, "retry_delay_ms": 500 }
        }"#;
        let config: ChannelConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.gateway_url, "wss://notify.clinic.example/push");
        assert_eq!(config.reconnect.max_attempts, 2);
        assert_eq!(config.reconnect.delay(), Duration::from_millis(500));
    }

    #[test]
    fn test_endpoint_appends_doctor_id() {
        let config = ChannelConfig::default();
        let url = config.endpoint("dr-17").unwrap();
        assert_eq!(url.as_str(), "ws://127.0.0.1:8080/notifications?doctor_id=dr-17");
    }

    #[test]
    fn test_endpoint_preserves_existing_query() {
        let config = ChannelConfig {
            gateway_url: "ws://gateway.local/push?version=2".to_string(),
            reconnect: ReconnectPolicy::default(),
        };
        let url = config.endpoint("dr-3").unwrap();
        assert_eq!(url.as_str(), "ws://gateway.local/push?version=2&doctor_id=dr-3");
    }

    #[test]
    fn test_endpoint_rejects_invalid_url() {
        let config = ChannelConfig {
            gateway_url: "not a url".to_string(),
            reconnect: ReconnectPolicy::default(),
        };
        assert!(config.endpoint("dr-1").is_err());
    }

    #[test]
    fn test_reconnect_policy_delay() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay(), Duration::from_millis(3000));
    }
}
