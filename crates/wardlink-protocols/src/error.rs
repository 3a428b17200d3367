//! Channel errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Invalid gateway endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Frame decode failed: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Channel disconnected")]
    Disconnected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_failed_error() {
        let err = ChannelError::ConnectionFailed("timeout".to_string());
        let display = err.to_string();
        assert!(display.contains("Connection failed"));
        assert!(display.contains("timeout"));
    }

    #[test]
    fn test_send_failed_error() {
        let err = ChannelError::SendFailed("queue full".to_string());
        let display = err.to_string();
        assert!(display.contains("Send failed"));
        assert!(display.contains("queue full"));
    }

    #[test]
    fn test_invalid_endpoint_error() {
        let err = ChannelError::InvalidEndpoint("not-a-url".to_string());
        let display = err.to_string();
        assert!(display.contains("Invalid gateway endpoint"));
        assert!(display.contains("not-a-url"));
    }

    #[test]
    fn test_decode_error_from_serde() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{oops");
        let err: ChannelError = parse.unwrap_err().into();
        assert!(err.to_string().contains("Frame decode failed"));
    }

    #[test]
    fn test_disconnected_error() {
        let err = ChannelError::Disconnected;
        assert_eq!(err.to_string(), "Channel disconnected");
    }

    #[test]
    fn test_error_debug() {
        let err = ChannelError::Disconnected;
        let debug = format!("{:?}", err);
        assert!(debug.contains("Disconnected"));
    }
}
