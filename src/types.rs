//! Type definitions and aliases

use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// How a single timed request ended
///
/// Every variant still produces a measurement; the class is kept so that
/// failed-request latency can be told apart from successful latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallStatus {
    /// 2xx or 3xx response
    Success,
    /// Response received with any other status code
    ProtocolError,
    /// No usable response (refused, reset, DNS failure, timeout)
    TransportError,
}

impl CallStatus {
    /// Whether the call counts as a successful request
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Short label used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::ProtocolError => "protocol_error",
            Self::TransportError => "transport_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_status() {
        assert!(CallStatus::Success.is_success());
        assert!(!CallStatus::ProtocolError.is_success());
        assert!(!CallStatus::TransportError.is_success());
        assert_eq!(CallStatus::TransportError.as_str(), "transport_error");
    }
}
