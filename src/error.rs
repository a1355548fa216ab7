//! Error types for the easel-daemon.
//!
//! Defines all error codes and types used throughout the daemon for
//! consistent error handling and reporting.

use std::fmt;

/// Error codes identifying each failure class the daemon can hit.
///
/// Only the startup codes are fatal; everything else is logged at the
/// current verbosity and the affected cycle is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// The OSC control socket could not be bound at startup.
    OscBindFailed,

    /// The effective configuration failed validation at startup.
    InvalidConfig,

    /// The pipeline failed to prepare conditioning for a prompt.
    ConditioningFailed,

    /// The pipeline failed while generating a frame.
    GenerationFailed,

    /// The texture transport failed while polling for an input frame.
    TransportReceiveFailed,

    /// The texture transport failed while delivering an output frame.
    TransportSendFailed,

    /// The texture transport could not re-establish its connections.
    ReconnectFailed,
}

impl ErrorCode {
    /// Returns the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::OscBindFailed => "OSC_BIND_FAILED",
            ErrorCode::InvalidConfig => "INVALID_CONFIG",
            ErrorCode::ConditioningFailed => "CONDITIONING_FAILED",
            ErrorCode::GenerationFailed => "GENERATION_FAILED",
            ErrorCode::TransportReceiveFailed => "TRANSPORT_RECEIVE_FAILED",
            ErrorCode::TransportSendFailed => "TRANSPORT_SEND_FAILED",
            ErrorCode::ReconnectFailed => "RECONNECT_FAILED",
        }
    }

    /// Returns a human-readable description of the error.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::OscBindFailed => "Could not bind the OSC control socket",
            ErrorCode::InvalidConfig => "Configuration failed validation",
            ErrorCode::ConditioningFailed => "Prompt conditioning preparation failed",
            ErrorCode::GenerationFailed => "Pipeline generation failed",
            ErrorCode::TransportReceiveFailed => "Receiving an input frame failed",
            ErrorCode::TransportSendFailed => "Delivering an output frame failed",
            ErrorCode::ReconnectFailed => "Texture connections could not be re-established",
        }
    }

    /// True if this code should terminate the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ErrorCode::OscBindFailed | ErrorCode::InvalidConfig)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for daemon operations.
#[derive(Debug)]
pub struct DaemonError {
    /// The error code identifying the type of error.
    pub code: ErrorCode,
    /// Human-readable error message with context.
    pub message: String,
    /// Optional underlying cause of the error.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl DaemonError {
    /// Creates a new DaemonError with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new DaemonError with an underlying cause.
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates an OSC_BIND_FAILED error.
    pub fn osc_bind_failed(addr: impl Into<String>, source: std::io::Error) -> Self {
        Self::with_source(
            ErrorCode::OscBindFailed,
            format!("Could not bind OSC socket on {}", addr.into()),
            source,
        )
    }

    /// Creates an INVALID_CONFIG error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InvalidConfig,
            format!("Invalid configuration: {}", reason.into()),
        )
    }

    /// Creates a CONDITIONING_FAILED error.
    pub fn conditioning_failed(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ConditioningFailed,
            format!("Conditioning preparation failed: {}", reason.into()),
        )
    }

    /// Creates a GENERATION_FAILED error.
    pub fn generation_failed(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::GenerationFailed,
            format!("Generation failed: {}", reason.into()),
        )
    }

    /// Creates a TRANSPORT_RECEIVE_FAILED error.
    pub fn transport_receive(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::TransportReceiveFailed,
            format!("Frame receive failed: {}", reason.into()),
        )
    }

    /// Creates a TRANSPORT_SEND_FAILED error.
    pub fn transport_send(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::TransportSendFailed,
            format!("Frame send failed: {}", reason.into()),
        )
    }

    /// Creates a RECONNECT_FAILED error.
    pub fn reconnect_failed(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ReconnectFailed,
            format!("Reconnect failed: {}", reason.into()),
        )
    }
}

impl fmt::Display for DaemonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for DaemonError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Result type alias using DaemonError.
pub type Result<T> = std::result::Result<T, DaemonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_as_str() {
        assert_eq!(ErrorCode::OscBindFailed.as_str(), "OSC_BIND_FAILED");
        assert_eq!(ErrorCode::InvalidConfig.as_str(), "INVALID_CONFIG");
        assert_eq!(ErrorCode::ConditioningFailed.as_str(), "CONDITIONING_FAILED");
        assert_eq!(ErrorCode::GenerationFailed.as_str(), "GENERATION_FAILED");
        assert_eq!(
            ErrorCode::TransportReceiveFailed.as_str(),
            "TRANSPORT_RECEIVE_FAILED"
        );
        assert_eq!(ErrorCode::TransportSendFailed.as_str(), "TRANSPORT_SEND_FAILED");
        assert_eq!(ErrorCode::ReconnectFailed.as_str(), "RECONNECT_FAILED");
    }

    #[test]
    fn error_code_descriptions_not_empty() {
        let codes = [
            ErrorCode::OscBindFailed,
            ErrorCode::InvalidConfig,
            ErrorCode::ConditioningFailed,
            ErrorCode::GenerationFailed,
            ErrorCode::TransportReceiveFailed,
            ErrorCode::TransportSendFailed,
            ErrorCode::ReconnectFailed,
        ];
        for code in codes {
            assert!(!code.description().is_empty());
        }
    }

    #[test]
    fn only_startup_codes_are_fatal() {
        assert!(ErrorCode::OscBindFailed.is_fatal());
        assert!(ErrorCode::InvalidConfig.is_fatal());
        assert!(!ErrorCode::ConditioningFailed.is_fatal());
        assert!(!ErrorCode::GenerationFailed.is_fatal());
        assert!(!ErrorCode::TransportReceiveFailed.is_fatal());
        assert!(!ErrorCode::TransportSendFailed.is_fatal());
        assert!(!ErrorCode::ReconnectFailed.is_fatal());
    }

    #[test]
    fn daemon_error_display() {
        let err = DaemonError::generation_failed("tensor shape mismatch");
        assert!(err.to_string().contains("GENERATION_FAILED"));
        assert!(err.to_string().contains("tensor shape mismatch"));
    }

    #[test]
    fn daemon_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use");
        let err = DaemonError::osc_bind_failed("127.0.0.1:7000", io);
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("127.0.0.1:7000"));
    }
}
