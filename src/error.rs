//! Custom error types for the control panel client.
//!
//! `CaptureError` is the single error type surfaced by the library. It keeps the
//! three failure classes the capture workflow distinguishes apart, so callers can
//! tell "we lost contact with the server" from "the server said no" from "the
//! operator typed something invalid":
//!
//! - **`Transport`**: the request never produced a usable response (connection
//!   refused, timeout, undecodable body).
//! - **`ServerRejection`**: a response arrived, but it reports failure.
//! - **`InvalidParameter`**: local validation rejected an input before any
//!   request was sent.
//!
//! The remaining variants cover session ownership, addressing and configuration.

use thiserror::Error;

use crate::connection::AddressError;

/// Convenience alias for results using the library error type.
pub type Result<T> = std::result::Result<T, CaptureError>;

/// Errors that can occur while talking to the capture server.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// No usable response (connection, timeout, decoding).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server answered with a failure status.
    #[error("Server rejected request: {0}")]
    ServerRejection(String),

    /// Local validation failed.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A capture session is already starting, running or stopping.
    #[error("A capture is already in progress ({0})")]
    SessionBusy(&'static str),

    /// Server address could not be normalized.
    #[error("Invalid server address: {0}")]
    Address(#[from] AddressError),

    /// Configuration failed to load or validate.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CaptureError {
    /// Returns true for failures where no response was received.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Short category label used in diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::ServerRejection(_) => "rejected",
            Self::InvalidParameter(_) => "invalid-parameter",
            Self::SessionBusy(_) => "busy",
            Self::Address(_) => "address",
            Self::Config(_) => "config",
        }
    }
}

impl From<reqwest::Error> for CaptureError {
    fn from(err: reqwest::Error) -> Self {
        // reqwest's Display drops the underlying cause (e.g. "connection refused")
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Self::Transport(message)
    }
}

impl From<figment::Error> for CaptureError {
    fn from(err: figment::Error) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_are_flagged() {
        assert!(CaptureError::Transport("connection refused".into()).is_transport());
        assert!(!CaptureError::ServerRejection("camera busy".into()).is_transport());
        assert!(!CaptureError::InvalidParameter("count".into()).is_transport());
    }

    #[test]
    fn display_includes_detail() {
        let err = CaptureError::ServerRejection("camera busy".into());
        assert_eq!(err.to_string(), "Server rejected request: camera busy");

        let err = CaptureError::SessionBusy("Capturing");
        assert!(err.to_string().contains("Capturing"));
    }

    #[test]
    fn address_errors_convert() {
        let err: CaptureError = AddressError::EmptyInput.into();
        assert_eq!(err.kind(), "address");
        assert!(err.to_string().contains("Address cannot be empty"));
    }
}
