//! Centralized error types for Skyboard.
//!
//! Every request made against the weather API ends in one of two ways
//! when it fails:
//! - `Application`: the API answered 2xx but flagged an error in the payload;
//!   its `detail` is shown to the user verbatim
//! - `Transport`: the HTTP layer itself failed (status, connectivity,
//!   timeout, undecodable body); a message is synthesized
//!
//! Neither kind is retried automatically.

use thiserror::Error;

/// Top-level error type shared by every Skyboard crate.
#[derive(Debug, Error)]
pub enum AppError {
    /// Well-formed API response carrying an error flag.
    #[error("{0}")]
    Application(String),

    #[error("{0}")]
    Transport(#[from] TransportError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The same action is still running; the request was not sent.
    #[error("A {0} is already in progress")]
    Busy(&'static str),
}

impl AppError {
    /// Build an application error from an API `detail` message.
    pub fn application(detail: impl Into<String>) -> Self {
        AppError::Application(detail.into())
    }

    /// True when the API itself reported the failure.
    pub fn is_application(&self) -> bool {
        matches!(self, AppError::Application(_))
    }

    /// True when the failure happened at the HTTP/network layer.
    pub fn is_transport(&self) -> bool {
        matches!(self, AppError::Transport(_))
    }

    /// Returns a short message suitable for display next to a failed action.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Application(_) => "The weather service rejected the request.",
            AppError::Transport(e) => e.user_message(),
            AppError::Config(e) => e.user_message(),
            AppError::Io(_) => "A file operation failed. Please try again.",
            AppError::Busy(_) => "Please wait for the current action to finish.",
        }
    }
}

/// HTTP/network failures.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error! status: {0}")]
    Status(u16),

    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl TransportError {
    pub fn user_message(&self) -> &'static str {
        match self {
            TransportError::Status(status) if *status >= 500 => {
                "The weather service is experiencing issues. Please try again later."
            }
            TransportError::Status(_) => "The request failed. Please try again.",
            TransportError::Timeout => "The request timed out. Please try again.",
            TransportError::ConnectionFailed(_) => {
                "Unable to reach the weather service. Check your connection."
            }
            TransportError::InvalidResponse(_) => {
                "Received an unexpected response. Please try again."
            }
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),

    #[error("Configuration directory unavailable")]
    NoConfigDir,
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
            ConfigError::NoConfigDir => "No configuration directory is available on this system.",
        }
    }
}

/// Extension trait for converting reqwest errors to our error types.
pub trait ReqwestErrorExt {
    fn into_transport_error(self) -> TransportError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_transport_error(self) -> TransportError {
        if self.is_timeout() {
            TransportError::Timeout
        } else if let Some(status) = self.status() {
            TransportError::Status(status.as_u16())
        } else if self.is_decode() {
            TransportError::InvalidResponse(self.to_string())
        } else {
            TransportError::ConnectionFailed(self.to_string())
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Transport(e.into_transport_error())
    }
}
