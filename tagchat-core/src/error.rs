//! Error types shared by the core and the browser backend.
//!
//! Errors that cached accessors hand to several awaiters at once are `Clone`
//! and carry their cause as text.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid URL for {field}: {reason}")]
    InvalidUrl { field: &'static str, reason: String },

    #[error("Missing required configuration: {field}")]
    Missing { field: &'static str },

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MediaError {
    /// The user or the platform refused capture.
    #[error("Media permission denied: {0}")]
    PermissionDenied(String),

    /// No capture API or no device.
    #[error("Media unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MatchmakingError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for MatchmakingError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PeerError {
    /// The broker has not opened the session yet.
    #[error("Not registered with the signaling broker")]
    NotRegistered,

    #[error("Link closed")]
    Closed,

    #[error("Signaling error: {0}")]
    Signaling(String),

    #[error("Peer connection error: {0}")]
    Rtc(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Malformed message ({reason}): {text}")]
    Malformed { reason: String, text: String },

    #[error("Failed to encode message: {0}")]
    Encode(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// Connect was requested before the broker assigned an identity.
    #[error("Own identity is not known yet")]
    NoIdentity,

    #[error(transparent)]
    Matchmaking(#[from] MatchmakingError),

    #[error(transparent)]
    Peer(#[from] PeerError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
