//! Error kinds surfaced by the token manager, the dispatcher and the publish sink.

use thiserror::Error;

use crate::sources::oauth2::GrantType;

/// Token could not be obtained or refreshed.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authorization endpoint unreachable: {0}")]
    Network(String),

    #[error("authorization endpoint rejected the {grant} grant with status {status}")]
    Rejected { grant: GrantType, status: u16 },

    #[error("malformed authorization response: {0}")]
    MalformedResponse(String),
}

/// A domain call or a publish failed after a valid token was attached.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Network(String),

    #[error("'{path}' responded with status {status}")]
    Status { status: u16, path: String },

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("publish failed: {0}")]
    Publish(String),
}

/// Outcome of every domain operation.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Network("request timed out".to_string())
        } else if err.is_connect() {
            TransportError::Network(format!("failed to connect: {}", err))
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AuthError::Network("request timed out".to_string())
        } else {
            AuthError::Network(err.to_string())
        }
    }
}

impl ApiError {
    /// Short label used for failure metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            ApiError::Auth(_) => "auth",
            ApiError::Transport(TransportError::Network(_)) => "network",
            ApiError::Transport(TransportError::Status { .. }) => "status",
            ApiError::Transport(TransportError::MalformedPayload(_)) => "payload",
            ApiError::Transport(TransportError::Publish(_)) => "publish",
        }
    }
}
