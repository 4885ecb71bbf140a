//! Error taxonomy for remote calls and client-side validation.
//!
//! Controllers never let these escape as panics: every failure is turned into
//! a user-visible message on the controller state, and the `Result` is handed
//! back to the caller as well.

use itinerary::ItineraryError;
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Rejected before any request was sent
    #[error("{0}")]
    Validation(String),

    /// An authenticated call was attempted without a token
    #[error("not signed in")]
    NotSignedIn,

    /// Login refused the credentials
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// The token was rejected; the session has been expired
    #[error("session expired")]
    Unauthorized,

    /// Any other non-success status
    #[error("HTTP error ({status}){}", detail_suffix(.detail))]
    Status {
        status: StatusCode,
        detail: Option<String>,
    },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Decode(String),

    #[error(transparent)]
    Itinerary(#[from] ItineraryError),
}

impl ClientError {
    pub fn validation(message: impl Into<String>) -> Self {
        ClientError::Validation(message.into())
    }

    /// Whether the failure means the user has to sign in again.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized | ClientError::NotSignedIn)
    }

    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Unauthorized | ClientError::InvalidCredentials(_) => {
                Some(StatusCode::UNAUTHORIZED)
            }
            ClientError::Transport(e) => e.status(),
            _ => None,
        }
    }
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default()
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
