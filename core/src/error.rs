//! Error types for the Authena client.
//!
//! # Design
//! `NotFound` gets a dedicated variant because callers frequently distinguish
//! "the user does not exist" from "the server returned an unexpected status."
//! All other non-2xx responses land in `Http` with the raw status code and
//! body, which is where the service puts its own error message.
//!
//! `ConfirmationFailed` and `UserNotConfirmed` are raised by the client itself
//! when a successful response still violates what the flow expects.

use thiserror::Error;

/// Errors returned by `AuthenaClient` parse methods and `UserClient` calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The transport failed before a response was received.
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The server returned 404: the requested user does not exist.
    #[error("resource not found")]
    NotFound,

    /// The server returned a non-2xx status other than 404.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The confirm flow finished without an access token.
    #[error(
        "access token was not created, so the user was probably not confirmed; \
         try again or contact the service administrators"
    )]
    ConfirmationFailed,

    /// A token was requested for a user that still has a pending challenge.
    #[error(
        "user is not confirmed; confirm the user before creating tokens \
         (call `UserClient::confirm`)"
    )]
    UserNotConfirmed,

    /// Client configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl ApiError {
    /// Wrap a transport-level failure.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        ApiError::Transport(Box::new(err))
    }
}
