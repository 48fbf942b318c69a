//! Error types for the admin API client.
//!
//! # Design
//! The remote server has no stable machine-readable error codes, so every
//! server-signalled failure lands in `Domain` with the server's text
//! verbatim. `NotFound` is never produced by the server: `get`-style lookups
//! synthesize it after filtering a list. `Auth` is reserved for a rejected
//! login so callers can tell "wrong credentials" apart from "not allowed".

use thiserror::Error;

/// Errors returned by `AdminClient` parse methods, transports and facades.
#[derive(Debug, Error)]
pub enum AdminError {
    /// The HTTP round-trip itself failed (connection refused, timeout, ...).
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body is not well-formed XML.
    #[error("malformed XML response: {0}")]
    MalformedXml(String),

    /// The server returned a non-2xx status without an XML error document.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Well-formed XML that lacks an element or attribute the operation needs.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// The server rejected the login.
    #[error("login failed: {0}")]
    Auth(String),

    /// The server reported an operation failure.
    #[error("{0}")]
    Domain(String),

    /// A lookup by name found nothing after filtering.
    #[error("{kind} does not exist: {name}")]
    NotFound { kind: &'static str, name: String },

    /// `Content-Disposition` is present but unusable.
    #[error("invalid attachment: {0}")]
    Attachment(String),

    /// Missing or invalid client configuration.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AdminError {
    /// True for failures of the transport layer itself: the network call or
    /// the XML decoding of its body.
    pub fn is_transport(&self) -> bool {
        matches!(self, AdminError::Transport(_) | AdminError::MalformedXml(_))
    }

    /// The server-supplied message, for errors that carry one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            AdminError::Auth(msg) | AdminError::Domain(msg) => Some(msg),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for AdminError {
    fn from(err: reqwest::Error) -> Self {
        AdminError::Transport(err.to_string())
    }
}

pub type Result<T, E = AdminError> = std::result::Result<T, E>;
