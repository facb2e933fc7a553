//! Error types shared by the session and the mailbox facade

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Login URL, code exchange, validity check, refresh, identity
    Auth,
    /// Anything returned by the mailbox operations
    Api,
}

/// Everything that can go wrong talking to Gmail
#[derive(Debug, Error)]
pub enum Error {
    /// The authorization URL could not be built from the given settings
    #[error("{0}")]
    AuthConfig(String),

    /// Authorization code exchange or ID token verification failed
    #[error("{0}")]
    AuthExchange(String),

    /// Refresh grant failed or identity could not be re-verified
    #[error("{0}")]
    AuthRefresh(String),

    #[error("User is not authenticated.")]
    NotAuthenticated,

    #[error("Part {part_id} not found in message {message_id}")]
    PartNotFound { message_id: String, part_id: String },

    /// MIME assembly failed
    #[error("{0}")]
    Compose(String),

    #[error(transparent)]
    Upload(#[from] UploadError),

    /// Error reported by the Gmail or OAuth endpoints, message verbatim
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("{0}")]
    Transport(String),

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::AuthConfig(_)
            | Error::AuthExchange(_)
            | Error::AuthRefresh(_)
            | Error::NotAuthenticated => ErrorKind::Auth,
            _ => ErrorKind::Api,
        }
    }

    /// HTTP status of an API error, if there was one
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Problems with a file offered as an attachment
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("The uploaded file {name} exceeds the maximum allowed size of {limit} bytes.")]
    TooLarge { name: String, limit: u64 },

    #[error("The uploaded file {name} was only partially uploaded.")]
    Partial { name: String },

    #[error("The uploaded file {name} is empty.")]
    Empty { name: String },

    #[error("Failed to read the uploaded file {name}: {reason}")]
    Other { name: String, reason: String },
}
