//! Gmail wrapper - session and mailbox operations over the Gmail REST API
//!
//! This crate provides:
//! - OAuth2 login, token validation and refresh ([`Session`])
//! - Mailbox operations returning a uniform result envelope ([`Mailbox`])
//! - Message decomposition, attachment retrieval and MIME composition
//! - Credential loading from file or environment ([`GmailCredentials`])
//!
//! HTTP is synchronous and goes through the [`HttpTransport`] trait, so the
//! crate works from any executor (or none).

pub mod config;
pub mod error;
pub mod gmail;
pub mod mailbox;
pub mod models;

pub use config::GmailCredentials;
pub use error::{Error, ErrorKind, Result, UploadError};
pub use gmail::api::{Draft, Label, MessageRef, MessageSummary};
pub use gmail::http::{HttpTransport, UreqTransport};
pub use gmail::{AccessType, GmailClient, LoginUrlOptions, MessageFormat, MessageQuery, Prompt, Session};
pub use mailbox::{AttachmentFile, BodyFormat, Mailbox, OutgoingMessage};
pub use models::{
    AttachmentData, BodyParts, Envelope, MessageDetails, MessagePage, TokenSet, UserDetails,
};
