//! Values handed back to callers

mod envelope;
mod message;
mod token;

pub use envelope::Envelope;
pub use message::{AttachmentData, BodyParts, MessageDetails, MessagePage, UserDetails};
pub use token::{EXPIRY_SKEW_SECS, TokenSet};
