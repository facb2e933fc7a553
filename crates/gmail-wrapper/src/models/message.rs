//! Message views produced by the mailbox facade

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

use crate::gmail::api::MessageRef;
use crate::gmail::encoding::base64url_encode;

/// One page of message references
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    pub messages: Vec<MessageRef>,
    /// Token for the following page; `None` once the listing is exhausted
    pub next_token: Option<String>,
}

/// Decoded message bodies, keyed by MIME type when serialized
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BodyParts {
    #[serde(rename = "text/plain")]
    pub text_plain: Vec<String>,
    #[serde(rename = "text/html")]
    pub text_html: Vec<String>,
}

/// A fetched message split into display-ready pieces
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDetails {
    /// Header name to value; later duplicates overwrite earlier ones
    pub headers: BTreeMap<String, String>,
    pub body: BodyParts,
    /// Part ids of attachments, usable with `Mailbox::get_attachment`
    pub files: Vec<String>,
    pub thread_id: String,
    pub label_ids: Vec<String>,
    pub snippet: String,
}

impl MessageDetails {
    /// Look up a header ignoring case
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Attachment bytes with the metadata of the part that carries them
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentData {
    pub mime_type: String,
    pub filename: String,
    pub headers: BTreeMap<String, String>,
    pub attachment_id: String,
    #[serde(serialize_with = "serialize_base64url")]
    pub data: Vec<u8>,
}

fn serialize_base64url<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&base64url_encode(bytes))
}

/// Identity of the authenticated user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserDetails {
    /// Subject claim of the verified ID token
    pub user_id: String,
    pub email: String,
}
