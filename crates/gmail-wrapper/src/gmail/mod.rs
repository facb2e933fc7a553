//! Gmail API integration
//!
//! This module provides:
//! - OAuth2 session and token lifecycle
//! - Gmail API client for the mailbox endpoints
//! - Message decomposition and body encoding helpers
//! - The HTTP transport seam

mod auth;
mod client;
pub mod encoding;
pub mod http;
mod normalize;

pub use auth::{AccessType, LoginUrlOptions, Prompt, Session};
pub use client::{GmailClient, MessageFormat, MessageQuery};
pub use normalize::{find_part, header_map, split_message};

/// Gmail API response types
pub mod api {
    use serde::{Deserialize, Serialize};

    /// Response from listing messages
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ListMessagesResponse {
        pub messages: Option<Vec<MessageRef>>,
        pub next_page_token: Option<String>,
        pub result_size_estimate: Option<u32>,
    }

    /// Reference to a message (just ID and thread ID)
    #[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessageRef {
        pub id: String,
        pub thread_id: String,
    }

    /// Minimal message resource returned by send, trash, untrash and modify
    #[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessageSummary {
        pub id: String,
        #[serde(default)]
        pub thread_id: Option<String>,
        #[serde(default)]
        pub label_ids: Vec<String>,
    }

    /// Full message from Gmail API
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct GmailMessage {
        pub id: String,
        pub thread_id: String,
        pub label_ids: Option<Vec<String>>,
        #[serde(default)]
        pub snippet: String,
        pub internal_date: Option<String>,
        pub payload: Option<MessagePart>,
    }

    /// Message part; the top-level payload has the same shape
    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessagePart {
        pub part_id: Option<String>,
        pub mime_type: Option<String>,
        pub filename: Option<String>,
        pub headers: Option<Vec<Header>>,
        pub body: Option<MessageBody>,
        pub parts: Option<Vec<MessagePart>>,
    }

    /// Email header (name-value pair)
    #[derive(Debug, Clone, Deserialize, Serialize)]
    pub struct Header {
        pub name: String,
        pub value: String,
    }

    /// Message body: inline base64url data or a reference to an attachment
    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessageBody {
        pub size: Option<u64>,
        pub data: Option<String>,
        pub attachment_id: Option<String>,
    }

    /// Attachment payload from `messages.attachments.get`
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AttachmentResponse {
        pub size: Option<u64>,
        pub data: Option<String>,
    }

    /// Thread with its messages
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct GmailThread {
        pub id: String,
        pub messages: Option<Vec<GmailMessage>>,
    }

    /// Draft resource
    #[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
    pub struct Draft {
        pub id: String,
        pub message: MessageSummary,
    }

    /// Label resource
    #[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Label {
        pub id: String,
        pub name: String,
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        pub label_type: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub message_list_visibility: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub label_list_visibility: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub messages_total: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub messages_unread: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub threads_total: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub threads_unread: Option<u32>,
    }

    /// Request body for creating a label
    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct NewLabel {
        pub name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub message_list_visibility: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub label_list_visibility: Option<String>,
    }

    impl NewLabel {
        pub fn named(name: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                message_list_visibility: None,
                label_list_visibility: None,
            }
        }
    }

    /// Response from listing labels
    #[derive(Debug, Deserialize)]
    pub struct ListLabelsResponse {
        pub labels: Option<Vec<Label>>,
    }

    /// Response from `users.getProfile`
    #[derive(Debug, Clone, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ProfileResponse {
        pub email_address: String,
        pub messages_total: Option<u64>,
        pub threads_total: Option<u64>,
        pub history_id: Option<String>,
    }
}
