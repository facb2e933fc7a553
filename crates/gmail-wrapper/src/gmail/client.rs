//! Gmail API HTTP client
//!
//! Thin typed wrappers over the `users/me` endpoints. Every call borrows the
//! session's access token and transport; nothing is cached.

use log::debug;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;

use super::Session;
use super::api::{
    AttachmentResponse, Draft, GmailMessage, GmailThread, Label, ListLabelsResponse,
    ListMessagesResponse, MessageSummary, NewLabel,
};
use super::http::{Request, call_json};
use crate::error::{Error, Result};

/// Filters for listing messages
#[derive(Debug, Clone, Default)]
pub struct MessageQuery {
    /// Gmail search syntax, e.g. `from:alice is:unread`
    pub q: Option<String>,
    pub label_ids: Vec<String>,
    pub max_results: Option<u32>,
    pub include_spam_trash: bool,
}

impl MessageQuery {
    /// Largest page size the API accepts
    pub const MAX_PAGE_SIZE: u32 = 500;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn q(mut self, q: impl Into<String>) -> Self {
        self.q = Some(q.into());
        self
    }

    pub fn label(mut self, label_id: impl Into<String>) -> Self {
        self.label_ids.push(label_id.into());
        self
    }

    pub fn max_results(mut self, max_results: u32) -> Self {
        self.max_results = Some(max_results.clamp(1, Self::MAX_PAGE_SIZE));
        self
    }

    pub fn include_spam_trash(mut self, include: bool) -> Self {
        self.include_spam_trash = include;
        self
    }

    fn apply(&self, mut request: Request) -> Request {
        if let Some(q) = &self.q {
            request = request.query("q", q.as_str());
        }
        for label_id in &self.label_ids {
            request = request.query("labelIds", label_id.as_str());
        }
        if let Some(max) = self.max_results {
            request = request.query("maxResults", max.to_string());
        }
        if self.include_spam_trash {
            request = request.query("includeSpamTrash", "true");
        }
        request
    }
}

/// How much of a message `messages.get` returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageFormat {
    #[default]
    Full,
    Metadata,
    Minimal,
    Raw,
}

impl MessageFormat {
    fn as_str(self) -> &'static str {
        match self {
            MessageFormat::Full => "full",
            MessageFormat::Metadata => "metadata",
            MessageFormat::Minimal => "minimal",
            MessageFormat::Raw => "raw",
        }
    }
}

/// Gmail API client bound to one session
#[derive(Clone)]
pub struct GmailClient {
    session: Arc<Session>,
}

impl GmailClient {
    /// Gmail API base URL for the authenticated user
    pub const BASE_URL: &'static str = "https://gmail.googleapis.com/gmail/v1/users/me";

    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn call<T: DeserializeOwned>(&self, request: Request) -> Result<T> {
        let request = self.session.authorize(request)?;
        call_json(self.session.transport(), &request)
    }

    fn url(path: &str) -> String {
        format!("{}/{}", Self::BASE_URL, path)
    }

    fn message_url(id: &str, action: &str) -> String {
        let base = Self::url(&format!("messages/{}", urlencoding::encode(id)));
        if action.is_empty() {
            base
        } else {
            format!("{}/{}", base, action)
        }
    }

    /// List one page of message references
    pub fn list_messages(
        &self,
        query: &MessageQuery,
        page_token: Option<&str>,
    ) -> Result<ListMessagesResponse> {
        let mut request = query.apply(Request::get(Self::url("messages")));
        if let Some(token) = page_token {
            request = request.query("pageToken", token);
        }
        debug!("Listing messages (page token: {:?})", page_token);
        self.call(request)
    }

    /// Get message details by ID
    pub fn get_message(&self, id: &str, format: MessageFormat) -> Result<GmailMessage> {
        debug!("Fetching message {} ({})", id, format.as_str());
        self.call(Request::get(Self::message_url(id, "")).query("format", format.as_str()))
    }

    /// Fetch the payload of an attachment
    pub fn get_attachment(&self, message_id: &str, attachment_id: &str) -> Result<AttachmentResponse> {
        let url = Self::message_url(
            message_id,
            &format!("attachments/{}", urlencoding::encode(attachment_id)),
        );
        debug!("Fetching attachment of message {}", message_id);
        self.call(Request::get(url))
    }

    /// Get a thread with the given headers of each message
    pub fn get_thread(&self, id: &str, metadata_headers: &[&str]) -> Result<GmailThread> {
        let mut request = Request::get(Self::url(&format!("threads/{}", urlencoding::encode(id))))
            .query("format", MessageFormat::Metadata.as_str());
        for header in metadata_headers {
            request = request.query("metadataHeaders", *header);
        }
        debug!("Fetching thread {}", id);
        self.call(request)
    }

    /// Send an already encoded RFC 2822 message
    pub fn send_raw(&self, raw: &str, thread_id: Option<&str>) -> Result<MessageSummary> {
        let request = Request::post(Self::url("messages/send")).json(raw_message(raw, thread_id));
        self.call(request)
    }

    /// Store an already encoded RFC 2822 message as a draft
    pub fn create_draft_raw(&self, raw: &str, thread_id: Option<&str>) -> Result<Draft> {
        let request = Request::post(Self::url("drafts"))
            .json(json!({ "message": raw_message(raw, thread_id) }));
        self.call(request)
    }

    /// Move a message to the trash
    pub fn trash(&self, id: &str) -> Result<MessageSummary> {
        self.call(Request::post(Self::message_url(id, "trash")))
    }

    /// Restore a message from the trash
    pub fn untrash(&self, id: &str) -> Result<MessageSummary> {
        self.call(Request::post(Self::message_url(id, "untrash")))
    }

    /// Add and remove labels on a message. Empty lists are left out of the request.
    pub fn modify_message(
        &self,
        id: &str,
        add_label_ids: &[&str],
        remove_label_ids: &[&str],
    ) -> Result<MessageSummary> {
        let mut body = json!({});
        if !add_label_ids.is_empty() {
            body["addLabelIds"] = json!(add_label_ids);
        }
        if !remove_label_ids.is_empty() {
            body["removeLabelIds"] = json!(remove_label_ids);
        }
        self.call(Request::post(Self::message_url(id, "modify")).json(body))
    }

    // === Labels API ===

    /// List all labels in the user's mailbox
    pub fn list_labels(&self) -> Result<Vec<Label>> {
        let response: ListLabelsResponse = self.call(Request::get(Self::url("labels")))?;
        Ok(response.labels.unwrap_or_default())
    }

    pub fn get_label(&self, id: &str) -> Result<Label> {
        self.call(Request::get(Self::url(&format!(
            "labels/{}",
            urlencoding::encode(id)
        ))))
    }

    pub fn create_label(&self, label: &NewLabel) -> Result<Label> {
        let body = serde_json::to_value(label)
            .map_err(|e| Error::InvalidResponse(e.to_string()))?;
        self.call(Request::post(Self::url("labels")).json(body))
    }
}

fn raw_message(raw: &str, thread_id: Option<&str>) -> serde_json::Value {
    let mut message = json!({ "raw": raw });
    if let Some(thread_id) = thread_id {
        message["threadId"] = json!(thread_id);
    }
    message
}
