//! Mailbox operations facade
//!
//! Each operation performs its Gmail calls through the session and returns an
//! [`Envelope`]: failures are logged and reported in the envelope, never
//! propagated or panicked on.

mod compose;

pub use compose::{AttachmentFile, BodyFormat, MAX_ATTACHMENT_BYTES, OutgoingMessage};

use log::{info, warn};
use std::sync::Arc;

use self::compose::{LoadedAttachment, ReplyHeaders, build_mime, load_attachment};
use crate::error::{Error, Result};
use crate::gmail::api::{Draft, Label, MessagePart, MessageSummary, NewLabel};
use crate::gmail::encoding::{base64url_decode, base64url_encode};
use crate::gmail::{GmailClient, MessageFormat, MessageQuery, Session, find_part, header_map, split_message};
use crate::models::{AttachmentData, Envelope, MessageDetails, MessagePage};

/// Mailbox of the session's authenticated user
pub struct Mailbox {
    client: GmailClient,
}

impl Mailbox {
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            client: GmailClient::new(session),
        }
    }

    /// The underlying API client, for calls the facade does not wrap
    pub fn client(&self) -> &GmailClient {
        &self.client
    }

    /// One page of messages. Pass the returned `next_token` back in to get
    /// the following page; it is `None` once the listing is exhausted.
    pub fn list_messages(&self, query: &MessageQuery, page_token: Option<&str>) -> Envelope<MessagePage> {
        let result = self.client.list_messages(query, page_token).map(|page| MessagePage {
            messages: page.messages.unwrap_or_default(),
            next_token: page.next_page_token.filter(|t| !t.is_empty()),
        });
        envelope("list messages", result)
    }

    /// Headers, decoded bodies and attachment part ids of a message
    pub fn get_message(&self, message_id: &str) -> Envelope<MessageDetails> {
        let result = self
            .client
            .get_message(message_id, MessageFormat::Full)
            .map(split_message);
        envelope("get message", result)
    }

    /// Decoded bytes and metadata of the attachment in part `part_id`
    pub fn get_attachment(&self, message_id: &str, part_id: &str) -> Envelope<AttachmentData> {
        envelope("get attachment", self.fetch_attachment(message_id, part_id))
    }

    fn fetch_attachment(&self, message_id: &str, part_id: &str) -> Result<AttachmentData> {
        let message = self.client.get_message(message_id, MessageFormat::Full)?;
        let payload = message.payload.unwrap_or_default();
        let part = find_part(&payload, part_id).ok_or_else(|| Error::PartNotFound {
            message_id: message_id.to_string(),
            part_id: part_id.to_string(),
        })?;

        let (attachment_id, encoded) = self.attachment_payload(message_id, part)?;
        Ok(AttachmentData {
            mime_type: part.mime_type.clone().unwrap_or_default(),
            filename: part.filename.clone().unwrap_or_default(),
            headers: header_map(part.headers.as_deref().unwrap_or_default()),
            attachment_id,
            data: base64url_decode(&encoded)?,
        })
    }

    /// Attachment id and encoded bytes; small parts carry their data inline
    fn attachment_payload(&self, message_id: &str, part: &MessagePart) -> Result<(String, String)> {
        let body = part.body.as_ref();
        if let Some(attachment_id) = body.and_then(|b| b.attachment_id.as_ref()) {
            let attachment = self.client.get_attachment(message_id, attachment_id)?;
            return Ok((attachment_id.clone(), attachment.data.unwrap_or_default()));
        }
        match body.and_then(|b| b.data.clone()) {
            Some(data) => Ok((String::new(), data)),
            None => Err(Error::InvalidResponse(format!(
                "Part {} of message {} has no attachment data",
                part.part_id.as_deref().unwrap_or_default(),
                message_id
            ))),
        }
    }

    /// Send a message, as a reply if it names a thread
    pub fn send(&self, message: &OutgoingMessage) -> Envelope<MessageSummary> {
        let result = self.compose_raw(message).and_then(|raw| {
            let sent = self.client.send_raw(&raw, message.thread_id.as_deref())?;
            info!("Sent message {}", sent.id);
            Ok(sent)
        });
        envelope("send", result)
    }

    /// Save a message as a draft
    pub fn create_draft(&self, message: &OutgoingMessage) -> Envelope<Draft> {
        let result = self.compose_raw(message).and_then(|raw| {
            let draft = self.client.create_draft_raw(&raw, message.thread_id.as_deref())?;
            info!("Created draft {}", draft.id);
            Ok(draft)
        });
        envelope("create draft", result)
    }

    /// Build the base64url encoded MIME message.
    ///
    /// Attachments are read first so a bad file fails before any API call.
    fn compose_raw(&self, message: &OutgoingMessage) -> Result<String> {
        let attachments = message
            .attachments
            .iter()
            .map(load_attachment)
            .collect::<std::result::Result<Vec<LoadedAttachment>, _>>()?;

        let reply = match &message.thread_id {
            Some(thread_id) => self.reply_headers(thread_id)?,
            None => ReplyHeaders::default(),
        };

        let user = self.client.session().current_user()?;
        let mime = build_mime(&user.email, message, &reply, attachments)?;
        Ok(base64url_encode(mime))
    }

    /// Subject and Message-Id of the first message in a thread
    fn reply_headers(&self, thread_id: &str) -> Result<ReplyHeaders> {
        let thread = self.client.get_thread(thread_id, &["Subject", "Message-Id"])?;
        let Some(first) = thread.messages.unwrap_or_default().into_iter().next() else {
            return Ok(ReplyHeaders::default());
        };

        let headers = first
            .payload
            .and_then(|p| p.headers)
            .unwrap_or_default();
        let lookup = |name: &str| {
            headers
                .iter()
                .rev()
                .find(|h| h.name.eq_ignore_ascii_case(name))
                .map(|h| h.value.clone())
        };

        Ok(ReplyHeaders {
            subject: lookup("Subject"),
            message_id: lookup("Message-Id"),
        })
    }

    /// Move a message to the trash
    pub fn trash(&self, message_id: &str) -> Envelope<MessageSummary> {
        envelope("trash", self.client.trash(message_id))
    }

    /// Restore a message from the trash
    pub fn untrash(&self, message_id: &str) -> Envelope<MessageSummary> {
        envelope("untrash", self.client.untrash(message_id))
    }

    pub fn get_labels(&self) -> Envelope<Vec<Label>> {
        envelope("list labels", self.client.list_labels())
    }

    pub fn get_label(&self, label_id: &str) -> Envelope<Label> {
        envelope("get label", self.client.get_label(label_id))
    }

    pub fn create_label(&self, name: &str) -> Envelope<Label> {
        envelope("create label", self.client.create_label(&NewLabel::named(name)))
    }

    /// Add and remove labels on a message; empty lists are not sent
    pub fn modify_labels(
        &self,
        message_id: &str,
        add_label_ids: &[&str],
        remove_label_ids: &[&str],
    ) -> Envelope<MessageSummary> {
        envelope(
            "modify labels",
            self.client
                .modify_message(message_id, add_label_ids, remove_label_ids),
        )
    }
}

fn envelope<T>(operation: &str, result: Result<T>) -> Envelope<T> {
    if let Err(e) = &result {
        warn!("Failed to {}: {}", operation, e);
    }
    result.into()
}
