//! Outgoing message assembly
//!
//! MIME encoding is done by lettre's message builder; this module only
//! gathers the pieces and checks attachment files before anything is sent.

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, Mailboxes, MultiPart, SinglePart};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result, UploadError};

/// Largest attachment accepted, matching Gmail's message size limit
pub const MAX_ATTACHMENT_BYTES: u64 = 25 * 1024 * 1024;

/// Body content type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyFormat {
    #[default]
    Html,
    Plain,
}

/// A file to attach: display name plus where its bytes currently live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentFile {
    pub name: String,
    pub path: PathBuf,
}

impl AttachmentFile {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// Message to send or save as a draft
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// One address or a comma-separated list
    pub to: String,
    /// Replaced by the thread's subject when `thread_id` is set
    pub subject: String,
    pub body: String,
    pub format: BodyFormat,
    pub attachments: Vec<AttachmentFile>,
    pub thread_id: Option<String>,
}

impl OutgoingMessage {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
            format: BodyFormat::default(),
            attachments: Vec::new(),
            thread_id: None,
        }
    }

    pub fn plain_text(mut self) -> Self {
        self.format = BodyFormat::Plain;
        self
    }

    pub fn attach(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.attachments.push(AttachmentFile::new(name, path));
        self
    }

    /// Send as a reply within an existing thread
    pub fn in_thread(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }
}

/// Attachment bytes ready for assembly
#[derive(Debug)]
pub(crate) struct LoadedAttachment {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Read an attachment file, rejecting empty and oversized files
pub(crate) fn load_attachment(file: &AttachmentFile) -> std::result::Result<LoadedAttachment, UploadError> {
    let other = |e: std::io::Error| UploadError::Other {
        name: file.name.clone(),
        reason: e.to_string(),
    };

    let size = std::fs::metadata(&file.path).map_err(other)?.len();
    if size == 0 {
        return Err(UploadError::Empty {
            name: file.name.clone(),
        });
    }
    if size > MAX_ATTACHMENT_BYTES {
        return Err(UploadError::TooLarge {
            name: file.name.clone(),
            limit: MAX_ATTACHMENT_BYTES,
        });
    }

    let bytes = std::fs::read(&file.path).map_err(other)?;
    Ok(LoadedAttachment {
        name: file.name.clone(),
        bytes,
    })
}

/// Headers that differ from the caller's message when replying in a thread
#[derive(Debug, Default)]
pub(crate) struct ReplyHeaders {
    pub subject: Option<String>,
    pub message_id: Option<String>,
}

/// Assemble the RFC 2822 message
pub(crate) fn build_mime(
    from: &str,
    message: &OutgoingMessage,
    reply: &ReplyHeaders,
    attachments: Vec<LoadedAttachment>,
) -> Result<Vec<u8>> {
    let sender: Mailbox = from
        .parse()
        .map_err(|e| Error::Compose(format!("Invalid sender address '{}': {}", from, e)))?;
    let recipients: Mailboxes = message
        .to
        .parse()
        .map_err(|e| Error::Compose(format!("Invalid recipient '{}': {}", message.to, e)))?;
    if recipients.iter().next().is_none() {
        return Err(Error::Compose("At least one recipient is required.".to_string()));
    }

    let subject = reply.subject.as_deref().unwrap_or(&message.subject);
    let mut builder = lettre::Message::builder().from(sender).subject(subject);
    for recipient in recipients {
        builder = builder.to(recipient);
    }
    if let Some(reference) = &reply.message_id {
        builder = builder
            .in_reply_to(reference.clone())
            .references(reference.clone());
    }

    let body = match message.format {
        BodyFormat::Html => SinglePart::html(message.body.clone()),
        BodyFormat::Plain => SinglePart::plain(message.body.clone()),
    };

    let email = if attachments.is_empty() {
        builder.singlepart(body)
    } else {
        let mut mixed = MultiPart::mixed().singlepart(body);
        for attachment in attachments {
            let content_type = guess_content_type(Path::new(&attachment.name));
            mixed = mixed.singlepart(Attachment::new(attachment.name).body(attachment.bytes, content_type));
        }
        builder.multipart(mixed)
    }
    .map_err(|e| Error::Compose(format!("Failed to build message: {}", e)))?;

    Ok(email.formatted())
}

fn guess_content_type(path: &Path) -> ContentType {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let mime = match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "zip" => "application/zip",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        "ics" => "text/calendar",
        _ => "application/octet-stream",
    };

    ContentType::parse(mime).unwrap_or(ContentType::TEXT_PLAIN)
}
