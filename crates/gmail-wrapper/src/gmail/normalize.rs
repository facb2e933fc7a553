//! Gmail API response normalization
//!
//! Splits a full `messages.get` response into headers, display-ready bodies
//! and attachment part ids.

use log::{debug, warn};
use std::collections::BTreeMap;

use super::api::{GmailMessage, Header, MessagePart};
use super::encoding::{base64url_decode, nl2br};
use crate::models::MessageDetails;

/// Collapse headers into a map; a repeated name keeps its last value
pub fn header_map(headers: &[Header]) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|h| (h.name.clone(), h.value.clone()))
        .collect()
}

/// Split a full message into headers, bodies and attachment part ids
pub fn split_message(message: GmailMessage) -> MessageDetails {
    let mut details = MessageDetails {
        thread_id: message.thread_id,
        label_ids: message.label_ids.unwrap_or_default(),
        snippet: message.snippet,
        ..MessageDetails::default()
    };

    let Some(payload) = message.payload else {
        return details;
    };

    details.headers = header_map(payload.headers.as_deref().unwrap_or_default());

    // Single-part messages carry their only body on the payload itself
    if let Some(data) = payload.body.as_ref().and_then(|b| b.data.as_deref())
        && let Some(text) = decode_text(data, charset(&payload).as_deref(), &message.id)
    {
        details.body.text_plain.push(text);
    }

    if let Some(parts) = &payload.parts {
        collect_parts(parts, &message.id, &mut details);
    }

    details
}

fn collect_parts(parts: &[MessagePart], message_id: &str, details: &mut MessageDetails) {
    for part in parts {
        if is_attachment(part) {
            push_file(part, details);
            continue;
        }

        if let Some(nested) = part.parts.as_deref().filter(|p| !p.is_empty()) {
            collect_parts(nested, message_id, details);
            continue;
        }

        let mime_type = part
            .mime_type
            .as_deref()
            .unwrap_or_default()
            .to_ascii_lowercase();
        let target = match mime_type.as_str() {
            "text/plain" => &mut details.body.text_plain,
            "text/html" => &mut details.body.text_html,
            _ => {
                push_file(part, details);
                continue;
            }
        };

        // Empty text parts have nothing to show or download
        let Some(data) = part
            .body
            .as_ref()
            .and_then(|b| b.data.as_deref())
            .filter(|d| !d.is_empty())
        else {
            continue;
        };
        if let Some(text) = decode_text(data, charset(part).as_deref(), message_id) {
            target.push(text);
        }
    }
}

fn is_attachment(part: &MessagePart) -> bool {
    part.filename.as_deref().is_some_and(|f| !f.is_empty())
        || part
            .body
            .as_ref()
            .is_some_and(|b| b.attachment_id.is_some())
}

fn push_file(part: &MessagePart, details: &mut MessageDetails) {
    if let Some(part_id) = &part.part_id {
        details.files.push(part_id.clone());
    }
}

/// `charset` parameter of a part's Content-Type header, lowercased
fn charset(part: &MessagePart) -> Option<String> {
    let content_type = part
        .headers
        .as_deref()?
        .iter()
        .rev()
        .find(|h| h.name.eq_ignore_ascii_case("Content-Type"))?;
    content_type.value.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"').to_ascii_lowercase())
    })
}

/// Decode a body for display.
///
/// Bodies that fail base64url decoding are skipped. Bytes that are not
/// UTF-8 are read as Latin-1 when the part declares it, and lossily
/// otherwise, so a body in another charset still yields an entry.
fn decode_text(data: &str, charset: Option<&str>, message_id: &str) -> Option<String> {
    let bytes = match base64url_decode(data) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Skipping body part of message {}: {}", message_id, e);
            return None;
        }
    };

    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            let bytes = e.into_bytes();
            match charset {
                Some("iso-8859-1" | "iso_8859-1" | "latin1") => {
                    bytes.iter().map(|&b| char::from(b)).collect()
                }
                _ => {
                    debug!(
                        "Body part of message {} is not UTF-8 (charset {:?})",
                        message_id, charset
                    );
                    String::from_utf8_lossy(&bytes).into_owned()
                }
            }
        }
    };
    Some(nl2br(&text))
}

/// Find a part by its part id anywhere below `root`
pub fn find_part<'a>(root: &'a MessagePart, part_id: &str) -> Option<&'a MessagePart> {
    root.parts.as_deref()?.iter().find_map(|part| {
        if part.part_id.as_deref() == Some(part_id) {
            Some(part)
        } else {
            find_part(part, part_id)
        }
    })
}
