//! Transport-safe body encoding
//!
//! Gmail exchanges message bodies and attachments as URL-safe base64:
//! `-` and `_` replace `+` and `/`. We never pad on encode but accept
//! padded and unpadded input on decode.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::prelude::*;

use crate::error::{Error, Result};

const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Encode bytes as unpadded URL-safe base64
pub fn base64url_encode(data: impl AsRef<[u8]>) -> String {
    BASE64_URL_SAFE_NO_PAD.encode(data)
}

/// Decode URL-safe base64, with or without trailing `=`
pub fn base64url_decode(data: &str) -> Result<Vec<u8>> {
    URL_SAFE_LENIENT
        .decode(data.trim())
        .map_err(|e| Error::InvalidResponse(format!("invalid base64url data: {}", e)))
}

/// Insert `<br />` before each line break, keeping the break itself
///
/// `\r\n` and `\n\r` count as a single break.
pub fn nl2br(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\r' | '\n' => {
                out.push_str("<br />");
                out.push(c);
                let pair = if c == '\r' { '\n' } else { '\r' };
                if chars.peek() == Some(&pair) {
                    out.push(pair);
                    chars.next();
                }
            }
            _ => out.push(c),
        }
    }

    out
}
