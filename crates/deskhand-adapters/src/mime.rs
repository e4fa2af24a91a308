//! RFC 2822 message construction and Gmail body decoding.
//!
//! Gmail's `send` and `drafts.create` endpoints take the complete message as
//! base64url text in a `raw` field; message parts come back the same way.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE, URL_SAFE_NO_PAD};

/// Longest line RFC 5322 allows, excluding CRLF.
const MAX_LINE_LEN: usize = 998;

/// Encoded-word payload budget; keeps each header line under 76 chars.
const ENCODED_WORD_CHUNK: usize = 45;

/// A single-part outgoing mail.
#[derive(Debug, Clone)]
pub struct OutgoingMessage<'a> {
    pub to: &'a str,
    pub subject: &'a str,
    pub body: &'a str,
    pub cc: Option<&'a str>,
    pub bcc: Option<&'a str>,
    pub html: bool,
}

impl OutgoingMessage<'_> {
    /// Render as RFC 2822 text with CRLF line endings.
    pub fn to_rfc2822(&self) -> String {
        let subtype = if self.html { "html" } else { "plain" };
        let mut out = String::with_capacity(self.body.len() + 256);

        out.push_str("MIME-Version: 1.0\r\n");
        out.push_str(&format!(
            "Content-Type: text/{subtype}; charset=\"utf-8\"\r\n"
        ));

        let body = if needs_base64(self.body) {
            out.push_str("Content-Transfer-Encoding: base64\r\n");
            wrap_base64(self.body.as_bytes())
        } else {
            out.push_str("Content-Transfer-Encoding: 7bit\r\n");
            normalize_newlines(self.body)
        };

        out.push_str(&format!("To: {}\r\n", single_line(self.to)));
        if let Some(cc) = self.cc {
            out.push_str(&format!("Cc: {}\r\n", single_line(cc)));
        }
        if let Some(bcc) = self.bcc {
            out.push_str(&format!("Bcc: {}\r\n", single_line(bcc)));
        }
        out.push_str(&format!("Subject: {}\r\n", encode_header(self.subject)));
        out.push_str("\r\n");
        out.push_str(&body);
        out
    }

    /// The `raw` field value Gmail expects.
    pub fn to_raw(&self) -> String {
        URL_SAFE.encode(self.to_rfc2822().as_bytes())
    }
}

/// Decode a Gmail `body.data` value (base64url, padding optional).
pub fn decode_body_data(data: &str) -> Option<String> {
    let trimmed: String = data
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '=')
        .collect();
    URL_SAFE_NO_PAD
        .decode(trimmed.as_bytes())
        .ok()
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}

/// Header values must not carry line breaks.
fn single_line(value: &str) -> String {
    value
        .replace(['\r', '\n'], " ")
        .trim()
        .to_string()
}

/// RFC 2047 `B` encoding for non-ASCII header text.
fn encode_header(value: &str) -> String {
    let value = single_line(value);
    if value.is_ascii() {
        return value;
    }

    let mut words = Vec::new();
    let mut chunk = String::new();
    for c in value.chars() {
        if chunk.len() + c.len_utf8() > ENCODED_WORD_CHUNK {
            words.push(format!("=?utf-8?b?{}?=", STANDARD.encode(chunk.as_bytes())));
            chunk.clear();
        }
        chunk.push(c);
    }
    if !chunk.is_empty() {
        words.push(format!("=?utf-8?b?{}?=", STANDARD.encode(chunk.as_bytes())));
    }
    words.join("\r\n ")
}

fn needs_base64(body: &str) -> bool {
    !body.is_ascii() || body.lines().any(|line| line.len() > MAX_LINE_LEN)
}

fn normalize_newlines(body: &str) -> String {
    body.replace("\r\n", "\n").replace('\n', "\r\n")
}

fn wrap_base64(bytes: &[u8]) -> String {
    let encoded = STANDARD.encode(bytes);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / 76 * 2 + 2);
    for line in encoded.as_bytes().chunks(76) {
        out.push_str(&String::from_utf8_lossy(line));
        out.push_str("\r\n");
    }
    out
}
