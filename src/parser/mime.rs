//! MIME decoding: walk the part tree of a message and feed posts and images
//! into the batch.

use std::borrow::Cow;

use mail_parser::{Message, MessageParser, MessagePart, MimeHeaders, PartType};

use crate::error::Result;
use crate::model::Batch;
use crate::publish::collect::from_attachment;
use crate::publish::post::extract_post;
use crate::publish::Publisher;

/// Maximum multipart nesting depth followed before giving up on a branch.
const MAX_DEPTH: usize = 16;

/// What a MIME part is, for our purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartClass {
    /// A container whose children are walked in turn.
    Multipart,
    /// A JPEG or PNG attachment.
    Image,
    /// Plain text that may hold a post.
    Text,
    /// Everything else; ignored.
    Unknown,
}

/// Classify a `type/subtype` media type.
///
/// Rules are checked in order: any `multipart/*` is a container (so
/// `multipart/alternative` is walked and its `text/plain` alternative used),
/// then `image/jpeg` and `image/png`, then `text/plain`.
pub fn classify_media_type(media_type: &str) -> PartClass {
    let media_type = media_type.trim().to_ascii_lowercase();
    if media_type.starts_with("multipart/") {
        PartClass::Multipart
    } else if media_type.starts_with("image/jpeg") || media_type.starts_with("image/png") {
        PartClass::Image
    } else if media_type.starts_with("text/plain") {
        PartClass::Text
    } else {
        PartClass::Unknown
    }
}

/// `type/subtype` of a part. Parts without a Content-Type are `text/plain`.
fn media_type(part: &MessagePart<'_>) -> String {
    part.content_type()
        .map(|ct| match ct.subtype() {
            Some(sub) => format!("{}/{sub}", ct.ctype()),
            None => ct.ctype().to_string(),
        })
        .unwrap_or_else(|| "text/plain".to_string())
}

/// Counts of what one message contributed to the batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeSummary {
    pub posts: usize,
    pub images: usize,
}

/// Parse raw message bytes (an optional MBOX `From ` line is skipped).
pub fn parse_message(raw: &[u8]) -> Option<Message<'_>> {
    MessageParser::default().parse(skip_from_line(raw))
}

/// Walk every part of `message`, adding posts and images to `batch`.
///
/// Broken parts are skipped with a diagnostic. Only failing to create a post
/// directory is returned as an error.
pub fn decode_message(
    message: &Message<'_>,
    batch: &mut Batch,
    publisher: &Publisher,
) -> Result<DecodeSummary> {
    let subject = message.subject().unwrap_or("(no subject)").to_string();
    let mut summary = DecodeSummary::default();

    // (part id, depth); children are pushed in reverse to keep document order.
    let mut worklist: Vec<(usize, usize)> = vec![(0, 0)];
    while let Some((part_id, depth)) = worklist.pop() {
        let Some(part) = message.parts.get(part_id) else {
            batch.diagnose(&subject, format!("missing MIME part #{part_id}"));
            continue;
        };

        let media_type = media_type(part);
        match classify_media_type(&media_type) {
            PartClass::Multipart => {
                let PartType::Multipart(children) = &part.body else {
                    batch.diagnose(&subject, format!("unreadable {media_type} section"));
                    continue;
                };
                if depth >= MAX_DEPTH {
                    batch.diagnose(&subject, "multipart nesting too deep");
                    continue;
                }
                worklist.extend(children.iter().rev().map(|&child| (child, depth + 1)));
            }
            PartClass::Image => {
                if decode_image(part, batch, &subject) {
                    summary.images += 1;
                }
            }
            PartClass::Text => {
                let text = part
                    .text_contents()
                    .map(Cow::Borrowed)
                    .unwrap_or_else(|| String::from_utf8_lossy(part.contents()));
                match extract_post(&text, publisher) {
                    Ok(post) => {
                        tracing::info!(title = %post.title, "Found post");
                        batch.add_post(post);
                        summary.posts += 1;
                    }
                    Err(e) if e.is_recoverable() => batch.diagnose(&subject, e.to_string()),
                    Err(e) => return Err(e),
                }
            }
            PartClass::Unknown => {
                tracing::debug!(media_type = %media_type, "Ignoring MIME part");
            }
        }
    }

    Ok(summary)
}

/// Add an image attachment to the batch. Returns `false` if it was skipped.
fn decode_image(part: &MessagePart<'_>, batch: &mut Batch, subject: &str) -> bool {
    let Some(filename) = part.attachment_name().filter(|n| !n.trim().is_empty()) else {
        batch.diagnose(subject, "image attachment without a filename");
        return false;
    };
    if part.is_encoding_problem {
        batch.diagnose(filename, "image attachment has a broken transfer encoding");
        return false;
    }
    let data = part.contents();
    if data.is_empty() {
        batch.diagnose(filename, "empty image attachment");
        return false;
    }

    tracing::info!(filename, bytes = data.len(), "Found image attachment");
    batch.add_image(from_attachment(filename, data.to_vec()));
    true
}

/// Skip the `From ` separator line at the start of MBOX messages.
fn skip_from_line(data: &[u8]) -> &[u8] {
    // Handle BOM
    let data = if data.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &data[3..]
    } else {
        data
    };

    if data.starts_with(b"From ") {
        if let Some(pos) = data.iter().position(|&b| b == b'\n') {
            return &data[pos + 1..];
        }
    }
    data
}
