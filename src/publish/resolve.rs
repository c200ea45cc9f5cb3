//! Image reference resolution.
//!
//! Post bodies reference images in three ways:
//!
//! | Kind | Syntax |
//! |---|---|
//! | Markdown | `![alt](LOCATOR "optional title")` |
//! | Figure shortcode | `{{< figure ... src="LOCATOR" ... >}}` |
//! | Img shortcode | `{{< img ... src="LOCATOR" ... >}}` |
//!
//! Every reference whose locator names a known image is rewritten to the
//! image's public URL, repeated references included. Only the locator inside
//! the reference is replaced; the same text elsewhere in the prose is left
//! alone.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::Result;
use crate::model::{Batch, PostId};

use super::Publisher;

static MARKDOWN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"!\[[^\]]*\]\(\s*([^\s)]+)[\s)]"#).expect("valid markdown image pattern")
});

static FIGURE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\{\{<\s*figure\b[^>]*?\bsrc="([^"]*)""#).expect("valid figure pattern")
});

static IMG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\{\{<\s*img\b[^>]*?\bsrc="([^"]*)""#).expect("valid img pattern")
});

/// The reference syntaxes, in resolution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Markdown,
    Figure,
    Img,
}

impl ReferenceKind {
    pub const ALL: [Self; 3] = [Self::Markdown, Self::Figure, Self::Img];

    fn pattern(self) -> &'static Regex {
        match self {
            Self::Markdown => &MARKDOWN,
            Self::Figure => &FIGURE,
            Self::Img => &IMG,
        }
    }
}

/// One image reference found in a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub kind: ReferenceKind,
    /// Byte range of the whole reference match.
    pub span: Range<usize>,
    /// Byte range of the locator.
    pub locator_span: Range<usize>,
    pub locator: String,
}

/// All references in `body`: markdown first, then figure, then img, each in
/// document order. Text claimed by an earlier match is not matched again.
pub fn find_references(body: &str) -> Vec<Reference> {
    let mut found: Vec<Reference> = Vec::new();
    for kind in ReferenceKind::ALL {
        for caps in kind.pattern().captures_iter(body) {
            let (Some(whole), Some(locator)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let span = whole.range();
            if found.iter().any(|r| overlaps(&r.span, &span)) {
                continue;
            }
            found.push(Reference {
                kind,
                span,
                locator_span: locator.range(),
                locator: locator.as_str().to_string(),
            });
        }
    }
    found
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

/// Rewrite every resolvable reference in one post.
///
/// Pending images are materialized with the post's date the first time they
/// are referenced; later references reuse the same URL. Images that fail to
/// decode are recorded as diagnostics and their references stay as written.
/// Returns the number of references rewritten.
pub fn resolve_post(batch: &mut Batch, id: PostId, publisher: &Publisher) -> Result<usize> {
    let references = find_references(&batch.post(id).body);
    let post_date = batch.post(id).date.clone();

    let mut edits: Vec<(Range<usize>, String)> = Vec::new();
    for reference in references {
        let Some(image_id) = batch.find_image(&reference.locator) else {
            tracing::debug!(locator = %reference.locator, "No image for reference");
            continue;
        };

        if batch.image(image_id).is_pending() {
            if let Err(e) = publisher.materialize(batch.image_mut(image_id), &post_date) {
                if !e.is_recoverable() {
                    return Err(e);
                }
                let origin = batch.image(image_id).origin.clone();
                batch.diagnose(origin, e.to_string());
                continue;
            }
        }

        if let Some(url) = batch.image(image_id).url() {
            edits.push((reference.locator_span, url.to_string()));
        }
    }

    let rewritten = edits.len();
    let body = &mut batch.post_mut(id).body;
    edits.sort_by(|a, b| b.0.start.cmp(&a.0.start));
    for (span, url) in edits {
        body.replace_range(span, &url);
    }
    Ok(rewritten)
}
