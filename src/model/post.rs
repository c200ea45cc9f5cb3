//! Blog post entity.

use std::path::PathBuf;

/// One blog entry extracted from a text part.
///
/// The body is the full text of the part (front matter included). It is
/// rewritten in place as image references resolve and is otherwise written
/// out byte for byte.
#[derive(Debug, Clone)]
pub struct Post {
    /// `title` from the front matter. Never empty.
    pub title: String,

    /// `date` from the front matter, as written.
    pub date: String,

    /// `type` from the front matter, lowercased.
    pub kind: String,

    /// Raw markdown, front matter included.
    pub body: String,

    /// Destination directory, computed once at extraction time.
    pub dir: PathBuf,

    /// Sanitized title plus `.md`.
    pub filename: String,
}

impl Post {
    /// Full destination path of the post file.
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.filename)
    }
}
