//! Images collected from a batch of messages.
//!
//! Raw bytes are held until a post references the image. Only then is the
//! picture normalized and written to disk.

use std::path::{Path, PathBuf};

/// Where an image is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageState {
    /// Known, but no post has referenced it yet.
    Pending,
    /// Written to `path` and published at `url`.
    Materialized { path: PathBuf, url: String },
    /// Decoding or encoding failed; references stay untouched.
    Failed,
}

/// One picture destined for a published post.
#[derive(Debug, Clone)]
pub struct Image {
    /// Attachment filename or source URL. Post bodies reference the image by
    /// exactly this string.
    pub origin: String,

    /// Sanitized output filename, always ending in `.jpg`.
    pub name: String,

    /// Encoded bytes as received (JPEG, PNG, ...).
    pub data: Vec<u8>,

    pub state: ImageState,
}

impl Image {
    /// Create a pending image.
    pub fn new(origin: impl Into<String>, name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            origin: origin.into(),
            name: name.into(),
            data,
            state: ImageState::Pending,
        }
    }

    /// Whether a locator captured from a post body refers to this image.
    ///
    /// Plain string equality: no case folding, trimming or URL normalization.
    pub fn matches(&self, locator: &str) -> bool {
        self.origin == locator
    }

    /// Final filesystem path, once materialized.
    pub fn path(&self) -> Option<&Path> {
        match &self.state {
            ImageState::Materialized { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Public URL, once materialized.
    pub fn url(&self) -> Option<&str> {
        match &self.state {
            ImageState::Materialized { url, .. } => Some(url),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state == ImageState::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_is_exact() {
        let img = Image::new("Apple.JPG", "apple.jpg", Vec::new());
        assert!(img.matches("Apple.JPG"));
        assert!(!img.matches("apple.jpg"));
        assert!(!img.matches(" Apple.JPG"));
        assert!(!img.matches("Apple.JPG "));
    }

    #[test]
    fn test_matches_url() {
        let img = Image::new(
            "https://example.com/pics/a.png?size=large",
            "a.jpg",
            Vec::new(),
        );
        assert!(img.matches("https://example.com/pics/a.png?size=large"));
        assert!(!img.matches("https://example.com/pics/a.png"));
    }

    #[test]
    fn test_new_image_is_pending() {
        let img = Image::new("a.png", "a.jpg", vec![1, 2, 3]);
        assert!(img.is_pending());
        assert!(img.path().is_none());
        assert!(img.url().is_none());
    }

    #[test]
    fn test_materialized_accessors() {
        let mut img = Image::new("a.png", "a.jpg", Vec::new());
        img.state = ImageState::Materialized {
            path: PathBuf::from("/site/static/a.jpg"),
            url: "https://example.com/a.jpg".into(),
        };
        assert!(!img.is_pending());
        assert_eq!(img.path(), Some(Path::new("/site/static/a.jpg")));
        assert_eq!(img.url(), Some("https://example.com/a.jpg"));
    }
}
