//! Batch-scoped store of posts and images.
//!
//! Every stage of the pipeline receives the batch explicitly and addresses
//! entries through [`PostId`] / [`ImageId`] handles. A batch is dropped when
//! its run ends.

use serde::Serialize;

use super::image::Image;
use super::post::Post;

/// Handle to a post inside a [`Batch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PostId(usize);

/// Handle to an image inside a [`Batch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageId(usize);

/// A recovered failure, kept for the run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// What failed: a message subject, post title, image name or URL.
    pub subject: String,
    /// Why it was skipped.
    pub reason: String,
}

/// Posts, images and diagnostics of a single run.
#[derive(Debug, Default)]
pub struct Batch {
    posts: Vec<Post>,
    images: Vec<Image>,
    diagnostics: Vec<Diagnostic>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_post(&mut self, post: Post) -> PostId {
        self.posts.push(post);
        PostId(self.posts.len() - 1)
    }

    /// Add an image. A name already used by another image in the batch gets
    /// a numeric suffix (`photo.jpg`, `photo_1.jpg`, ...) so no two images
    /// share an output file.
    pub fn add_image(&mut self, mut image: Image) -> ImageId {
        if self.name_taken(&image.name) {
            let renamed = self.free_name(&image.name);
            tracing::debug!(
                origin = %image.origin,
                from = %image.name,
                to = %renamed,
                "Renamed colliding image"
            );
            image.name = renamed;
        }
        self.images.push(image);
        ImageId(self.images.len() - 1)
    }

    fn name_taken(&self, name: &str) -> bool {
        self.images.iter().any(|img| img.name == name)
    }

    fn free_name(&self, name: &str) -> String {
        let (stem, ext) = match name.rfind('.') {
            Some(pos) if pos > 0 => name.split_at(pos),
            _ => (name, ""),
        };
        let mut n = 1;
        loop {
            let candidate = format!("{stem}_{n}{ext}");
            if !self.name_taken(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    pub fn post(&self, id: PostId) -> &Post {
        &self.posts[id.0]
    }

    pub fn post_mut(&mut self, id: PostId) -> &mut Post {
        &mut self.posts[id.0]
    }

    pub fn image(&self, id: ImageId) -> &Image {
        &self.images[id.0]
    }

    pub fn image_mut(&mut self, id: ImageId) -> &mut Image {
        &mut self.images[id.0]
    }

    /// Handles of all posts, in extraction order.
    pub fn post_ids(&self) -> impl Iterator<Item = PostId> {
        (0..self.posts.len()).map(PostId)
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn images(&self) -> &[Image] {
        &self.images
    }

    /// Find the image a locator refers to. The first registered match wins.
    pub fn find_image(&self, locator: &str) -> Option<ImageId> {
        self.images
            .iter()
            .position(|img| img.matches(locator))
            .map(ImageId)
    }

    /// Record a recovered failure and log it.
    pub fn diagnose(&mut self, subject: impl Into<String>, reason: impl Into<String>) {
        let diagnostic = Diagnostic {
            subject: subject.into(),
            reason: reason.into(),
        };
        tracing::warn!(
            subject = %diagnostic.subject,
            reason = %diagnostic.reason,
            "Skipped"
        );
        self.diagnostics.push(diagnostic);
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}
