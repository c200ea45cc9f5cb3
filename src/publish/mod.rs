//! Publishing: turning extracted posts and images into files on disk.
//!
//! - [`template`] fills `<type>`/`<date>` directory templates.
//! - [`normalize`] resizes and re-encodes images as JPEG.
//! - [`collect`] builds images from attachments and remote URLs.
//! - [`post`] builds posts from front matter.
//! - [`resolve`] rewrites image references in post bodies.
//! - [`writer`] saves finished posts.

pub mod collect;
pub mod normalize;
pub mod post;
pub mod resolve;
pub mod template;
pub mod writer;

use std::path::{Path, PathBuf};

use crate::config::PublishConfig;
use crate::error::{MailpostError, Result};
use crate::model::{Image, ImageState};

use self::normalize::NormalizeOptions;
use self::template::PathParts;

/// Output layout bound to a [`PublishConfig`].
#[derive(Debug, Clone)]
pub struct Publisher {
    config: PublishConfig,
}

impl Publisher {
    pub fn new(config: PublishConfig) -> Self {
        Self { config }
    }

    /// Render a front-matter date with the configured layout.
    pub fn date_part(&self, date: &str) -> String {
        template::date_part(date, &self.config.date_path_fmt)
    }

    /// Destination directory for a post, created if missing.
    pub fn post_dir(&self, kind: &str, date: &str) -> Result<PathBuf> {
        let date_part = self.date_part(date);
        let dir = PathBuf::from(template::fill_template(
            &self.config.post_dir,
            PathParts {
                kind,
                date: &date_part,
            },
        ));
        template::ensure_dir(&dir)?;
        Ok(dir)
    }

    /// Normalize `image` and write it next to the other images of `post_date`.
    ///
    /// On success the image becomes [`ImageState::Materialized`]. A decode
    /// failure marks it [`ImageState::Failed`] and is returned as a
    /// recoverable error. Directory and write failures are fatal.
    pub fn materialize(&self, image: &mut Image, post_date: &str) -> Result<()> {
        let options = NormalizeOptions {
            max_width: self.config.max_img_width,
            quality: self.config.jpeg_quality,
        };
        let jpeg = match normalize::normalize(&image.name, &image.data, options) {
            Ok(jpeg) => jpeg,
            Err(e) => {
                image.state = ImageState::Failed;
                return Err(e);
            }
        };

        let date_part = self.date_part(post_date);
        let dir = PathBuf::from(template::fill_template(
            &self.config.image_dir,
            PathParts {
                kind: "",
                date: &date_part,
            },
        ));
        template::ensure_dir(&dir)?;

        let path = dir.join(&image.name);
        write_file(&path, &jpeg)?;
        let url = join_url(
            &self.config.base_url,
            &[&self.config.image_path, &date_part, &image.name],
        );
        tracing::info!(path = %path.display(), url = %url, "Saved image");

        image.state = ImageState::Materialized { path, url };
        Ok(())
    }
}

/// Join URL path segments onto `base` with single slashes.
///
/// Empty segments are skipped; a base of `/` yields a root-relative URL.
pub fn join_url(base: &str, segments: &[&str]) -> String {
    let mut url = base.trim_end_matches('/').to_string();
    for segment in segments {
        let segment = segment.trim_matches('/');
        if segment.is_empty() {
            continue;
        }
        url.push('/');
        url.push_str(segment);
    }
    url
}

/// Create or truncate `path` with `contents`.
pub(crate) fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    std::fs::write(path, contents).map_err(|e| MailpostError::io(path, e))
}
