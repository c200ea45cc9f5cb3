//! Image collection: attachments and remotely linked pictures.

use std::collections::HashSet;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{MailpostError, Result};
use crate::model::{Batch, Image, ImageId};

/// Markdown image references whose target is an absolute http(s) URL.
static REMOTE_IMAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"!\[[^\]]*\]\(\s*(https?://[^\s)]+)"#).expect("valid remote image pattern")
});

/// Lowercase `name` and replace everything outside `[a-z0-9_.]` with `_`.
///
/// An empty name becomes `unknown`.
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() {
        "unknown".to_string()
    } else {
        sanitized
    }
}

/// Output filename for an image: sanitized, extension replaced by `.jpg`.
pub fn image_file_name(original: &str) -> String {
    let sanitized = sanitize_filename(original);
    let stem = match sanitized.rfind('.') {
        Some(pos) if pos > 0 => &sanitized[..pos],
        _ => sanitized.as_str(),
    };
    format!("{stem}.jpg")
}

/// Build an image from a decoded attachment.
pub fn from_attachment(filename: &str, data: Vec<u8>) -> Image {
    Image::new(filename, image_file_name(filename), data)
}

/// Build an image from a downloaded URL, named after the URL's last path
/// segment.
pub fn from_remote(url: &str, data: Vec<u8>) -> Image {
    Image::new(url, image_file_name(&remote_basename(url)), data)
}

/// Last non-empty path segment of `url`, or its host if the path is empty.
fn remote_basename(url: &str) -> String {
    let Ok(parsed) = url::Url::parse(url) else {
        return url.rsplit('/').next().unwrap_or_default().to_string();
    };
    parsed
        .path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .map(str::to_string)
        .or_else(|| parsed.host_str().map(str::to_string))
        .unwrap_or_default()
}

/// Absolute image URLs referenced by markdown image syntax, in document order.
pub fn remote_locators(body: &str) -> Vec<&str> {
    REMOTE_IMAGE
        .captures_iter(body)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .collect()
}

/// Source of remote image bytes.
pub trait ImageFetcher {
    /// Download `url`. Anything but a 200 response is an error.
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// [`ImageFetcher`] backed by a blocking HTTP client.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("mailpost/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MailpostError::Config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl ImageFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let fetch_error = |reason: String| MailpostError::Fetch {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| fetch_error(e.to_string()))?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(fetch_error(format!("HTTP {status}")));
        }
        let bytes = response.bytes().map_err(|e| fetch_error(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Download every remote image referenced by the batch's posts.
///
/// Each URL is fetched at most once, and not at all when an image with that
/// origin is already known. Failures are recorded and the next URL is tried.
/// Returns the handles of the images added.
pub fn collect_remote(batch: &mut Batch, fetcher: &dyn ImageFetcher) -> Vec<ImageId> {
    let urls: Vec<String> = batch
        .posts()
        .iter()
        .flat_map(|post| remote_locators(&post.body))
        .map(str::to_string)
        .collect();

    let mut attempted = HashSet::new();
    let mut added = Vec::new();
    for url in urls {
        if !attempted.insert(url.clone()) || batch.find_image(&url).is_some() {
            continue;
        }
        match fetcher.fetch(&url) {
            Ok(data) => {
                tracing::info!(url = %url, bytes = data.len(), "Fetched remote image");
                added.push(batch.add_image(from_remote(&url, data)));
            }
            Err(e) => batch.diagnose(url, e.to_string()),
        }
    }
    added
}
