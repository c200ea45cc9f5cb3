//! Post extraction from text parts.

use crate::error::{MailpostError, Result};
use crate::model::Post;
use crate::parser::front_matter::parse_front_matter;

use super::collect::sanitize_filename;
use super::Publisher;

/// Build a post from a text part.
///
/// Fails with a recoverable [`MailpostError::FrontMatter`] when the front
/// matter cannot be parsed or has no title. The destination directory is
/// created here; failing to do so is fatal.
pub fn extract_post(text: &str, publisher: &Publisher) -> Result<Post> {
    let front_matter = parse_front_matter(text)?;
    let title = front_matter.title.trim();
    if title.is_empty() {
        return Err(MailpostError::FrontMatter("no title in front matter".into()));
    }

    let kind = front_matter.kind.trim().to_lowercase();
    if !is_single_segment(&kind) {
        return Err(MailpostError::FrontMatter(format!(
            "type '{kind}' is not a plain directory name"
        )));
    }
    let dir = publisher.post_dir(&kind, &front_matter.date)?;

    Ok(Post {
        title: title.to_string(),
        filename: format!("{}.md", sanitize_filename(title)),
        date: front_matter.date,
        kind,
        body: text.to_string(),
        dir,
    })
}

/// Whether `kind` can stand in for `<type>` without leaving the template's
/// directory: no separators and no `.`/`..` components.
fn is_single_segment(kind: &str) -> bool {
    !kind.contains(['/', '\\']) && kind != "." && kind != ".."
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PublishConfig;

    fn publisher(root: &std::path::Path) -> Publisher {
        Publisher::new(PublishConfig {
            post_dir: format!("{}/content/<type>/<date>", root.display()),
            date_path_fmt: "%Y".into(),
            ..PublishConfig::default()
        })
    }

    #[test]
    fn test_extract_post() {
        let tmp = tempfile::tempdir().unwrap();
        let text = "---\ntitle: An Apple A Day\ndate: 2015-03-07\ntype: Blog \n---\n![An apple](apple.jpg)\n";

        let post = extract_post(text, &publisher(tmp.path())).unwrap();

        assert_eq!(post.title, "An Apple A Day");
        assert_eq!(post.kind, "blog");
        assert_eq!(post.filename, "an_apple_a_day.md");
        assert_eq!(post.body, text);
        assert_eq!(post.dir, tmp.path().join("content/blog/2015"));
        assert!(post.dir.is_dir());
    }

    #[test]
    fn test_extract_post_without_title() {
        let tmp = tempfile::tempdir().unwrap();
        let err = extract_post("---\ndate: 2015-03-07\n---\nbody\n", &publisher(tmp.path()))
            .unwrap_err();
        assert!(matches!(err, MailpostError::FrontMatter(_)));
        assert!(!tmp.path().join("content").exists());
    }

    #[test]
    fn test_extract_post_rejects_type_outside_post_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let site = tmp.path().join("site");
        let publisher = Publisher::new(PublishConfig {
            post_dir: format!("{}/content/<type>", site.display()),
            ..PublishConfig::default()
        });

        for kind in ["../../../outside", "..", "a/b", "..\\outside"] {
            let text = format!("---\ntitle: Escape\ntype: '{kind}'\n---\n");
            let err = extract_post(&text, &publisher).unwrap_err();
            assert!(matches!(err, MailpostError::FrontMatter(_)), "{kind}");
            assert!(err.is_recoverable());
        }
        let entries: Vec<_> = std::fs::read_dir(tmp.path()).unwrap().collect();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_extract_post_bad_date_uses_zero_date() {
        let tmp = tempfile::tempdir().unwrap();
        let post = extract_post(
            "---\ntitle: Undated\ndate: someday\ntype: notes\n---\n",
            &publisher(tmp.path()),
        )
        .unwrap();
        assert_eq!(post.dir, tmp.path().join("content/notes/0001"));
    }
}
