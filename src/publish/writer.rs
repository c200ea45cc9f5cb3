//! Saving finished posts.

use std::path::PathBuf;

use crate::error::Result;
use crate::model::Post;

use super::write_file;

/// Write the post body to `dir/filename`, replacing any existing file.
pub fn write_post(post: &Post) -> Result<PathBuf> {
    let path = post.path();
    write_file(&path, post.body.as_bytes())?;
    tracing::info!(path = %path.display(), title = %post.title, "Saved post");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MailpostError;

    fn post_in(dir: PathBuf) -> Post {
        Post {
            title: "Hello".into(),
            date: "2015-03-07".into(),
            kind: "blog".into(),
            body: "---\ntitle: Hello\n---\nHi\n".into(),
            dir,
            filename: "hello.md".into(),
        }
    }

    #[test]
    fn test_write_post_truncates() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("hello.md"), "old content that is longer").unwrap();

        let path = write_post(&post_in(tmp.path().to_path_buf())).unwrap();

        assert_eq!(
            std::fs::read_to_string(path).unwrap(),
            "---\ntitle: Hello\n---\nHi\n"
        );
    }

    #[test]
    fn test_write_post_missing_dir_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let err = write_post(&post_in(tmp.path().join("gone"))).unwrap_err();
        assert!(matches!(err, MailpostError::Io { .. }));
        assert!(!err.is_recoverable());
    }
}
