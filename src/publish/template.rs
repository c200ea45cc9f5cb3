//! Directory templates with `<type>` and `<date>` tokens.

use std::fmt::Write as _;
use std::path::Path;

use chrono::{DateTime, NaiveDate};

use crate::error::{MailpostError, Result};

/// Token replaced by the post type.
pub const TYPE_TOKEN: &str = "<type>";
/// Token replaced by the formatted date.
pub const DATE_TOKEN: &str = "<date>";

/// Values substituted into a template.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathParts<'a> {
    pub kind: &'a str,
    pub date: &'a str,
}

/// Substitute the first `<type>`, then the first `<date>`.
///
/// The type is trimmed. An empty value removes its token. Later occurrences
/// of a token are left as they are.
pub fn fill_template(template: &str, parts: PathParts<'_>) -> String {
    template
        .replacen(TYPE_TOKEN, parts.kind.trim(), 1)
        .replacen(DATE_TOKEN, parts.date, 1)
}

/// Create `path` and its parents if they do not exist yet.
pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|e| MailpostError::io(path, e))
}

/// Render a front-matter date (`YYYY-MM-DD`) with a strftime `layout`.
///
/// RFC 3339 timestamps contribute their date. Anything else renders the
/// zero date, 0001-01-01.
pub fn date_part(date: &str, layout: &str) -> String {
    let parsed = parse_front_matter_date(date).unwrap_or_else(|| {
        if !date.trim().is_empty() {
            tracing::debug!(date, "Unparsable post date, using zero date");
        }
        zero_date()
    });

    let mut out = String::new();
    if write!(out, "{}", parsed.format(layout)).is_err() {
        tracing::warn!(layout, "Date layout cannot format a date");
        return String::new();
    }
    out
}

fn parse_front_matter_date(date: &str) -> Option<NaiveDate> {
    let date = date.trim();
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(date).ok().map(|d| d.date_naive()))
}

fn zero_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1, 1, 1).unwrap_or(NaiveDate::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_both_tokens() {
        let parts = PathParts {
            kind: " blog ",
            date: "2015/03",
        };
        assert_eq!(
            fill_template("content/<type>/<date>", parts),
            "content/blog/2015/03"
        );
    }

    #[test]
    fn test_fill_replaces_at_most_once() {
        let parts = PathParts {
            kind: "blog",
            date: "2015",
        };
        assert_eq!(
            fill_template("<type>/<type>/<date>/<date>", parts),
            "blog/<type>/2015/<date>"
        );
    }

    #[test]
    fn test_fill_type_before_date() {
        // A type value containing the date token is then consumed by the date pass.
        let parts = PathParts {
            kind: "<date>",
            date: "2015",
        };
        assert_eq!(fill_template("x/<type>/<date>", parts), "x/2015/<date>");
    }

    #[test]
    fn test_fill_idempotent_without_tokens() {
        let parts = PathParts {
            kind: "blog",
            date: "2015/03",
        };
        let once = fill_template("content/<type>/<date>", parts);
        assert_eq!(fill_template(&once, parts), once);
        assert_eq!(fill_template("static/img", parts), "static/img");
    }

    #[test]
    fn test_fill_empty_values() {
        assert_eq!(
            fill_template("static/<type>images/<date>", PathParts::default()),
            "static/images/"
        );
    }

    #[test]
    fn test_date_part_layouts() {
        assert_eq!(date_part("2015-03-07", "%Y/%m"), "2015/03");
        assert_eq!(date_part("2015-03-07", "%Y-%m-%d"), "2015-03-07");
        assert_eq!(date_part(" 2015-03-07 ", "%Y"), "2015");
    }

    #[test]
    fn test_date_part_rfc3339() {
        assert_eq!(date_part("2015-03-07T10:00:00+01:00", "%Y/%m"), "2015/03");
    }

    #[test]
    fn test_date_part_unparsable_is_zero_date() {
        assert_eq!(date_part("yesterday", "%Y/%m"), "0001/01");
        assert_eq!(date_part("", "%Y/%m"), "0001/01");
    }

    #[test]
    fn test_date_part_bad_layout_is_empty() {
        assert_eq!(date_part("2015-03-07", "%H:%M"), "");
    }

    #[test]
    fn test_ensure_dir_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("a").join("b");
        ensure_dir(&dir).unwrap();
        ensure_dir(&dir).unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn test_ensure_dir_fails_on_file() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("occupied");
        std::fs::write(&file, b"x").unwrap();
        let err = ensure_dir(&file.join("sub")).unwrap_err();
        assert!(matches!(err, MailpostError::Io { .. }));
    }
}
