//! Front matter parsing for post text.
//!
//! Two block styles are recognized:
//!
//! - YAML, closed by a `---` (or `...`) line. The opening `---` is optional.
//! - TOML, enclosed in `+++` lines.

use crate::error::{MailpostError, Result};

/// The front-matter fields mailpost cares about. Other keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontMatter {
    pub title: String,
    pub date: String,
    /// The `type` key.
    pub kind: String,
}

/// Parse the front matter at the start of `text`.
pub fn parse_front_matter(text: &str) -> Result<FrontMatter> {
    let text = text.trim_start_matches('\u{feff}');
    let mut lines = text.lines().skip_while(|l| l.trim().is_empty()).peekable();

    match lines.peek().map(|l| l.trim_end()) {
        Some("+++") => {
            lines.next();
            parse_toml(&collect_until(lines, |l| l == "+++"))
        }
        Some("---") => {
            lines.next();
            parse_yaml(&collect_until(lines, is_yaml_end))
        }
        Some(_) => parse_yaml(&collect_until(lines, is_yaml_end)),
        None => Err(MailpostError::FrontMatter("empty text".into())),
    }
}

fn is_yaml_end(line: &str) -> bool {
    line == "---" || line == "..."
}

/// Join lines up to (excluding) the first one matching `end`.
fn collect_until<'a>(lines: impl Iterator<Item = &'a str>, end: impl Fn(&str) -> bool) -> String {
    let mut block = String::new();
    for line in lines {
        if end(line.trim_end()) {
            break;
        }
        block.push_str(line);
        block.push('\n');
    }
    block
}

fn parse_yaml(block: &str) -> Result<FrontMatter> {
    // Dates and numbers come back as YAML scalars; keep their source text.
    let value: serde_yaml::Value =
        serde_yaml::from_str(block).map_err(|e| MailpostError::FrontMatter(e.to_string()))?;
    let serde_yaml::Value::Mapping(map) = value else {
        return Err(MailpostError::FrontMatter(
            "front matter is not a mapping".into(),
        ));
    };

    let field = |key: &str| -> String {
        match map.get(key) {
            Some(serde_yaml::Value::String(s)) => s.clone(),
            Some(serde_yaml::Value::Number(n)) => n.to_string(),
            Some(serde_yaml::Value::Bool(b)) => b.to_string(),
            _ => String::new(),
        }
    };

    Ok(FrontMatter {
        title: field("title"),
        date: field("date"),
        kind: field("type"),
    })
}

fn parse_toml(block: &str) -> Result<FrontMatter> {
    let table = block
        .parse::<toml::Table>()
        .map_err(|e| MailpostError::FrontMatter(e.to_string()))?;

    let field = |key: &str| -> String {
        match table.get(key) {
            Some(toml::Value::String(s)) => s.clone(),
            Some(toml::Value::Datetime(d)) => d.to_string(),
            Some(toml::Value::Integer(i)) => i.to_string(),
            Some(toml::Value::Float(f)) => f.to_string(),
            Some(toml::Value::Boolean(b)) => b.to_string(),
            _ => String::new(),
        }
    };

    Ok(FrontMatter {
        title: field("title"),
        date: field("date"),
        kind: field("type"),
    })
}
