//! Local message sources: `.eml` files, MBOX files and inbox directories.

use std::path::{Path, PathBuf};

use mail_parser::mailbox::mbox::MessageIterator;
use mail_parser::Message;

use crate::error::{MailpostError, Result};
use crate::publish::template::ensure_dir;

/// Name of the inbox subdirectory consumed files are moved to.
pub const PROCESSED_DIR: &str = "processed";

/// One undecoded message and the file it came from.
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub origin: PathBuf,
    pub bytes: Vec<u8>,
}

/// Regular files directly inside `dir`, sorted by name.
///
/// Subdirectories (including the archive) are ignored. A path that is a
/// file rather than a directory is a configuration error.
pub fn inbox_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if dir.is_file() {
        return Err(MailpostError::Config(format!(
            "inbox '{}' is a file, not a directory",
            dir.display()
        )));
    }
    let entries = std::fs::read_dir(dir).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            MailpostError::FileNotFound(dir.to_path_buf())
        } else {
            MailpostError::io(dir, e)
        }
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| MailpostError::io(dir, e))?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Expand command-line paths: directories become their sorted files.
pub fn expand_paths(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            files.extend(inbox_files(path)?);
        } else if path.exists() {
            files.push(path.clone());
        } else {
            return Err(MailpostError::FileNotFound(path.clone()));
        }
    }
    Ok(files)
}

/// Read every message from `files`, in order.
pub fn load_messages(files: &[PathBuf]) -> Result<Vec<RawMessage>> {
    let mut messages = Vec::new();
    for path in files {
        messages.extend(load_file(path)?);
    }
    Ok(messages)
}

/// Read the messages in one file.
///
/// `.eml` files and files that do not start with an MBOX `From ` line hold a
/// single message; anything else is split as MBOX.
pub fn load_file(path: &Path) -> Result<Vec<RawMessage>> {
    let bytes = std::fs::read(path).map_err(|e| MailpostError::io(path, e))?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        tracing::debug!(path = %path.display(), "Skipping empty file");
        return Ok(Vec::new());
    }

    if is_eml(path) || !looks_like_mbox(&bytes) {
        return Ok(vec![RawMessage {
            origin: path.to_path_buf(),
            bytes,
        }]);
    }

    let mut messages = Vec::new();
    for (i, item) in MessageIterator::new(bytes.as_slice()).enumerate() {
        match item {
            Ok(message) => messages.push(RawMessage {
                origin: path.to_path_buf(),
                bytes: message.contents().to_vec(),
            }),
            Err(_) => tracing::warn!(
                path = %path.display(),
                index = i,
                "Skipping unreadable MBOX entry"
            ),
        }
    }
    tracing::debug!(path = %path.display(), count = messages.len(), "Read MBOX file");
    Ok(messages)
}

fn is_eml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("eml"))
}

fn looks_like_mbox(bytes: &[u8]) -> bool {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    bytes.starts_with(b"From ")
}

/// Address of the first `From` mailbox, if any.
pub fn sender_address(message: &Message<'_>) -> Option<String> {
    message
        .from()
        .and_then(|addr| addr.first())
        .and_then(|addr| addr.address())
        .map(str::to_string)
}

/// Whether a message from `sender` passes the `post_from` filter.
///
/// No filter accepts everything. Otherwise the addresses must match exactly,
/// ignoring case.
pub fn sender_allowed(sender: Option<&str>, post_from: Option<&str>) -> bool {
    match post_from.map(str::trim).filter(|f| !f.is_empty()) {
        None => true,
        Some(expected) => sender.is_some_and(|s| s.trim().eq_ignore_ascii_case(expected)),
    }
}

/// Move consumed inbox files into `<inbox>/processed/`.
pub fn archive(inbox: &Path, files: &[PathBuf]) -> Result<usize> {
    if files.is_empty() {
        return Ok(0);
    }
    let target_dir = inbox.join(PROCESSED_DIR);
    ensure_dir(&target_dir)?;

    let mut moved = 0;
    for path in files {
        let Some(name) = path.file_name() else {
            continue;
        };
        let target = target_dir.join(name);
        std::fs::rename(path, &target).map_err(|e| MailpostError::io(path, e))?;
        tracing::debug!(from = %path.display(), to = %target.display(), "Archived");
        moved += 1;
    }
    tracing::info!(count = moved, dir = %target_dir.display(), "Archived processed files");
    Ok(moved)
}
