//! Batch processing: messages in, posts and images out.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::Config;
use crate::error::{MailpostError, Result};
use crate::model::{Batch, Diagnostic};
use crate::parser::mime::{decode_message, parse_message};
use crate::publish::collect::{collect_remote, ImageFetcher};
use crate::publish::resolve::resolve_post;
use crate::publish::writer::write_post;
use crate::publish::Publisher;
use crate::source::{self, RawMessage};

/// What one batch produced.
#[derive(Debug, Default, Serialize)]
pub struct BatchReport {
    /// Messages read from the source.
    pub messages: usize,
    /// Messages rejected by the sender filter.
    pub skipped: usize,
    pub posts_written: Vec<PathBuf>,
    pub images_saved: Vec<PathBuf>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Run one batch over `messages`.
///
/// Per-item failures end up in the report's diagnostics. An error is returned
/// only when an output directory or file cannot be written; files written
/// before that point stay on disk.
pub fn run_batch(
    messages: &[RawMessage],
    publisher: &Publisher,
    fetcher: &dyn ImageFetcher,
    post_from: Option<&str>,
) -> Result<BatchReport> {
    let mut report = BatchReport::default();
    let mut batch = Batch::new();

    for raw in messages {
        report.messages += 1;
        let Some(message) = parse_message(&raw.bytes) else {
            let err = MailpostError::MimeError("not an RFC 5322 message".into());
            batch.diagnose(raw.origin.display().to_string(), err.to_string());
            continue;
        };

        let subject = message.subject().unwrap_or("(no subject)");
        let sender = source::sender_address(&message);
        tracing::info!(
            subject,
            from = sender.as_deref().unwrap_or("-"),
            "Processing message"
        );
        if !source::sender_allowed(sender.as_deref(), post_from) {
            tracing::info!(subject, "Skipping message from unexpected sender");
            report.skipped += 1;
            continue;
        }

        decode_message(&message, &mut batch, publisher)?;
    }

    collect_remote(&mut batch, fetcher);

    let ids: Vec<_> = batch.post_ids().collect();
    for id in ids {
        resolve_post(&mut batch, id, publisher)?;
        report.posts_written.push(write_post(batch.post(id))?);
    }

    report.images_saved = batch
        .images()
        .iter()
        .filter_map(|image| image.path().map(Path::to_path_buf))
        .collect();
    report.diagnostics = batch.diagnostics().to_vec();

    tracing::info!(
        messages = report.messages,
        posts = report.posts_written.len(),
        images = report.images_saved.len(),
        problems = report.diagnostics.len(),
        "Batch finished"
    );
    Ok(report)
}

/// Process the configured inbox once, archiving consumed files afterwards.
pub fn process_inbox(config: &Config, fetcher: &dyn ImageFetcher) -> Result<BatchReport> {
    let inbox = &config.source.inbox;
    let files = source::inbox_files(inbox)?;
    if files.is_empty() {
        tracing::debug!(inbox = %inbox.display(), "Inbox is empty");
        return Ok(BatchReport::default());
    }

    let messages = source::load_messages(&files)?;
    let report = process(&messages, config, fetcher)?;

    if config.source.archive_processed {
        source::archive(inbox, &files)?;
    }
    Ok(report)
}

/// Process explicit files or directories once. Nothing is archived.
pub fn process_paths(
    paths: &[PathBuf],
    config: &Config,
    fetcher: &dyn ImageFetcher,
) -> Result<BatchReport> {
    let files = source::expand_paths(paths)?;
    let messages = source::load_messages(&files)?;
    process(&messages, config, fetcher)
}

fn process(
    messages: &[RawMessage],
    config: &Config,
    fetcher: &dyn ImageFetcher,
) -> Result<BatchReport> {
    let publisher = Publisher::new(config.publish.clone());
    run_batch(
        messages,
        &publisher,
        fetcher,
        config.source.post_from.as_deref(),
    )
}
