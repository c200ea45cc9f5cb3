//! `mailpost`: publish blog posts sent by email.
//!
//! Messages are read from `.eml`/MBOX files, their text parts become
//! Markdown posts (title, date and type come from the front matter) and
//! their image attachments, or remote images they link to, are resized,
//! re-encoded as JPEG and linked from the post.

pub mod config;
pub mod error;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod publish;
pub mod source;
