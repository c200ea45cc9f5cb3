//! Email parsing: MIME part walking and front matter extraction.

pub mod front_matter;
pub mod mime;
