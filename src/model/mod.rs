//! Core data model: posts, images and the batch that owns them.

pub mod batch;
pub mod image;
pub mod post;

pub use batch::{Batch, Diagnostic, ImageId, PostId};
pub use image::{Image, ImageState};
pub use post::Post;
