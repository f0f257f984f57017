//! Content module - discovers, parses, expands and renders posts

pub mod blocks;
pub mod diagram;
mod frontmatter;
pub mod loader;
mod markdown;
mod post;
mod repository;
mod source;

use std::path::PathBuf;
use thiserror::Error;

pub use blocks::{BlockExpander, Expansion};
pub use diagram::{DiagramError, DiagramResolver, PlantUmlServer};
pub use frontmatter::{parse_date, FrontMatter, EPOCH};
pub use loader::PostLoader;
pub use markdown::{MarkdownRenderer, SafeHtml};
pub use post::Post;
pub use repository::PostRepository;
pub use source::DocumentSource;

/// Content loading errors
#[derive(Error, Debug)]
pub enum ContentError {
    #[error("cannot read content directory {path:?}: {source}")]
    UnreadableDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot read document {path:?}: {source}")]
    UnreadableDocument {
        path: PathBuf,
        source: std::io::Error,
    },
}
