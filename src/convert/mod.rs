//! Format conversion utilities: HTML to Markdown and GraphML graph data

mod graphml;

use std::path::PathBuf;
use thiserror::Error;

pub use graphml::{read_graphml, NodeLinkGraph};

/// Conversion errors
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("cannot read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid XML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("not a GraphML document: {0}")]
    NotGraphml(String),

    #[error("HTML conversion failed: {0}")]
    Html(std::io::Error),
}

/// Convert an HTML fragment to Markdown, links included.
/// Blank input gives `None`.
pub fn html_to_markdown(html: &str) -> Result<Option<String>, ConvertError> {
    if html.trim().is_empty() {
        return Ok(None);
    }
    let markdown = htmd::convert(html).map_err(ConvertError::Html)?;
    Ok(Some(markdown))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_to_markdown() {
        let markdown = html_to_markdown(
            "<h1>Title</h1><p>Some <strong>bold</strong> and a <a href=\"https://x.test/\">link</a>.</p>",
        )
        .unwrap()
        .unwrap();

        assert!(markdown.starts_with("# Title"));
        assert!(markdown.contains("**bold**"));
        assert!(markdown.contains("[link](https://x.test/)"));
    }

    #[test]
    fn test_blank_html() {
        assert!(html_to_markdown("  \n").unwrap().is_none());
    }
}
