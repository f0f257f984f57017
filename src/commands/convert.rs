//! Convert an HTML or GraphML file

use anyhow::{Context, Result};
use std::path::Path;

use crate::convert;

/// `.graphml` files print as node-link JSON, anything else is read as HTML
/// and printed as Markdown
pub fn run(file: &Path) -> Result<()> {
    let is_graphml = file
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("graphml"));

    if is_graphml {
        let graph = convert::read_graphml(file)?;
        println!("{}", serde_json::to_string_pretty(&graph)?);
        return Ok(());
    }

    let html = std::fs::read_to_string(file).with_context(|| format!("Failed to read {:?}", file))?;
    if let Some(markdown) = convert::html_to_markdown(&html)? {
        println!("{}", markdown);
    }
    Ok(())
}
