//! CLI subcommands

pub mod convert;
pub mod list;
pub mod render;
pub mod search;
pub mod show;

use crate::content::Post;

/// One-line summary of a post for terminal output
fn post_line(post: &Post) -> String {
    format!(
        "  {} - {} [{}]",
        post.create_date.format("%Y-%m-%d"),
        plain_title(post),
        post.slug
    )
}

/// Rendered title without its paragraph wrapper
fn plain_title(post: &Post) -> &str {
    let title = post.title.as_str().trim();
    title
        .strip_prefix("<p>")
        .and_then(|t| t.strip_suffix("</p>"))
        .unwrap_or(title)
}
