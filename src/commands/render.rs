//! Render a single Markdown file without the post cache

use anyhow::{Context, Result};
use std::path::Path;

use crate::content::Post;
use crate::Site;

/// Render `file` exactly as the repository would
pub async fn render_file(site: &Site, file: &Path) -> Result<Post> {
    let loader = site.loader()?;
    loader
        .load_post(file)
        .await
        .with_context(|| format!("Failed to render {:?}", file))
}

pub async fn run(site: &Site, file: &Path) -> Result<()> {
    let post = render_file(site, file).await?;
    println!("{}", post.html);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use std::fs;

    #[tokio::test]
    async fn test_render_file_outside_content_dir() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("note.md");
        fs::write(
            &file,
            "---\ntitle: Note\ntags: [Rust]\n---\n```mermaid\ngraph TD\n```\n",
        )
        .unwrap();

        let site = Site::with_config(dir.path().to_path_buf(), SiteConfig::default());
        let post = render_file(&site, &file).await.unwrap();
        assert_eq!(post.slug, "note");
        assert!(post.html.as_str().contains(r#"<div class="mermaid">"#));
        assert!(post.tags.as_str().contains("hashtag/Rust/"));
    }

    #[tokio::test]
    async fn test_render_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let site = Site::with_config(dir.path().to_path_buf(), SiteConfig::default());
        assert!(render_file(&site, &dir.path().join("nope.md")).await.is_err());
    }
}
