//! mdsite: a Markdown-backed personal site and blog engine
//!
//! Posts are read from a content directory, their front-matter parsed,
//! diagram and chart fences expanded, and the Markdown rendered to HTML.
//! The rendered set is cached in memory until explicitly invalidated and
//! served over a small JSON API.

pub mod cache;
pub mod commands;
pub mod config;
pub mod content;
pub mod convert;
pub mod gallery;
pub mod helpers;
pub mod resume;
pub mod server;

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use content::{BlockExpander, DocumentSource, MarkdownRenderer, PlantUmlServer, PostLoader};

/// The site: configuration and resolved directories
#[derive(Clone)]
pub struct Site {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Markdown posts
    pub content_dir: PathBuf,
    /// Gallery images
    pub humor_dir: PathBuf,
    /// JSON resumes
    pub cv_dir: PathBuf,
    /// GraphML files
    pub graph_dir: PathBuf,
}

impl Site {
    /// Create a new site from a directory, reading `_config.yml` when present
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join("_config.yml");

        let config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            config::SiteConfig::default()
        };

        Ok(Self::with_config(base_dir, config))
    }

    pub fn with_config(base_dir: PathBuf, config: config::SiteConfig) -> Self {
        let content_dir = base_dir.join(&config.content_dir);
        let humor_dir = base_dir.join(&config.humor_dir);
        let cv_dir = base_dir.join(&config.cv_dir);
        let graph_dir = base_dir.join(&config.graph_dir);

        Self {
            config,
            base_dir,
            content_dir,
            humor_dir,
            cv_dir,
            graph_dir,
        }
    }

    /// Markdown renderer configured for this site
    pub fn renderer(&self) -> MarkdownRenderer {
        MarkdownRenderer::with_options(
            &self.config.highlight.theme,
            self.config.highlight.line_number,
            &self.config.emoji_cdn,
        )
    }

    /// Post loader wired to the configured PlantUML server
    pub fn loader(&self) -> Result<PostLoader> {
        let plantuml = &self.config.plantuml;
        let resolver = PlantUmlServer::new(&plantuml.server, plantuml.timeout(), plantuml.verify)?;
        let expander = BlockExpander::new(Arc::new(resolver), plantuml.timeout());

        Ok(PostLoader::new(
            Arc::new(self.renderer()),
            expander,
            &self.config.hashtag_url,
        ))
    }

    /// Post repository over the content directory
    pub fn repository(&self) -> Result<content::PostRepository> {
        let source = DocumentSource::new(
            &self.content_dir,
            self.config.extensions.clone(),
            &self.config.draft_prefix,
        );
        Ok(content::PostRepository::new(source, self.loader()?))
    }

    /// Humor image gallery
    pub fn gallery(&self) -> gallery::Gallery {
        gallery::Gallery::new(&self.humor_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_site_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let site = Site::new(dir.path()).unwrap();
        assert_eq!(site.content_dir, dir.path().join("content"));
        assert_eq!(site.humor_dir, dir.path().join("static/img/humor"));
        assert_eq!(site.cv_dir, dir.path().join("cv-db"));
        assert_eq!(site.graph_dir, dir.path().join("graph"));
    }

    #[test]
    fn test_site_reads_config() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("_config.yml"), "content_dir: posts\n").unwrap();
        let site = Site::new(dir.path()).unwrap();
        assert_eq!(site.content_dir, dir.path().join("posts"));
    }

    #[tokio::test]
    async fn test_repository_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("_config.yml"),
            "plantuml:\n  server: http://plantuml.test/svg/\n  verify: false\n",
        )
        .unwrap();
        fs::create_dir(dir.path().join("content")).unwrap();
        fs::write(
            dir.path().join("content").join("hello.md"),
            "---\ntitle: Hello\n---\n```plantuml\nA -> B\n```\n",
        )
        .unwrap();

        let site = Site::new(dir.path()).unwrap();
        let repo = site.repository().unwrap();
        let post = repo.get_by_slug("hello").await.unwrap().unwrap();
        assert!(post
            .html
            .as_str()
            .contains(r#"<img src="http://plantuml.test/svg/"#));
    }
}
