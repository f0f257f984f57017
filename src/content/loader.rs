//! Content loader - turns document files into posts

use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{BlockExpander, ContentError, FrontMatter, MarkdownRenderer, Post};
use crate::helpers::{hashtag_links, title_case};

/// Runs the per-document pipeline: front-matter, block expansion, rendering
#[derive(Clone)]
pub struct PostLoader {
    renderer: Arc<MarkdownRenderer>,
    expander: BlockExpander,
    hashtag_url: String,
}

impl PostLoader {
    /// Create a new post loader
    pub fn new(renderer: Arc<MarkdownRenderer>, expander: BlockExpander, hashtag_url: &str) -> Self {
        Self {
            renderer,
            expander,
            hashtag_url: hashtag_url.to_string(),
        }
    }

    /// Load every path concurrently.
    ///
    /// Unreadable documents and later duplicates of a slug are skipped.
    /// Posts are sorted newest first; equal dates keep the order of `paths`.
    pub async fn load_posts(&self, paths: &[PathBuf]) -> Vec<Post> {
        let results = join_all(paths.iter().map(|path| self.load_post(path))).await;

        let mut seen = HashSet::new();
        let mut posts = Vec::with_capacity(results.len());

        for result in results {
            match result {
                Ok(post) => {
                    if seen.insert(post.slug.clone()) {
                        posts.push(post);
                    } else {
                        tracing::warn!(
                            "Duplicate slug {:?} in {:?}, skipping",
                            post.slug,
                            post.source
                        );
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to load post: {}", e);
                }
            }
        }

        // Sort by date descending (newest first); sort_by is stable
        posts.sort_by(|a, b| b.create_date.cmp(&a.create_date));

        posts
    }

    /// Load a single post from a file
    pub async fn load_post(&self, path: &Path) -> Result<Post, ContentError> {
        let content = tokio::fs::read_to_string(path).await.map_err(|source| {
            ContentError::UnreadableDocument {
                path: path.to_path_buf(),
                source,
            }
        })?;

        let file_modified = tokio::fs::metadata(path)
            .await
            .ok()
            .and_then(|metadata| metadata.modified().ok())
            .map(DateTime::<Utc>::from);

        Ok(self.render_post(path, &content, file_modified).await)
    }

    /// Build a post from file content; never fails, degraded parts are rendered in place
    pub async fn render_post(
        &self,
        path: &Path,
        content: &str,
        file_modified: Option<DateTime<Utc>>,
    ) -> Post {
        let (fm, body) = FrontMatter::parse(content);

        let slug = fm.slug.clone().unwrap_or_else(|| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("untitled")
                .to_string()
        });

        let create_date = fm.resolve_create_date(file_modified);
        let update_date = fm.resolve_update_date(create_date);

        let title = fm
            .title
            .clone()
            .unwrap_or_else(|| title_case(&slug.replace('-', " ")));
        let title_markdown = format!(
            "{}{}{}",
            icon(fm.pre_icon.as_deref()),
            title,
            icon(fm.post_icon.as_deref())
        );

        let expansion = self.expander.expand(body).await;
        if expansion.diagram_failures > 0 {
            tracing::warn!(
                "{} diagram(s) in {:?} rendered as source",
                expansion.diagram_failures,
                path
            );
        }

        tracing::debug!("Rendered post {:?} from {:?}", slug, path);

        Post {
            title: self.renderer.render(&title_markdown),
            tags: self
                .renderer
                .render(&hashtag_links(&fm.tags, &self.hashtag_url)),
            html: self.renderer.render(&expansion.text),
            chart_included: fm.chart_included || expansion.chart_included(),
            slug,
            create_date,
            update_date,
            summary: fm.summary.or(fm.excerpt),
            cover_image: fm.cover_image.or(fm.image),
            tag_names: fm.tags,
            category: fm.category,
            sub_category: fm.sub_category,
            raw_markdown: body.to_string(),
            graphml_included: fm.graphml_included,
            graphml_file: fm.graphml_file,
            source: path.to_path_buf(),
        }
    }
}

/// Emoji shortcode for a title icon
fn icon(name: Option<&str>) -> String {
    name.map(|name| format!(":{}:", name)).unwrap_or_default()
}
