//! Post repository - cached access to the rendered post set

use std::sync::Arc;

use super::{ContentError, DocumentSource, Post, PostLoader};
use crate::cache::SnapshotCache;

/// Owns the rendered posts of a content directory
pub struct PostRepository {
    source: DocumentSource,
    loader: PostLoader,
    cache: SnapshotCache<Vec<Post>>,
}

impl PostRepository {
    pub fn new(source: DocumentSource, loader: PostLoader) -> Self {
        Self {
            source,
            loader,
            cache: SnapshotCache::new(),
        }
    }

    /// All posts, newest first. Served from cache until [`invalidate`](Self::invalidate).
    pub async fn load_all(&self) -> Result<Arc<Vec<Post>>, ContentError> {
        self.cache
            .get_or_try_fill(|| async {
                let start = std::time::Instant::now();
                let paths = self.source.discover()?;
                let posts = self.loader.load_posts(&paths).await;
                tracing::info!(
                    "Loaded {} posts from {:?} in {:.2}s",
                    posts.len(),
                    self.source.dir(),
                    start.elapsed().as_secs_f64()
                );
                Ok::<_, ContentError>(posts)
            })
            .await
    }

    /// Drop the cached posts; the next read reloads from disk
    pub fn invalidate(&self) {
        tracing::info!("Post cache invalidated");
        self.cache.invalidate();
    }

    /// Look up a post by slug
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>, ContentError> {
        let posts = self.load_all().await?;
        Ok(posts.iter().find(|p| p.slug == slug).cloned())
    }

    /// Posts containing `query` (case-insensitive) in their title, summary,
    /// tags, category, sub-category or body. An empty query matches everything.
    pub async fn search(&self, query: &str) -> Result<Vec<Post>, ContentError> {
        let posts = self.load_all().await?;
        let needle = query.trim().to_lowercase();
        Ok(posts
            .iter()
            .filter(|p| needle.is_empty() || p.matches(&needle))
            .cloned()
            .collect())
    }

    /// The `n` most recent posts
    pub async fn latest(&self, n: usize) -> Result<Vec<Post>, ContentError> {
        let posts = self.load_all().await?;
        Ok(posts.iter().take(n).cloned().collect())
    }

    /// How many times posts were loaded from disk
    pub fn fill_count(&self) -> usize {
        self.cache.fill_count()
    }
}
