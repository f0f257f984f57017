//! Humor image gallery

use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use crate::cache::SnapshotCache;
use crate::content::ContentError;

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "webp", "gif"];

/// Path prefix the images are served under
const URL_PREFIX: &str = "img/humor/";

/// Cached listing of the images in a directory
pub struct Gallery {
    dir: PathBuf,
    cache: SnapshotCache<Vec<String>>,
}

impl Gallery {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self {
            dir: dir.into(),
            cache: SnapshotCache::new(),
        }
    }

    /// Image paths as `img/humor/<file>`, sorted alphabetically
    pub async fn images(&self) -> Result<Arc<Vec<String>>, ContentError> {
        self.cache
            .get_or_try_fill(|| async { list_images(&self.dir) })
            .await
    }

    pub fn invalidate(&self) {
        self.cache.invalidate();
    }
}

fn list_images(dir: &Path) -> Result<Vec<String>, ContentError> {
    let mut images = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| ContentError::UnreadableDirectory {
            path: dir.to_path_buf(),
            source: e.into(),
        })?;

        let name = entry.file_name().to_string_lossy();
        if entry.file_type().is_file() && is_image(&name) {
            images.push(format!("{}{}", URL_PREFIX, name));
        }
    }

    images.sort();
    tracing::debug!("Found {} gallery images in {:?}", images.len(), dir);
    Ok(images)
}

fn is_image(name: &str) -> bool {
    let name = name.to_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .any(|ext| name.ends_with(&format!(".{}", ext)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn test_images_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.PNG", "a.jpeg", "c.webp", "notes.txt", "d.gif"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }

        let gallery = Gallery::new(dir.path());
        let images = gallery.images().await.unwrap();
        assert_eq!(
            *images,
            vec![
                "img/humor/a.jpeg",
                "img/humor/b.PNG",
                "img/humor/c.webp",
                "img/humor/d.gif"
            ]
        );
    }

    #[tokio::test]
    async fn test_listing_is_cached() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("one.png"), b"x").unwrap();

        let gallery = Gallery::new(dir.path());
        assert_eq!(gallery.images().await.unwrap().len(), 1);

        fs::write(dir.path().join("two.png"), b"x").unwrap();
        assert_eq!(gallery.images().await.unwrap().len(), 1);

        gallery.invalidate();
        assert_eq!(gallery.images().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = Gallery::new(dir.path().join("nope"));
        assert!(gallery.images().await.is_err());
    }
}
