//! Content discovery

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::ContentError;

/// Enumerates publishable documents in a content directory
#[derive(Debug, Clone)]
pub struct DocumentSource {
    dir: PathBuf,
    extensions: Vec<String>,
    draft_prefix: String,
}

impl DocumentSource {
    pub fn new<P: Into<PathBuf>>(dir: P, extensions: Vec<String>, draft_prefix: &str) -> Self {
        Self {
            dir: dir.into(),
            extensions,
            draft_prefix: draft_prefix.to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// List document paths, sorted by file name.
    ///
    /// Only the top level of the directory is scanned. Files whose name starts
    /// with the draft prefix are skipped.
    pub fn discover(&self) -> Result<Vec<PathBuf>, ContentError> {
        let mut documents = Vec::new();

        for entry in WalkDir::new(&self.dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                // The directory itself could not be read
                Err(e) if e.depth() == 0 => {
                    return Err(ContentError::UnreadableDirectory {
                        path: self.dir.clone(),
                        source: e.into_io_error().unwrap_or_else(|| {
                            std::io::Error::new(std::io::ErrorKind::Other, "filesystem loop")
                        }),
                    });
                }
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry in {:?}: {}", self.dir, e);
                    continue;
                }
            };

            let path = entry.path();
            if entry.file_type().is_file() && self.is_document(path) {
                documents.push(path.to_path_buf());
            }
        }

        tracing::debug!("Discovered {} documents in {:?}", documents.len(), self.dir);
        Ok(documents)
    }

    fn is_document(&self, path: &Path) -> bool {
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => return false,
        };

        if !self.draft_prefix.is_empty() && name.starts_with(&self.draft_prefix) {
            return false;
        }

        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.iter().any(|ext| ext == e))
            .unwrap_or(false)
    }
}
