//! Post model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::SafeHtml;

/// A blog post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Unique identifier, from metadata or the file name
    pub slug: String,

    /// Rendered title (with optional emoji icons)
    pub title: SafeHtml,

    pub create_date: DateTime<Utc>,

    pub update_date: DateTime<Utc>,

    pub summary: Option<String>,

    pub cover_image: Option<String>,

    /// Rendered hashtag links
    pub tags: SafeHtml,

    /// Tags as listed in the front-matter
    pub tag_names: Vec<String>,

    pub category: Option<String>,

    pub sub_category: Option<String>,

    /// Rendered body
    pub html: SafeHtml,

    /// Body as written, before block expansion
    pub raw_markdown: String,

    pub graphml_included: bool,

    pub graphml_file: Option<String>,

    /// Set by front-matter or when a chart block was found
    pub chart_included: bool,

    /// Source file path, kept out of API responses
    #[serde(skip)]
    pub source: PathBuf,
}

impl Post {
    /// Case-insensitive substring match over the searchable fields.
    /// `needle` must already be lowercase.
    pub fn matches(&self, needle: &str) -> bool {
        let fields = [
            Some(self.html.as_str()),
            Some(self.title.as_str()),
            self.summary.as_deref(),
            Some(self.tags.as_str()),
            self.category.as_deref(),
            self.sub_category.as_deref(),
        ];

        fields
            .iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(needle))
    }
}
