//! Site configuration (_config.yml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub author: String,

    // Directory
    pub content_dir: String,
    pub humor_dir: String,
    pub cv_dir: String,
    pub graph_dir: String,

    // Discovery
    pub extensions: Vec<String>,
    pub draft_prefix: String,

    // Rendering
    pub hashtag_url: String,
    pub emoji_cdn: String,
    #[serde(default)]
    pub highlight: HighlightConfig,
    #[serde(default)]
    pub plantuml: PlantUmlConfig,

    // Server
    #[serde(default)]
    pub server: ServerConfig,

    // Store any additional fields
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Larminier".to_string(),
            author: "Tom Larminier".to_string(),

            content_dir: "content".to_string(),
            humor_dir: "static/img/humor".to_string(),
            cv_dir: "cv-db".to_string(),
            graph_dir: "graph".to_string(),

            extensions: vec!["md".to_string()],
            draft_prefix: "_".to_string(),

            hashtag_url: "https://www.linkedin.com/feed/hashtag/".to_string(),
            emoji_cdn: "https://cdn.jsdelivr.net/gh/jdecked/twemoji@15.1.0/assets/svg/".to_string(),
            highlight: HighlightConfig::default(),
            plantuml: PlantUmlConfig::default(),

            server: ServerConfig::default(),
            extra: HashMap::new(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }
}

/// Code highlighting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    /// syntect theme name
    pub theme: String,
    pub line_number: bool,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            theme: "InspiredGitHub".to_string(),
            line_number: false,
        }
    }
}

/// PlantUML server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlantUmlConfig {
    /// Base URL the encoded diagram is appended to
    pub server: String,
    pub timeout_secs: u64,
    /// Ask the server to render the diagram before embedding its URL
    pub verify: bool,
}

impl PlantUmlConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl Default for PlantUmlConfig {
    fn default() -> Self {
        Self {
            server: "https://www.plantuml.com/plantuml/svg/".to_string(),
            timeout_secs: 5,
            verify: true,
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub ip: String,
    pub port: u16,
    /// Invalidate the post cache when content files change
    pub watch: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ip: "localhost".to_string(),
            port: 5000,
            watch: true,
        }
    }
}
