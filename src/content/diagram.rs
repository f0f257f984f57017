//! Diagram-as-code resolution through a PlantUML server

use async_trait::async_trait;
use base64::alphabet::Alphabet;
use base64::engine::general_purpose::{GeneralPurpose, NO_PAD};
use base64::Engine;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use lazy_static::lazy_static;
use std::io::Write;
use std::time::Duration;
use thiserror::Error;

/// Header a PlantUML server sets when the diagram source does not compile
const DIAGRAM_ERROR_HEADER: &str = "X-PlantUML-Diagram-Error";

lazy_static! {
    static ref PLANTUML_BASE64: GeneralPurpose = {
        let alphabet =
            Alphabet::new("0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz-_")
                .unwrap();
        GeneralPurpose::new(&alphabet, NO_PAD)
    };
}

/// Diagram resolution errors
#[derive(Error, Debug)]
pub enum DiagramError {
    #[error("empty diagram source")]
    EmptySource,

    #[error("encoding failed: {0}")]
    Encode(#[from] std::io::Error),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server responded with status {0}")]
    Status(u16),

    #[error("diagram error: {0}")]
    Rejected(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Turns diagram source into an image URL
#[async_trait]
pub trait DiagramResolver: Send + Sync {
    async fn resolve(&self, source: &str) -> Result<String, DiagramError>;
}

/// Encode diagram source the way PlantUML servers expect it in URLs:
/// raw DEFLATE followed by base64 over PlantUML's own alphabet.
pub fn encode_plantuml(source: &str) -> Result<String, DiagramError> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(source.as_bytes())?;
    let compressed = encoder.finish()?;
    Ok(PLANTUML_BASE64.encode(compressed))
}

/// Resolver backed by a PlantUML server
pub struct PlantUmlServer {
    base_url: String,
    client: reqwest::Client,
    verify: bool,
}

impl PlantUmlServer {
    /// `base_url` is the render endpoint the encoded source is appended to,
    /// e.g. `https://www.plantuml.com/plantuml/svg/`.
    pub fn new(base_url: &str, timeout: Duration, verify: bool) -> Result<Self, DiagramError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.to_string(),
            client,
            verify,
        })
    }

    /// URL of the rendered diagram, without contacting the server
    pub fn url_for(&self, source: &str) -> Result<String, DiagramError> {
        if source.trim().is_empty() {
            return Err(DiagramError::EmptySource);
        }
        Ok(format!("{}{}", self.base_url, encode_plantuml(source)?))
    }
}

#[async_trait]
impl DiagramResolver for PlantUmlServer {
    async fn resolve(&self, source: &str) -> Result<String, DiagramError> {
        let url = self.url_for(source)?;
        if !self.verify {
            return Ok(url);
        }

        let response = self.client.get(&url).send().await?;

        if let Some(message) = response.headers().get(DIAGRAM_ERROR_HEADER) {
            let message = message.to_str().unwrap_or("unreadable error header");
            return Err(DiagramError::Rejected(message.to_string()));
        }

        let status = response.status();
        if !status.is_success() {
            return Err(DiagramError::Status(status.as_u16()));
        }

        tracing::debug!("Diagram rendered: {}", url);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::DeflateDecoder;
    use std::io::Read;

    #[test]
    fn test_encode_roundtrips_through_deflate() {
        let source = "@startuml\nAlice -> Bob: hello\n@enduml";
        let encoded = encode_plantuml(source).unwrap();
        assert!(encoded
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));

        let bytes = PLANTUML_BASE64.decode(&encoded).unwrap();
        let mut decoded = String::new();
        DeflateDecoder::new(&bytes[..])
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, source);
    }

    #[tokio::test]
    async fn test_unverified_resolution_builds_url() {
        let server =
            PlantUmlServer::new("http://plantuml.test/svg/", Duration::from_secs(1), false)
                .unwrap();
        let url = server.resolve("A -> B").await.unwrap();
        assert!(url.starts_with("http://plantuml.test/svg/"));
        assert!(url.len() > "http://plantuml.test/svg/".len());
    }

    #[tokio::test]
    async fn test_empty_source_fails() {
        let server =
            PlantUmlServer::new("http://plantuml.test/svg/", Duration::from_secs(1), false)
                .unwrap();
        assert!(matches!(
            server.resolve("  \n").await,
            Err(DiagramError::EmptySource)
        ));
    }
}
