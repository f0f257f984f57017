//! Resume timeline rendering
//!
//! Reads a JSON resume and turns its work history into a Mermaid sequence
//! diagram for client-side rendering.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Resume loading errors
#[derive(Error, Debug)]
pub enum ResumeError {
    #[error("not a JSON resume: {0}")]
    NotJson(String),

    #[error("cannot read resume {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid resume {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub company: String,
    pub position: String,
    pub start_date: String,
    #[serde(default)]
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct WorkHistory {
    #[serde(default)]
    work: Vec<Job>,
}

/// A loaded resume: the raw document plus its parsed work history
#[derive(Debug, Clone)]
pub struct Resume {
    pub document: serde_json::Value,
    pub work: Vec<Job>,
}

impl Resume {
    pub fn from_value(document: serde_json::Value) -> Result<Self, serde_json::Error> {
        let history = WorkHistory::deserialize(&document)?;
        Ok(Self {
            document,
            work: history.work,
        })
    }

    /// Load `<dir>/<file_name>`; only `.json` names are accepted and the name
    /// may not leave `dir`
    pub fn load(dir: &Path, file_name: &str) -> Result<Self, ResumeError> {
        let is_plain_name = Path::new(file_name).file_name().and_then(|n| n.to_str()) == Some(file_name);
        if !file_name.ends_with(".json") || !is_plain_name {
            return Err(ResumeError::NotJson(file_name.to_string()));
        }

        let path = dir.join(file_name);
        let content = std::fs::read_to_string(&path).map_err(|source| ResumeError::Io {
            path: path.clone(),
            source,
        })?;
        let document = serde_json::from_str(&content).map_err(|source| ResumeError::Invalid {
            path: path.clone(),
            source,
        })?;

        Self::from_value(document).map_err(|source| ResumeError::Invalid { path, source })
    }

    /// Mermaid sequence diagram with one round trip per job
    pub fn mermaid_timeline(&self) -> String {
        let mut code = String::from("sequenceDiagram\n");
        code.push_str("    participant Start\n");

        for job in &self.work {
            code.push_str(&format!(
                "    Start ->>+ {}: {} - ({} to {})\n",
                job.company,
                job.position,
                job.start_date,
                job.end_date.as_deref().unwrap_or("Present")
            ));
            code.push_str(&format!("    {} -->>- Start: Done\n", job.company));
        }

        code
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mermaid_timeline() {
        let resume = Resume::from_value(json!({
            "basics": {"name": "Tom"},
            "work": [
                {"company": "Acme", "position": "Engineer", "startDate": "2019", "endDate": "2021"},
                {"company": "Initech", "position": "Lead", "startDate": "2021"}
            ]
        }))
        .unwrap();

        assert_eq!(
            resume.mermaid_timeline(),
            "sequenceDiagram\n    participant Start\n\
             \x20   Start ->>+ Acme: Engineer - (2019 to 2021)\n\
             \x20   Acme -->>- Start: Done\n\
             \x20   Start ->>+ Initech: Lead - (2021 to Present)\n\
             \x20   Initech -->>- Start: Done\n"
        );
        assert_eq!(resume.document["basics"]["name"], "Tom");
    }

    #[test]
    fn test_empty_work_history() {
        let resume = Resume::from_value(json!({})).unwrap();
        assert_eq!(
            resume.mermaid_timeline(),
            "sequenceDiagram\n    participant Start\n"
        );
    }

    #[test]
    fn test_load_rejects_non_json_and_traversal() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Resume::load(dir.path(), "cv.txt"),
            Err(ResumeError::NotJson(_))
        ));
        assert!(matches!(
            Resume::load(dir.path(), "../cv.json"),
            Err(ResumeError::NotJson(_))
        ));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("cv.json"),
            r#"{"work": [{"company": "Acme", "position": "Dev", "startDate": "2020", "endDate": "2022"}]}"#,
        )
        .unwrap();

        let resume = Resume::load(dir.path(), "cv.json").unwrap();
        assert_eq!(resume.work.len(), 1);
        assert!(matches!(
            Resume::load(dir.path(), "missing.json"),
            Err(ResumeError::Io { .. })
        ));
    }
}
