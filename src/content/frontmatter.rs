//! Front-matter parsing

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_yaml::{Mapping, Value};
use std::collections::HashMap;

/// Last-resort timestamp when neither metadata nor the filesystem yield a date
pub const EPOCH: DateTime<Utc> = DateTime::<Utc>::UNIX_EPOCH;

/// Accepted metadata date formats, tried in order
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%d-%m-%Y"];
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// A scalar metadata value as a string, whatever its native type.
/// Empty strings and non-scalars count as absent.
fn scalar(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Tagged(tagged) => return scalar(&tagged.value),
        _ => return None,
    };
    Some(text).filter(|s| !s.trim().is_empty())
}

/// A single scalar or a list of scalars
fn string_or_vec(value: &Value) -> Vec<String> {
    match value {
        Value::Sequence(items) => items.iter().filter_map(scalar).collect(),
        Value::Null => Vec::new(),
        other => scalar(other).into_iter().collect(),
    }
}

/// Truthiness: empty strings, zero, null and empty collections are false
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Sequence(items) => !items.is_empty(),
        Value::Mapping(map) => !map.is_empty(),
        Value::Tagged(tagged) => truthy(&tagged.value),
    }
}

/// Front-matter data from a post
#[derive(Debug, Clone, Default)]
pub struct FrontMatter {
    pub slug: Option<String>,
    pub title: Option<String>,
    /// Emoji shortcode (without colons) placed before the title
    pub pre_icon: Option<String>,
    /// Emoji shortcode (without colons) placed after the title
    pub post_icon: Option<String>,
    pub create_date: Option<String>,
    pub update_date: Option<String>,
    pub summary: Option<String>,
    pub excerpt: Option<String>,
    pub cover_image: Option<String>,
    pub image: Option<String>,
    pub tags: Vec<String>,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub graphml_included: bool,
    pub graphml_file: Option<String>,
    pub chart_included: bool,

    /// Additional custom fields
    pub extra: HashMap<String, Value>,
}

impl FrontMatter {
    /// Parse front-matter from content string
    /// Returns (front_matter, remaining_content). Content without a usable
    /// front-matter block comes back whole with default metadata.
    pub fn parse(content: &str) -> (Self, &str) {
        let trimmed = content.trim_start();

        // Check for YAML front-matter (---)
        if trimmed.starts_with("---") {
            return Self::parse_yaml(trimmed).unwrap_or((FrontMatter::default(), content));
        }

        // Check for JSON front-matter (;;; or {"key":)
        if trimmed.starts_with(";;;") || trimmed.starts_with('{') {
            return Self::parse_json(trimmed).unwrap_or((FrontMatter::default(), content));
        }

        (FrontMatter::default(), content)
    }

    /// Build from a metadata mapping, reading each key on its own so that a
    /// value of the wrong shape only loses that key
    pub fn from_mapping(mapping: Mapping) -> Self {
        let mut fm = FrontMatter::default();

        for (key, value) in mapping {
            let Some(key) = key.as_str() else {
                continue;
            };

            let text = || {
                let text = scalar(&value);
                if text.is_none() && !matches!(value, Value::Null | Value::String(_)) {
                    tracing::warn!("Ignoring front-matter {:?}: expected a scalar", key);
                }
                text
            };

            match key {
                "slug" => fm.slug = text(),
                "title" => fm.title = text(),
                "pre_icon" => fm.pre_icon = text(),
                "post_icon" => fm.post_icon = text(),
                "create_date" => fm.create_date = text(),
                "update_date" => fm.update_date = text(),
                "summary" => fm.summary = text(),
                "excerpt" => fm.excerpt = text(),
                "cover_image" => fm.cover_image = text(),
                "image" => fm.image = text(),
                "tags" => fm.tags = string_or_vec(&value),
                "category" => fm.category = text(),
                "sub_category" => fm.sub_category = text(),
                "graphml_included" => fm.graphml_included = truthy(&value),
                "graphml_file" => fm.graphml_file = text(),
                "chart_included" => fm.chart_included = truthy(&value),
                _ => {
                    fm.extra.insert(key.to_string(), value);
                }
            }
        }

        fm
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Mapping(mapping) => Some(Self::from_mapping(mapping)),
            Value::Null => Some(FrontMatter::default()),
            _ => None,
        }
    }

    fn parse_yaml(content: &str) -> Option<(Self, &str)> {
        let rest = &content[3..]; // Skip opening ---
        let rest = rest.trim_start_matches(['\n', '\r']);

        let end_pos = rest.find("\n---")?;
        let yaml_content = &rest[..end_pos];
        let remaining = &rest[end_pos + 4..]; // Skip \n---
        let remaining = remaining.trim_start_matches(['\n', '\r']);

        if yaml_content.trim().is_empty() {
            return Some((FrontMatter::default(), remaining));
        }

        // A thematic break followed by prose is not front-matter: require at
        // least one `key: value` line with a plain identifier key.
        let has_yaml_structure = yaml_content.lines().any(|line| {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                return false;
            }
            if let Some(colon_pos) = trimmed.find(':') {
                let before_colon = &trimmed[..colon_pos];
                let is_valid_key = !before_colon.is_empty()
                    && before_colon
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
                    && before_colon != "http"
                    && before_colon != "https"
                    && before_colon != "ftp";
                if is_valid_key {
                    let after_colon = &trimmed[colon_pos + 1..];
                    return after_colon.is_empty() || after_colon.starts_with(' ');
                }
            }
            false
        });

        if !has_yaml_structure {
            return None;
        }

        match serde_yaml::from_str::<Value>(yaml_content) {
            Ok(value) => Self::from_value(value).map(|fm| (fm, remaining)),
            Err(e) => {
                tracing::warn!(
                    "Failed to parse YAML front-matter, treating as content: {}",
                    e
                );
                None
            }
        }
    }

    fn parse_json(content: &str) -> Option<(Self, &str)> {
        // JSON front-matter ends with ;;;
        if let Some(rest) = content.strip_prefix(";;;") {
            let end_pos = rest.find(";;;")?;
            let json_content = &rest[..end_pos];
            let remaining = rest[end_pos + 3..].trim_start_matches(['\n', '\r']);
            return Self::from_json(json_content).map(|fm| (fm, remaining));
        }

        // Find the brace closing the leading object
        let mut depth = 0;
        let mut end_pos = 0;
        for (i, c) in content.char_indices() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        end_pos = i + 1;
                        break;
                    }
                }
                _ => {}
            }
        }

        if end_pos == 0 {
            return None;
        }

        let remaining = content[end_pos..].trim_start_matches(['\n', '\r']);
        Self::from_json(&content[..end_pos]).map(|fm| (fm, remaining))
    }

    fn from_json(json: &str) -> Option<Self> {
        // JSON is a subset of YAML
        serde_json::from_str::<serde_json::Value>(json)
            .map_err(|e| tracing::debug!("Not JSON front-matter: {}", e))
            .ok()
            .and_then(|value| serde_yaml::to_value(value).ok())
            .and_then(Self::from_value)
    }

    /// Creation date: the metadata value if present (epoch when unparseable),
    /// otherwise `fallback`, otherwise epoch.
    pub fn resolve_create_date(&self, fallback: Option<DateTime<Utc>>) -> DateTime<Utc> {
        match &self.create_date {
            Some(raw) => parse_or_epoch(raw),
            None => fallback.unwrap_or(EPOCH),
        }
    }

    /// Update date: the metadata value if present (epoch when unparseable),
    /// otherwise the creation date.
    pub fn resolve_update_date(&self, create_date: DateTime<Utc>) -> DateTime<Utc> {
        match &self.update_date {
            Some(raw) => parse_or_epoch(raw),
            None => create_date,
        }
    }
}

fn parse_or_epoch(raw: &str) -> DateTime<Utc> {
    parse_date(raw).unwrap_or_else(|| {
        tracing::warn!("Unrecognized date {:?}, using epoch", raw);
        EPOCH
    })
}

/// Parse a metadata date.
///
/// Native timestamps (RFC 3339 and YAML `YYYY-MM-DD HH:MM:SS` style) are
/// taken as-is; otherwise `YYYY-MM-DD`, `YYYY/MM/DD`, `DD-MM-YYYY` and
/// `YYYY-MM-DD HH:MM` are tried in that order.
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();

    if let Some(native) = parse_native(s) {
        return Some(native);
    }

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }

    NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
        .ok()
        .map(|dt| dt.and_utc())
}

fn parse_native(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.and_utc())
}
