//! HTML helper functions

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters left as-is in a single URL path segment
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Escape HTML special characters
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Escape a value for a single-quoted attribute, keeping double quotes readable
pub fn attr_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\'', "&#39;")
}

/// Percent-encode a string for use as one URL path segment
pub fn encode_segment(s: &str) -> String {
    utf8_percent_encode(s, PATH_SEGMENT).to_string()
}

/// Backslash-escape ASCII punctuation so text is taken literally by Markdown
pub fn markdown_escape(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_ascii_punctuation() {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Build the Markdown source for a list of hashtag links
///
/// # Examples
/// ```ignore
/// hashtag_links(&["rust".into()], "https://example.com/tag/")
/// // -> "[#rust](https://example.com/tag/rust/)"
/// ```
pub fn hashtag_links(tags: &[String], base_url: &str) -> String {
    tags.iter()
        .map(|tag| {
            format!(
                "[#{}]({}{}/)",
                markdown_escape(tag),
                base_url,
                encode_segment(tag)
            )
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Capitalize the first letter of every word and lowercase the rest
pub fn title_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut prev_is_letter = false;

    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                result.extend(c.to_lowercase());
            } else {
                result.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            result.push(c);
            prev_is_letter = false;
        }
    }

    result
}
