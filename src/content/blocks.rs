//! Fenced block expansion
//!
//! Runs on the raw Markdown body before it reaches the Markdown renderer.
//! A small lexer finds fenced regions first; each fence is then classified
//! and handed to the handler for its kind:
//!
//! - ```` ```plantuml ```` is resolved to an image through a [`DiagramResolver`].
//!   When resolution fails the source is shown escaped with a failure note.
//! - ```` ```json <type> ```` becomes an `<svg class='chart'>` placeholder
//!   carrying the chart type and the re-serialized JSON for a client-side
//!   renderer. Invalid JSON leaves the fence exactly as written.
//! - Every other fence is left alone for the Markdown renderer.

use std::borrow::Cow;
use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

use super::diagram::{DiagramError, DiagramResolver};
use crate::helpers::{attr_escape, html_escape};

/// A fenced region of a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fence<'a> {
    /// Byte range from the opening fence to the end of the closing fence
    /// (line terminator excluded)
    pub span: Range<usize>,
    /// Spaces before the opening fence, e.g. inside a list item
    pub indent: usize,
    /// Info string after the opening fence, trimmed
    pub info: &'a str,
    /// Lines between the fences with the fence indentation removed, without
    /// the final line terminator
    pub body: Cow<'a, str>,
}

/// How a fence is handled during expansion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceKind<'a> {
    /// PlantUML source
    Diagram,
    /// JSON chart data with its chart type
    Chart(&'a str),
    /// Left for the Markdown renderer
    Other,
}

impl<'a> Fence<'a> {
    pub fn kind(&self) -> FenceKind<'a> {
        let mut words = self.info.split_whitespace();
        match (words.next(), words.next(), words.next()) {
            (Some("plantuml"), _, _) => FenceKind::Diagram,
            (Some("json"), Some(chart), None)
                if chart.chars().all(|c| c.is_alphanumeric() || c == '_') =>
            {
                FenceKind::Chart(chart)
            }
            _ => FenceKind::Other,
        }
    }
}

/// Opening or closing fence marker found on a line
struct Marker<'a> {
    indent: usize,
    ch: char,
    len: usize,
    rest: &'a str,
}

/// Fences are recognized at any indentation so that they still count when
/// nested in list items or admonition bodies
fn fence_marker(line: &str) -> Option<Marker<'_>> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    let line = &line[indent..];
    let ch = line.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = line.len() - line.trim_start_matches(ch).len();
    if len < 3 {
        return None;
    }
    Some(Marker {
        indent,
        ch,
        len,
        rest: &line[len..],
    })
}

fn strip_line_ending(line: &str) -> &str {
    line.trim_end_matches('\n').trim_end_matches('\r')
}

/// Remove up to `indent` leading spaces from every line
fn dedent(text: &str, indent: usize) -> Cow<'_, str> {
    if indent == 0 {
        return Cow::Borrowed(text);
    }
    let lines: Vec<&str> = text
        .split('\n')
        .map(|line| {
            let spaces = line.len() - line.trim_start_matches(' ').len();
            &line[spaces.min(indent)..]
        })
        .collect();
    Cow::Owned(lines.join("\n"))
}

/// Prefix every line after the first with `indent` spaces
fn reindent(text: &str, indent: usize) -> String {
    if indent == 0 {
        return text.to_string();
    }
    text.replace('\n', &format!("\n{}", " ".repeat(indent)))
}

/// Find every fenced region in `text`, in document order.
///
/// A fence is closed by a line made of the same fence character, at least as
/// long as the opening run. An unclosed fence swallows the rest of the
/// document, so scanning stops there.
pub fn scan_fences(text: &str) -> Vec<Fence<'_>> {
    let mut lines = Vec::new();
    let mut pos = 0;
    for line in text.split_inclusive('\n') {
        lines.push((pos, line));
        pos += line.len();
    }

    let mut fences = Vec::new();
    let mut i = 0;

    'outer: while i < lines.len() {
        let (start, line) = lines[i];
        let opening = match fence_marker(strip_line_ending(line)) {
            Some(marker) => marker,
            None => {
                i += 1;
                continue;
            }
        };

        if opening.ch == '`' && opening.rest.contains('`') {
            i += 1;
            continue;
        }

        let body_start = start + line.len();
        for (j, &(close_start, close_line)) in lines.iter().enumerate().skip(i + 1) {
            let content = strip_line_ending(close_line);
            let closes = fence_marker(content).is_some_and(|m| {
                m.ch == opening.ch && m.len >= opening.len && m.rest.trim().is_empty()
            });
            if closes {
                let body = if close_start > body_start {
                    strip_line_ending(&text[body_start..close_start])
                } else {
                    ""
                };
                fences.push(Fence {
                    span: start + opening.indent..close_start + content.len(),
                    indent: opening.indent,
                    info: opening.rest.trim(),
                    body: dedent(body, opening.indent),
                });
                i = j + 1;
                continue 'outer;
            }
        }

        break;
    }

    fences
}

/// Result of expanding a document body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expansion {
    pub text: String,
    /// Chart placeholders emitted
    pub charts: usize,
    /// Diagrams resolved to images
    pub diagrams: usize,
    /// Diagrams that fell back to escaped source
    pub diagram_failures: usize,
}

impl Expansion {
    pub fn chart_included(&self) -> bool {
        self.charts > 0
    }
}

/// Rewrites diagram and chart fences into embeddable markup
#[derive(Clone)]
pub struct BlockExpander {
    resolver: Arc<dyn DiagramResolver>,
    timeout: Duration,
}

impl BlockExpander {
    /// `timeout` bounds every diagram resolution; running out counts as a failure
    pub fn new(resolver: Arc<dyn DiagramResolver>, timeout: Duration) -> Self {
        Self { resolver, timeout }
    }

    /// Expand all diagram and chart fences in `body`
    pub async fn expand(&self, body: &str) -> Expansion {
        let mut expansion = Expansion {
            text: String::with_capacity(body.len()),
            ..Default::default()
        };
        let mut last = 0;

        for fence in scan_fences(body) {
            expansion.text.push_str(&body[last..fence.span.start]);
            let original = &body[fence.span.clone()];

            match fence.kind() {
                FenceKind::Diagram => match self.resolve_diagram(&fence.body).await {
                    Ok(url) => {
                        expansion.diagrams += 1;
                        expansion.text.push_str(&diagram_img(&url));
                    }
                    Err(e) => {
                        tracing::warn!("Failed to generate diagram: {}", e);
                        expansion.diagram_failures += 1;
                        let failure = diagram_failure(&fence.body, &e);
                        expansion.text.push_str(&reindent(&failure, fence.indent));
                    }
                },
                FenceKind::Chart(chart) => match chart_placeholder(chart, &fence.body) {
                    Some(svg) => {
                        expansion.charts += 1;
                        expansion.text.push_str(&svg);
                    }
                    None => {
                        tracing::debug!("Chart block with invalid JSON left unchanged");
                        expansion.text.push_str(original);
                    }
                },
                FenceKind::Other => expansion.text.push_str(original),
            }

            last = fence.span.end;
        }

        expansion.text.push_str(&body[last..]);
        expansion
    }

    async fn resolve_diagram(&self, source: &str) -> Result<String, DiagramError> {
        match tokio::time::timeout(self.timeout, self.resolver.resolve(source)).await {
            Ok(result) => result,
            Err(_) => Err(DiagramError::Timeout(self.timeout)),
        }
    }
}

fn diagram_img(url: &str) -> String {
    format!(r#"<img src="{}" alt="PlantUML diagram">"#, html_escape(url))
}

fn diagram_failure(source: &str, error: &DiagramError) -> String {
    format!(
        "<pre>{}</pre><p><em>Failed to generate diagram: {}</em></p>",
        html_escape(source),
        html_escape(&error.to_string())
    )
}

/// Chart placeholder, `None` when the payload is not valid JSON
fn chart_placeholder(chart: &str, payload: &str) -> Option<String> {
    let data: serde_json::Value = serde_json::from_str(payload.trim()).ok()?;
    Some(format!(
        "<svg class='chart' width='500' height='300' data-type='{}' data-json='{}'></svg>",
        attr_escape(chart),
        attr_escape(&data.to_string())
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedUrl;

    #[async_trait]
    impl DiagramResolver for FixedUrl {
        async fn resolve(&self, _source: &str) -> Result<String, DiagramError> {
            Ok("https://diagrams.test/svg/abc".to_string())
        }
    }

    struct Rejecting;

    #[async_trait]
    impl DiagramResolver for Rejecting {
        async fn resolve(&self, _source: &str) -> Result<String, DiagramError> {
            Err(DiagramError::Status(500))
        }
    }

    struct Stalled;

    #[async_trait]
    impl DiagramResolver for Stalled {
        async fn resolve(&self, _source: &str) -> Result<String, DiagramError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok("never".to_string())
        }
    }

    fn expander(resolver: impl DiagramResolver + 'static) -> BlockExpander {
        BlockExpander::new(Arc::new(resolver), Duration::from_millis(50))
    }

    #[test]
    fn test_scan_fences() {
        let text = "intro\n```plantuml\nA -> B\n```\nmiddle\n~~~~json bar\n{}\n~~~~\nend";
        let fences = scan_fences(text);
        assert_eq!(fences.len(), 2);

        assert_eq!(fences[0].info, "plantuml");
        assert_eq!(fences[0].body, "A -> B");
        assert_eq!(&text[fences[0].span.clone()], "```plantuml\nA -> B\n```");
        assert_eq!(fences[0].kind(), FenceKind::Diagram);

        assert_eq!(fences[1].info, "json bar");
        assert_eq!(fences[1].kind(), FenceKind::Chart("bar"));
    }

    #[test]
    fn test_fence_needs_matching_close() {
        // A shorter or different closing run does not end the fence
        let text = "````rust\n```\nstill code\n~~~\n````\nafter";
        let fences = scan_fences(text);
        assert_eq!(fences.len(), 1);
        assert_eq!(fences[0].body, "```\nstill code\n~~~");
    }

    #[test]
    fn test_unclosed_fence_stops_scan() {
        let fences = scan_fences("```plantuml\nA -> B\n");
        assert!(fences.is_empty());
    }

    #[test]
    fn test_fence_kinds() {
        let kind = |info: &'static str| {
            Fence {
                span: 0..0,
                indent: 0,
                info,
                body: Cow::Borrowed(""),
            }
            .kind()
        };
        assert_eq!(kind("json"), FenceKind::Other);
        assert_eq!(kind("json line extra"), FenceKind::Other);
        assert_eq!(kind("json pie-chart"), FenceKind::Other);
        assert_eq!(kind("json line_2"), FenceKind::Chart("line_2"));
        assert_eq!(kind("mermaid"), FenceKind::Other);
    }

    #[tokio::test]
    async fn test_diagram_success() {
        let body = "Before\n\n```plantuml\n@startuml\nA -> B\n@enduml\n```\n\nAfter";
        let out = expander(FixedUrl).expand(body).await;
        assert_eq!(
            out.text,
            "Before\n\n<img src=\"https://diagrams.test/svg/abc\" alt=\"PlantUML diagram\">\n\nAfter"
        );
        assert_eq!(out.diagrams, 1);
        assert_eq!(out.diagram_failures, 0);
    }

    #[tokio::test]
    async fn test_diagram_failure_degrades() {
        let body = "Before\n```plantuml\nA -> <B>\n```\nAfter";
        let out = expander(Rejecting).expand(body).await;
        assert!(out.text.starts_with("Before\n<pre>A -&gt; &lt;B&gt;</pre>"));
        assert!(out
            .text
            .contains("<p><em>Failed to generate diagram: server responded with status 500</em></p>"));
        assert!(out.text.ends_with("\nAfter"));
        assert_eq!(out.diagram_failures, 1);
    }

    #[tokio::test]
    async fn test_diagram_timeout_degrades() {
        let out = expander(Stalled).expand("```plantuml\nA -> B\n```").await;
        assert!(out.text.starts_with("<pre>A -&gt; B</pre>"));
        assert!(out.text.contains("timed out"));
    }

    #[tokio::test]
    async fn test_chart_placeholder() {
        let body = "Chart:\n```json bar\n{\"x\":1}\n```\n";
        let out = expander(FixedUrl).expand(body).await;
        assert_eq!(
            out.text,
            "Chart:\n<svg class='chart' width='500' height='300' data-type='bar' data-json='{\"x\":1}'></svg>\n"
        );
        assert!(out.chart_included());
    }

    #[tokio::test]
    async fn test_chart_reserializes_compactly() {
        let body = "```json line\n{\n  \"b\": [1, 2],\n  \"a\": \"it's\"\n}\n```";
        let out = expander(FixedUrl).expand(body).await;
        assert!(out
            .text
            .contains("data-json='{\"b\":[1,2],\"a\":\"it&#39;s\"}'"));
    }

    #[tokio::test]
    async fn test_bad_chart_json_left_unchanged() {
        let body = "Text\n```json bar\n{\"x\": oops}\n```\nMore";
        let out = expander(FixedUrl).expand(body).await;
        assert_eq!(out.text, body);
        assert!(!out.chart_included());
    }

    #[tokio::test]
    async fn test_other_fences_untouched() {
        let body = "```rust\nfn main() {}\n```\n\n```mermaid\ngraph TD\n```\n\n```json\n{}\n```";
        let out = expander(Rejecting).expand(body).await;
        assert_eq!(out.text, body);
        assert_eq!(out, Expansion {
            text: body.to_string(),
            ..Default::default()
        });
    }
    #[test]
    fn test_indented_fence_body_is_dedented() {
        let text = "1. Step\n\n    ```plantuml\n    A -> B\n      note\n    ```\n";
        let fences = scan_fences(text);
        assert_eq!(fences.len(), 1);
        assert_eq!(fences[0].indent, 4);
        assert_eq!(fences[0].body, "A -> B\n  note");
        assert_eq!(&text[fences[0].span.clone()], "```plantuml\n    A -> B\n      note\n    ```");
    }

    #[tokio::test]
    async fn test_fences_in_list_item_and_admonition() {
        let body = "1. Step one\n\n    ```plantuml\n    A -> B\n    ```\n\n!!! note\n    ```json bar\n    {\"x\":1}\n    ```\n";
        let out = expander(FixedUrl).expand(body).await;
        assert_eq!(out.diagrams, 1);
        assert_eq!(out.charts, 1);
        assert_eq!(
            out.text,
            "1. Step one\n\n    <img src=\"https://diagrams.test/svg/abc\" alt=\"PlantUML diagram\">\n\n\
             !!! note\n    <svg class='chart' width='500' height='300' data-type='bar' data-json='{\"x\":1}'></svg>\n"
        );
    }

    #[tokio::test]
    async fn test_indented_diagram_failure_stays_in_item() {
        let body = "- item\n\n  ```plantuml\n  A -> B\n  B -> C\n  ```\n";
        let out = expander(Rejecting).expand(body).await;
        assert!(out
            .text
            .starts_with("- item\n\n  <pre>A -&gt; B\n  B -&gt; C</pre>"));
    }
}
