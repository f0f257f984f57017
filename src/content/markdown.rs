//! Markdown rendering with syntax highlighting

use lazy_static::lazy_static;
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

use super::blocks::scan_fences;
use crate::helpers::{html_escape, replace_shortcodes, title_case};

lazy_static! {
    static ref MARK: Regex = Regex::new(r"==(\S(?:.*?\S)?)==").unwrap();
    static ref ADMONITION: Regex =
        Regex::new(r#"^!!!\s+([\w-]+(?:\s+[\w-]+)*)(?:\s+"([^"]*)")?\s*$"#).unwrap();
}

/// Fence language rendered client-side instead of highlighted
const MERMAID: &str = "mermaid";

/// HTML that is already escaped and safe to embed as-is
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SafeHtml(String);

impl SafeHtml {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SafeHtml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Markdown renderer with syntax highlighting
pub struct MarkdownRenderer {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
    theme_name: String,
    line_numbers: bool,
    emoji_cdn: String,
}

struct CodeBlock {
    lang: Option<String>,
    content: String,
}

impl MarkdownRenderer {
    /// Create a new markdown renderer
    pub fn new() -> Self {
        Self::with_options(
            "InspiredGitHub",
            false,
            "https://cdn.jsdelivr.net/gh/jdecked/twemoji@15.1.0/assets/svg/",
        )
    }

    /// Create with custom settings
    pub fn with_options(theme: &str, line_numbers: bool, emoji_cdn: &str) -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
            theme_name: theme.to_string(),
            line_numbers,
            emoji_cdn: emoji_cdn.to_string(),
        }
    }

    /// Render markdown to HTML
    pub fn render(&self, markdown: &str) -> SafeHtml {
        let source = expand_admonitions(markdown);
        let options = Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_HEADING_ATTRIBUTES
            | Options::ENABLE_DEFINITION_LIST
            | Options::ENABLE_GFM;
        let parser = Parser::new_ext(&source, options);

        let mut events: Vec<Event> = Vec::new();
        let mut code_block: Option<CodeBlock> = None;
        // Adjacent text events are merged so inline syntax split across them still matches
        let mut pending_text = String::new();
        let mut image_depth = 0usize;

        for event in parser {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    self.flush_text(&mut pending_text, &mut events);
                    let lang = match kind {
                        CodeBlockKind::Fenced(info) => info
                            .split_whitespace()
                            .next()
                            .map(|lang| lang.to_string()),
                        CodeBlockKind::Indented => None,
                    };
                    code_block = Some(CodeBlock {
                        lang,
                        content: String::new(),
                    });
                }
                Event::End(TagEnd::CodeBlock) => {
                    if let Some(block) = code_block.take() {
                        events.push(Event::Html(CowStr::from(self.code_block_html(&block))));
                    }
                }
                Event::Text(text) => match code_block.as_mut() {
                    Some(block) => block.content.push_str(&text),
                    None if image_depth == 0 => pending_text.push_str(&text),
                    None => events.push(Event::Text(text)),
                },
                other => {
                    if code_block.is_some() {
                        continue;
                    }
                    self.flush_text(&mut pending_text, &mut events);
                    match &other {
                        Event::Start(Tag::Image { .. }) => image_depth += 1,
                        Event::End(TagEnd::Image) => image_depth = image_depth.saturating_sub(1),
                        _ => {}
                    }
                    events.push(other);
                }
            }
        }
        self.flush_text(&mut pending_text, &mut events);

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());

        SafeHtml(html_output)
    }

    fn flush_text(&self, pending: &mut String, events: &mut Vec<Event>) {
        if pending.is_empty() {
            return;
        }
        events.push(Event::InlineHtml(CowStr::from(self.inline_text(pending))));
        pending.clear();
    }

    /// Escape plain text and apply `==mark==` and `:emoji:` syntax
    fn inline_text(&self, text: &str) -> String {
        let escaped = html_escape(text);
        let marked = MARK.replace_all(&escaped, "<mark>$1</mark>");
        replace_shortcodes(&marked, &self.emoji_cdn)
    }

    fn code_block_html(&self, block: &CodeBlock) -> String {
        match block.lang.as_deref() {
            Some(MERMAID) => format!(
                r#"<div class="mermaid">{}</div>"#,
                html_escape(&block.content)
            ),
            lang => self.highlight_code(&block.content, lang),
        }
    }

    /// Highlight a code block
    fn highlight_code(&self, code: &str, lang: Option<&str>) -> String {
        let lang = lang.unwrap_or("text");

        // Try to find syntax for the language
        let syntax = self
            .syntax_set
            .find_syntax_by_token(lang)
            .or_else(|| self.syntax_set.find_syntax_by_extension(lang))
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        let theme = self
            .theme_set
            .themes
            .get(&self.theme_name)
            .or_else(|| self.theme_set.themes.values().next());

        let highlighted = theme.and_then(|theme| {
            highlighted_html_for_string(code, &self.syntax_set, syntax, theme).ok()
        });

        let lang = html_escape(lang);
        match highlighted {
            Some(highlighted) if self.line_numbers => {
                self.add_line_numbers(&highlighted, code, &lang)
            }
            Some(highlighted) => format!(
                r#"<div class="highlight language-{}">{}</div>"#,
                lang, highlighted
            ),
            // Fallback to plain code block
            None => format!(
                r#"<pre><code class="language-{}">{}</code></pre>"#,
                lang,
                html_escape(code)
            ),
        }
    }

    /// Wrap highlighted code in a table with a line-number gutter.
    /// Numbers come from the source lines; syntect's own `<pre>` wrapper is
    /// reused for the code column.
    fn add_line_numbers(&self, highlighted: &str, code: &str, lang: &str) -> String {
        let (pre_open, inner) = split_pre(highlighted).unwrap_or(("<pre>", highlighted));

        let gutter = (1..=code.lines().count().max(1))
            .map(|n| format!(r#"<span class="line-number">{}</span>"#, n))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"<figure class="highlight {}"><table><tr><td class="gutter"><pre>{}</pre></td><td class="code">{}{}</pre></td></tr></table></figure>"#,
            lang,
            gutter,
            pre_open,
            inner.trim_end_matches('\n')
        )
    }
}

/// Split `<pre ...>\n...</pre>` into its opening tag and contents
fn split_pre(html: &str) -> Option<(&str, &str)> {
    let html = html.trim_end();
    if !html.starts_with("<pre") {
        return None;
    }
    let open_end = html.find('>')? + 1;
    let inner = html[open_end..].strip_suffix("</pre>")?;
    Some((&html[..open_end], inner.strip_prefix('\n').unwrap_or(inner)))
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn strip_line_ending(line: &str) -> &str {
    line.trim_end_matches('\n').trim_end_matches('\r')
}

/// Rewrite `!!! type "Title"` blocks and their indented bodies into
/// `<div class="admonition type">` wrappers. Fenced code is left alone.
fn expand_admonitions(markdown: &str) -> String {
    if !markdown.contains("!!!") {
        return markdown.to_string();
    }

    let fences = scan_fences(markdown);
    let in_fence = |offset: usize| fences.iter().any(|f| f.span.contains(&offset));

    let mut lines = Vec::new();
    let mut pos = 0;
    for line in markdown.split_inclusive('\n') {
        lines.push((pos, line));
        pos += line.len();
    }

    let mut out = String::with_capacity(markdown.len());
    let mut i = 0;

    while i < lines.len() {
        let (offset, line) = lines[i];
        let caps = if in_fence(offset) {
            None
        } else {
            ADMONITION.captures(strip_line_ending(line))
        };

        let Some(caps) = caps else {
            out.push_str(line);
            i += 1;
            continue;
        };

        let classes = caps[1].split_whitespace().collect::<Vec<_>>().join(" ");
        let title = match caps.get(2) {
            Some(title) => title.as_str().to_string(),
            None => title_case(caps[1].split_whitespace().next().unwrap_or_default()),
        };

        // Body: following lines indented by four spaces (or a tab), blank lines allowed inside
        let mut last_body_line = i;
        for (j, &(_, body_line)) in lines.iter().enumerate().skip(i + 1) {
            let body_line = strip_line_ending(body_line);
            if body_line.trim().is_empty() {
                continue;
            }
            if body_line.starts_with("    ") || body_line.starts_with('\t') {
                last_body_line = j;
            } else {
                break;
            }
        }

        let mut body = String::new();
        for &(_, body_line) in &lines[i + 1..=last_body_line] {
            let body_line = strip_line_ending(body_line);
            let dedented = body_line
                .strip_prefix("    ")
                .or_else(|| body_line.strip_prefix('\t'))
                .unwrap_or(body_line);
            body.push_str(dedented);
            body.push('\n');
        }

        out.push_str(&format!(r#"<div class="admonition {}">"#, html_escape(&classes)));
        out.push('\n');
        if !title.is_empty() {
            out.push_str(&format!(
                r#"<p class="admonition-title">{}</p>"#,
                html_escape(&title)
            ));
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&expand_admonitions(&body));
        out.push_str("\n</div>\n\n");

        i = last_body_line + 1;
    }

    out
}
