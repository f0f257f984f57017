//! Emoji shortcode expansion into twemoji images

use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    static ref SHORTCODE: Regex = Regex::new(r":([a-zA-Z0-9_+\-]+):").unwrap();
}

const ZWJ: char = '\u{200d}';
const VS16: char = '\u{fe0f}';

/// twemoji asset name for an emoji: lowercase hex codepoints joined by `-`.
/// The variation selector is dropped unless the emoji is a ZWJ sequence.
pub fn twemoji_code(emoji: &str) -> String {
    let keep_vs16 = emoji.contains(ZWJ);
    emoji
        .chars()
        .filter(|&c| keep_vs16 || c != VS16)
        .map(|c| format!("{:x}", c as u32))
        .collect::<Vec<_>>()
        .join("-")
}

/// Image tag for a single shortcode, `None` if the shortcode is unknown
pub fn emoji_img(shortcode: &str, cdn: &str) -> Option<String> {
    let emoji = emojis::get_by_shortcode(shortcode)?;
    Some(format!(
        r#"<img alt="{}" class="twemoji" src="{}{}.svg" title=":{}:" />"#,
        emoji.as_str(),
        cdn,
        twemoji_code(emoji.as_str()),
        shortcode
    ))
}

/// Replace every known `:shortcode:` in already-escaped HTML text
pub fn replace_shortcodes(html: &str, cdn: &str) -> String {
    SHORTCODE
        .replace_all(html, |caps: &Captures| {
            emoji_img(&caps[1], cdn).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
