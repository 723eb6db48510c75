//! Textual detection of component tags inside compiled output
//!
//! No parsing happens here. The text is lower-cased and every markup
//! character (`<`, `>`, `/`, quotes, backticks) becomes [`MARKUP_BOUNDARY`]
//! while whitespace runs become [`WHITESPACE_BOUNDARY`]. A tag is referenced
//! when it appears right after a markup boundary and right before either
//! kind of boundary. That catches `<cmp-a>`, `<cmp-a/>`, `</cmp-a>`,
//! `h('cmp-a')` and multi-line attribute lists, while words in prose,
//! comments, markdown and longer tags sharing a prefix never match.

use std::borrow::Cow;

use cow_utils::CowUtils;
use once_cell::sync::Lazy;
use regex::Regex;

/// Replaces `<`, `>`, `/`, quotes and backticks
pub const MARKUP_BOUNDARY: char = '|';
/// Replaces runs of whitespace
pub const WHITESPACE_BOUNDARY: char = '~';
/// Replaces `//` so a line comment never opens a tag boundary
const LINE_COMMENT_MARKER: &str = "_";

static MARKUP_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[<>/'"`]"#).expect("markup pattern is valid"));
static WHITESPACE_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Source text in the normalized form the scanner matches against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText(String);

impl NormalizedText {
    pub fn new(text: &str) -> Self {
        Self(normalize_content(text))
    }

    /// Whether `tag` (already lower-cased) is referenced by the text
    pub fn references(&self, tag: &str) -> bool {
        if tag.is_empty() {
            return false;
        }
        let mut finder = String::with_capacity(tag.len() + 2);
        finder.push(MARKUP_BOUNDARY);
        finder.push_str(tag);
        finder.push(MARKUP_BOUNDARY);
        if self.0.contains(&finder) {
            return true;
        }
        finder.pop();
        finder.push(WHITESPACE_BOUNDARY);
        self.0.contains(&finder)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Normalize text for tag matching
pub fn normalize_content(text: &str) -> String {
    let lowered = text.cow_to_lowercase();
    let without_comments = lowered.cow_replace("//", LINE_COMMENT_MARKER);
    let markup = replace_all(&MARKUP_CHARS, &without_comments, MARKUP_BOUNDARY);
    let normalized = replace_all(&WHITESPACE_RUNS, &markup, WHITESPACE_BOUNDARY);

    let mut wrapped = String::with_capacity(normalized.len() + 2);
    wrapped.push(MARKUP_BOUNDARY);
    wrapped.push_str(&normalized);
    wrapped.push(MARKUP_BOUNDARY);
    wrapped
}

fn replace_all<'t>(pattern: &Regex, text: &'t str, boundary: char) -> Cow<'t, str> {
    let mut buf = [0u8; 4];
    let replacement: &str = boundary.encode_utf8(&mut buf);
    pattern.replace_all(text, regex::NoExpand(replacement))
}

/// Return the candidate tags referenced by `text`, sorted ascending
///
/// Candidates are compared case-insensitively.
pub fn find_component_tags<I, S>(candidates: I, text: &str) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    if text.is_empty() {
        return Vec::new();
    }

    let normalized = NormalizedText::new(text);
    let mut found: Vec<String> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let tag = candidate.as_ref().cow_to_lowercase();
            normalized.references(&tag).then(|| tag.into_owned())
        })
        .collect();
    found.sort();
    found.dedup();
    found
}
