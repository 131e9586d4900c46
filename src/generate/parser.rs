//! Marker-grammar parser for generated style blocks.
//!
//! The generator is instructed to emit, for each style `S`, a pair of begin
//! markers `---S_TEXT---` and `---S_PROMPT---` (style name uppercased, spaces
//! mapped to `_`). A span runs from the end of its marker to the start of the
//! next recognized marker of any style, or end-of-text. That closing rule is
//! the contract: a block whose counterpart marker is missing can never swallow
//! a later style's block.

use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::OnceCell;
use regex::Regex;

use crate::report::Variant;

/// Zero variants could be extracted for any expected style. Callers treat
/// this the same as a generation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseFailure;

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no usable style variants in model output")
    }
}

impl std::error::Error for ParseFailure {}

fn style_slug(name: &str) -> String {
    name.trim()
        .to_uppercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

pub fn text_marker(style: &str) -> String {
    format!("---{}_TEXT---", style_slug(style))
}

pub fn prompt_marker(style: &str) -> String {
    format!("---{}_PROMPT---", style_slug(style))
}

/// Extract one `Variant` per expected style found in `raw`. Partial success
/// is success; only zero variants overall is a `ParseFailure`.
pub fn parse_styled_output(
    raw: &str,
    styles: &[String],
) -> Result<BTreeMap<String, Variant>, ParseFailure> {
    // All recognized marker start offsets bound every span.
    let mut boundaries: Vec<usize> = Vec::new();
    let mut text_starts: BTreeMap<&str, usize> = BTreeMap::new();
    let mut prompt_starts: BTreeMap<&str, usize> = BTreeMap::new();

    for style in styles {
        let t = text_marker(style);
        for (pos, _) in raw.match_indices(&t) {
            boundaries.push(pos);
        }
        if let Some(pos) = raw.find(&t) {
            text_starts.insert(style.as_str(), pos + t.len());
        }
        let p = prompt_marker(style);
        for (pos, _) in raw.match_indices(&p) {
            boundaries.push(pos);
        }
        if let Some(pos) = raw.find(&p) {
            prompt_starts.insert(style.as_str(), pos + p.len());
        }
    }
    boundaries.sort_unstable();

    let span_end = |start: usize| {
        boundaries
            .iter()
            .copied()
            .find(|&b| b >= start)
            .unwrap_or(raw.len())
    };

    let mut variants = BTreeMap::new();
    for style in styles {
        let Some(&start) = text_starts.get(style.as_str()) else {
            continue;
        };
        let body = clean_block(&raw[start..span_end(start)]);
        if body.is_empty() {
            continue;
        }
        let image_prompt = prompt_starts
            .get(style.as_str())
            .map(|&s| clean_block(&raw[s..span_end(s)]))
            .filter(|p| !p.is_empty());
        variants.insert(
            style.clone(),
            Variant {
                style: style.clone(),
                body,
                image_prompt,
            },
        );
    }

    if variants.is_empty() {
        Err(ParseFailure)
    } else {
        Ok(variants)
    }
}

/// Strip known model artifacts: bracketed numeric citations and runs of 3+
/// newlines collapsed to one blank line.
fn clean_block(s: &str) -> String {
    static RE_CITE: OnceCell<Regex> = OnceCell::new();
    let re_cite = RE_CITE.get_or_init(|| Regex::new(r"\[\d+\]").unwrap());
    let out = re_cite.replace_all(s, "");

    static RE_BLANKS: OnceCell<Regex> = OnceCell::new();
    let re_blanks = RE_BLANKS.get_or_init(|| Regex::new(r"\n{3,}").unwrap());
    let out = re_blanks.replace_all(&out, "\n\n");

    out.trim().to_string()
}
