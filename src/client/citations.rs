use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::models::Source;

fn marker_re() -> &'static Regex {
    static MARKER_RE: OnceLock<Regex> = OnceLock::new();
    MARKER_RE.get_or_init(|| Regex::new(r"\[([0-9]+)\]").expect("citation marker pattern is valid"))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Citation {
    pub id: String,
    /// The source's page, or the marker number when the source has none.
    pub page: i64,
    pub content: String,
    pub similarity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Text(String),
    Marker {
        raw: String,
        number: usize,
        citation: Option<Citation>,
    },
}

impl Segment {
    /// Only markers that resolved to a source can be activated.
    pub fn is_interactive(&self) -> bool {
        matches!(
            self,
            Segment::Marker {
                citation: Some(_),
                ..
            }
        )
    }

    /// The exact text this segment covers in the answer.
    pub fn as_str(&self) -> &str {
        match self {
            Segment::Text(text) => text,
            Segment::Marker { raw, .. } => raw,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedAnswer {
    pub citations: Vec<Citation>,
    pub segments: Vec<Segment>,
}

/// Resolves `[n]` markers against `sources[n - 1]`. Numbers outside
/// `1..=sources.len()` never become citations and render as plain text.
pub fn parse_answer(text: &str, sources: &[Source]) -> ParsedAnswer {
    ParsedAnswer {
        citations: extract_citations(text, sources),
        segments: split_segments(text, sources),
    }
}

/// Distinct resolvable markers in order of first appearance.
pub fn extract_citations(text: &str, sources: &[Source]) -> Vec<Citation> {
    let mut seen = HashSet::new();
    let mut citations = Vec::new();

    for captures in marker_re().captures_iter(text) {
        let Some(number) = captures.get(1).and_then(|m| m.as_str().parse::<usize>().ok()) else {
            continue;
        };
        if !seen.insert(number) {
            continue;
        }
        if let Some(citation) = resolve(number, sources) {
            citations.push(citation);
        }
    }

    citations
}

/// Splits `text` into plain runs and marker tokens. Concatenating the segments'
/// text gives back `text` unchanged.
pub fn split_segments(text: &str, sources: &[Source]) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut pending = String::new();
    let mut last = 0;

    for captures in marker_re().captures_iter(text) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        pending.push_str(&text[last..whole.start()]);
        last = whole.end();

        // Digit runs too long for usize cannot name a source; keep them as text.
        let Some(number) = captures.get(1).and_then(|m| m.as_str().parse::<usize>().ok()) else {
            pending.push_str(whole.as_str());
            continue;
        };

        if !pending.is_empty() {
            segments.push(Segment::Text(std::mem::take(&mut pending)));
        }
        segments.push(Segment::Marker {
            raw: whole.as_str().to_string(),
            number,
            citation: resolve(number, sources),
        });
    }

    pending.push_str(&text[last..]);
    if !pending.is_empty() {
        segments.push(Segment::Text(pending));
    }

    segments
}

fn resolve(number: usize, sources: &[Source]) -> Option<Citation> {
    let source = sources.get(number.checked_sub(1)?)?;
    Some(Citation {
        id: source.id.clone(),
        page: source.page.unwrap_or(number as i64),
        content: source.content.clone(),
        similarity: source.similarity,
    })
}
