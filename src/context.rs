use crate::models::RetrievedPassage;

/// Label used in place of a page number the passage does not carry.
const UNKNOWN_PAGE: &str = "?";

/// Renders passages as `[n] (Page P) content` blocks separated by a blank line.
///
/// `n` is the 1-based position in `passages`, the same number the client resolves
/// `[n]` markers against. Returns an empty string for an empty slice.
pub fn build_context(passages: &[RetrievedPassage]) -> String {
    passages
        .iter()
        .enumerate()
        .map(|(i, passage)| {
            let page = passage
                .page()
                .map(|p| p.to_string())
                .unwrap_or_else(|| UNKNOWN_PAGE.to_string());
            format!("[{}] (Page {}) {}", i + 1, page, passage.content)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
