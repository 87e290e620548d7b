use crate::models::{RetrievedPassage, Source};

/// Maps passages to the source list returned to clients, keeping their order.
///
/// `index` and `id` derive only from position, so they line up with the `[n]`
/// numbering of the context block built from the same slice.
pub fn normalize_sources(passages: &[RetrievedPassage]) -> Vec<Source> {
    passages
        .iter()
        .enumerate()
        .map(|(i, passage)| {
            let index = i + 1;
            Source {
                id: format!("source-{index}"),
                page: passage.page(),
                content: passage.content.clone(),
                similarity: if passage.similarity.is_finite() {
                    passage.similarity
                } else {
                    0.0
                },
                index,
            }
        })
        .collect()
}
