//! Name similarity and keyword normalization.

/// Lower-cases `text` and strips all whitespace, so keyword checks are
/// insensitive to both case and spacing ("Cross Fit" matches "crossfit").
#[must_use]
pub fn normalize_for_match(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// `1 − levenshtein(a, b) / max(len(a), len(b))` over the names as given.
///
/// Lengths are counted in chars. Two empty names are fully similar.
#[must_use]
pub fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    let distance = strsim::levenshtein(a, b);
    #[allow(clippy::cast_precision_loss)]
    let score = 1.0 - distance as f64 / max_len as f64;
    score
}
