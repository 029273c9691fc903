/// Split a free-text query into lower-case search tokens.
///
/// Punctuation is removed, runs of whitespace collapse, and empty tokens are
/// dropped. An empty result means the query has nothing searchable in it.
pub fn normalize(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}
