use anyhow::Result;

use super::song_data::Song;

/// Searchable song columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Artist,
}

impl Field {
    /// Column holding the case-folded copy of this field.
    pub fn folded_column(&self) -> &'static str {
        match self {
            Field::Name => "name_folded",
            Field::Artist => "artist_folded",
        }
    }
}

/// One condition on one field. Matching ignores case (Unicode lowercase, so
/// "ÉDITH" matches "Édith") for all three forms; the text is the user's
/// literal input and is never interpreted as a pattern by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    Equals(Field, String),
    StartsWith(Field, String),
    Contains(Field, String),
}

/// A record-store query: either any or all of its clauses must hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Any(Vec<Clause>),
    All(Vec<Clause>),
}

impl Predicate {
    /// `name <op> text OR artist <op> text`, the shape most lookups use.
    pub fn either_field(make: fn(Field, String) -> Clause, text: &str) -> Self {
        Predicate::Any(vec![
            make(Field::Name, text.to_string()),
            make(Field::Artist, text.to_string()),
        ])
    }
}

/// The record-store capability the search engine runs on.
///
/// Implementations must be shareable across threads: the retriever issues
/// several lookups at once from blocking tasks.
pub trait SongStore: Send + Sync {
    fn find_where(&self, predicate: &Predicate) -> Result<Vec<Song>>;
}

/// Case-fold text for storage and comparison.
pub fn fold_case(text: &str) -> String {
    text.to_lowercase()
}

/// Escape LIKE metacharacters so user input matches literally.
/// Pair with `ESCAPE '\'` in the SQL.
pub fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_case_handles_accents() {
        assert_eq!(fold_case("ÉDITH Piaf"), "édith piaf");
        assert_eq!(fold_case("Björk"), fold_case("BJÖRK"));
        assert_eq!(fold_case("100%_x"), "100%_x");
    }

    #[test]
    fn escape_like_neutralizes_wildcards() {
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
        assert_eq!(escape_like("Don't Stop"), "Don't Stop");
    }

    #[test]
    fn either_field_builds_or_clause() {
        let p = Predicate::either_field(Clause::StartsWith, "abba");
        assert_eq!(
            p,
            Predicate::Any(vec![
                Clause::StartsWith(Field::Name, "abba".into()),
                Clause::StartsWith(Field::Artist, "abba".into()),
            ])
        );
    }
}
