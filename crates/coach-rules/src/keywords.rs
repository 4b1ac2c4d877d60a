//! Keyword derivation for extracted rules.

use std::collections::BTreeSet;

/// Tokens never kept as rule keywords: connectives, vague instruction verbs
/// and words describing document structure rather than behaviour.
pub const EXTRACTION_STOP_WORDS: &[&str] = &[
    "about", "across", "after", "again", "also", "and", "any", "are", "avoid", "because",
    "been", "before", "being", "but", "can", "checklist", "consider", "could", "does", "each",
    "etc", "for", "from", "guide", "guideline", "guidelines", "has", "have", "here", "how",
    "idiom", "idioms", "into", "its", "just", "like", "make", "more", "most", "much", "note",
    "notes", "only", "other", "our", "overview", "per", "please", "prefer", "prefers",
    "rather", "rule", "rules", "section", "some", "such", "than", "that", "the", "their",
    "them", "then", "there", "these", "they", "this", "those", "through", "use", "used",
    "uses", "using", "very", "via", "was", "were", "what", "when", "where", "which", "while",
    "who", "will", "with", "within", "without", "would", "you", "your",
];

/// Whether `token` is on the extraction stop-list.
pub fn is_stop_word(token: &str) -> bool {
    EXTRACTION_STOP_WORDS.contains(&token)
}

/// Lowercase `text` and split it on every non-alphanumeric character,
/// keeping tokens longer than two characters.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| t.len() > 2)
        .map(str::to_ascii_lowercase)
}

/// Deduplicated keyword set for `text` with stop words removed.
pub fn derive_keywords(text: &str) -> BTreeSet<String> {
    tokenize(text).filter(|t| !is_stop_word(t)).collect()
}
