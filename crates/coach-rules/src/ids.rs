//! Slug IDs unique within one allocation scope.

use std::collections::HashSet;

/// Slug used when a title has no alphanumeric characters.
pub const FALLBACK_SLUG: &str = "section";

/// Lowercase `title`, collapse every run of non-alphanumerics to `-` and trim
/// dashes from both ends.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in title.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        FALLBACK_SLUG.to_owned()
    } else {
        slug
    }
}

/// Hands out IDs, suffixing `-2`, `-3`, ... on collision.
#[derive(Debug, Default)]
pub struct IdAllocator {
    taken: HashSet<String>,
}

impl IdAllocator {
    /// Allocator with no IDs taken.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocator that treats `ids` as already issued.
    pub fn with_taken<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            taken: ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Claim `base` verbatim, or the first free `base-N` with `N >= 2`.
    pub fn claim(&mut self, base: &str) -> String {
        let mut candidate = base.to_owned();
        let mut counter = 2_usize;
        while self.taken.contains(&candidate) {
            candidate = format!("{base}-{counter}");
            counter += 1;
        }
        let _ = self.taken.insert(candidate.clone());
        candidate
    }

    /// Claim the slug of `title`.
    pub fn allocate(&mut self, title: &str) -> String {
        self.claim(&slugify(title))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn slugify_basic() {
        assert_eq!(slugify("Error Handling"), "error-handling");
        assert_eq!(slugify("  --Rust: idioms!--  "), "rust-idioms");
        assert_eq!(slugify("Git -> rebase"), "git-rebase");
        assert_eq!(slugify("Testing-item-3"), "testing-item-3");
    }

    #[test]
    fn slugify_empty_falls_back() {
        assert_eq!(slugify(""), "section");
        assert_eq!(slugify("!!!"), "section");
        assert_eq!(slugify("日本語"), "section");
    }

    #[test]
    fn collisions_get_counters_in_order() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.allocate("Style"), "style");
        assert_eq!(ids.allocate("style"), "style-2");
        assert_eq!(ids.allocate("STYLE!"), "style-3");
        assert_eq!(ids.allocate("Other"), "other");
    }

    #[test]
    fn literal_suffix_does_not_collide() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.allocate("a"), "a");
        assert_eq!(ids.allocate("a 2"), "a-2");
        assert_eq!(ids.allocate("a"), "a-3");
    }

    #[test]
    fn with_taken_seeds_existing() {
        let mut ids = IdAllocator::with_taken(["mis-s-r"]);
        assert_eq!(ids.claim("mis-s-r"), "mis-s-r-2");
    }

    proptest! {
        #[test]
        fn allocated_ids_are_unique(titles in proptest::collection::vec("[a-c -]{0,4}", 0..40)) {
            let mut ids = IdAllocator::new();
            let mut seen = HashSet::new();
            for title in &titles {
                prop_assert!(seen.insert(ids.allocate(title)));
            }
        }
    }
}
