//! Prompt sections.

use serde::{Deserialize, Serialize};

/// One named, headed block of text destined for a model context.
///
/// Built fresh for every assembly and never persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSection {
    /// Stable section ID (`session-meta`, `agent-rules`, ...). Drives eviction priority.
    pub id: String,
    /// Markdown heading text.
    pub heading: String,
    /// Section body.
    pub content: String,
}

impl PromptSection {
    /// Build a section, returning `None` when `content` is blank.
    #[must_use]
    pub fn non_empty(
        id: impl Into<String>,
        heading: impl Into<String>,
        content: impl Into<String>,
    ) -> Option<Self> {
        let content = content.into();
        if content.trim().is_empty() {
            return None;
        }
        Some(Self {
            id: id.into(),
            heading: heading.into(),
            content,
        })
    }

    /// Render as `# heading\n\ncontent\n`.
    #[must_use]
    pub fn render(&self) -> String {
        format!("# {}\n\n{}\n", self.heading, self.content.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_content_yields_none() {
        assert!(PromptSection::non_empty("x", "X", "  \n ").is_none());
        assert!(PromptSection::non_empty("x", "X", "body").is_some());
    }

    #[test]
    fn render_trims_content() {
        let section = PromptSection::non_empty("x", "Heading", "\n body \n").unwrap();
        assert_eq!(section.render(), "# Heading\n\nbody\n");
    }
}
