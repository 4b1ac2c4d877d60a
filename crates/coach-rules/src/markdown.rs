//! Structural parse of instruction documents.
//!
//! Splits a Markdown document into [`Section`]s at every heading. Each
//! section records its heading text and level, every list item's own text in
//! document order (nested items are separate entries and do not leak into
//! their parent), the paragraphs outside lists, and the raw body between this
//! heading and the next.
//!
//! Text before the first heading becomes an `Introduction` section at level 1,
//! kept only when it has content.

use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};

/// Heading given to content that precedes the first heading.
pub const INTRODUCTION_HEADING: &str = "Introduction";

/// One heading-delimited region of a document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Section {
    /// Heading text with inline markup stripped.
    pub heading: String,
    /// Heading level, 1 through 6.
    pub level: u8,
    /// List item texts in document order, nested items included.
    pub bullets: Vec<String>,
    /// Paragraphs outside any list.
    pub prose: Vec<String>,
    /// Source text between this heading and the next, trimmed.
    pub body: String,
}

#[derive(Default)]
struct SectionBuilder {
    heading: String,
    level: u8,
    body_start: usize,
    bullets: Vec<String>,
    prose: Vec<String>,
}

impl SectionBuilder {
    fn finish(self, source: &str, body_end: usize) -> Section {
        let body = source
            .get(self.body_start..body_end)
            .unwrap_or_default()
            .trim()
            .to_owned();
        Section {
            heading: self.heading.trim().to_owned(),
            level: self.level,
            bullets: self
                .bullets
                .into_iter()
                .map(|b| b.trim().to_owned())
                .filter(|b| !b.is_empty())
                .collect(),
            prose: self.prose,
            body,
        }
    }
}

/// Where inline text is currently routed.
#[derive(Default)]
struct Cursor {
    in_heading: bool,
    in_paragraph: bool,
    in_code_block: bool,
    /// Indices into the current section's bullets, innermost last.
    items: Vec<usize>,
    paragraph: String,
}

/// Parse a document into sections.
pub fn parse_sections(source: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current = SectionBuilder {
        heading: INTRODUCTION_HEADING.to_owned(),
        level: 1,
        ..SectionBuilder::default()
    };
    let mut is_intro = true;
    let mut cursor = Cursor::default();

    for (event, range) in Parser::new(source).into_offset_iter() {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                let finished = std::mem::take(&mut current).finish(source, range.start);
                if !is_intro || !finished.body.is_empty() {
                    sections.push(finished);
                }
                is_intro = false;
                current.level = heading_depth(level);
                cursor = Cursor {
                    in_heading: true,
                    ..Cursor::default()
                };
            }
            Event::End(TagEnd::Heading(_)) => {
                cursor.in_heading = false;
                current.body_start = range.end;
            }
            Event::Start(Tag::Item) => {
                current.bullets.push(String::new());
                cursor.items.push(current.bullets.len() - 1);
            }
            Event::End(TagEnd::Item) => {
                let _ = cursor.items.pop();
            }
            Event::Start(Tag::Paragraph) => {
                if let Some(&item) = cursor.items.last() {
                    push_space(&mut current.bullets[item]);
                } else {
                    cursor.in_paragraph = true;
                    cursor.paragraph.clear();
                }
            }
            Event::End(TagEnd::Paragraph) => {
                if cursor.in_paragraph && cursor.items.is_empty() {
                    let text = cursor.paragraph.trim();
                    if !text.is_empty() {
                        current.prose.push(text.to_owned());
                    }
                    cursor.in_paragraph = false;
                }
            }
            Event::Start(Tag::CodeBlock(_)) => cursor.in_code_block = true,
            Event::End(TagEnd::CodeBlock) => cursor.in_code_block = false,
            Event::Text(text) | Event::Code(text) => {
                if !cursor.in_code_block {
                    route_text(&mut current, &mut cursor, &text);
                }
            }
            Event::SoftBreak | Event::HardBreak => route_text(&mut current, &mut cursor, " "),
            _ => {}
        }
    }

    let finished = current.finish(source, source.len());
    if !is_intro || !finished.body.is_empty() {
        sections.push(finished);
    }
    sections
}

fn route_text(section: &mut SectionBuilder, cursor: &mut Cursor, text: &str) {
    if cursor.in_heading {
        section.heading.push_str(text);
    } else if let Some(&item) = cursor.items.last() {
        section.bullets[item].push_str(text);
    } else if cursor.in_paragraph {
        cursor.paragraph.push_str(text);
    }
}

fn push_space(text: &mut String) {
    if !text.is_empty() && !text.ends_with(' ') {
        text.push(' ');
    }
}

fn heading_depth(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}
