//! Structural parser for generated CV text.
//!
//! The generation endpoint returns plain text with a loose convention:
//! blank-line-separated blocks, where the first block is a header
//! (name and contact lines) and each later block is a section whose first
//! line is its title. Lines starting with `-` are bullets.
//!
//! Parsing is total. Any input, including text that follows none of the
//! conventions, produces a well-formed document; degraded structure is a
//! rendering concern, never an error.

use serde::{Deserialize, Serialize};

/// One classified content line inside a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SectionLine {
    /// A `-`-prefixed line, stored without the marker.
    Bullet(String),
    /// Any other non-empty line, trimmed.
    Paragraph(String),
}

/// A titled section. The title may be empty when the source text carried
/// consecutive blank blocks; renderers skip the title line in that case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub lines: Vec<SectionLine>,
}

/// The parsed shape of one generated CV.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredDocument {
    /// Header lines, kept verbatim: the name and contact block.
    pub header: Vec<String>,
    pub sections: Vec<Section>,
}

impl StructuredDocument {
    pub fn is_empty(&self) -> bool {
        self.header.is_empty() && self.sections.is_empty()
    }
}

/// Parses generated CV text into header and sections. Total: empty or
/// whitespace-only input yields an empty document, and no input errors.
pub fn parse(text: &str) -> StructuredDocument {
    let normalized = text.replace("\r\n", "\n");
    if normalized.trim().is_empty() {
        return StructuredDocument::default();
    }

    let mut blocks = normalized.split("\n\n");

    // First block is the header, lines kept verbatim.
    let header = blocks
        .next()
        .map(|block| block.trim().split('\n').map(str::to_string).collect())
        .unwrap_or_default();

    let sections = blocks.map(parse_section).collect();

    StructuredDocument { header, sections }
}

fn parse_section(block: &str) -> Section {
    let mut lines = block.trim().split('\n');
    let title = lines.next().unwrap_or_default().trim().to_string();
    let lines = lines.filter_map(classify_line).collect();
    Section { title, lines }
}

/// Classifies one content line. Bullets are lines whose first non-space
/// character is `-`; everything else non-empty is a paragraph line.
fn classify_line(line: &str) -> Option<SectionLine> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.strip_prefix('-') {
        Some(rest) => Some(SectionLine::Bullet(rest.trim().to_string())),
        None => Some(SectionLine::Paragraph(trimmed.to_string())),
    }
}
