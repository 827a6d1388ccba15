//! Offscreen render surface for PDF export.
//!
//! The parsed document is laid out onto a single tall strip at twice the
//! output resolution: one surface unit is half a PDF point, so the strip
//! is later placed on Letter pages at 0.5 scale. Styling mirrors the
//! on-screen CV view (1 CSS pixel = 1.5 surface units): a tinted header
//! band with a centered bold name line, blue section titles over a light
//! rule, and hanging bullet markers.
//!
//! Layout is pure geometry. Elements come out strictly top-ordered, which
//! the paginator relies on when it slices the strip into pages.

use crate::export::metrics::{glyph_widths, FontStyle, GlyphWidths};
use crate::formatter::{SectionLine, StructuredDocument};

/// Printable width: 7.5in at two surface units per point.
pub const CONTENT_WIDTH: f32 = 1080.0;

// Type scale, in surface units (CSS px × 1.5).
const NAME_SIZE: f32 = 45.0; // 30px
const NAME_LINE_HEIGHT: f32 = 54.0; // 36px
const SUBTITLE_SIZE: f32 = 27.0; // 18px
const SUBTITLE_LINE_HEIGHT: f32 = 42.0; // 28px
const TITLE_SIZE: f32 = 27.0; // 18px
const TITLE_LINE_HEIGHT: f32 = 42.0; // 28px
const BODY_SIZE: f32 = 24.0; // 16px
const BODY_LINE_HEIGHT: f32 = 36.0; // 24px

// Spacing.
const HEADER_PAD: f32 = 48.0; // 32px padding inside the header band
const SPACE_SM: f32 = 6.0; // 4px under each subtitle line
const SPACE_MD: f32 = 18.0; // 12px under the name and body lines
const SPACE_LG: f32 = 24.0; // 16px under a section title rule
const SPACE_XL: f32 = 48.0; // 32px between header and sections
const INDENT: f32 = 24.0; // 16px section body indent
const BULLET_INDENT: f32 = 24.0; // 16px extra indent for bullets
const BULLET_GAP: f32 = 12.0; // 8px between marker and text
const RULE_GAP: f32 = 12.0; // 8px between title baseline box and rule
const RULE_HEIGHT: f32 = 3.0; // 2px title underline

/// Helvetica ascender, used to place baselines inside line boxes.
const ASCENT: f32 = 0.718;

const BULLET_GLYPH: &str = "•";

// Palette lifted from the on-screen CV card.
const HEADER_BG: Rgb = Rgb { r: 240, g: 247, b: 255 };
const NAME_BLUE: Rgb = Rgb { r: 30, g: 64, b: 175 };
const SUBTITLE_GRAY: Rgb = Rgb { r: 75, g: 85, b: 99 };
const TITLE_BLUE: Rgb = Rgb { r: 29, g: 78, b: 216 };
const RULE_BLUE: Rgb = Rgb { r: 191, g: 219, b: 254 };
const MARKER_BLUE: Rgb = Rgb { r: 59, g: 130, b: 246 };
const BULLET_TEXT: Rgb = Rgb { r: 55, g: 65, b: 81 };
const PARAGRAPH_TEXT: Rgb = Rgb { r: 31, g: 41, b: 55 };

// ────────────────────────────────────────────────────────────────────────────
// Surface model
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Channel fractions in 0.0..=1.0, the form PDF color operators take.
    pub fn fractions(&self) -> [f32; 3] {
        [
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
        ]
    }
}

/// One positioned line of text. `top`/`height` describe the line box used
/// for pagination; `baseline` is where the glyphs sit.
#[derive(Debug, Clone)]
pub struct TextRun {
    pub x: f32,
    pub top: f32,
    pub baseline: f32,
    pub height: f32,
    pub size: f32,
    pub style: FontStyle,
    pub color: Rgb,
    pub text: String,
}

/// A filled rectangle: the header band and section title rules.
#[derive(Debug, Clone)]
pub struct RectShape {
    pub x: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
    pub color: Rgb,
}

#[derive(Debug, Clone)]
pub enum Element {
    Text(TextRun),
    Rect(RectShape),
}

impl Element {
    /// Vertical extent as (top, bottom) in surface units.
    pub fn extent(&self) -> (f32, f32) {
        match self {
            Element::Text(run) => (run.top, run.top + run.height),
            Element::Rect(rect) => (rect.top, rect.top + rect.height),
        }
    }
}

/// The laid-out strip: `CONTENT_WIDTH` wide, `height` tall, elements in
/// top-to-bottom order.
#[derive(Debug, Clone)]
pub struct RenderSurface {
    pub width: f32,
    pub height: f32,
    pub elements: Vec<Element>,
}

// ────────────────────────────────────────────────────────────────────────────
// Layout
// ────────────────────────────────────────────────────────────────────────────

struct LayoutCursor {
    y: f32,
    elements: Vec<Element>,
}

impl LayoutCursor {
    /// Places one run at the current cursor without advancing, so several
    /// runs (bullet marker plus first text piece) can share a line box.
    fn text_span(
        &mut self,
        x: f32,
        text: &str,
        size: f32,
        line_height: f32,
        style: FontStyle,
        color: Rgb,
    ) {
        let baseline = self.y + (line_height - size) / 2.0 + size * ASCENT;
        self.elements.push(Element::Text(TextRun {
            x,
            top: self.y,
            baseline,
            height: line_height,
            size,
            style,
            color,
            text: text.to_string(),
        }));
    }

    fn text_line(
        &mut self,
        x: f32,
        text: &str,
        size: f32,
        line_height: f32,
        style: FontStyle,
        color: Rgb,
    ) {
        self.text_span(x, text, size, line_height, style, color);
        self.y += line_height;
    }

    /// A flowing rectangle: placed at the cursor, advances past it.
    fn rule(&mut self, x: f32, width: f32, height: f32, color: Rgb) {
        self.elements.push(Element::Rect(RectShape {
            x,
            top: self.y,
            width,
            height,
            color,
        }));
        self.y += height;
    }

    fn gap(&mut self, height: f32) {
        self.y += height;
    }
}

/// Lays the parsed document out onto the export surface. An empty document
/// produces an empty surface; the exporter still emits one blank page.
pub fn layout(doc: &StructuredDocument) -> RenderSurface {
    let mut cursor = LayoutCursor {
        y: 0.0,
        elements: Vec::new(),
    };

    if !doc.header.is_empty() {
        layout_header(&mut cursor, &doc.header);
        cursor.gap(SPACE_XL);
    }

    for section in &doc.sections {
        if !section.title.is_empty() {
            let metrics = glyph_widths(FontStyle::Bold);
            for piece in metrics.wrap(&section.title, TITLE_SIZE, CONTENT_WIDTH) {
                cursor.text_line(
                    0.0,
                    &piece,
                    TITLE_SIZE,
                    TITLE_LINE_HEIGHT,
                    FontStyle::Bold,
                    TITLE_BLUE,
                );
            }
            cursor.gap(RULE_GAP);
            cursor.rule(0.0, CONTENT_WIDTH, RULE_HEIGHT, RULE_BLUE);
            cursor.gap(SPACE_LG);
        }

        for line in &section.lines {
            match line {
                SectionLine::Paragraph(text) => layout_paragraph(&mut cursor, text),
                SectionLine::Bullet(text) => layout_bullet(&mut cursor, text),
            }
        }
        cursor.gap(SPACE_XL);
    }

    RenderSurface {
        width: CONTENT_WIDTH,
        height: cursor.y,
        elements: cursor.elements,
    }
}

/// Header band: tinted background, centered lines, the first line large
/// and bold, the rest as gray subtitles.
fn layout_header(cursor: &mut LayoutCursor, header: &[String]) {
    let band_top = cursor.y;
    let band_index = cursor.elements.len();
    cursor.gap(HEADER_PAD);

    for (i, line) in header.iter().enumerate() {
        let (size, line_height, style, color, gap_after) = if i == 0 {
            (
                NAME_SIZE,
                NAME_LINE_HEIGHT,
                FontStyle::Bold,
                NAME_BLUE,
                SPACE_MD,
            )
        } else {
            (
                SUBTITLE_SIZE,
                SUBTITLE_LINE_HEIGHT,
                FontStyle::Regular,
                SUBTITLE_GRAY,
                SPACE_SM,
            )
        };
        let metrics = glyph_widths(style);
        for piece in metrics.wrap(line, size, CONTENT_WIDTH - 2.0 * HEADER_PAD) {
            let width = metrics.line_width(&piece, size);
            let x = (CONTENT_WIDTH - width) / 2.0;
            cursor.text_line(x, &piece, size, line_height, style, color);
        }
        cursor.gap(gap_after);
    }

    cursor.gap(HEADER_PAD);
    // The band is drawn first so the text lands on top of it.
    cursor.elements.insert(
        band_index,
        Element::Rect(RectShape {
            x: 0.0,
            top: band_top,
            width: CONTENT_WIDTH,
            height: cursor.y - band_top,
            color: HEADER_BG,
        }),
    );
}

fn layout_paragraph(cursor: &mut LayoutCursor, text: &str) {
    let metrics = glyph_widths(FontStyle::Regular);
    for piece in metrics.wrap(text, BODY_SIZE, CONTENT_WIDTH - INDENT) {
        cursor.text_line(
            INDENT,
            &piece,
            BODY_SIZE,
            BODY_LINE_HEIGHT,
            FontStyle::Regular,
            PARAGRAPH_TEXT,
        );
    }
    cursor.gap(SPACE_MD);
}

/// Bullet with a hanging marker: continuation lines align under the first
/// text column, not under the marker.
fn layout_bullet(cursor: &mut LayoutCursor, text: &str) {
    let metrics: &GlyphWidths = glyph_widths(FontStyle::Regular);
    let marker_x = INDENT + BULLET_INDENT;
    let text_x = marker_x + metrics.line_width(BULLET_GLYPH, BODY_SIZE) + BULLET_GAP;

    let pieces = metrics.wrap(text, BODY_SIZE, CONTENT_WIDTH - text_x);
    if pieces.is_empty() {
        // A bare "-" in the source keeps its marker so the list shape survives.
        cursor.text_line(
            marker_x,
            BULLET_GLYPH,
            BODY_SIZE,
            BODY_LINE_HEIGHT,
            FontStyle::Regular,
            MARKER_BLUE,
        );
    } else {
        for (i, piece) in pieces.iter().enumerate() {
            if i == 0 {
                cursor.text_span(
                    marker_x,
                    BULLET_GLYPH,
                    BODY_SIZE,
                    BODY_LINE_HEIGHT,
                    FontStyle::Regular,
                    MARKER_BLUE,
                );
            }
            cursor.text_line(
                text_x,
                piece,
                BODY_SIZE,
                BODY_LINE_HEIGHT,
                FontStyle::Regular,
                BULLET_TEXT,
            );
        }
    }
    cursor.gap(SPACE_MD);
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
