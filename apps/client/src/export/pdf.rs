//! Export artifacts: verbatim text and the paginated PDF.
//!
//! The text export is a byte-for-byte copy of the tailored CV. The PDF
//! export slices the 2×-resolution render surface into Letter pages with
//! half-inch margins: each page embeds its slice as a Form XObject placed
//! at 0.5 scale. Slicing snaps to line boxes, so a line of text is never
//! cut across a page boundary.
//!
//! Assembly is CPU-bound and runs inside `tokio::task::spawn_blocking`.
//! Nothing is written anywhere by this module; a failed export returns an
//! error and no bytes, so a partial file can never be observed.

use std::path::{Path, PathBuf};

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream, StringFormat};
use tracing::{debug, info};

use crate::errors::ClientError;
use crate::export::metrics::FontStyle;
use crate::export::surface::{self, Element, RenderSurface};
use crate::formatter::StructuredDocument;
use crate::models::GenerationRecord;

pub const TEXT_FILENAME: &str = "tailored_cv.txt";
pub const PDF_FILENAME: &str = "tailored_cv.pdf";

// US Letter with 0.5in margins. The surface carries two units per point.
const PAGE_WIDTH_PT: f32 = 612.0;
const PAGE_HEIGHT_PT: f32 = 792.0;
const MARGIN_PT: f32 = 36.0;
pub const RASTER_SCALE: f32 = 2.0;
const PAGE_SURFACE_HEIGHT: f32 = (PAGE_HEIGHT_PT - 2.0 * MARGIN_PT) * RASTER_SCALE;

/// A finished export: fixed filename and media type plus the complete
/// payload.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub filename: &'static str,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Emits the tailored CV text verbatim as UTF-8. Infallible: an empty
/// record exports as an empty file, exactly as it would print.
pub fn export_text(record: &GenerationRecord) -> ExportArtifact {
    ExportArtifact {
        filename: TEXT_FILENAME,
        content_type: "text/plain",
        bytes: record.tailored_resume.clone().into_bytes(),
    }
}

/// Renders the parsed document to a paginated PDF. Resolves only once
/// layout, pagination, and encoding have all completed.
pub async fn export_pdf(document: &StructuredDocument) -> Result<ExportArtifact, ClientError> {
    let surface = surface::layout(document);

    let bytes = tokio::task::spawn_blocking(move || assemble_pdf(&surface))
        .await
        .map_err(|e| {
            ClientError::Internal(anyhow::anyhow!("spawn_blocking failed in PDF export: {e}"))
        })??;

    info!(bytes = bytes.len(), "PDF export complete");
    Ok(ExportArtifact {
        filename: PDF_FILENAME,
        content_type: "application/pdf",
        bytes,
    })
}

/// Writes an artifact into `dir` under its fixed filename, creating the
/// directory if needed. Returns the full path written.
pub async fn save_artifact(artifact: &ExportArtifact, dir: &Path) -> Result<PathBuf, ClientError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| ClientError::Export(format!("Failed to create {}: {e}", dir.display())))?;
    let path = dir.join(artifact.filename);
    tokio::fs::write(&path, &artifact.bytes)
        .await
        .map_err(|e| ClientError::Export(format!("Failed to write {}: {e}", path.display())))?;
    Ok(path)
}

// ────────────────────────────────────────────────────────────────────────────
// Pagination
// ────────────────────────────────────────────────────────────────────────────

struct PageSlice {
    elements: Vec<Element>,
}

/// Slices the surface strip into page-sized windows. A line box that would
/// cross the window boundary starts the next page instead, so breaks land
/// between lines. An empty surface still yields one blank page.
fn paginate(surface: &RenderSurface) -> Vec<PageSlice> {
    let mut pages: Vec<PageSlice> = Vec::new();
    let mut current: Vec<Element> = Vec::new();
    let mut page_start = 0.0_f32;

    for element in &surface.elements {
        let (top, bottom) = element.extent();
        if bottom - page_start > PAGE_SURFACE_HEIGHT && top > page_start {
            pages.push(PageSlice {
                elements: std::mem::take(&mut current),
            });
            page_start = top;
        }
        current.push(rebase(element, page_start));
    }
    pages.push(PageSlice { elements: current });
    pages
}

/// Shifts an element into page-local coordinates.
fn rebase(element: &Element, page_start: f32) -> Element {
    match element {
        Element::Text(run) => {
            let mut run = run.clone();
            run.top -= page_start;
            run.baseline -= page_start;
            Element::Text(run)
        }
        Element::Rect(rect) => {
            let mut rect = rect.clone();
            rect.top -= page_start;
            Element::Rect(rect)
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// PDF assembly
// ────────────────────────────────────────────────────────────────────────────

fn assemble_pdf(surface: &RenderSurface) -> Result<Vec<u8>, ClientError> {
    let slices = paginate(surface);
    debug!(pages = slices.len(), height = surface.height, "assembling PDF");

    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut page_ids = Vec::with_capacity(slices.len());
    for slice in &slices {
        // The page slice, captured at surface resolution.
        let drawing = Content {
            operations: slice_operations(slice),
        };
        let encoded = drawing
            .encode()
            .map_err(|e| ClientError::Export(format!("Failed to encode page content: {e}")))?;
        let xobject_id = doc.add_object(Stream::new(form_xobject_dict(), encoded));

        // Place the capture at half scale inside the margins.
        let placement = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Real(1.0 / RASTER_SCALE),
                        Object::Real(0.0),
                        Object::Real(0.0),
                        Object::Real(1.0 / RASTER_SCALE),
                        Object::Real(MARGIN_PT),
                        Object::Real(MARGIN_PT),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"C0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let placement_encoded = placement
            .encode()
            .map_err(|e| ClientError::Export(format!("Failed to encode page content: {e}")))?;
        let content_id = doc.add_object(Stream::new(Dictionary::new(), placement_encoded));

        let mut xobjects = Dictionary::new();
        xobjects.set("C0", Object::Reference(xobject_id));
        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(xobjects));

        let page = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(PAGE_WIDTH_PT),
                    Object::Real(PAGE_HEIGHT_PT),
                ]),
            ),
            ("Resources", Object::Dictionary(resources)),
            ("Contents", Object::Reference(content_id)),
        ]);
        page_ids.push(doc.add_object(page));
    }

    let pages = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(page_ids.len() as i64)),
        (
            "Kids",
            Object::Array(page_ids.iter().map(|id| Object::Reference(*id)).collect()),
        ),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]);
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| ClientError::Export(format!("Failed to generate PDF: {e}")))?;
    Ok(buffer)
}

/// Drawing operators for one page slice, in surface coordinates flipped to
/// PDF's bottom-up y axis.
fn slice_operations(slice: &PageSlice) -> Vec<Operation> {
    let mut ops = Vec::new();
    for element in &slice.elements {
        match element {
            Element::Rect(rect) => {
                let [r, g, b] = rect.color.fractions();
                ops.push(Operation::new(
                    "rg",
                    vec![Object::Real(r), Object::Real(g), Object::Real(b)],
                ));
                ops.push(Operation::new(
                    "re",
                    vec![
                        Object::Real(rect.x),
                        Object::Real(PAGE_SURFACE_HEIGHT - rect.top - rect.height),
                        Object::Real(rect.width),
                        Object::Real(rect.height),
                    ],
                ));
                ops.push(Operation::new("f", vec![]));
            }
            Element::Text(run) => {
                let [r, g, b] = run.color.fractions();
                ops.push(Operation::new("BT", vec![]));
                ops.push(Operation::new(
                    "Tf",
                    vec![
                        Object::Name(font_name(run.style).to_vec()),
                        Object::Real(run.size),
                    ],
                ));
                ops.push(Operation::new(
                    "rg",
                    vec![Object::Real(r), Object::Real(g), Object::Real(b)],
                ));
                ops.push(Operation::new(
                    "Tm",
                    vec![
                        Object::Real(1.0),
                        Object::Real(0.0),
                        Object::Real(0.0),
                        Object::Real(1.0),
                        Object::Real(run.x),
                        Object::Real(PAGE_SURFACE_HEIGHT - run.baseline),
                    ],
                ));
                ops.push(Operation::new(
                    "Tj",
                    vec![Object::String(
                        encode_winansi(&run.text),
                        StringFormat::Literal,
                    )],
                ));
                ops.push(Operation::new("ET", vec![]));
            }
        }
    }
    ops
}

fn font_name(style: FontStyle) -> &'static [u8] {
    match style {
        FontStyle::Regular => b"F1",
        FontStyle::Bold => b"F2",
    }
}

fn form_xobject_dict() -> Dictionary {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Form".to_vec()));
    dict.set("FormType", Object::Integer(1));
    dict.set(
        "BBox",
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(surface::CONTENT_WIDTH),
            Object::Real(PAGE_SURFACE_HEIGHT),
        ]),
    );
    dict.set(
        "Matrix",
        Object::Array(vec![
            Object::Integer(1),
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(1),
            Object::Integer(0),
            Object::Integer(0),
        ]),
    );
    dict.set("Resources", Object::Dictionary(font_resources()));
    dict
}

fn font_resources() -> Dictionary {
    let mut fonts = Dictionary::new();
    fonts.set("F1", Object::Dictionary(base_font(b"Helvetica")));
    fonts.set("F2", Object::Dictionary(base_font(b"Helvetica-Bold")));
    let mut resources = Dictionary::new();
    resources.set("Font", Object::Dictionary(fonts));
    resources
}

fn base_font(name: &[u8]) -> Dictionary {
    let mut font = Dictionary::new();
    font.set("Type", Object::Name(b"Font".to_vec()));
    font.set("Subtype", Object::Name(b"Type1".to_vec()));
    font.set("BaseFont", Object::Name(name.to_vec()));
    font.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
    font
}

/// Maps text to WinAnsi bytes: ASCII and Latin-1 pass through, the common
/// typographic marks get their WinAnsi slots, everything else degrades to
/// `?` rather than failing the export.
fn encode_winansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            0x20..=0x7E => c as u8,
            0xA0..=0xFF => c as u8,
            0x2018 => 0x91, // left single quote
            0x2019 => 0x92, // right single quote
            0x201C => 0x93, // left double quote
            0x201D => 0x94, // right double quote
            0x2022 => 0x95, // bullet
            0x2013 => 0x96, // en dash
            0x2014 => 0x97, // em dash
            _ => b'?',
        })
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::parse;

    const SAMPLE: &str = "Jane Doe\njane@example.com\n\nSummary\nBuilds things.\n\nSkills\n- Rust\n- Tokio";

    fn make_record(resume: &str) -> GenerationRecord {
        GenerationRecord {
            tailored_resume: resume.to_string(),
            ..Default::default()
        }
    }

    fn assert_letter_pages(doc: &Document) {
        for (_, page_id) in doc.get_pages() {
            let page = doc.objects.get(&page_id).unwrap().as_dict().unwrap();
            let media_box = match page.get(b"MediaBox").unwrap() {
                Object::Array(items) => items,
                other => panic!("MediaBox should be an array, got {other:?}"),
            };
            let corners: Vec<f32> = media_box
                .iter()
                .map(|obj| match obj {
                    Object::Integer(i) => *i as f32,
                    Object::Real(r) => *r,
                    other => panic!("MediaBox entry should be numeric, got {other:?}"),
                })
                .collect();
            assert_eq!(corners, vec![0.0, 0.0, 612.0, 792.0]);
        }
    }

    // ── text export ─────────────────────────────────────────────────────────

    #[test]
    fn test_export_text_is_verbatim() {
        let record = make_record("Jane Doe\n\nSummary\nBuilds things.\n");
        let artifact = export_text(&record);
        assert_eq!(artifact.filename, "tailored_cv.txt");
        assert_eq!(artifact.content_type, "text/plain");
        assert_eq!(artifact.bytes, record.tailored_resume.as_bytes());
    }

    #[tokio::test]
    async fn test_save_artifact_writes_under_the_given_dir() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = export_text(&make_record("saved"));

        let path = save_artifact(&artifact, dir.path()).await.unwrap();
        assert_eq!(path, dir.path().join("tailored_cv.txt"));
        assert_eq!(std::fs::read(&path).unwrap(), b"saved");
    }

    #[test]
    fn test_export_text_empty_record_is_empty_payload() {
        let artifact = export_text(&GenerationRecord::default());
        assert!(artifact.bytes.is_empty());
    }

    // ── pagination ──────────────────────────────────────────────────────────

    #[test]
    fn test_paginate_keeps_line_boxes_inside_pages() {
        let long = format!("Jane Doe\n\nExperience\n{}", "- Shipped a thing\n".repeat(80));
        let surface = surface::layout(&parse(&long));
        let slices = paginate(&surface);

        assert!(slices.len() >= 2, "80 bullets should span pages");
        for slice in &slices {
            for element in &slice.elements {
                let (top, bottom) = element.extent();
                assert!(top >= 0.0, "element above page top");
                assert!(
                    bottom <= PAGE_SURFACE_HEIGHT + 0.01,
                    "element crosses the page boundary: {top}..{bottom}"
                );
            }
        }
    }

    #[test]
    fn test_paginate_empty_surface_is_one_blank_page() {
        let surface = surface::layout(&StructuredDocument::default());
        let slices = paginate(&surface);
        assert_eq!(slices.len(), 1);
        assert!(slices[0].elements.is_empty());
    }

    // ── PDF assembly ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_export_pdf_produces_a_loadable_single_page() {
        let artifact = export_pdf(&parse(SAMPLE)).await.unwrap();
        assert_eq!(artifact.filename, "tailored_cv.pdf");
        assert_eq!(artifact.content_type, "application/pdf");
        assert!(artifact.bytes.starts_with(b"%PDF-"));

        let doc = Document::load_mem(&artifact.bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
        assert_letter_pages(&doc);
    }

    #[tokio::test]
    async fn test_export_pdf_paginates_long_documents() {
        let long = format!(
            "Jane Doe\n\nExperience\n{}",
            "- Led a project with measurable outcomes\n".repeat(80)
        );
        let artifact = export_pdf(&parse(&long)).await.unwrap();
        let doc = Document::load_mem(&artifact.bytes).unwrap();
        assert!(doc.get_pages().len() >= 2);
        assert_letter_pages(&doc);
    }

    #[tokio::test]
    async fn test_export_pdf_empty_document_is_one_blank_page() {
        let artifact = export_pdf(&StructuredDocument::default()).await.unwrap();
        let doc = Document::load_mem(&artifact.bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    // ── encoding ────────────────────────────────────────────────────────────

    #[test]
    fn test_winansi_maps_latin1_and_marks() {
        assert_eq!(encode_winansi("résumé"), b"r\xe9sum\xe9".to_vec());
        assert_eq!(encode_winansi("•"), vec![0x95]);
        assert_eq!(encode_winansi("\u{2019}"), vec![0x92]);
    }

    #[test]
    fn test_winansi_degrades_unknown_to_question_mark() {
        assert_eq!(encode_winansi("日本"), b"??".to_vec());
    }

    #[test]
    fn test_page_geometry_matches_surface_scale() {
        // 7.5in printable width at two units per point.
        let printable = PAGE_WIDTH_PT - 2.0 * MARGIN_PT;
        assert_eq!(surface::CONTENT_WIDTH, printable * RASTER_SCALE);
        assert_eq!(PAGE_SURFACE_HEIGHT, 1440.0);
    }
}
