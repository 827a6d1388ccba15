// Export pipeline: Helvetica metrics, 2× render surface, PDF/text artifacts.
// CPU-bound PDF assembly must run inside tokio::task::spawn_blocking.

pub mod metrics;
pub mod pdf;
pub mod surface;

// Re-export the public API consumed by other modules (session, driver).
pub use pdf::{export_pdf, export_text, save_artifact, ExportArtifact, PDF_FILENAME, TEXT_FILENAME};
