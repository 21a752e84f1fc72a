//! PDF text extraction.
//!
//! Converts a PDF file into per-page text using lopdf. Extraction is
//! page-granular so passages can cite the page range they came from.
//! A file that cannot be loaded at all (corrupt, encrypted, not a PDF)
//! fails with [`PipelineError::UnreadablePdf`]; a structurally valid PDF
//! with no extractable text yields an empty page list instead.

use std::path::Path;

use lopdf::Document as PdfDocument;
use tracing::warn;

use crate::error::{PipelineError, Result};
use crate::models::PageText;

/// The only attachment MIME type the pipeline accepts.
pub const MIME_PDF: &str = "application/pdf";

/// Extraction result for one PDF.
#[derive(Debug)]
pub struct ExtractedPdf {
    /// Pages in the source document, counting pages without text.
    pub page_count: usize,
    /// Text-bearing pages in ascending page order.
    pub pages: Vec<PageText>,
}

/// Extract text from every page of a PDF, in ascending page order.
///
/// Pages with no extractable text (scanned images, empty pages) are
/// dropped from the page list but still counted in
/// [`ExtractedPdf::page_count`]. A page whose text extraction fails
/// inside an otherwise readable document is logged and skipped rather
/// than failing the whole document.
pub fn extract_pages(path: &Path) -> Result<ExtractedPdf> {
    let doc = PdfDocument::load(path).map_err(|e| PipelineError::UnreadablePdf {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    if doc.is_encrypted() {
        return Err(PipelineError::UnreadablePdf {
            path: path.to_path_buf(),
            reason: "document is encrypted".to_string(),
        });
    }

    let page_map = doc.get_pages();
    let page_count = page_map.len();
    let mut pages = Vec::new();

    for (&number, _) in page_map.iter() {
        match doc.extract_text(&[number]) {
            Ok(text) => {
                let text = normalize_page_text(&text);
                if !text.is_empty() {
                    pages.push(PageText { number, text });
                }
            }
            Err(e) => {
                warn!(page = number, error = %e, "skipping page with unextractable text");
            }
        }
    }

    Ok(ExtractedPdf { page_count, pages })
}

/// Strip carriage returns and trim surrounding whitespace. Interior
/// newlines are kept so the chunker can prefer paragraph boundaries.
fn normalize_page_text(text: &str) -> String {
    text.replace('\r', "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_corrupt_pdf_is_unreadable() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"%PDF-1.5\nthis is not a real pdf body").unwrap();

        let err = extract_pages(file.path()).unwrap_err();
        assert!(matches!(err, PipelineError::UnreadablePdf { .. }));
    }

    #[test]
    fn test_non_pdf_file_is_unreadable() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"just a plain text file").unwrap();

        let err = extract_pages(file.path()).unwrap_err();
        assert!(matches!(err, PipelineError::UnreadablePdf { .. }));
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let err = extract_pages(Path::new("/nonexistent/missing.pdf")).unwrap_err();
        assert!(matches!(err, PipelineError::UnreadablePdf { .. }));
    }

    #[test]
    fn test_normalize_strips_carriage_returns() {
        assert_eq!(normalize_page_text("  a\r\nb\r\n  "), "a\nb");
        assert_eq!(normalize_page_text("\n \t\n"), "");
    }
}
