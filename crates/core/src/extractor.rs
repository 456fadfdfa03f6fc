use crate::error::IngestError;
use crate::models::Page;
use lopdf::Document;
use regex::Regex;
use std::path::Path;
use tracing::{info, warn};

/// Empty-page ratio above which the document is probably scanned imagery.
const EMPTY_RATIO_WARN: f64 = 0.3;

/// What a document yielded: pages with text, plus the accumulated partial
/// failures. A bad page never fails the document.
#[derive(Debug, Clone)]
pub struct ExtractionReport {
    pub pages: Vec<Page>,
    pub total_pages: usize,
    pub empty_pages: usize,
    pub failed_pages: Vec<(u32, String)>,
}

/// The extraction collaborator: one `Page` per physical page that has
/// non-empty text, in page order.
pub trait PageExtractor {
    fn extract(&self, path: &Path) -> Result<ExtractionReport, IngestError>;
}

pub struct LopdfExtractor {
    trailing_blanks: Regex,
    newline_runs: Regex,
    blank_runs: Regex,
}

impl LopdfExtractor {
    pub fn new() -> Result<Self, IngestError> {
        Ok(Self {
            trailing_blanks: Regex::new(r"[ \t]+\n")?,
            newline_runs: Regex::new(r"\n{3,}")?,
            blank_runs: Regex::new(r"[ \t]{2,}")?,
        })
    }

    /// Tidy page text while preserving line structure; heading detection
    /// depends on the newlines staying put.
    pub fn clean_page_text(&self, text: &str) -> String {
        let text = text.replace("\r\n", "\n").replace('\r', "\n");
        let text = self.trailing_blanks.replace_all(&text, "\n");
        let text = self.newline_runs.replace_all(&text, "\n\n");
        let text = self.blank_runs.replace_all(&text, " ");
        text.trim().to_string()
    }
}

impl PageExtractor for LopdfExtractor {
    fn extract(&self, path: &Path) -> Result<ExtractionReport, IngestError> {
        if !path.exists() {
            return Err(IngestError::SourceNotFound(path.to_path_buf()));
        }

        let source_file = path
            .file_name()
            .map(|name| name.to_string_lossy().replace(' ', "_"))
            .unwrap_or_else(|| path.to_string_lossy().to_string());

        info!(source = %source_file, "opening pdf");
        let document =
            Document::load(path).map_err(|error| IngestError::PdfParse(error.to_string()))?;

        let page_numbers: Vec<u32> = document.get_pages().keys().copied().collect();
        let total_pages = page_numbers.len();

        let mut report = ExtractionReport {
            pages: Vec::new(),
            total_pages,
            empty_pages: 0,
            failed_pages: Vec::new(),
        };

        for page_number in page_numbers {
            match document.extract_text(&[page_number]) {
                Ok(raw) => {
                    let text = self.clean_page_text(&raw);
                    if text.is_empty() {
                        report.empty_pages += 1;
                    } else {
                        report.pages.push(Page {
                            page_number,
                            text,
                            source_file: source_file.clone(),
                        });
                    }
                }
                Err(error) => report.failed_pages.push((page_number, error.to_string())),
            }
        }

        info!(
            total = total_pages,
            non_empty = report.pages.len(),
            empty = report.empty_pages,
            failed = report.failed_pages.len(),
            "extraction complete"
        );

        if total_pages > 0 {
            let empty_ratio = report.empty_pages as f64 / total_pages as f64;
            if empty_ratio > EMPTY_RATIO_WARN {
                warn!(
                    empty_ratio,
                    "high empty page ratio, document is likely scanned imagery"
                );
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn extractor() -> LopdfExtractor {
        LopdfExtractor::new().expect("extractor builds")
    }

    #[test]
    fn missing_source_is_a_distinct_error() {
        let result = extractor().extract(&PathBuf::from("/definitely/not/here.pdf"));
        match result {
            Err(IngestError::SourceNotFound(path)) => {
                assert!(path.ends_with("here.pdf"));
            }
            other => panic!("expected SourceNotFound, got {other:?}"),
        }
    }

    #[test]
    fn unparsable_pdf_is_a_parse_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"%PDF-1.4\n%broken")?;

        match extractor().extract(&path) {
            Err(IngestError::PdfParse(_)) => Ok(()),
            other => panic!("expected PdfParse, got {other:?}"),
        }
    }

    #[test]
    fn cleanup_preserves_line_structure() {
        let raw = "1 PURPOSE   \r\nline  two\t\t here\n\n\n\nnext";
        let cleaned = extractor().clean_page_text(raw);
        assert_eq!(cleaned, "1 PURPOSE\nline two here\n\nnext");
    }

    #[test]
    fn cleanup_trims_outer_whitespace() {
        assert_eq!(extractor().clean_page_text("  \n body \n "), "body");
    }
}
