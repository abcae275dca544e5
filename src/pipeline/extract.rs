//! Document text extraction: bytes → ordered page texts.
//!
//! ## Why spawn_blocking?
//!
//! pdfium wraps a C++ library with thread-local state; it is not safe to
//! call from async contexts and text extraction is CPU-bound anyway.
//! [`extract_pages`] moves every extractor call onto the blocking pool so
//! Tokio workers never stall on a large statement.
//!
//! Extraction is text-layer only. A scanned statement with no text layer
//! fails with [`ExtractionError::NoExtractableText`] rather than producing an
//! empty transaction list.

use crate::error::{CashflowError, ExtractionError};
use pdfium_render::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

const PDF_MAGIC: &[u8] = b"%PDF";

/// Page texts in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageTexts(Vec<String>);

impl PageTexts {
    pub fn new(pages: Vec<String>) -> Self {
        Self(pages)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// All pages joined with a blank line.
    pub fn joined(&self) -> String {
        self.0.join("\n\n")
    }

    /// Fail on empty documents and documents without any text.
    fn ensure_text(self) -> Result<Self, ExtractionError> {
        if self.0.is_empty() {
            return Err(ExtractionError::NoPages);
        }
        if self.0.iter().all(|p| p.trim().is_empty()) {
            return Err(ExtractionError::NoExtractableText { pages: self.0.len() });
        }
        Ok(self)
    }
}

/// Turns a document into page texts.
///
/// Implementations are synchronous and may block; callers go through
/// [`extract_pages`].
pub trait TextExtractor: Send + Sync {
    fn name(&self) -> &str;

    fn extract(&self, bytes: &[u8], password: Option<&str>) -> Result<PageTexts, ExtractionError>;
}

// ── PDF ──────────────────────────────────────────────────────────────────────

/// Text-layer extraction through pdfium.
#[derive(Debug, Clone, Default)]
pub struct PdfiumExtractor {
    library_path: Option<PathBuf>,
}

impl PdfiumExtractor {
    pub fn new(library_path: Option<PathBuf>) -> Self {
        Self { library_path }
    }

    /// Bind to the configured library, else one next to the working
    /// directory, else the system library.
    fn bind(&self) -> Result<Pdfium, ExtractionError> {
        let bindings = match &self.library_path {
            Some(path) => Pdfium::bind_to_library(path),
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| ExtractionError::EngineUnavailable(format!("{e:?}")))?;
        Ok(Pdfium::new(bindings))
    }
}

impl TextExtractor for PdfiumExtractor {
    fn name(&self) -> &str {
        "pdfium"
    }

    fn extract(&self, bytes: &[u8], password: Option<&str>) -> Result<PageTexts, ExtractionError> {
        let pdfium = self.bind()?;

        let document = pdfium
            .load_pdf_from_byte_vec(bytes.to_vec(), password)
            .map_err(|e| {
                let err_str = format!("{:?}", e);
                if err_str.contains("Password") || err_str.contains("password") {
                    if password.is_some() {
                        ExtractionError::WrongPassword
                    } else {
                        ExtractionError::PasswordRequired
                    }
                } else {
                    ExtractionError::Corrupt { detail: err_str }
                }
            })?;

        let pages = document.pages();
        info!("PDF loaded: {} pages", pages.len());

        let mut texts = Vec::with_capacity(pages.len() as usize);
        for (idx, page) in pages.iter().enumerate() {
            let text = page
                .text()
                .map_err(|e| ExtractionError::Corrupt {
                    detail: format!("page {}: {:?}", idx + 1, e),
                })?
                .all();
            debug!("Page {}: {} chars", idx + 1, text.chars().count());
            texts.push(text);
        }

        PageTexts::new(texts).ensure_text()
    }
}

// ── Plain text ───────────────────────────────────────────────────────────────

/// UTF-8 text; form feeds (`\x0c`) separate pages.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn name(&self) -> &str {
        "text"
    }

    fn extract(&self, bytes: &[u8], _password: Option<&str>) -> Result<PageTexts, ExtractionError> {
        let text = std::str::from_utf8(bytes).map_err(|_| ExtractionError::UnsupportedFormat {
            magic: bytes.iter().take(4).copied().collect(),
        })?;
        let pages: Vec<String> = if text.is_empty() {
            Vec::new()
        } else {
            text.split('\x0c').map(str::to_string).collect()
        };
        PageTexts::new(pages).ensure_text()
    }
}

// ── Format sniffing ──────────────────────────────────────────────────────────

/// PDF when the bytes start with `%PDF`, plain text otherwise.
#[derive(Debug, Clone, Default)]
pub struct AutoExtractor {
    pdf: PdfiumExtractor,
}

impl AutoExtractor {
    pub fn new(pdfium_library_path: Option<PathBuf>) -> Self {
        Self {
            pdf: PdfiumExtractor::new(pdfium_library_path),
        }
    }
}

impl TextExtractor for AutoExtractor {
    fn name(&self) -> &str {
        "auto"
    }

    fn extract(&self, bytes: &[u8], password: Option<&str>) -> Result<PageTexts, ExtractionError> {
        if bytes.starts_with(PDF_MAGIC) {
            self.pdf.extract(bytes, password)
        } else {
            PlainTextExtractor.extract(bytes, password)
        }
    }
}

/// Run `extractor` on the blocking pool.
pub async fn extract_pages(
    extractor: Arc<dyn TextExtractor>,
    bytes: Vec<u8>,
    password: Option<String>,
) -> Result<PageTexts, CashflowError> {
    let name = extractor.name().to_string();
    let pages = tokio::task::spawn_blocking(move || extractor.extract(&bytes, password.as_deref()))
        .await
        .map_err(|e| CashflowError::Internal(format!("Extraction task panicked: {}", e)))??;
    debug!("{} extractor: {} pages", name, pages.len());
    Ok(pages)
}
