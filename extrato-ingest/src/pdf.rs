//! PDF page text, with an OCR fallback for pages that carry no text layer.

use anyhow::{Context, Result, anyhow, bail};
use extrato_core::ExtratoError;
use std::path::Path;
use tracing::{info, warn};

/// Upper bound on pages recognized when the page count is unknown.
pub const MAX_OCR_PAGES: usize = 1000;

/// Recognizes the text of a single rendered PDF page.
///
/// `page_index` is zero-based. Asking for a page past the end must fail with
/// `ExtratoError::PageOutOfRange`; any other error is a real failure.
pub trait PageOcr {
    fn recognize(&self, pdf: &Path, page_index: usize) -> Result<String>;
}

/// Native text of every page, split on the form feed the extractor emits
/// between pages. Blank pages are kept so indices stay aligned with the PDF.
pub fn extract_pages(path: &Path) -> Result<Vec<String>> {
    let text = pdf_extract::extract_text(path)
        .map_err(|e| anyhow!("extracting text from {}: {e}", path.display()))?;
    Ok(split_pages(&text))
}

fn split_pages(text: &str) -> Vec<String> {
    let mut pages: Vec<String> = text.split('\u{000C}').map(|s| s.to_string()).collect();
    if pages.len() > 1 && pages.last().is_some_and(|p| p.trim().is_empty()) {
        pages.pop();
    }
    pages
}

/// Text blocks for a statement, one per page.
///
/// With an OCR engine, pages whose native text is blank are recognized from
/// the rendered image instead. If native extraction fails outright and OCR is
/// available, pages are OCR'd in order until OCR reports the end of the
/// document. Any other OCR error fails the whole statement.
pub fn statement_pages(path: &Path, ocr: Option<&dyn PageOcr>) -> Result<Vec<String>> {
    let native = extract_pages(path);

    let Some(ocr) = ocr else {
        return native;
    };

    let mut pages = match native {
        Ok(pages) => pages,
        Err(e) => {
            warn!("native extraction failed, using OCR for every page: {e:#}");
            return ocr_all_pages(path, ocr);
        }
    };

    fill_blank_pages(&mut pages, path, ocr)?;
    Ok(pages)
}

/// Replace pages without a text layer by their OCR text. Pages that already
/// have text are left alone.
fn fill_blank_pages(pages: &mut [String], path: &Path, ocr: &dyn PageOcr) -> Result<()> {
    for (i, page) in pages.iter_mut().enumerate() {
        if page.trim().is_empty() {
            info!(page = i + 1, "no text layer, running OCR");
            *page = ocr
                .recognize(path, i)
                .with_context(|| format!("OCR of page {} of {}", i + 1, path.display()))?;
        }
    }
    Ok(())
}

fn ocr_all_pages(path: &Path, ocr: &dyn PageOcr) -> Result<Vec<String>> {
    let mut pages = Vec::new();
    loop {
        let i = pages.len();
        if i >= MAX_OCR_PAGES {
            bail!("OCR stopped after {MAX_OCR_PAGES} pages of {}", path.display());
        }
        match ocr.recognize(path, i) {
            Ok(text) => pages.push(text),
            Err(e) if i > 0 && is_past_end(&e) => break,
            Err(e) => {
                return Err(e).with_context(|| format!("OCR of page {} of {}", i + 1, path.display()));
            }
        }
    }
    Ok(pages)
}

fn is_past_end(e: &anyhow::Error) -> bool {
    matches!(e.downcast_ref::<ExtratoError>(), Some(ExtratoError::PageOutOfRange(_)))
}
