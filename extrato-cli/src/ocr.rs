use anyhow::{Context, Result, bail};
use extrato_core::ExtratoError;
use extrato_ingest::PageOcr;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Exit code pdftoppm uses for a page range it cannot satisfy.
const PDFTOPPM_BAD_RANGE: i32 = 99;

/// OCR through the `pdftoppm` (poppler) and `tesseract` command-line tools.
///
/// Each page is rasterized into a temp dir and recognized from the PNG.
pub struct TesseractOcr {
    pdftoppm: PathBuf,
    tesseract: PathBuf,
    language: String,
    dpi: u32,
}

impl TesseractOcr {
    /// Locate both tools on PATH up front so a missing install fails before
    /// any page is processed.
    pub fn locate(language: &str, dpi: u32) -> Result<Self> {
        let pdftoppm = which::which("pdftoppm")
            .context("pdftoppm not found on PATH (install poppler-utils to use --ocr)")?;
        let tesseract = which::which("tesseract")
            .context("tesseract not found on PATH (install tesseract-ocr to use --ocr)")?;
        Ok(Self {
            pdftoppm,
            tesseract,
            language: language.to_string(),
            dpi,
        })
    }
}

impl PageOcr for TesseractOcr {
    fn recognize(&self, pdf: &Path, page_index: usize) -> Result<String> {
        let dir = tempfile::tempdir().context("create temp dir for OCR")?;
        let prefix = dir.path().join("page");
        let page = (page_index + 1).to_string();

        let status = Command::new(&self.pdftoppm)
            .args(["-f", &page, "-l", &page, "-r", &self.dpi.to_string(), "-png", "-singlefile"])
            .arg(pdf)
            .arg(&prefix)
            .status()
            .context("running pdftoppm")?;
        if status.code() == Some(PDFTOPPM_BAD_RANGE) {
            return Err(ExtratoError::PageOutOfRange(page_index).into());
        }
        if !status.success() {
            bail!("pdftoppm could not render page {page}: {status}");
        }

        let image = prefix.with_extension("png");
        if !image.exists() {
            bail!("pdftoppm produced no image for page {page}");
        }

        let out = Command::new(&self.tesseract)
            .arg(&image)
            .arg("stdout")
            .args(["-l", &self.language])
            .output()
            .context("running tesseract")?;
        if !out.status.success() {
            bail!(
                "tesseract failed on page {page}: {}",
                String::from_utf8_lossy(&out.stderr).trim()
            );
        }

        let text = String::from_utf8_lossy(&out.stdout).into_owned();
        debug!(page = page_index + 1, chars = text.len(), "OCR page");
        Ok(text)
    }
}
