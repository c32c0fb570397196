//! External collaborators for the scanned document: a page renderer and an OCR engine.
//!
//! Both shipped adapters shell out to fixed executables (Poppler's `pdfinfo`
//! and `pdftoppm`, and `tesseract`). Tests substitute in-process fakes through the traits.

use crate::config::OcrSettings;
use crate::error::{EtlError, Result};
use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;
use tracing::debug;

/// Renders a document page to an image file
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Render the first page of `document` into `out_dir`.
    /// Returns `None` when the document has no pages.
    async fn render_first_page(&self, document: &Path, out_dir: &Path) -> Result<Option<PathBuf>>;
}

/// Turns a page image into raw text
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn image_to_string(&self, image: &Path) -> Result<String>;
}

/// Run `executable` to completion; launch failures and non-zero exits are OCR errors
async fn run_tool(executable: &Path, args: &[&OsStr]) -> Result<Output> {
    let output = Command::new(executable)
        .args(args)
        .output()
        .await
        .map_err(|e| EtlError::ocr(format!("failed to launch {}: {e}", executable.display())))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(EtlError::ocr(format!(
            "{} exited with {}: {}",
            executable.display(),
            output.status,
            stderr.trim()
        )));
    }
    Ok(output)
}

/// Read the `Pages:` line of `pdfinfo` output
fn parse_page_count(info: &str) -> Result<u32> {
    let line = info
        .lines()
        .find_map(|line| line.strip_prefix("Pages:"))
        .ok_or_else(|| EtlError::ocr("pdfinfo output has no Pages line"))?;

    line.trim()
        .parse::<u32>()
        .map_err(|e| EtlError::ocr(format!("pdfinfo page count '{}' is invalid: {e}", line.trim())))
}

/// Poppler wrapper: `pdfinfo` for the page count, `pdftoppm` for the render
pub struct PdftoppmRenderer {
    executable_path: PathBuf,
    pdfinfo_path: PathBuf,
    dpi: u32,
}

impl PdftoppmRenderer {
    pub fn new<P, Q>(executable_path: P, pdfinfo_path: Q, dpi: u32) -> Self
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        Self {
            executable_path: executable_path.as_ref().to_path_buf(),
            pdfinfo_path: pdfinfo_path.as_ref().to_path_buf(),
            dpi,
        }
    }

    pub fn from_settings(settings: &OcrSettings) -> Self {
        Self::new(&settings.pdftoppm_cmd, &settings.pdfinfo_cmd, settings.render_dpi)
    }

    pub async fn page_count(&self, document: &Path) -> Result<u32> {
        let output = run_tool(&self.pdfinfo_path, &[document.as_os_str()]).await?;
        parse_page_count(&String::from_utf8_lossy(&output.stdout))
    }
}

#[async_trait]
impl PageRenderer for PdftoppmRenderer {
    async fn render_first_page(&self, document: &Path, out_dir: &Path) -> Result<Option<PathBuf>> {
        // pdftoppm rejects the 1..1 page range on an empty document
        let pages = self.page_count(document).await?;
        if pages == 0 {
            debug!("{:?} has no pages", document);
            return Ok(None);
        }

        let prefix = out_dir.join("page");
        let dpi = self.dpi.to_string();
        debug!("Rendering first page of {:?} with {:?}", document, self.executable_path);

        let args: [&OsStr; 9] = [
            "-png".as_ref(),
            "-r".as_ref(),
            dpi.as_ref(),
            "-f".as_ref(),
            "1".as_ref(),
            "-l".as_ref(),
            "1".as_ref(),
            document.as_os_str(),
            prefix.as_os_str(),
        ];
        run_tool(&self.executable_path, &args).await?;

        // pdftoppm zero-pads the page number to the document's page-count width
        let mut rendered: Vec<PathBuf> = std::fs::read_dir(out_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().map_or(false, |ext| ext == "png"))
            .collect();
        rendered.sort();
        Ok(rendered.into_iter().next())
    }
}

/// `tesseract` wrapper writing recognized text to stdout
pub struct TesseractOcr {
    executable_path: PathBuf,
}

impl TesseractOcr {
    pub fn new<P: AsRef<Path>>(executable_path: P) -> Self {
        Self {
            executable_path: executable_path.as_ref().to_path_buf(),
        }
    }

    pub fn from_settings(settings: &OcrSettings) -> Self {
        Self::new(&settings.tesseract_cmd)
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn image_to_string(&self, image: &Path) -> Result<String> {
        debug!("Running OCR on {:?}", image);

        let output = run_tool(&self.executable_path, &[image.as_os_str(), "stdout".as_ref()]).await?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
