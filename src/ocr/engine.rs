use anyhow::{anyhow, Context, Result};
use image::GrayImage;
use std::process::Command;
use tempfile::NamedTempFile;
use tracing::debug;

use super::setup::TesseractPaths;

/// Page segmentation modes used by the recognition passes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageSegMode {
    /// Single uniform block of text
    Block = 6,
    /// Single text line
    Line = 7,
    /// Single word
    Word = 8,
}

/// Runs the Tesseract CLI on in-memory images.
#[derive(Debug, Clone)]
pub struct Tesseract {
    paths: TesseractPaths,
}

impl Tesseract {
    pub fn new(paths: TesseractPaths) -> Self {
        Self { paths }
    }

    /// Recognizes plain text. `whitelist` restricts the characters Tesseract may emit.
    pub fn recognize_text(
        &self,
        img: &GrayImage,
        psm: PageSegMode,
        whitelist: Option<&str>,
    ) -> Result<String> {
        let temp_input = NamedTempFile::with_suffix(".png")?;
        img.save(temp_input.path())
            .context("Failed to write OCR input image")?;

        let mut cmd = Command::new(&self.paths.executable);
        cmd.arg(temp_input.path()).arg("stdout");
        if let Some(tessdata) = &self.paths.tessdata {
            cmd.arg("--tessdata-dir").arg(tessdata);
        }
        cmd.arg("-l").arg("eng").arg("--psm").arg((psm as u8).to_string());
        if let Some(chars) = whitelist {
            cmd.arg("-c").arg(format!("tessedit_char_whitelist={}", chars));
        }

        let output = cmd.output().context("Failed to launch Tesseract")?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("Tesseract failed: {}", stderr.trim()));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(psm = psm as u8, text = %text.trim(), "OCR pass");
        Ok(text)
    }
}
