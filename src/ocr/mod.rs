pub mod engine;
pub mod extract;
pub mod preprocess;
pub mod setup;

pub use engine::{PageSegMode, Tesseract};
pub use extract::Extraction;
pub use setup::ensure_tesseract;

use anyhow::Result;
use image::RgbaImage;
use tracing::debug;

use preprocess::enhance_for_ocr;

/// Characters allowed in the digits-only retry passes.
const DIGIT_WHITELIST: &str = "0123456789.%";

/// High-level function: captured region → percentage and crop label.
///
/// The first pass reads unrestricted text so the crop label survives. When it
/// finds no percentage, digit-only passes retry as a single word, then as a
/// single line. The crop label always comes from the first pass.
pub fn read_region(tesseract: &Tesseract, img: &RgbaImage) -> Result<Extraction> {
    let prepared = enhance_for_ocr(img);

    let text = tesseract.recognize_text(&prepared, PageSegMode::Block, None)?;
    let mut extraction = extract::extract(&text)?;
    if extraction.percent.is_some() {
        return Ok(extraction);
    }

    for psm in [PageSegMode::Word, PageSegMode::Line] {
        let text = tesseract.recognize_text(&prepared, psm, Some(DIGIT_WHITELIST))?;
        if !text.contains('%') {
            continue;
        }
        extraction.percent = extract::extract(&text)?.percent;
        if extraction.percent.is_some() {
            debug!(psm = psm as u8, "Percentage found on retry pass");
            break;
        }
    }

    Ok(extraction)
}
