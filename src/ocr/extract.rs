use anyhow::Result;
use regex::Regex;

use crate::timer::CropLabel;

/// Pattern to match percentage readings: `42%`, `87.5 %`
const PERCENT_PATTERN: &str = r"(\d+(?:\.\d+)?)\s*%";

/// What one OCR text yields.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Extraction {
    /// Smallest valid percentage found, if any
    pub percent: Option<f64>,
    pub crop: CropLabel,
}

/// Extracts every percentage in [0, 100] from the text, deduplicated in order.
pub fn extract_percentages(text: &str) -> Result<Vec<f64>> {
    let percent_regex = Regex::new(PERCENT_PATTERN)?;

    let mut found: Vec<f64> = Vec::new();
    for cap in percent_regex.captures_iter(text) {
        let Ok(value) = cap[1].parse::<f64>() else {
            continue;
        };
        if (0.0..=100.0).contains(&value) && !found.contains(&value) {
            found.push(value);
        }
    }
    Ok(found)
}

/// Classifies the crop label shown next to the percentage.
///
/// `cannabis` must appear as a whole word. `coca` may appear anywhere,
/// since OCR often glues it to neighbouring glyphs.
pub fn detect_crop_label(text: &str) -> CropLabel {
    let lower = text.to_lowercase();

    let has_cannabis = lower
        .split(|c: char| !c.is_alphabetic())
        .any(|token| token == "cannabis");
    if has_cannabis {
        return CropLabel::Cannabis;
    }
    if lower.contains("coca") {
        return CropLabel::Coca;
    }
    CropLabel::Unknown
}

/// Runs both extractors over one OCR text.
pub fn extract(text: &str) -> Result<Extraction> {
    let percent = extract_percentages(text)?
        .into_iter()
        .reduce(f64::min);
    Ok(Extraction {
        percent,
        crop: detect_crop_label(text),
    })
}
