use anyhow::{anyhow, Context, Result};
use image::RgbaImage;
use std::path::PathBuf;

use super::FrameSource;
use crate::config::ScreenRegion;

/// Reads the watched image from a file on every grab.
///
/// The file is reopened each time so an external tool can overwrite it while
/// the timer runs. When a region is given and fits inside the image, only that
/// region is returned.
pub struct ImageFileSource {
    path: PathBuf,
    region: Option<ScreenRegion>,
}

impl ImageFileSource {
    pub fn new(path: PathBuf, region: Option<ScreenRegion>) -> Self {
        Self { path, region }
    }
}

impl FrameSource for ImageFileSource {
    fn grab(&mut self) -> Result<RgbaImage> {
        let img = image::open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?
            .to_rgba8();
        crop_to_region(img, self.region)
    }

    fn describe(&self) -> String {
        format!("replay file {}", self.path.display())
    }
}

fn crop_to_region(img: RgbaImage, region: Option<ScreenRegion>) -> Result<RgbaImage> {
    let Some(region) = region else {
        return Ok(img);
    };
    let (w, h) = img.dimensions();
    if region.x < 0 || region.y < 0 {
        return Err(anyhow!("Region starts outside the image"));
    }
    let (x, y) = (region.x as u32, region.y as u32);
    if x.saturating_add(region.width) > w || y.saturating_add(region.height) > h {
        // A replay image that is already the cropped area.
        return Ok(img);
    }
    Ok(image::imageops::crop_imm(&img, x, y, region.width, region.height).to_image())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use tempfile::tempdir;

    fn gradient(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| Rgba([x as u8, y as u8, 0, 255]))
    }

    #[test]
    fn test_grab_crops_to_region() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("frame.png");
        gradient(100, 50).save(&path).unwrap();

        let region = ScreenRegion { x: 10, y: 20, width: 30, height: 5 };
        let mut source = ImageFileSource::new(path, Some(region));
        let img = source.grab().unwrap();

        assert_eq!(img.dimensions(), (30, 5));
        assert_eq!(img.get_pixel(0, 0)[0], 10);
        assert_eq!(img.get_pixel(0, 0)[1], 20);
    }

    #[test]
    fn test_grab_whole_image_when_region_too_large() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("frame.png");
        gradient(40, 10).save(&path).unwrap();

        let region = ScreenRegion { x: 500, y: 300, width: 40, height: 10 };
        let mut source = ImageFileSource::new(path, Some(region));
        assert_eq!(source.grab().unwrap().dimensions(), (40, 10));
    }

    #[test]
    fn test_grab_rereads_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("frame.png");
        gradient(8, 8).save(&path).unwrap();

        let mut source = ImageFileSource::new(path.clone(), None);
        assert_eq!(source.grab().unwrap().dimensions(), (8, 8));

        gradient(16, 4).save(&path).unwrap();
        assert_eq!(source.grab().unwrap().dimensions(), (16, 4));
    }

    #[test]
    fn test_grab_missing_file_errors() {
        let dir = tempdir().unwrap();
        let mut source = ImageFileSource::new(dir.path().join("missing.png"), None);
        assert!(source.grab().is_err());
    }
}
