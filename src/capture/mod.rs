//! Frame sources for the sampler.
//!
//! This module provides:
//! - The `FrameSource` trait the sampler pulls images from
//! - Screen-region capture through GDI (`ScreenRegionSource`, Windows only)
//! - Image-file replay (`ImageFileSource`) for testing without the game

pub mod file;
#[cfg(windows)]
pub mod screen;

use anyhow::{anyhow, Result};
use image::RgbaImage;

use crate::config::{ScreenRegion, TimerConfig};

pub use file::ImageFileSource;
#[cfg(windows)]
pub use screen::ScreenRegionSource;

/// Something that can produce the watched image on demand.
pub trait FrameSource: Send {
    fn grab(&mut self) -> Result<RgbaImage>;

    /// Short label for logs.
    fn describe(&self) -> String;
}

/// Picks the frame source the config asks for.
///
/// `replay_image` wins over the screen. Without a replay image a selected
/// area is required.
pub fn open_source(config: &TimerConfig) -> Result<Box<dyn FrameSource>> {
    let region = config.region();

    if let Some(path) = &config.replay_image {
        return Ok(Box::new(ImageFileSource::new(path.clone(), region)));
    }

    let region = region.ok_or_else(|| anyhow!("No screen area selected"))?;
    open_screen(region)
}

#[cfg(windows)]
fn open_screen(region: ScreenRegion) -> Result<Box<dyn FrameSource>> {
    Ok(Box::new(ScreenRegionSource::new(region)))
}

#[cfg(not(windows))]
fn open_screen(region: ScreenRegion) -> Result<Box<dyn FrameSource>> {
    Err(anyhow!(
        "Screen capture of {}x{} at ({}, {}) is only supported on Windows; set replay_image instead",
        region.width,
        region.height,
        region.x,
        region.y
    ))
}
