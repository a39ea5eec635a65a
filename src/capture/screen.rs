//! Screen-region capture through GDI.

use anyhow::{anyhow, Result};
use image::RgbaImage;
use std::mem;

use windows::Win32::Foundation::HWND;
use windows::Win32::Graphics::Gdi::{
    BI_RGB, BITMAPINFO, BITMAPINFOHEADER, BitBlt, CreateCompatibleBitmap, CreateCompatibleDC,
    DIB_RGB_COLORS, DeleteDC, DeleteObject, GetDC, GetDIBits, ReleaseDC, SRCCOPY, SelectObject,
};

use super::FrameSource;
use crate::config::ScreenRegion;

/// Copies a fixed rectangle of the desktop on every grab.
pub struct ScreenRegionSource {
    region: ScreenRegion,
}

impl ScreenRegionSource {
    pub fn new(region: ScreenRegion) -> Self {
        Self { region }
    }
}

impl FrameSource for ScreenRegionSource {
    fn grab(&mut self) -> Result<RgbaImage> {
        capture_region(self.region)
    }

    fn describe(&self) -> String {
        let r = self.region;
        format!("screen {}x{} at ({}, {})", r.width, r.height, r.x, r.y)
    }
}

/// Captures `region` of the virtual screen.
///
/// This function:
/// 1. Blits the region from the screen DC into a compatible bitmap
/// 2. Reads the bitmap back as a top-down 32-bit DIB
/// 3. Converts from BGRA to RGBA with an opaque alpha
pub fn capture_region(region: ScreenRegion) -> Result<RgbaImage> {
    let width = region.width as i32;
    let height = region.height as i32;
    let len = (region.width as usize)
        .checked_mul(region.height as usize)
        .and_then(|pixels| pixels.checked_mul(4))
        .ok_or_else(|| anyhow!("capture region {}x{} is too large", region.width, region.height))?;
    let mut bgra = vec![0u8; len];

    unsafe {
        let hdc_screen = GetDC(HWND::default());
        if hdc_screen.is_invalid() {
            return Err(anyhow!("GetDC failed"));
        }

        let hdc_mem = CreateCompatibleDC(hdc_screen);
        if hdc_mem.is_invalid() {
            ReleaseDC(HWND::default(), hdc_screen);
            return Err(anyhow!("CreateCompatibleDC failed"));
        }

        let hbitmap = CreateCompatibleBitmap(hdc_screen, width, height);
        if hbitmap.is_invalid() {
            let _ = DeleteDC(hdc_mem);
            ReleaseDC(HWND::default(), hdc_screen);
            return Err(anyhow!("CreateCompatibleBitmap failed"));
        }

        let previous = SelectObject(hdc_mem, hbitmap);
        let blit = BitBlt(
            hdc_mem, 0, 0, width, height, hdc_screen, region.x, region.y, SRCCOPY,
        );

        let mut bmi = BITMAPINFO {
            bmiHeader: BITMAPINFOHEADER {
                biSize: mem::size_of::<BITMAPINFOHEADER>() as u32,
                biWidth: width,
                biHeight: -height, // Top-down DIB
                biPlanes: 1,
                biBitCount: 32,
                biCompression: BI_RGB.0,
                ..Default::default()
            },
            ..Default::default()
        };

        // The bitmap must not be selected into a DC while GetDIBits reads it.
        SelectObject(hdc_mem, previous);
        let lines = if blit.is_ok() {
            GetDIBits(
                hdc_screen,
                hbitmap,
                0,
                region.height,
                Some(bgra.as_mut_ptr().cast()),
                &mut bmi,
                DIB_RGB_COLORS,
            )
        } else {
            0
        };

        let _ = DeleteObject(hbitmap);
        let _ = DeleteDC(hdc_mem);
        ReleaseDC(HWND::default(), hdc_screen);

        blit.map_err(|e| anyhow!("BitBlt failed: {}", e))?;
        if lines == 0 {
            return Err(anyhow!("GetDIBits failed"));
        }
    }

    for px in bgra.chunks_exact_mut(4) {
        px.swap(0, 2);
        px[3] = 255;
    }

    RgbaImage::from_raw(region.width, region.height, bgra)
        .ok_or_else(|| anyhow!("Captured buffer has the wrong size"))
}
