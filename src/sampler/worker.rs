//! Background capture + OCR producer.
//!
//! Runs in a separate thread so slow recognition never blocks the overlay's
//! tick and render path. Every result, including failures, ends up in the
//! `SampleSlot` as a `Sample`.

use anyhow::{Context, Result};
use image::RgbaImage;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::slot::SampleSlot;
use crate::capture::FrameSource;
use crate::ocr::Extraction;
use crate::timer::{CropLabel, Sample};

/// Granularity of the stop-flag check while waiting between captures.
const STOP_POLL: Duration = Duration::from_millis(50);

/// File name of the debug capture kept for the last OCR miss.
pub const DEBUG_CAPTURE_NAME: &str = "ocr_miss.png";

/// Producer settings taken from the config.
#[derive(Clone, Debug)]
pub struct SamplerOptions {
    pub interval: Duration,
    /// Directory for the last-miss capture, `None` to disable
    pub debug_dir: Option<PathBuf>,
}

/// Owns the producer thread. Dropping the handle stops and joins it.
pub struct SamplerHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl SamplerHandle {
    /// Asks the producer to exit after its current capture.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stops the producer and waits for it to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.request_stop();
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            warn!("Sampler thread panicked");
        }
    }
}

impl Drop for SamplerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Spawns the producer thread.
///
/// `read` turns one captured frame into an `Extraction`; in the application it
/// is the Tesseract pipeline.
pub fn spawn_sampler<F>(
    mut source: Box<dyn FrameSource>,
    mut read: F,
    slot: SampleSlot,
    options: SamplerOptions,
) -> Result<SamplerHandle>
where
    F: FnMut(&RgbaImage) -> Result<Extraction> + Send + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = Arc::clone(&stop);

    let thread = thread::Builder::new()
        .name("sampler".to_string())
        .spawn(move || {
            info!(source = %source.describe(), interval_ms = options.interval.as_millis() as u64, "Sampler started");
            while !stop_flag.load(Ordering::SeqCst) {
                let sample = sample_once(source.as_mut(), &mut read, options.debug_dir.as_deref());
                slot.publish(sample);
                wait_or_stop(&stop_flag, options.interval);
            }
            info!("Sampler finished");
        })
        .context("Failed to spawn sampler thread")?;

    Ok(SamplerHandle {
        stop,
        thread: Some(thread),
    })
}

/// Captures and reads one frame. Failures produce an empty sample.
fn sample_once<F>(source: &mut dyn FrameSource, read: &mut F, debug_dir: Option<&Path>) -> Sample
where
    F: FnMut(&RgbaImage) -> Result<Extraction>,
{
    let captured_at = Instant::now();
    let empty = Sample {
        captured_at,
        percent: None,
        detected_crop: CropLabel::Unknown,
    };

    let img = match source.grab() {
        Ok(img) => img,
        Err(e) => {
            warn!(error = %e, "Capture failed");
            return empty;
        }
    };

    let extraction = match read(&img) {
        Ok(extraction) => extraction,
        Err(e) => {
            warn!(error = %e, "OCR failed");
            return empty;
        }
    };

    match extraction.percent {
        Some(percent) => debug!(percent, crop = ?extraction.crop, "Sample read"),
        None => {
            debug!(crop = ?extraction.crop, "No percentage in capture");
            if let Some(dir) = debug_dir
                && let Err(e) = save_debug_capture(&img, dir)
            {
                warn!(error = %e, "Failed to save debug capture");
            }
        }
    }

    Sample {
        captured_at,
        percent: extraction.percent,
        detected_crop: extraction.crop,
    }
}

/// Writes `img` as the debug capture in `dir`, replacing the previous one.
pub fn save_debug_capture(img: &RgbaImage, dir: &Path) -> Result<PathBuf> {
    let path = dir.join(DEBUG_CAPTURE_NAME);
    img.save(&path)
        .with_context(|| format!("Failed to save {}", path.display()))?;
    Ok(path)
}

fn wait_or_stop(stop: &AtomicBool, total: Duration) {
    let deadline = Instant::now() + total;
    while !stop.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep(STOP_POLL.min(deadline - now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use image::Rgba;
    use std::sync::atomic::AtomicUsize;
    use tempfile::tempdir;

    struct SolidSource;

    impl FrameSource for SolidSource {
        fn grab(&mut self) -> Result<RgbaImage> {
            Ok(RgbaImage::from_pixel(4, 4, Rgba([200, 200, 200, 255])))
        }

        fn describe(&self) -> String {
            "solid".to_string()
        }
    }

    struct BrokenSource;

    impl FrameSource for BrokenSource {
        fn grab(&mut self) -> Result<RgbaImage> {
            Err(anyhow!("no screen"))
        }

        fn describe(&self) -> String {
            "broken".to_string()
        }
    }

    fn options() -> SamplerOptions {
        SamplerOptions {
            interval: Duration::from_millis(10),
            debug_dir: None,
        }
    }

    fn wait_for_sample(slot: &SampleSlot) -> Sample {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(sample) = slot.take() {
                return sample;
            }
            assert!(Instant::now() < deadline, "No sample published");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_sampler_publishes_readings() {
        let slot = SampleSlot::new();
        let handle = spawn_sampler(
            Box::new(SolidSource),
            |_: &RgbaImage| {
                Ok(Extraction {
                    percent: Some(42.0),
                    crop: CropLabel::Coca,
                })
            },
            slot.clone(),
            options(),
        )
        .unwrap();

        let sample = wait_for_sample(&slot);
        assert_eq!(sample.percent, Some(42.0));
        assert_eq!(sample.detected_crop, CropLabel::Coca);
        handle.stop();
    }

    #[test]
    fn test_capture_failure_publishes_empty_sample() {
        let slot = SampleSlot::new();
        let handle = spawn_sampler(
            Box::new(BrokenSource),
            |_: &RgbaImage| Ok(Extraction::default()),
            slot.clone(),
            options(),
        )
        .unwrap();

        let sample = wait_for_sample(&slot);
        assert_eq!(sample.percent, None);
        assert_eq!(sample.detected_crop, CropLabel::Unknown);
        handle.stop();
    }

    #[test]
    fn test_ocr_failure_publishes_empty_sample() {
        let mut source = SolidSource;
        let mut read = |_: &RgbaImage| -> Result<Extraction> { Err(anyhow!("tesseract crashed")) };
        let sample = sample_once(&mut source, &mut read, None);
        assert_eq!(sample.percent, None);
    }

    #[test]
    fn test_miss_writes_debug_capture() {
        let dir = tempdir().unwrap();
        let mut source = SolidSource;
        let mut read = |_: &RgbaImage| -> Result<Extraction> { Ok(Extraction::default()) };

        sample_once(&mut source, &mut read, Some(dir.path()));
        assert!(dir.path().join(DEBUG_CAPTURE_NAME).exists());
    }

    #[test]
    fn test_hit_skips_debug_capture() {
        let dir = tempdir().unwrap();
        let mut source = SolidSource;
        let mut read = |_: &RgbaImage| -> Result<Extraction> {
            Ok(Extraction {
                percent: Some(1.0),
                crop: CropLabel::Unknown,
            })
        };

        sample_once(&mut source, &mut read, Some(dir.path()));
        assert!(!dir.path().join(DEBUG_CAPTURE_NAME).exists());
    }

    #[test]
    fn test_stop_ends_thread() {
        let reads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&reads);
        let handle = spawn_sampler(
            Box::new(SolidSource),
            move |_: &RgbaImage| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Extraction::default())
            },
            SampleSlot::new(),
            SamplerOptions {
                interval: Duration::from_secs(60),
                debug_dir: None,
            },
        )
        .unwrap();

        // A long interval must not delay shutdown.
        let started = Instant::now();
        handle.stop();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(reads.load(Ordering::SeqCst) <= 1);
    }
}
