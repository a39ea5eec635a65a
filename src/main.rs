//! COCA Smart Timer
//!
//! A transparent always-on-top overlay that reads a crop's growth percentage
//! off the screen with Tesseract and counts down the remaining growth stages.

// Hide console window on Windows for release builds
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod capture;
mod config;
mod gui;
mod logging;
mod ocr;
mod paths;
mod sampler;
mod timer;
mod triggers;

use anyhow::{anyhow, Context, Result};
use std::sync::mpsc::channel;
use std::time::Duration;
use tracing::{error, info, warn};

use config::{ConfigWatcher, TimerConfig};
use sampler::{SampleSlot, SamplerHandle, SamplerOptions};

fn main() -> Result<()> {
    let _log_guard = logging::init();

    // Set up panic hook to log panics
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}:{}", loc.file(), loc.line(), loc.column()))
            .unwrap_or_default();
        error!(%location, "PANIC: {}", msg);
    }));

    paths::ensure_directories().context("Failed to create output directories")?;

    let config_path = paths::get_config_path();
    let config = TimerConfig::load(&config_path);
    if !config_path.exists()
        && let Err(e) = config.save(&config_path)
    {
        warn!(error = %e, "Could not write default config");
    }
    info!(
        crop = %config.crop_type,
        planter = %config.planter_type,
        auto_detect = config.auto_detect_crop,
        area = ?config.selected_area,
        "Configuration ready"
    );

    let slot = SampleSlot::new();
    let sampler = start_sampler(&config, slot.clone());

    let (action_tx, action_rx) = channel();
    triggers::spawn_listener(&config.trigger_start, &config.trigger_reset, action_tx)?;

    match gui::run_overlay(
        &config,
        ConfigWatcher::new(config_path),
        slot,
        action_rx,
        sampler,
    ) {
        Ok(()) => {
            info!("Overlay exited normally");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Overlay error");
            Err(anyhow!("Overlay error: {}", e))
        }
    }
}

/// Starts the capture + OCR thread, or explains why sampling is unavailable.
///
/// Without a sampler the overlay still shows, but start triggers are refused.
fn start_sampler(config: &TimerConfig, slot: SampleSlot) -> Option<SamplerHandle> {
    let source = match capture::open_source(config) {
        Ok(source) => source,
        Err(e) => {
            warn!(error = %e, "Screen sampling disabled");
            return None;
        }
    };

    let tesseract = match ocr::ensure_tesseract() {
        Ok(paths) => ocr::Tesseract::new(paths),
        Err(e) => {
            warn!(error = %e, "Failed to set up Tesseract, OCR disabled");
            return None;
        }
    };

    let options = SamplerOptions {
        interval: Duration::from_millis(config.capture_interval_ms),
        debug_dir: config
            .save_debug_screenshots
            .then(paths::get_screenshots_dir),
    };

    let read = move |img: &image::RgbaImage| ocr::read_region(&tesseract, img);
    match sampler::spawn_sampler(source, read, slot, options) {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(error = %e, "Failed to start sampler");
            None
        }
    }
}
