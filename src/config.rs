//! Persisted user configuration.
//!
//! Loads settings from coca_config.json next to the executable. Provides the
//! watched screen area, overlay placement, trigger words and crop defaults.
//! Everything is validated here so the timer engine can assume sane values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use tracing::{info, warn};

use crate::timer::{CropType, PlanterType, TimerSettings};

/// Name of the config file, looked up next to the executable.
pub const CONFIG_FILE_NAME: &str = "coca_config.json";

const TRIGGER_MIN_LEN: usize = 2;
const TRIGGER_MAX_LEN: usize = 10;
const MIN_INTERVAL_MS: u64 = 50;
/// Largest width or height accepted for the watched area, in pixels.
pub const MAX_AREA_SIDE: i32 = 16384;

/// Rejections raised at the configuration boundary.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("trigger word must be {TRIGGER_MIN_LEN} to {TRIGGER_MAX_LEN} letters, got {0}")]
    TriggerLength(usize),
    #[error("trigger word {0:?} may only contain letters a-z")]
    TriggerCharacters(String),
    #[error("trigger word {word:?} conflicts with {other:?}")]
    TriggerConflict { word: String, other: String },
    #[error("selected area must have a positive width and height")]
    EmptyArea,
    #[error("selected area is {width}x{height}, sides may be at most {MAX_AREA_SIDE} pixels")]
    AreaTooLarge { width: i32, height: i32 },
}

/// A rectangle in absolute screen pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScreenRegion {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl ScreenRegion {
    /// Builds a region from the persisted `[x, y, width, height]` form.
    pub fn from_area(area: [i32; 4]) -> Result<Self, ConfigError> {
        let [x, y, width, height] = area;
        if width <= 0 || height <= 0 {
            return Err(ConfigError::EmptyArea);
        }
        if width > MAX_AREA_SIDE || height > MAX_AREA_SIDE {
            return Err(ConfigError::AreaTooLarge { width, height });
        }
        Ok(Self {
            x,
            y,
            width: width as u32,
            height: height as u32,
        })
    }
}

/// Where the overlay sits on the primary screen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayPosition {
    #[default]
    CenterTop,
    TopLeft,
    TopRight,
    BottomCenter,
    BottomLeft,
    BottomRight,
}

impl OverlayPosition {
    /// Distance kept from the screen edges, in points.
    pub const MARGIN: f32 = 20.0;

    /// Top-left corner for a window of `window` size on a screen of `screen` size.
    pub fn origin(self, screen: (f32, f32), window: (f32, f32)) -> (f32, f32) {
        let (sw, sh) = screen;
        let (ww, wh) = window;
        let center_x = ((sw - ww) / 2.0).max(0.0);
        let right_x = (sw - ww - Self::MARGIN).max(0.0);
        let bottom_y = (sh - wh - Self::MARGIN).max(0.0);

        match self {
            OverlayPosition::CenterTop => (center_x, Self::MARGIN),
            OverlayPosition::TopLeft => (Self::MARGIN, Self::MARGIN),
            OverlayPosition::TopRight => (right_x, Self::MARGIN),
            OverlayPosition::BottomCenter => (center_x, bottom_y),
            OverlayPosition::BottomLeft => (Self::MARGIN, bottom_y),
            OverlayPosition::BottomRight => (right_x, bottom_y),
        }
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    /// Watched screen area as `[x, y, width, height]`
    pub selected_area: Option<[i32; 4]>,
    pub position_mode: OverlayPosition,
    pub trigger_start: String,
    pub trigger_reset: String,
    /// Manual crop, used unless auto-detection reads one off the screen
    pub crop_type: CropType,
    pub planter_type: PlanterType,
    pub auto_detect_crop: bool,
    /// Delay between screen captures (milliseconds)
    pub capture_interval_ms: u64,
    /// Delay between timer ticks (milliseconds)
    pub tick_interval_ms: u64,
    /// Image file read instead of the screen, for replaying a saved capture
    pub replay_image: Option<PathBuf>,
    /// Keep the last capture that produced no percentage
    pub save_debug_screenshots: bool,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            selected_area: None,
            position_mode: OverlayPosition::CenterTop,
            trigger_start: "ccc".to_string(),
            trigger_reset: "rrr".to_string(),
            crop_type: CropType::Coca,
            planter_type: PlanterType::Basic,
            auto_detect_crop: true,
            capture_interval_ms: 1000,
            tick_interval_ms: 250,
            replay_image: None,
            save_debug_screenshots: false,
        }
    }
}

impl TimerConfig {
    /// The values the timer engine reads.
    pub fn engine_settings(&self) -> TimerSettings {
        TimerSettings {
            crop: self.crop_type,
            planter: self.planter_type,
            auto_detect: self.auto_detect_crop,
        }
    }

    /// The watched area, if one has been selected and is non-empty.
    pub fn region(&self) -> Option<ScreenRegion> {
        self.selected_area
            .and_then(|area| ScreenRegion::from_area(area).ok())
    }

    /// Replaces invalid loaded values with defaults, logging each fix.
    fn sanitize(&mut self) {
        let defaults = TimerConfig::default();

        let start = validate_trigger(&self.trigger_start, &self.trigger_reset);
        let reset = validate_trigger(&self.trigger_reset, &self.trigger_start);
        match (start, reset) {
            (Ok(start), Ok(reset)) => {
                self.trigger_start = start;
                self.trigger_reset = reset;
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "Invalid trigger words in config, using defaults");
                self.trigger_start = defaults.trigger_start.clone();
                self.trigger_reset = defaults.trigger_reset.clone();
            }
        }

        if let Some(area) = self.selected_area
            && let Err(e) = ScreenRegion::from_area(area)
        {
            warn!(error = %e, ?area, "Discarding selected area");
            self.selected_area = None;
        }

        if self.capture_interval_ms < MIN_INTERVAL_MS {
            warn!(value = self.capture_interval_ms, "capture_interval_ms too small, using default");
            self.capture_interval_ms = defaults.capture_interval_ms;
        }
        if self.tick_interval_ms < MIN_INTERVAL_MS {
            warn!(value = self.tick_interval_ms, "tick_interval_ms too small, using default");
            self.tick_interval_ms = defaults.tick_interval_ms;
        }
    }

    /// Loads configuration from `path` or returns defaults.
    ///
    /// Never fails: unreadable or malformed files are logged and replaced with
    /// the default config.
    pub fn load(path: &Path) -> TimerConfig {
        info!(path = %path.display(), "Looking for config");

        if !path.exists() {
            info!("{} not found. Using default config.", CONFIG_FILE_NAME);
            return TimerConfig::default();
        }

        let mut config = match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<TimerConfig>(&contents) {
                Ok(config) => {
                    info!("Config loaded from {}", CONFIG_FILE_NAME);
                    config
                }
                Err(e) => {
                    warn!(error = %e, "Failed to parse {}. Using defaults.", CONFIG_FILE_NAME);
                    return TimerConfig::default();
                }
            },
            Err(e) => {
                warn!(error = %e, "Failed to read {}. Using defaults.", CONFIG_FILE_NAME);
                return TimerConfig::default();
            }
        };

        config.sanitize();
        config
    }

    /// Writes the configuration as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        info!(path = %path.display(), "Saved config");
        Ok(())
    }
}

/// Notices edits to the config file so settings apply without a restart.
#[derive(Debug)]
pub struct ConfigWatcher {
    path: PathBuf,
    modified: Option<SystemTime>,
}

impl ConfigWatcher {
    pub fn new(path: PathBuf) -> Self {
        let modified = modified_time(&path);
        Self { path, modified }
    }

    /// Returns the reloaded config when the file changed since the last poll.
    pub fn poll(&mut self) -> Option<TimerConfig> {
        let modified = modified_time(&self.path);
        if modified == self.modified {
            return None;
        }
        self.modified = modified;
        modified?;
        info!(path = %self.path.display(), "Config changed, reloading");
        Some(TimerConfig::load(&self.path))
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Normalizes a trigger word and checks it against the other trigger.
///
/// Trigger words are trimmed and lowercased, 2 to 10 ASCII letters long, and
/// must not contain or be contained in the other trigger.
pub fn validate_trigger(word: &str, other: &str) -> Result<String, ConfigError> {
    let word = word.trim().to_lowercase();
    let len = word.chars().count();
    if !(TRIGGER_MIN_LEN..=TRIGGER_MAX_LEN).contains(&len) {
        return Err(ConfigError::TriggerLength(len));
    }
    if !word.chars().all(|c| c.is_ascii_lowercase()) {
        return Err(ConfigError::TriggerCharacters(word));
    }
    let other = other.trim().to_lowercase();
    if !other.is_empty() && (word.contains(&other) || other.contains(&word)) {
        return Err(ConfigError::TriggerConflict { word, other });
    }
    Ok(word)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_validate_trigger_normalizes() {
        assert_eq!(validate_trigger("  CcC ", "rrr").unwrap(), "ccc");
        assert_eq!(validate_trigger("abcdefghij", "rrr").unwrap(), "abcdefghij");
    }

    #[test]
    fn test_validate_trigger_rejects_bad_words() {
        assert_eq!(validate_trigger("c", "rrr"), Err(ConfigError::TriggerLength(1)));
        assert_eq!(validate_trigger("abcdefghijk", "rrr"), Err(ConfigError::TriggerLength(11)));
        assert_eq!(validate_trigger("", "rrr"), Err(ConfigError::TriggerLength(0)));
        assert!(matches!(
            validate_trigger("c1c", "rrr"),
            Err(ConfigError::TriggerCharacters(_))
        ));
        assert!(matches!(
            validate_trigger("c c", "rrr"),
            Err(ConfigError::TriggerCharacters(_))
        ));
    }

    #[test]
    fn test_validate_trigger_rejects_overlap() {
        assert!(matches!(
            validate_trigger("rr", "rrr"),
            Err(ConfigError::TriggerConflict { .. })
        ));
        assert!(matches!(
            validate_trigger("xrrrx", "rrr"),
            Err(ConfigError::TriggerConflict { .. })
        ));
        assert!(matches!(
            validate_trigger("rrr", "rrr"),
            Err(ConfigError::TriggerConflict { .. })
        ));
    }

    #[test]
    fn test_region_from_area() {
        let region = ScreenRegion::from_area([10, 20, 300, 40]).unwrap();
        assert_eq!(region, ScreenRegion { x: 10, y: 20, width: 300, height: 40 });
        assert_eq!(ScreenRegion::from_area([0, 0, 0, 10]), Err(ConfigError::EmptyArea));
        assert_eq!(ScreenRegion::from_area([0, 0, 10, -1]), Err(ConfigError::EmptyArea));
    }

    #[test]
    fn test_region_rejects_oversized_area() {
        let side = ScreenRegion::from_area([0, 0, MAX_AREA_SIDE, MAX_AREA_SIDE]).unwrap();
        assert_eq!(side.width, MAX_AREA_SIDE as u32);

        assert_eq!(
            ScreenRegion::from_area([0, 0, i32::MAX, i32::MAX]),
            Err(ConfigError::AreaTooLarge { width: i32::MAX, height: i32::MAX })
        );
        assert_eq!(
            ScreenRegion::from_area([0, 0, 100, MAX_AREA_SIDE + 1]),
            Err(ConfigError::AreaTooLarge { width: 100, height: MAX_AREA_SIDE + 1 })
        );
    }

    #[test]
    fn test_overlay_origin() {
        let screen = (1920.0, 1080.0);
        let window = (200.0, 40.0);
        assert_eq!(OverlayPosition::CenterTop.origin(screen, window), (860.0, 20.0));
        assert_eq!(OverlayPosition::TopLeft.origin(screen, window), (20.0, 20.0));
        assert_eq!(OverlayPosition::TopRight.origin(screen, window), (1700.0, 20.0));
        assert_eq!(OverlayPosition::BottomCenter.origin(screen, window), (860.0, 1020.0));
        assert_eq!(OverlayPosition::BottomLeft.origin(screen, window), (20.0, 1020.0));
        assert_eq!(OverlayPosition::BottomRight.origin(screen, window), (1700.0, 1020.0));
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempdir().unwrap();
        let config = TimerConfig::load(&dir.path().join(CONFIG_FILE_NAME));
        assert_eq!(config, TimerConfig::default());
    }

    #[test]
    fn test_load_legacy_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(
            &path,
            r#"{
                "selected_area": [100, 200, 150, 30],
                "position_mode": "bottom_right",
                "trigger_start": "go",
                "trigger_reset": "stop",
                "crop_type": "marijuana",
                "planter_type": "planter_box",
                "auto_detect_crop": false
            }"#,
        )
        .unwrap();

        let config = TimerConfig::load(&path);
        assert_eq!(config.crop_type, CropType::Cannabis);
        assert_eq!(config.planter_type, PlanterType::Box);
        assert_eq!(config.position_mode, OverlayPosition::BottomRight);
        assert_eq!(config.trigger_start, "go");
        assert!(!config.auto_detect_crop);
        assert_eq!(
            config.region(),
            Some(ScreenRegion { x: 100, y: 200, width: 150, height: 30 })
        );
        // Fields absent from older files fall back to defaults.
        assert_eq!(config.tick_interval_ms, 250);
    }

    #[test]
    fn test_load_malformed_file_returns_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(TimerConfig::load(&path), TimerConfig::default());
    }

    #[test]
    fn test_load_replaces_invalid_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(
            &path,
            r#"{ "trigger_start": "aa", "trigger_reset": "aaa", "selected_area": [0, 0, 0, 0], "tick_interval_ms": 0 }"#,
        )
        .unwrap();

        let config = TimerConfig::load(&path);
        assert_eq!(config.trigger_start, "ccc");
        assert_eq!(config.trigger_reset, "rrr");
        assert_eq!(config.selected_area, None);
        assert_eq!(config.tick_interval_ms, 250);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let mut config = TimerConfig::default();
        config.crop_type = CropType::Cannabis;
        config.selected_area = Some([5, 6, 70, 8]);
        config.save(&path).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("\"cannabis\""));
        assert_eq!(TimerConfig::load(&path), config);
    }

    #[test]
    fn test_engine_settings() {
        let config = TimerConfig {
            crop_type: CropType::Cannabis,
            planter_type: PlanterType::Box,
            auto_detect_crop: false,
            ..TimerConfig::default()
        };
        let settings = config.engine_settings();
        assert_eq!(settings.crop, CropType::Cannabis);
        assert_eq!(settings.planter, PlanterType::Box);
        assert!(!settings.auto_detect);
    }

    #[test]
    fn test_watcher_reports_changes_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        TimerConfig::default().save(&path).unwrap();

        let mut watcher = ConfigWatcher::new(path.clone());
        assert!(watcher.poll().is_none());

        let mut config = TimerConfig::default();
        config.planter_type = PlanterType::Box;
        config.save(&path).unwrap();
        fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(SystemTime::now() + std::time::Duration::from_secs(10))
            .unwrap();

        let reloaded = watcher.poll().unwrap();
        assert_eq!(reloaded.planter_type, PlanterType::Box);
        assert!(watcher.poll().is_none());
    }

    #[test]
    fn test_watcher_ignores_missing_file() {
        let dir = tempdir().unwrap();
        let mut watcher = ConfigWatcher::new(dir.path().join(CONFIG_FILE_NAME));
        assert!(watcher.poll().is_none());
    }
}
