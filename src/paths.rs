use std::path::PathBuf;
use std::sync::OnceLock;

use crate::config::CONFIG_FILE_NAME;

static EXE_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the directory containing the executable.
pub fn get_exe_dir() -> &'static PathBuf {
    EXE_DIR.get_or_init(|| {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

/// Returns the config file path: `<exe_dir>/coca_config.json`
pub fn get_config_path() -> PathBuf {
    get_exe_dir().join(CONFIG_FILE_NAME)
}

/// Returns the logs directory: `<exe_dir>/logs/`
pub fn get_logs_dir() -> PathBuf {
    get_exe_dir().join("logs")
}

/// Returns the screenshots directory: `<exe_dir>/screenshots/`
pub fn get_screenshots_dir() -> PathBuf {
    get_exe_dir().join("screenshots")
}

/// Returns the bundled tesseract directory: `<exe_dir>/tesseract/`
pub fn get_bundled_tesseract_dir() -> PathBuf {
    get_exe_dir().join("tesseract")
}

/// Returns the per-user tesseract data directory, used when the bundled one is absent.
pub fn get_user_tesseract_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("coca-timer")
        .join("tesseract")
}

/// Ensures all output directories exist. Call at startup.
pub fn ensure_directories() -> std::io::Result<()> {
    std::fs::create_dir_all(get_logs_dir())?;
    std::fs::create_dir_all(get_screenshots_dir())?;
    Ok(())
}
