use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tracing::{info, warn};

use crate::paths::{get_bundled_tesseract_dir, get_user_tesseract_dir};

const TESSDATA_REPO: &str = "https://github.com/tesseract-ocr/tessdata/raw/main";
const TRAINED_DATA: &str = "eng.traineddata";

#[cfg(windows)]
const EXE_NAME: &str = "tesseract.exe";
#[cfg(not(windows))]
const EXE_NAME: &str = "tesseract";

#[cfg(windows)]
const SYSTEM_INSTALL_DIRS: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR",
    r"C:\Program Files (x86)\Tesseract-OCR",
];
#[cfg(not(windows))]
const SYSTEM_INSTALL_DIRS: &[&str] = &["/usr/bin", "/usr/local/bin", "/opt/homebrew/bin"];

/// Resolved Tesseract installation.
#[derive(Debug, Clone)]
pub struct TesseractPaths {
    pub executable: PathBuf,
    /// `None` lets Tesseract use its compiled-in data directory.
    pub tessdata: Option<PathBuf>,
}

/// Locates Tesseract and makes sure English trained data is reachable.
///
/// Downloads `eng.traineddata` into the per-user directory when the executable
/// exists but no trained data can be found next to it.
pub fn ensure_tesseract() -> Result<TesseractPaths> {
    let executable = find_tesseract_executable()?;
    info!(path = %executable.display(), "Tesseract executable found");

    if let Some(tessdata) = find_tessdata_dir() {
        info!(path = %tessdata.display(), "Using tessdata");
        return Ok(TesseractPaths {
            executable,
            tessdata: Some(tessdata),
        });
    }

    if system_has_trained_data(&executable) {
        info!("Using Tesseract's built-in tessdata");
        return Ok(TesseractPaths {
            executable,
            tessdata: None,
        });
    }

    let tessdata = get_user_tesseract_dir().join("tessdata");
    fs::create_dir_all(&tessdata)
        .with_context(|| format!("Failed to create {}", tessdata.display()))?;
    download_tessdata(&tessdata)?;

    Ok(TesseractPaths {
        executable,
        tessdata: Some(tessdata),
    })
}

/// Finds the Tesseract executable: bundled dir, then PATH, then known install dirs.
pub fn find_tesseract_executable() -> Result<PathBuf> {
    let bundled = get_bundled_tesseract_dir().join(EXE_NAME);
    if bundled.exists() {
        return Ok(bundled);
    }

    if let Ok(output) = Command::new("tesseract").arg("--version").output()
        && output.status.success()
    {
        return Ok(PathBuf::from("tesseract"));
    }

    for dir in SYSTEM_INSTALL_DIRS {
        let p = Path::new(dir).join(EXE_NAME);
        if p.exists() {
            return Ok(p);
        }
    }

    Err(anyhow!(
        "Tesseract not found. Install Tesseract-OCR and add it to PATH, \
         or copy it to {}",
        get_bundled_tesseract_dir().display()
    ))
}

/// Finds a tessdata directory containing English trained data.
pub fn find_tessdata_dir() -> Option<PathBuf> {
    let mut candidates = vec![
        get_bundled_tesseract_dir().join("tessdata"),
        get_user_tesseract_dir().join("tessdata"),
    ];

    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        let prefix = PathBuf::from(prefix);
        candidates.push(prefix.join("tessdata"));
        candidates.push(prefix);
    }

    #[cfg(windows)]
    candidates.extend(
        SYSTEM_INSTALL_DIRS
            .iter()
            .map(|dir| Path::new(dir).join("tessdata")),
    );

    candidates
        .into_iter()
        .find(|dir| dir.join(TRAINED_DATA).exists())
}

/// Asks Tesseract which languages its default data directory provides.
fn system_has_trained_data(executable: &Path) -> bool {
    match Command::new(executable).arg("--list-langs").output() {
        Ok(output) if output.status.success() => {
            // Some builds print the list on stderr.
            let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
            text.push_str(&String::from_utf8_lossy(&output.stderr));
            text.lines().any(|line| line.trim() == "eng")
        }
        Ok(_) => false,
        Err(e) => {
            warn!(error = %e, "Failed to list Tesseract languages");
            false
        }
    }
}

/// Downloads English trained data from the tessdata repository.
fn download_tessdata(tessdata_dir: &Path) -> Result<()> {
    let eng_url = format!("{}/{}", TESSDATA_REPO, TRAINED_DATA);
    let eng_path = tessdata_dir.join(TRAINED_DATA);

    info!(url = %eng_url, "Downloading {}", TRAINED_DATA);

    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(300))
        .build()?;

    let response = client
        .get(&eng_url)
        .header("User-Agent", "coca-timer")
        .send()?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Failed to download {}: HTTP {}",
            TRAINED_DATA,
            response.status()
        ));
    }

    let bytes = response.bytes()?;
    let mut file = fs::File::create(&eng_path)
        .with_context(|| format!("Failed to create {}", eng_path.display()))?;
    file.write_all(&bytes)?;

    info!(bytes = bytes.len(), "Downloaded {}", TRAINED_DATA);
    Ok(())
}
