use anyhow::{anyhow, Context, Result};
use image::GrayImage;
use std::path::PathBuf;
use std::process::Command;
use tempfile::NamedTempFile;

use super::setup::{ensure_tesseract, TesseractPaths};
use crate::config::AppConfig;

/// Outcome of one recognition call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Recognition {
    /// Recognized text, trimmed, with line breaks folded to spaces
    Text(String),
    /// The engine ran but found nothing
    Empty,
    /// The engine could not run; the message is for the log
    Failed(String),
}

impl Recognition {
    /// Normalizes raw engine output.
    pub fn from_output(output: &str) -> Self {
        let text = output
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if text.is_empty() {
            Self::Empty
        } else {
            Self::Text(text)
        }
    }

    /// Text for scoring. Empty and failed results both yield "".
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Empty | Self::Failed(_) => String::new(),
        }
    }
}

/// Single-line text recognition over a grayscale image.
pub trait TextRecognizer {
    fn recognize(&self, image: &GrayImage) -> Recognition;
}

/// Tesseract driven through its command-line interface.
///
/// Each call writes the image to a temporary PNG and runs the executable in
/// single-line mode (`--psm 7`) with the configured character whitelist.
pub struct TesseractEngine {
    executable: PathBuf,
    tessdata: PathBuf,
    whitelist: String,
}

impl TesseractEngine {
    pub fn new(paths: TesseractPaths, whitelist: &str) -> Self {
        Self {
            executable: paths.executable,
            tessdata: paths.tessdata,
            whitelist: whitelist.to_string(),
        }
    }

    /// Locates Tesseract and verifies it runs. Errors here are fatal to
    /// starting a tracking session.
    pub fn create(config: &AppConfig) -> Result<Self> {
        let engine = Self::new(ensure_tesseract(config)?, &config.char_whitelist);
        let version = engine.version()?;
        crate::log(&format!("OCR engine ready: {}", version));
        Ok(engine)
    }

    /// First line of `tesseract --version`.
    pub fn version(&self) -> Result<String> {
        let output = Command::new(&self.executable)
            .arg("--version")
            .output()
            .with_context(|| format!("running {}", self.executable.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("Tesseract failed: {}", stderr));
        }

        // Older builds print the banner on stderr
        let text = if output.stdout.is_empty() {
            String::from_utf8_lossy(&output.stderr).to_string()
        } else {
            String::from_utf8_lossy(&output.stdout).to_string()
        };
        Ok(text.lines().next().unwrap_or("tesseract").trim().to_string())
    }

    fn run(&self, image: &GrayImage) -> Result<String> {
        let temp_input = NamedTempFile::with_suffix(".png")?;
        image.save(temp_input.path())?;

        let output = Command::new(&self.executable)
            .arg(temp_input.path())
            .arg("stdout")
            .arg("--tessdata-dir")
            .arg(&self.tessdata)
            .arg("-l")
            .arg("eng")
            .arg("--psm")
            .arg("7") // Single text line
            .arg("-c")
            .arg(format!("tessedit_char_whitelist={}", self.whitelist))
            .arg("-c")
            .arg("preserve_interword_spaces=1")
            .arg("-c")
            .arg("tessedit_do_invert=1")
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("Tesseract failed: {}", stderr.trim()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl TextRecognizer for TesseractEngine {
    fn recognize(&self, image: &GrayImage) -> Recognition {
        match self.run(image) {
            Ok(stdout) => Recognition::from_output(&stdout),
            Err(e) => Recognition::Failed(format!("{:#}", e)),
        }
    }
}
