use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use image::RgbaImage;
use tempfile::TempDir;
use tracing::debug;

use crate::error::OcrError;
use crate::ocr::{OcrEngine, OcrProvider};

/// Tesseract's own default, fully automatic page segmentation. Base fields
/// are single lines but `groups` is a multi-line list, so no single-line mode
/// fits every zone.
pub const DEFAULT_PSM: u8 = 3;

/// Provider backed by the `tesseract` command line tool.
#[derive(Debug, Clone)]
pub struct TesseractBridge {
    binary: PathBuf,
    lang: String,
    psm: u8,
}

impl Default for TesseractBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl TesseractBridge {
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            lang: "eng".to_string(),
            psm: DEFAULT_PSM,
        }
    }

    pub fn with_binary(mut self, binary: PathBuf) -> Self {
        self.binary = binary;
        self
    }

    pub fn with_lang(mut self, lang: String) -> Self {
        self.lang = lang;
        self
    }

    pub fn with_psm(mut self, psm: u8) -> Self {
        self.psm = psm;
        self
    }
}

impl TesseractBridge {
    fn command(&self, input: &Path, output_base: &Path) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .arg(input)
            .arg(output_base)
            .arg("-l")
            .arg(&self.lang)
            .arg("--psm")
            .arg(self.psm.to_string());
        command
    }
}

impl OcrProvider for TesseractBridge {
    type Engine = TesseractEngine;

    fn acquire(&self) -> Result<TesseractEngine, OcrError> {
        let version = Command::new(&self.binary)
            .arg("--version")
            .output()
            .map_err(|e| {
                OcrError::EngineUnavailable(format!(
                    "failed to invoke {}: {e}",
                    self.binary.display()
                ))
            })?;
        if !version.status.success() {
            return Err(OcrError::EngineUnavailable(format!(
                "{} --version exited with {}",
                self.binary.display(),
                version.status
            )));
        }

        let scratch = tempfile::Builder::new()
            .prefix("uar-zones-ocr-")
            .tempdir()
            .map_err(|e| OcrError::EngineUnavailable(format!("failed to create scratch dir: {e}")))?;
        debug!(dir = %scratch.path().display(), "acquired tesseract engine");

        Ok(TesseractEngine {
            bridge: self.clone(),
            scratch: Some(scratch),
            calls: 0,
        })
    }
}

/// One tesseract handle with a private scratch directory.
#[derive(Debug)]
pub struct TesseractEngine {
    bridge: TesseractBridge,
    scratch: Option<TempDir>,
    calls: u64,
}

impl OcrEngine for TesseractEngine {
    fn extract_text(&mut self, image: &RgbaImage) -> Result<String, OcrError> {
        let Some(scratch) = &self.scratch else {
            return Err(OcrError::Processing("engine already released".to_string()));
        };
        self.calls += 1;

        let input = scratch.path().join(format!("crop-{}.png", self.calls));
        let output_base = scratch.path().join(format!("crop-{}", self.calls));
        let output_file = output_base.with_extension("txt");

        image
            .save(&input)
            .map_err(|e| OcrError::Processing(format!("failed to write crop: {e}")))?;

        let output = self
            .bridge
            .command(&input, &output_base)
            .output()
            .map_err(|e| OcrError::Processing(format!("failed to run tesseract: {e}")));

        let _ = fs::remove_file(&input);
        let output = output?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Processing(format!("tesseract failed: {stderr}")));
        }

        let text = fs::read_to_string(&output_file)
            .map_err(|e| OcrError::Processing(format!("failed to read output: {e}")))?;
        let _ = fs::remove_file(&output_file);

        Ok(text)
    }

    fn release(&mut self) -> Result<(), OcrError> {
        match self.scratch.take() {
            Some(dir) => dir.close().map_err(|e| OcrError::Release(e.to_string())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_binary_is_unavailable() {
        let bridge = TesseractBridge::new().with_binary(PathBuf::from("/nonexistent/tesseract-bin"));
        assert!(matches!(
            bridge.acquire(),
            Err(OcrError::EngineUnavailable(_))
        ));
    }

    #[test]
    fn default_segmentation_is_automatic() {
        let bridge = TesseractBridge::new();
        let command = bridge.command(Path::new("in.png"), Path::new("out"));
        let args: Vec<_> = command.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, vec!["in.png", "out", "-l", "eng", "--psm", "3"]);

        let single_line = bridge.with_psm(7).with_lang("kor".to_string());
        let command = single_line.command(Path::new("in.png"), Path::new("out"));
        let args: Vec<_> = command.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args[3..], ["kor", "--psm", "7"]);
    }

    #[test]
    #[ignore] // requires tesseract on PATH
    fn reads_blank_tile() {
        let bridge = TesseractBridge::new();
        let mut engine = bridge.acquire().unwrap();
        let tile = RgbaImage::from_pixel(40, 20, image::Rgba([255, 255, 255, 255]));
        let text = engine.recognize(&tile).unwrap();
        assert!(text.is_empty());
        engine.release().unwrap();
    }
}
