//! Tesseract CLI recognizer.

use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;

use adascal_config::OcrConfig;
use adascal_protocols::{OcrError, TextRecognizer};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, trace};

use crate::preprocess::Preprocessor;

/// Runs `<command> stdin stdout -l <language> <extra_args>` per image.
pub struct TesseractRecognizer {
    command: String,
    language: String,
    extra_args: Vec<String>,
    timeout: Duration,
    preprocessor: Preprocessor,
}

impl TesseractRecognizer {
    pub fn new(command: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            language: language.into(),
            extra_args: Vec::new(),
            timeout: Duration::from_secs(20),
            preprocessor: Preprocessor::default(),
        }
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self {
            command: config.command.clone(),
            language: config.language.clone(),
            extra_args: config.extra_args.clone(),
            timeout: config.timeout(),
            preprocessor: Preprocessor {
                upscale_below: config.upscale_below,
                upscale_factor: config.upscale_factor,
            },
        }
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.command);
        cmd.arg("stdin")
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .args(&self.extra_args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    async fn run(&self, image: Vec<u8>) -> Result<String, OcrError> {
        let mut child = self.build_command().spawn().map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                OcrError::Unavailable(format!("{} not found", self.command))
            } else {
                OcrError::Unavailable(e.to_string())
            }
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            // The process may exit before reading everything.
            if let Err(e) = stdin.write_all(&image).await {
                trace!("OCR stdin write ended early: {}", e);
            }
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| OcrError::Recognition(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Recognition(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl TextRecognizer for TesseractRecognizer {
    async fn recognize(&self, png: &[u8]) -> Result<String, OcrError> {
        let image = self.preprocessor.apply(png)?;
        let text = timeout(self.timeout, self.run(image))
            .await
            .map_err(|_| OcrError::Timeout(self.timeout.as_millis() as u64))??;
        debug!("OCR recognized {} characters", text.trim().len());
        Ok(text)
    }
}
