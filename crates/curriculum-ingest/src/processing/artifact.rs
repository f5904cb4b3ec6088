//! Scoped temporary artifacts
//!
//! Extractors read from disk, so each upload is staged to a uniquely named
//! file. The file is removed when the artifact is released or dropped,
//! including when extraction panics.

use std::io::Write;
use std::path::Path;

use tempfile::TempPath;

use crate::config::StagingConfig;
use crate::error::{Error, Result};

const MAX_STEM_CHARS: usize = 40;

/// A staged copy of an upload, deleted on release or drop
#[derive(Debug)]
pub struct TemporaryArtifact {
    path: Option<TempPath>,
}

impl TemporaryArtifact {
    /// Write `data` to a new uniquely named file in the staging directory
    ///
    /// The name keeps the original extension so extension-sensitive parsers
    /// behave, plus a timestamp and random suffix so concurrent uploads of
    /// the same filename never collide.
    pub fn stage(config: &StagingConfig, filename: &str, data: &[u8]) -> Result<Self> {
        std::fs::create_dir_all(&config.dir).map_err(|e| {
            Error::resource(format!(
                "Failed to create staging directory '{}': {}",
                config.dir.display(),
                e
            ))
        })?;

        let source = Path::new(filename);
        let stem = source
            .file_stem()
            .map(|s| sanitize(&s.to_string_lossy()))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "document".to_string());
        let suffix = source
            .extension()
            .map(|e| format!(".{}", sanitize(&e.to_string_lossy()).to_lowercase()))
            .unwrap_or_default();
        let prefix = format!(
            "{}-{}-{}-",
            config.prefix,
            chrono::Utc::now().format("%Y%m%dT%H%M%S%3f"),
            stem
        );

        let mut file = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(&suffix)
            .rand_bytes(8)
            .tempfile_in(&config.dir)
            .map_err(|e| Error::resource(format!("Failed to create temp file: {}", e)))?;

        file.write_all(data)
            .and_then(|_| file.flush())
            .map_err(|e| Error::resource(format!("Failed to write temp file: {}", e)))?;

        let path = file.into_temp_path();
        tracing::debug!("Staged '{}' at {} ({} bytes)", filename, path.display(), data.len());

        Ok(Self { path: Some(path) })
    }

    /// Path of the staged file
    pub fn path(&self) -> &Path {
        // Only `release` takes the path, and it consumes `self`
        self.path.as_deref().unwrap_or_else(|| Path::new(""))
    }

    /// Delete the staged file, reporting failure instead of logging it
    pub fn release(mut self) -> Result<()> {
        match self.path.take() {
            Some(path) => {
                let shown = path.display().to_string();
                path.close()
                    .map_err(|e| Error::resource(format!("Failed to delete '{}': {}", shown, e)))
            }
            None => Ok(()),
        }
    }
}

impl Drop for TemporaryArtifact {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            let shown = path.display().to_string();
            if let Err(e) = path.close() {
                tracing::warn!("Failed to delete temporary artifact '{}': {}", shown, e);
            }
        }
    }
}

/// Keep filename characters that are safe on every platform
fn sanitize(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .take(MAX_STEM_CHARS)
        .collect()
}
