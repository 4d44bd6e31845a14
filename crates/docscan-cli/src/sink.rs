// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PNG file sink for captured documents.

use std::path::{Path, PathBuf};

use docscan_core::error::Result;
use docscan_session::{CapturedDocument, DocumentSink};
use tracing::info;

/// Writes each document as a PNG.
///
/// When the target is an existing directory every document is written to
/// `<dir>/<capture id>.png`; otherwise the target is the file path itself.
#[derive(Debug)]
pub struct PngFileSink {
    target: PathBuf,
    written: Vec<PathBuf>,
}

impl PngFileSink {
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            written: Vec::new(),
        }
    }

    /// Paths written so far, in order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn path_for(&self, document: &CapturedDocument) -> PathBuf {
        if self.target.is_dir() {
            self.target.join(format!("{}.png", document.id))
        } else {
            self.target.clone()
        }
    }
}

impl DocumentSink for PngFileSink {
    fn accept(&mut self, document: CapturedDocument) -> Result<()> {
        let path = self.path_for(&document);
        let bytes = document.image.to_png_bytes()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_dir(parent)?;
        }
        std::fs::write(&path, bytes)?;
        info!(path = %path.display(), id = %document.id, "Document written");
        self.written.push(path);
        Ok(())
    }
}

fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}
