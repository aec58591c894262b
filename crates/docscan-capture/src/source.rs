// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Frame sources — where the capture loop gets its pictures from.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use docscan_core::error::{DocscanError, Result};
use docscan_document::RasterImage;
use image::ImageFormat;
use tracing::{debug, info};

/// Something that yields camera frames one at a time.
///
/// `Ok(None)` means the source is exhausted and the capture loop should end.
/// An `Err` is reported for that frame only; the loop asks again next cycle.
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Result<Option<RasterImage>>;

    /// Human-readable origin of the most recent frame, for logs and file names.
    fn last_label(&self) -> Option<&str> {
        None
    }
}

/// Replays the image files of a directory in file-name order.
///
/// Files the `image` crate cannot identify by extension are ignored.
#[derive(Debug)]
pub struct DirectoryFrameSource {
    pending: VecDeque<PathBuf>,
    last: Option<String>,
}

impl DirectoryFrameSource {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(DocscanError::InvalidArgument(format!(
                "{} is not a directory",
                dir.display()
            )));
        }

        let mut frames = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && ImageFormat::from_path(&path).is_ok() {
                frames.push(path);
            } else {
                debug!(path = %path.display(), "Ignoring non-image entry");
            }
        }
        frames.sort();

        info!(dir = %dir.display(), frames = frames.len(), "Frame directory opened");
        Ok(Self {
            pending: frames.into(),
            last: None,
        })
    }

    /// Frames not yet handed out.
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl FrameSource for DirectoryFrameSource {
    fn next_frame(&mut self) -> Result<Option<RasterImage>> {
        let Some(path) = self.pending.pop_front() else {
            return Ok(None);
        };
        self.last = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned());
        RasterImage::open(&path).map(Some)
    }

    fn last_label(&self) -> Option<&str> {
        self.last.as_deref()
    }
}
