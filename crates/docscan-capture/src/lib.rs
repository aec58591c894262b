// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docscan-capture — Periodic auto-capture on top of docscan-document.
//
// A `FrameSource` stands in for the camera. Each cycle pulls one frame,
// compares a downscaled preview against the last accepted frame, skips
// near-duplicates, and runs accepted frames through detection, cropping,
// quality estimation, and the filter pipeline. The `CaptureLoop` drives
// one cycle at a time on tokio's blocking pool.

pub mod processor;
pub mod scheduler;
pub mod session;
pub mod source;

pub use processor::{FrameOutcome, FrameProcessor};
pub use scheduler::{CaptureLoop, CapturedFrame};
pub use session::{CaptureSession, CaptureStats, FrameDecision, downscale_preview};
pub use source::{DirectoryFrameSource, FrameSource};
