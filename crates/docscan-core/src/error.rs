// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for docscan.

use thiserror::Error;

/// Top-level error type for all docscan operations.
#[derive(Debug, Error)]
pub enum DocscanError {
    // -- Caller errors --
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    // -- Vision engine --
    #[error("{step} failed: {reason}")]
    ProcessingFailure { step: String, reason: String },

    // -- Decode / encode --
    #[error("image processing failed: {0}")]
    ImageError(String),

    // -- Configuration --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Capture session --
    #[error("capture session is no longer active")]
    SessionClosed,
}

impl DocscanError {
    /// Shorthand for a failed vision-engine step.
    pub fn processing(step: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ProcessingFailure {
            step: step.into(),
            reason: reason.into(),
        }
    }

    /// How a caller is expected to recover from this error.
    pub fn recovery(&self) -> Recovery {
        match self {
            Self::InvalidArgument(_) | Self::Config(_) | Self::Serialization(_) => {
                Recovery::FixInput
            }
            Self::ProcessingFailure { .. } | Self::ImageError(_) => Recovery::UseOriginal,
            Self::Io(_) | Self::SessionClosed => Recovery::Abort,
        }
    }
}

/// Recovery classes. Nothing in docscan retries internally; these tell the
/// caller which policy applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// The input is wrong. Retrying with the same input will fail again.
    FixInput,
    /// Keep the pre-pipeline original image instead of a processed result.
    UseOriginal,
    /// Stop the current session or command.
    Abort,
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocscanError>;
