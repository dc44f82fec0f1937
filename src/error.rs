//! Error types used by the telemetry runtime.
//!
//! This module defines three error enums, one per failure site:
//!
//! - [`RenderError`]: a renderer or surface failed to draw.
//! - [`DispatchError`]: the handler could not process one envelope.
//! - [`EmitError`]: a producer could not enqueue an envelope.
//!
//! None of these is fatal to the process producing telemetry: dispatch errors
//! are logged by the handler and the loop continues; emit errors degrade to a
//! stderr report on the producer's side. All types provide `as_label` /
//! `as_message` helpers for logging.

use std::io;
use thiserror::Error;

/// # Errors produced while drawing to a sink or surface.
///
/// Raised by the progress renderer, the curve board, or a user-provided
/// [`Surface`](crate::Surface) implementation.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RenderError {
    /// Writing to the console sink failed.
    #[error("sink write failed: {0}")]
    Io(#[from] io::Error),

    /// The surface rejected the frame.
    #[error("surface rejected frame: {detail}")]
    Surface {
        /// Backend-specific description of the rejection.
        detail: String,
    },

    /// The surface panicked while drawing; the panic was caught.
    #[error("surface panicked: {detail}")]
    Panicked {
        /// The captured panic payload, stringified.
        detail: String,
    },
}

impl RenderError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            RenderError::Io(_) => "render_io",
            RenderError::Surface { .. } => "render_surface",
            RenderError::Panicked { .. } => "render_panicked",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        self.to_string()
    }
}

/// # Errors produced while dispatching one envelope.
///
/// Every dispatch failure is recovered locally: the handler logs it at error
/// severity and keeps looping. Only an explicit stop ends the loop.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum DispatchError {
    /// Envelope payload failed validation; the entry is discarded.
    #[error("malformed entry: {detail}")]
    Malformed {
        /// What was wrong with the payload.
        detail: String,
    },

    /// A renderer failed while acting on the entry.
    #[error("{action} rendering failed: {source}")]
    Render {
        /// The action kind that was being rendered.
        action: &'static str,
        /// The underlying renderer failure.
        #[source]
        source: RenderError,
    },
}

impl DispatchError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use curvelog::DispatchError;
    ///
    /// let err = DispatchError::Malformed { detail: "empty name".into() };
    /// assert_eq!(err.as_label(), "entry_malformed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            DispatchError::Malformed { .. } => "entry_malformed",
            DispatchError::Render { .. } => "entry_render_failed",
        }
    }

    /// Returns a human-readable message including the source chain.
    pub fn as_message(&self) -> String {
        match self {
            DispatchError::Malformed { detail } => format!("malformed entry: {detail}"),
            DispatchError::Render { action, source } => {
                format!("{action} rendering failed: {}", source.as_message())
            }
        }
    }
}

/// # Errors produced while enqueuing an envelope.
///
/// Reported to the producer's own stderr and never raised back through the
/// recording call site: logging must not crash the computation it observes.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitError {
    /// The inbox is full; the entry was dropped.
    #[error("telemetry inbox full")]
    Full,

    /// The inbox is closed (handler gone); the entry was dropped.
    #[error("telemetry inbox closed")]
    Closed,
}

impl EmitError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            EmitError::Full => "emit_full",
            EmitError::Closed => "emit_closed",
        }
    }
}
