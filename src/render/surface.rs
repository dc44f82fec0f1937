//! # Plotting surface seam.
//!
//! `Surface` is the extension point for plugging a real plotting backend into
//! the runtime. The curve board hands it one [`CurveFrame`] per rate-limited
//! redraw; the frame always carries *all* series of the figure (live and
//! archived), so legends stay complete whenever a curve is added.
//!
//! ## Contract
//! - Implementations may be slow (I/O, GUI round-trips); they run inside the
//!   handler task and only delay telemetry, never the producers.
//! - A returned error or a panic is caught per entry and logged; it never
//!   terminates the dispatch loop.
//!
//! ## Example (skeleton)
//! ```rust
//! // use curvelog::{CurveFrame, RenderError, Surface};
//! //
//! // struct GuiBridge { /* channel to a plotting thread */ }
//! // #[async_trait::async_trait]
//! // impl Surface for GuiBridge {
//! //     async fn draw(&mut self, frame: CurveFrame<'_>) -> Result<(), RenderError> {
//! //         // forward frame to the GUI...
//! //         Ok(())
//! //     }
//! // }
//! ```

use async_trait::async_trait;

use crate::envelope::Scale;
use crate::error::RenderError;

/// One `(iteration, value)` point of a series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub iteration: u64,
    pub value: f64,
}

/// Borrowed view of one labeled series within a figure.
#[derive(Debug, Clone, Copy)]
pub struct SeriesView<'a> {
    /// Curve label, used for the legend.
    pub curve: &'a str,
    /// Archived series no longer accept points; render them static.
    pub archived: bool,
    pub scale: Scale,
    pub line_style: &'a str,
    /// Points sorted by iteration.
    pub points: &'a [Sample],
}

/// Everything needed to redraw one figure.
#[derive(Debug)]
pub struct CurveFrame<'a> {
    pub figure: &'a str,
    pub series: Vec<SeriesView<'a>>,
}

/// Contract for plotting backends.
///
/// Called from the handler task. Implementations should prefer async I/O and
/// cooperative waits; blocking here stalls telemetry rendering only.
#[async_trait]
pub trait Surface: Send {
    /// Redraws one figure from a full frame.
    async fn draw(&mut self, frame: CurveFrame<'_>) -> Result<(), RenderError>;

    /// Human-readable name (for handler error lines).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Headless surface; accepts every frame and draws nothing. The default.
pub struct NullSurface;

#[async_trait]
impl Surface for NullSurface {
    async fn draw(&mut self, _frame: CurveFrame<'_>) -> Result<(), RenderError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "null"
    }
}

/// Stderr summary surface for debugging and demos.
///
/// Prints one compact line per redraw. Goes to stderr so it cannot corrupt
/// an open progress line on stdout. Not intended for production use;
/// implement a custom [`Surface`] for a real plotting backend.
pub struct TraceSurface;

#[async_trait]
impl Surface for TraceSurface {
    async fn draw(&mut self, frame: CurveFrame<'_>) -> Result<(), RenderError> {
        for series in &frame.series {
            let last = series
                .points
                .last()
                .map(|s| format!("({}, {:.4})", s.iteration, s.value))
                .unwrap_or_else(|| "none".to_string());
            eprintln!(
                "[figure {}] {}{}: {} pts, last={}, scale={:?}, style={}",
                frame.figure,
                series.curve,
                if series.archived { " (archived)" } else { "" },
                series.points.len(),
                last,
                series.scale,
                series.line_style,
            );
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "trace"
    }
}
