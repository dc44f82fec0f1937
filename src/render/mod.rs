//! # Renderers owned by the handler.
//!
//! - [`sink`]: console text output seam ([`Sink`], [`StdoutSink`], [`MemorySink`]).
//! - [`surface`]: plotting backend seam ([`Surface`], frames, stock surfaces).
//! - [`progress`]: in-place text progress bars, one open line at a time.
//! - [`curve`]: sorted, archivable series with rate-limited surface redraws.

mod curve;
mod progress;
mod sink;
mod surface;

pub use sink::{MemorySink, Sink, StdoutSink};
pub use surface::{CurveFrame, NullSurface, Sample, SeriesView, Surface, TraceSurface};

pub(crate) use curve::CurveBoard;
pub(crate) use progress::{Cursor, ProgressRenderer};
