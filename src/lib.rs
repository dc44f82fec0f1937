//! # curvelog: asynchronous telemetry for long-running computations.
//!
//! Producers hold cheap [`Recorder`] facades and keep computing; a single
//! background handler task owns the console and the plotting surface and
//! renders everything, so concurrent output never garbles.
//!
//! ## Architecture
//! ```text
//!   Recorder ──┐
//!   Recorder ──┼── try_send ──► bounded inbox ──► Handler (one task)
//!   Recorder ──┘   (Envelope)                       │
//!                                                   ├─► Sink     (log lines, progress bars)
//!        Telemetry (supervisor)                     ├─► Surface  (live cost curves)
//!        refcount + epoch lifecycle                 └─► objects  (accumulated snapshots)
//! ```
//!
//! - **[`Recorder`]**: per-producer facade. Filters by its own level, formats
//!   [`Envelope`]s, enqueues without blocking. Dropping the last one stops
//!   the handler; creating a new one restarts it.
//! - **[`Telemetry`]**: explicit supervisor, shared by `Arc`. Owns the
//!   reference count and the handler epoch; no global state.
//! - **Handler**: singleton per epoch. Dispatches envelopes to the progress
//!   renderer, the curve board, and the log writer; a failed or malformed
//!   entry is logged and skipped, never fatal.
//! - **[`Sink`] / [`Surface`]**: output seams. Defaults are stdout and a
//!   headless no-op; tests capture with [`MemorySink`].
//!
//! ## Quickstart
//! ```no_run
//! use curvelog::{Config, Level, Recorder, Telemetry};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let telemetry = Telemetry::new(Config::default());
//!
//!     let mut log = Recorder::new(&telemetry, "trainer", Level::Info);
//!     log.info("starting");
//!     for i in 0..=1000u64 {
//!         log.progress(i, 1000);
//!         log.cost("training", "loss", (1000 - i) as f64);
//!     }
//!     log.end_curve("training", "loss");
//!     log.info("finished");
//!     log.end().await;
//! }
//! ```

mod config;
mod core;
mod envelope;
mod error;
mod recorder;
mod render;

pub use config::Config;
pub use core::{HandlerState, Telemetry, TelemetryBuilder};
pub use envelope::{Action, CurveStyle, Envelope, Level, PlotForward, Scale, Snapshot};
pub use error::{DispatchError, EmitError, RenderError};
pub use recorder::{CostEntry, ObjectEntry, ProgressEntry, Recorder};
pub use render::{
    CurveFrame, MemorySink, NullSurface, Sample, SeriesView, Sink, StdoutSink, Surface,
    TraceSurface,
};
