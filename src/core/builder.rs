//! Builder for wiring a [`Telemetry`] supervisor with custom output.

use std::sync::Arc;

use crate::config::Config;
use crate::core::supervisor::{SinkFactory, SurfaceFactory, Telemetry};
use crate::render::{NullSurface, Sink, StdoutSink, Surface};

/// Builder for constructing a [`Telemetry`] supervisor.
///
/// Sinks and surfaces are provided as factories because the handler is a
/// singleton per epoch: every restart gets a fresh instance.
///
/// # Example
/// ```
/// use curvelog::{Config, MemorySink, Telemetry};
///
/// let sink = MemorySink::new();
/// let capture = sink.clone();
/// let telemetry = Telemetry::builder(Config::default())
///     .with_sink(move || capture.clone())
///     .build();
/// # let _ = telemetry;
/// ```
pub struct TelemetryBuilder {
    cfg: Config,
    sink_factory: Option<SinkFactory>,
    surface_factory: Option<SurfaceFactory>,
}

impl TelemetryBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            sink_factory: None,
            surface_factory: None,
        }
    }

    /// Sets the console sink factory. Defaults to stdout.
    pub fn with_sink<S, F>(mut self, factory: F) -> Self
    where
        S: Sink + 'static,
        F: Fn() -> S + Send + Sync + 'static,
    {
        self.sink_factory = Some(Box::new(move || Box::new(factory())));
        self
    }

    /// Sets the plotting surface factory. Defaults to the headless
    /// [`NullSurface`].
    pub fn with_surface<S, F>(mut self, factory: F) -> Self
    where
        S: Surface + 'static,
        F: Fn() -> S + Send + Sync + 'static,
    {
        self.surface_factory = Some(Box::new(move || Box::new(factory())));
        self
    }

    /// Builds the supervisor. The handler starts lazily on first use.
    pub fn build(self) -> Arc<Telemetry> {
        let sink_factory = self
            .sink_factory
            .unwrap_or_else(|| Box::new(|| Box::new(StdoutSink::new())));
        let surface_factory = self
            .surface_factory
            .unwrap_or_else(|| Box::new(|| Box::new(NullSurface)));
        Telemetry::from_parts(self.cfg, sink_factory, surface_factory)
    }
}
