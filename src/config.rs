//! # Global runtime configuration.
//!
//! [`Config`] defines the telemetry runtime's behavior: the handler's initial
//! severity threshold, inbox capacity, dequeue poll timeout, redraw rate
//! limits, and default curve styling.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use curvelog::{Config, Level};
//!
//! let mut cfg = Config::default();
//! cfg.level = Level::Info;
//! cfg.progress_interval = Duration::from_millis(50);
//!
//! assert_eq!(cfg.channel_capacity, 1024);
//! ```

use std::time::Duration;

use crate::envelope::Level;

/// Global configuration for the handler and its renderers.
///
/// Controls severity filtering, inbox sizing, poll cadence, and redraw
/// rate limits. Neither rate-limit threshold is load-bearing; both exist to
/// keep tight producer loops from flooding the console or the surface.
#[derive(Clone, Debug)]
pub struct Config {
    /// Initial severity threshold of the handler (mutable via `SetLevel`).
    pub level: Level,
    /// Capacity of the handler inbox channel.
    pub channel_capacity: usize,
    /// Bounded wait of one dequeue; orphaning is checked on each timeout.
    pub poll_timeout: Duration,
    /// Minimum interval between in-place redraws of one progress stream.
    pub progress_interval: Duration,
    /// Minimum interval between surface redraws of one figure.
    pub redraw_interval: Duration,
    /// Default line style handed to the surface for new curves.
    pub line_style: String,
    /// Logs handler-internal lines (start, per-entry receipt, clean quit).
    pub handler_trace: bool,
}

impl Default for Config {
    /// Provides a default configuration:
    /// - `level = Debug` (the handler renders everything; facades filter first)
    /// - `channel_capacity = 1024`
    /// - `poll_timeout = 2s`
    /// - `progress_interval = 100ms`
    /// - `redraw_interval = 400ms`
    /// - `line_style = "-o"`
    /// - `handler_trace = false`
    fn default() -> Self {
        Self {
            level: Level::Debug,
            channel_capacity: 1024,
            poll_timeout: Duration::from_secs(2),
            progress_interval: Duration::from_millis(100),
            redraw_interval: Duration::from_millis(400),
            line_style: "-o".to_string(),
            handler_trace: false,
        }
    }
}

impl Config {
    /// Inbox capacity clamped away from zero.
    pub(crate) fn channel_capacity_clamped(&self) -> usize {
        self.channel_capacity.max(1)
    }
}
