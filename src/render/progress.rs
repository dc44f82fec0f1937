//! # Progress renderer: one redrawing line per named stream.
//!
//! Renders `<LEVEL> - <name> - NN.NN%` and redraws the percentage field in
//! place with backspace characters. Only one stream's line is ever open:
//! switching streams (or writing an ordinary log line) first closes the open
//! line with a newline, so two interleaved streams can never corrupt each
//! other's in-place redraw.
//!
//! Redraws are rate-limited per stream; a tight loop emitting thousands of
//! updates per second costs one console write per interval.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::envelope::Level;
use crate::error::RenderError;
use crate::render::sink::Sink;

/// Width of the percentage field (`"100.00%"`).
const FIELD_WIDTH: usize = 7;

/// Tracks whether the last console write left a progress line open, and for
/// which stream. Owned by the handler, shared between log writes and
/// progress updates.
#[derive(Default)]
pub(crate) struct Cursor {
    last_writer: Option<String>,
    line_open: bool,
}

impl Cursor {
    /// Closes an open progress line so the next write starts fresh.
    pub(crate) fn break_line(&mut self, sink: &mut dyn Sink) -> Result<(), RenderError> {
        if self.line_open {
            sink.write_str("\n")?;
        }
        self.line_open = false;
        self.last_writer = None;
        Ok(())
    }

    fn owned_by(&self, name: &str) -> bool {
        self.line_open && self.last_writer.as_deref() == Some(name)
    }
}

/// Per-stream redraw state.
struct StreamGauge {
    /// `None` forces the next redraw regardless of the interval.
    last_draw: Option<Instant>,
    /// Highest percentage shown so far; keeps the display monotone within
    /// one segment even if samples arrive out of order.
    shown: f64,
}

/// Stateful text-progress-bar writer keyed by stream name.
pub(crate) struct ProgressRenderer {
    interval: Duration,
    streams: HashMap<String, StreamGauge>,
}

impl ProgressRenderer {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval,
            streams: HashMap::new(),
        }
    }

    /// Applies one progress update for `name`.
    ///
    /// `iteration_max == 0` is treated as already complete. Emits the `Done`
    /// marker exactly once per segment, when `iteration >= iteration_max`,
    /// then clears the cursor so the next entry starts a fresh line.
    pub(crate) fn update(
        &mut self,
        sink: &mut dyn Sink,
        cursor: &mut Cursor,
        level: Level,
        name: &str,
        iteration: u64,
        iteration_max: u64,
        now: Instant,
    ) -> Result<(), RenderError> {
        if !cursor.owned_by(name) {
            cursor.break_line(sink)?;
            sink.write_str(&format!("{level} - {name} - "))?;
            sink.write_str(&" ".repeat(FIELD_WIDTH))?;
            cursor.line_open = true;
            cursor.last_writer = Some(name.to_string());
            self.streams.insert(
                name.to_string(),
                StreamGauge {
                    last_draw: None,
                    shown: 0.0,
                },
            );
        }

        let gauge = self
            .streams
            .entry(name.to_string())
            .or_insert(StreamGauge {
                last_draw: None,
                shown: 0.0,
            });
        let raw = iteration as f64 / iteration_max.max(1) as f64;
        let percentage = raw.max(gauge.shown);

        let due = gauge
            .last_draw
            .map_or(true, |last| now.duration_since(last) >= self.interval);
        if due {
            gauge.last_draw = Some(now);
            gauge.shown = percentage;
            sink.write_str(&format!(
                "{}{:6.2}%",
                "\u{8}".repeat(FIELD_WIDTH),
                percentage * 100.0
            ))?;
        }

        if iteration >= iteration_max {
            sink.write_str(&format!("{}Done   \n", "\u{8}".repeat(FIELD_WIDTH)))?;
            cursor.line_open = false;
            cursor.last_writer = None;
            self.streams.remove(name);
        }

        sink.flush()
    }
}
