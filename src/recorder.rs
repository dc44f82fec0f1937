//! # Recorder: the per-producer logging facade.
//!
//! A [`Recorder`] is the cheap handle a worker holds while computing. Calls
//! are filtered against the recorder's own level, formatted into
//! [`Envelope`]s, and enqueued on the handler inbox without blocking; the
//! handler filters again on receipt, so a level change never races a message
//! already in flight.
//!
//! Creating a recorder increments the supervisor's reference count; `end()`
//! decrements it, and the facade that brings it to zero stops the handler
//! and waits for it to exit. A recorder created afterwards restarts the
//! handler transparently.
//!
//! ## Example
//! ```no_run
//! use curvelog::{Config, Level, Recorder, Telemetry};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let telemetry = Telemetry::new(Config::default());
//!     let mut log = Recorder::new(&telemetry, "worker-1", Level::Info);
//!
//!     log.info("starting descent");
//!     for i in 0..=100u64 {
//!         log.progress(i, 100);
//!         log.cost("run1", "loss", 1.0 / (i + 1) as f64);
//!     }
//!     log.end_curve("run1", "loss");
//!     log.end().await;
//! }
//! ```

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::mpsc::error::TrySendError;

use crate::core::Telemetry;
use crate::envelope::{Action, CurveStyle, Envelope, Level, PlotForward, Snapshot};
use crate::error::EmitError;

/// Full parameter set of one progress update.
#[derive(Debug, Clone)]
pub struct ProgressEntry {
    /// Logical stream name; prefixed with the recorder's name when set.
    pub name: String,
    pub level: Level,
    pub iteration: u64,
    pub iteration_max: u64,
}

impl Default for ProgressEntry {
    fn default() -> Self {
        Self {
            name: "Progress".to_string(),
            level: Level::Info,
            iteration: 0,
            iteration_max: 100,
        }
    }
}

/// Full parameter set of one cost sample.
#[derive(Debug, Clone)]
pub struct CostEntry {
    pub figure: String,
    pub curve: String,
    pub cost: f64,
    /// `None` auto-assigns one past the last recorded index.
    pub iteration: Option<u64>,
    /// Archives the curve after a final redraw.
    pub end: bool,
    pub style: CurveStyle,
    pub level: Level,
}

impl Default for CostEntry {
    fn default() -> Self {
        Self {
            figure: "Cost".to_string(),
            curve: "cost".to_string(),
            cost: 0.0,
            iteration: None,
            end: false,
            style: CurveStyle::default(),
            level: Level::Info,
        }
    }
}

/// Full parameter set of one object snapshot.
pub struct ObjectEntry {
    pub name: String,
    pub snapshot: Snapshot,
    pub iteration: Option<u64>,
    pub at: Option<SystemTime>,
    /// Forwards a derived scalar into the curve board.
    pub plot: Option<PlotForward>,
    pub level: Level,
}

impl ObjectEntry {
    pub fn new(name: impl Into<String>, snapshot: Snapshot) -> Self {
        Self {
            name: name.into(),
            snapshot,
            iteration: None,
            at: None,
            plot: None,
            level: Level::Info,
        }
    }
}

/// Per-producer logging handle.
///
/// Cheap to create, safe to move across tasks and threads. All methods are
/// non-blocking except [`Recorder::end`], [`Recorder::kill`], and
/// [`Recorder::drain`].
pub struct Recorder {
    telemetry: Arc<Telemetry>,
    name: String,
    level: Level,
    running: bool,
}

impl Recorder {
    /// Creates a facade bound to the given supervisor.
    ///
    /// `name` prefixes every message and progress stream from this recorder;
    /// pass an empty string for no prefix. `level` filters calls before they
    /// are even formatted.
    pub fn new(telemetry: &Arc<Telemetry>, name: impl Into<String>, level: Level) -> Self {
        telemetry.register();
        Self {
            telemetry: Arc::clone(telemetry),
            name: name.into(),
            level,
            running: true,
        }
    }

    /// This recorder's own severity threshold.
    pub fn level(&self) -> Level {
        self.level
    }

    /// True while a handler epoch is running.
    pub fn is_alive(&self) -> bool {
        self.telemetry.is_alive()
    }

    pub fn debug(&self, message: impl AsRef<str>) {
        self.log(Level::Debug, message.as_ref());
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.log(Level::Info, message.as_ref());
    }

    pub fn warning(&self, message: impl AsRef<str>) {
        self.log(Level::Warning, message.as_ref());
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.log(Level::Error, message.as_ref());
    }

    pub fn critical(&self, message: impl AsRef<str>) {
        self.log(Level::Critical, message.as_ref());
    }

    /// Logs loop progress at INFO on the default stream.
    pub fn progress(&self, iteration: u64, iteration_max: u64) {
        self.progress_entry(ProgressEntry {
            iteration,
            iteration_max,
            ..ProgressEntry::default()
        });
    }

    /// Logs loop progress with full control over stream name and level.
    pub fn progress_entry(&self, entry: ProgressEntry) {
        if entry.level < self.level {
            return;
        }
        self.emit(Envelope::new(
            entry.level,
            Action::Progress {
                name: self.prefixed(&entry.name),
                iteration: entry.iteration,
                iteration_max: entry.iteration_max,
            },
        ));
    }

    /// Appends one sample to `(figure, curve)` at INFO, auto-numbered.
    pub fn cost(&self, figure: &str, curve: &str, value: f64) {
        self.graphical_cost(CostEntry {
            figure: figure.to_string(),
            curve: curve.to_string(),
            cost: value,
            ..CostEntry::default()
        });
    }

    /// Archives `(figure, curve)`: final redraw, then the trace goes static.
    pub fn end_curve(&self, figure: &str, curve: &str) {
        self.graphical_cost(CostEntry {
            figure: figure.to_string(),
            curve: curve.to_string(),
            end: true,
            ..CostEntry::default()
        });
    }

    /// Logs one cost sample with full control over key, style, and level.
    pub fn graphical_cost(&self, entry: CostEntry) {
        if entry.level < self.level {
            return;
        }
        self.emit(Envelope::new(
            entry.level,
            Action::Cost {
                figure: entry.figure,
                curve: entry.curve,
                cost: entry.cost,
                iteration: entry.iteration,
                end: entry.end,
                style: entry.style,
            },
        ));
    }

    /// Accumulates an arbitrary snapshot under `name` at INFO.
    pub fn log_object<T: Any + Send + Sync>(&self, name: &str, object: T) {
        self.object_entry(ObjectEntry::new(name, Arc::new(object)));
    }

    /// Accumulates a snapshot with full control, including curve forwarding.
    pub fn object_entry(&self, entry: ObjectEntry) {
        if entry.level < self.level {
            return;
        }
        self.emit(Envelope::new(
            entry.level,
            Action::Object {
                name: entry.name,
                snapshot: entry.snapshot,
                iteration: entry.iteration,
                at: entry.at,
                plot: entry.plot,
            },
        ));
    }

    /// Requests persistence of a named object. Currently a logged no-op on
    /// the handler side; the extension point exists so call sites are stable.
    pub fn save(&self, name: Option<&str>) {
        if Level::Info < self.level {
            return;
        }
        self.emit(Envelope::new(
            Level::Info,
            Action::Save {
                name: name.map(str::to_string),
            },
        ));
    }

    /// Changes this recorder's threshold and forwards it to the handler.
    ///
    /// The handler applies it to envelopes dequeued from then on; entries
    /// already in flight keep the filtering decision made when sent.
    pub fn set_level(&mut self, level: Level) {
        self.level = level;
        self.emit(Envelope::new(level, Action::SetLevel(level)));
    }

    /// Waits until the handler inbox is empty.
    ///
    /// Useful before reading captured output in tests or before a
    /// synchronization point; pending entries are rendered, not dropped.
    pub async fn drain(&self) {
        while !self.telemetry.inbox_idle() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    /// Releases this facade. The last live facade sends the stop envelope
    /// (ordered after everything already queued) and waits until the handler
    /// has fully exited. Safe to call more than once.
    pub async fn end(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.telemetry.release().await;
    }

    /// Forces handler shutdown regardless of other live facades. For
    /// abnormal-termination paths.
    pub async fn kill(&mut self) {
        if self.telemetry.is_alive() {
            self.emit(Envelope::new(
                Level::Debug,
                Action::Log {
                    message: self.prefixed("kill"),
                },
            ));
        }
        self.running = false;
        self.telemetry.force_stop().await;
    }

    fn log(&self, level: Level, message: &str) {
        if level < self.level {
            return;
        }
        self.emit(Envelope::new(
            level,
            Action::Log {
                message: self.prefixed(message),
            },
        ));
    }

    fn prefixed(&self, text: &str) -> String {
        if self.name.is_empty() {
            text.to_string()
        } else {
            format!("{} - {}", self.name, text)
        }
    }

    /// Enqueues one envelope, restarting the handler if the previous epoch
    /// died. Failure to enqueue is reported to this producer's stderr and
    /// swallowed: telemetry must never crash the computation it observes.
    fn emit(&self, envelope: Envelope) {
        let tx = self.telemetry.ensure_running();
        if let Err(err) = tx.try_send(envelope) {
            let reason = match err {
                TrySendError::Full(_) => EmitError::Full,
                TrySendError::Closed(_) => EmitError::Closed,
            };
            eprintln!(
                "== ERROR - recorder '{}' - fail to log: {}",
                self.name, reason
            );
        }
    }
}

impl Drop for Recorder {
    /// Best-effort release: decrements the reference count and, when this
    /// was the last facade, fire-and-forgets the stop. Call
    /// [`Recorder::end`] for the blocking, fully-drained shutdown.
    fn drop(&mut self) {
        if self.running {
            self.running = false;
            self.telemetry.abandon();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::core::HandlerState;
    use crate::render::MemorySink;

    fn quick_cfg(level: Level) -> Config {
        let mut cfg = Config::default();
        cfg.level = level;
        cfg.poll_timeout = Duration::from_millis(20);
        cfg.progress_interval = Duration::from_millis(0);
        cfg
    }

    fn telemetry_with_sink(level: Level) -> (Arc<Telemetry>, MemorySink) {
        let sink = MemorySink::new();
        let capture = sink.clone();
        let telemetry = Telemetry::builder(quick_cfg(level))
            .with_sink(move || capture.clone())
            .build();
        (telemetry, sink)
    }

    #[tokio::test]
    async fn test_name_prefixes_messages() {
        let (telemetry, sink) = telemetry_with_sink(Level::Debug);
        let mut log = Recorder::new(&telemetry, "opt", Level::Info);

        log.info("hello");
        log.end().await;

        assert!(sink.contents().contains("INFO - opt - hello\n"));
    }

    #[tokio::test]
    async fn test_recorder_level_filters_before_sending() {
        let (telemetry, sink) = telemetry_with_sink(Level::Debug);
        let mut log = Recorder::new(&telemetry, "", Level::Info);

        log.debug("suppressed at the facade");
        log.info("sent");
        log.end().await;

        let text = sink.contents();
        assert!(!text.contains("suppressed"), "{text:?}");
        assert!(text.contains("INFO - sent\n"), "{text:?}");
    }

    #[tokio::test]
    async fn test_handler_level_filters_on_receipt() {
        let (telemetry, sink) = telemetry_with_sink(Level::Error);
        let mut log = Recorder::new(&telemetry, "", Level::Debug);

        log.warning("dropped by the handler");
        log.error("rendered");
        log.end().await;

        let text = sink.contents();
        assert!(!text.contains("dropped by the handler"), "{text:?}");
        assert!(text.contains("ERROR - rendered\n"), "{text:?}");
    }

    #[tokio::test]
    async fn test_end_renders_pending_entries_before_stop() {
        let (telemetry, sink) = telemetry_with_sink(Level::Info);
        let mut log = Recorder::new(&telemetry, "", Level::Info);

        for i in 0..5 {
            log.info(format!("pending {i}"));
        }
        log.end().await;

        let text = sink.contents();
        for i in 0..5 {
            assert!(text.contains(&format!("INFO - pending {i}\n")), "{text:?}");
        }
        assert_eq!(telemetry.state(), HandlerState::Stopped);
    }

    #[tokio::test]
    async fn test_end_is_idempotent_per_facade() {
        let (telemetry, _sink) = telemetry_with_sink(Level::Info);
        let mut first = Recorder::new(&telemetry, "a", Level::Info);
        let second = Recorder::new(&telemetry, "b", Level::Info);

        first.info("warm up");
        first.end().await;
        first.end().await;

        assert_eq!(telemetry.references(), 1);
        assert!(second.is_alive(), "second facade must keep the handler");
        drop(second);
    }

    #[tokio::test]
    async fn test_new_facade_restarts_after_all_ended() {
        let (telemetry, sink) = telemetry_with_sink(Level::Info);
        let mut first = Recorder::new(&telemetry, "", Level::Info);
        first.info("epoch one");
        first.end().await;
        assert!(!telemetry.is_alive());

        let mut second = Recorder::new(&telemetry, "", Level::Info);
        second.info("epoch two");
        assert!(second.is_alive(), "restart must be transparent");
        second.end().await;

        let text = sink.contents();
        assert!(text.contains("epoch one"));
        assert!(text.contains("epoch two"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_ends_stop_exactly_once() {
        let (telemetry, sink) = telemetry_with_sink(Level::Debug);
        let mut recorders: Vec<Recorder> = (0..3)
            .map(|i| Recorder::new(&telemetry, format!("w{i}"), Level::Info))
            .collect();
        recorders[0].info("hold the handler open");

        let mut joins = Vec::new();
        for mut recorder in recorders.drain(..) {
            joins.push(tokio::spawn(async move { recorder.end().await }));
        }
        for join in joins {
            join.await.unwrap();
        }

        assert!(!telemetry.is_alive());
        assert_eq!(telemetry.references(), 0);
        assert_eq!(sink.contents().matches("handler: stop").count(), 1);
    }

    #[tokio::test]
    async fn test_three_streams_finish_independently() {
        let (telemetry, sink) = telemetry_with_sink(Level::Info);
        let recorders: Vec<Recorder> = (0..3)
            .map(|i| Recorder::new(&telemetry, format!("w{i}"), Level::Info))
            .collect();

        for i in 0..=10 {
            for recorder in &recorders {
                recorder.progress(i, 10);
            }
        }
        for mut recorder in recorders {
            recorder.end().await;
        }

        let text = sink.contents();
        assert_eq!(text.matches("Done").count(), 3, "{text:?}");
        for i in 0..3 {
            assert!(text.contains(&format!("w{i} - Progress")), "{text:?}");
        }
        // Every progress line start sits at a line boundary: no stream ever
        // writes into another stream's open line.
        for line in text.lines() {
            assert!(
                line.matches(" - Progress - ").count() <= 1,
                "corrupted line: {line:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_kill_forces_shutdown_with_live_facades() {
        let (telemetry, _sink) = telemetry_with_sink(Level::Info);
        let mut doomed = Recorder::new(&telemetry, "", Level::Info);
        let survivor = Recorder::new(&telemetry, "", Level::Info);
        doomed.info("spin up");

        doomed.kill().await;

        assert!(!telemetry.is_alive());
        assert_eq!(telemetry.state(), HandlerState::Stopped);
        drop(survivor);
    }

    #[tokio::test]
    async fn test_drain_waits_for_inbox() {
        let (telemetry, sink) = telemetry_with_sink(Level::Info);
        let mut log = Recorder::new(&telemetry, "", Level::Info);

        for i in 0..50 {
            log.info(format!("burst {i}"));
        }
        log.drain().await;
        // One envelope may still be mid-dispatch; the backlog itself is gone.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let text = sink.contents();
        for i in 0..50 {
            assert!(text.contains(&format!("burst {i}\n")), "missing burst {i}");
        }
        log.end().await;
    }

    #[tokio::test]
    async fn test_set_level_tightens_both_filters() {
        let (telemetry, sink) = telemetry_with_sink(Level::Debug);
        let mut log = Recorder::new(&telemetry, "", Level::Debug);

        log.debug("early debug");
        log.set_level(Level::Warning);
        log.info("late info");
        log.warning("late warning");
        log.end().await;

        let text = sink.contents();
        assert!(text.contains("DEBUG - early debug\n"), "{text:?}");
        assert!(!text.contains("late info"), "{text:?}");
        assert!(text.contains("WARNING - late warning\n"), "{text:?}");
    }

    #[tokio::test]
    async fn test_drop_releases_reference() {
        let (telemetry, _sink) = telemetry_with_sink(Level::Info);
        {
            let log = Recorder::new(&telemetry, "", Level::Info);
            log.info("spin up");
            assert_eq!(telemetry.references(), 1);
        }
        assert_eq!(telemetry.references(), 0);
        // Fire-and-forget stop: give the detached handler a moment to drain.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!telemetry.is_alive());
    }

    #[tokio::test]
    async fn test_cost_entries_survive_handler_restart() {
        let (telemetry, sink) = telemetry_with_sink(Level::Debug);
        let mut log = Recorder::new(&telemetry, "", Level::Info);

        log.cost("run1", "loss", 0.9);
        log.end_curve("run1", "loss");
        log.cost("run1", "loss", 0.5);
        log.info("curves intact");
        log.end().await;

        assert!(sink.contents().contains("INFO - curves intact\n"));
    }
}
