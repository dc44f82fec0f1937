//! # Handler: the single owner of all rendering state.
//!
//! One background task owns the console sink, the progress renderer, the
//! curve board, and the in-memory object store, and runs the dispatch loop
//! over [`Envelope`]s. Centralizing every console and surface write into one
//! task is what lets any number of producers log concurrently without
//! garbling shared output.
//!
//! ## Dispatch loop
//! ```text
//! loop {
//!   ├─► recv with bounded wait (Config::poll_timeout)
//!   │     ├─ timeout   → orphaned? implicit stop : continue (NOOP)
//!   │     └─ closed    → implicit stop
//!   ├─► Stop           → flush open line, log termination, exit
//!   ├─► SetLevel       → replace threshold (applies from next entry)
//!   ├─► level < threshold → silently discard
//!   ├─► Log            → close open progress line, write `<LEVEL> - <msg>`
//!   └─► Progress/Cost/Object/Save
//!         └─► renderer returns Result; Err is logged at ERROR, loop continues
//! }
//! ```
//!
//! ## Rules
//! - Handler state is **single-owner**: nothing outside this task touches it.
//! - The loop never dies except on stop or orphan detection; renderer
//!   failures and malformed entries are logged and skipped.

use std::collections::HashMap;
use std::time::{Duration, Instant, SystemTime};

use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::envelope::{Action, Envelope, Level, Snapshot};
use crate::error::{DispatchError, RenderError};
use crate::render::{CurveBoard, Cursor, ProgressRenderer, Sink, Surface};

/// Outcome of dispatching one envelope.
enum Flow {
    Continue,
    Stop,
}

/// One accumulated object snapshot.
pub(crate) struct ObjectRecord {
    pub(crate) snapshot: Snapshot,
    pub(crate) iteration: Option<u64>,
    pub(crate) at: Option<SystemTime>,
}

/// Owns renderer state and executes the dispatch loop.
pub(crate) struct Handler {
    level: Level,
    poll: Duration,
    trace_on: bool,
    cursor: Cursor,
    progress: ProgressRenderer,
    curves: CurveBoard,
    /// Snapshots accumulated by OBJECT entries; discarded at stop.
    objects: HashMap<String, Vec<ObjectRecord>>,
    sink: Box<dyn Sink>,
    surface: Box<dyn Surface>,
}

impl Handler {
    pub(crate) fn new(cfg: &Config, sink: Box<dyn Sink>, surface: Box<dyn Surface>) -> Self {
        Self {
            level: cfg.level,
            poll: cfg.poll_timeout,
            trace_on: cfg.handler_trace,
            cursor: Cursor::default(),
            progress: ProgressRenderer::new(cfg.progress_interval),
            curves: CurveBoard::new(cfg.redraw_interval, cfg.line_style.clone()),
            objects: HashMap::new(),
            sink,
            surface,
        }
    }

    /// Runs the dispatch loop until stop or orphan detection.
    ///
    /// `orphan` is cancelled by the supervisor when it goes away; the loop
    /// observes it on its next poll timeout and treats it as an implicit stop.
    pub(crate) async fn run(mut self, mut rx: mpsc::Receiver<Envelope>, orphan: CancellationToken) {
        if self.trace_on {
            let msg = format!("handler: start, level={}", self.level);
            self.log_self(Level::Debug, &msg);
        }
        loop {
            let envelope = match timeout(self.poll, rx.recv()).await {
                Ok(Some(envelope)) => envelope,
                Ok(None) => {
                    // Every sender is gone; nothing can arrive anymore.
                    self.finish("handler: inbox closed, stopping");
                    return;
                }
                Err(_) => {
                    if orphan.is_cancelled() {
                        self.finish("handler: orphaned, stopping");
                        return;
                    }
                    continue;
                }
            };
            match self.dispatch(envelope).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Stop) => {
                    self.finish("handler: stop");
                    return;
                }
                Err(err) => {
                    let msg = format!("handler: {}", err.as_message());
                    self.log_self(Level::Error, &msg);
                }
            }
        }
    }

    /// Processes one envelope. Failures are returned, never raised past the
    /// loop; the caller logs them and keeps going.
    async fn dispatch(&mut self, envelope: Envelope) -> Result<Flow, DispatchError> {
        let Envelope { level: entry_level, action } = envelope;
        if self.trace_on && !matches!(action, Action::Object { .. }) {
            let msg = format!("handler: got {} entry", action.kind());
            self.log_self(Level::Debug, &msg);
        }

        match action {
            Action::Stop => Ok(Flow::Stop),
            Action::Noop => Ok(Flow::Continue),
            Action::SetLevel(level) => {
                self.level = level;
                if self.trace_on {
                    let msg = format!("handler: set level {level}");
                    self.log_self(Level::Debug, &msg);
                }
                Ok(Flow::Continue)
            }
            action => {
                if entry_level < self.level {
                    return Ok(Flow::Continue);
                }
                action.validate()?;
                self.render(entry_level, action).await?;
                Ok(Flow::Continue)
            }
        }
    }

    /// Delegates one renderable action to its renderer.
    async fn render(&mut self, entry_level: Level, action: Action) -> Result<(), DispatchError> {
        let now = Instant::now();
        match action {
            Action::Log { message } => self
                .write_log(entry_level, &message)
                .map_err(|source| DispatchError::Render {
                    action: "LOG",
                    source,
                }),
            Action::Progress {
                name,
                iteration,
                iteration_max,
            } => self
                .progress
                .update(
                    self.sink.as_mut(),
                    &mut self.cursor,
                    entry_level,
                    &name,
                    iteration,
                    iteration_max,
                    now,
                )
                .map_err(|source| DispatchError::Render {
                    action: "PROGRESS",
                    source,
                }),
            Action::Cost {
                figure,
                curve,
                cost,
                iteration,
                end,
                style,
            } => self
                .curves
                .record(
                    self.surface.as_mut(),
                    &figure,
                    &curve,
                    cost,
                    iteration,
                    end,
                    &style,
                    now,
                )
                .await
                .map_err(|source| DispatchError::Render {
                    action: "COST",
                    source,
                }),
            Action::Object {
                name,
                snapshot,
                iteration,
                at,
                plot,
            } => {
                self.objects.entry(name).or_default().push(ObjectRecord {
                    snapshot,
                    iteration,
                    at,
                });
                if let Some(forward) = plot {
                    self.curves
                        .record(
                            self.surface.as_mut(),
                            &forward.figure,
                            &forward.curve,
                            forward.value,
                            iteration,
                            forward.end,
                            &forward.style,
                            now,
                        )
                        .await
                        .map_err(|source| DispatchError::Render {
                            action: "OBJECT",
                            source,
                        })?;
                }
                Ok(())
            }
            Action::Save { name } => {
                let target = name.as_deref().unwrap_or("<unnamed>").to_string();
                let msg = format!("handler: save '{target}' requested, persistence not wired");
                self.log_self(Level::Debug, &msg);
                Ok(())
            }
            Action::Stop | Action::Noop | Action::SetLevel(_) => Ok(()),
        }
    }

    /// Closes any open progress line and writes the termination message.
    fn finish(&mut self, message: &str) {
        let _ = self.cursor.break_line(self.sink.as_mut());
        self.log_self(Level::Debug, message);
        let _ = self.sink.flush();
    }

    /// Writes one `<LEVEL> - <message>` line, closing an open progress line
    /// first so bars and logs never share a line.
    fn write_log(&mut self, level: Level, message: &str) -> Result<(), RenderError> {
        self.cursor.break_line(self.sink.as_mut())?;
        self.sink.write_str(&format!("{level} - {message}\n"))?;
        self.sink.flush()
    }

    /// Handler-internal line, filtered by the handler's own threshold.
    /// Sink failures here are swallowed: diagnostics must not recurse.
    fn log_self(&mut self, level: Level, message: &str) {
        if level >= self.level {
            let _ = self.write_log(level, message);
        }
    }
}
