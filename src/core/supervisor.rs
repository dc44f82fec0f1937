//! # Telemetry supervisor: refcounted handler lifecycle.
//!
//! [`Telemetry`] owns the shared state that outlives any single facade: the
//! live-facade reference count, the current handler epoch (inbox sender plus
//! join handle), and the orphan-detection token. It is shared by `Arc` and
//! injected into every [`Recorder`](crate::Recorder); there is no ambient
//! global.
//!
//! ## Lifecycle
//! ```text
//! NotStarted ──ensure_running()──► Running ──last release()──► Stopping
//!     ▲                               ▲                            │
//!     │                               │ ensure_running()        join
//!     │                               │ (new epoch)                ▼
//!     └────────── (fresh state) ──────┴──────────────────────── Stopped
//! ```
//!
//! The handler is a singleton **per epoch**, not per process lifetime: after
//! the last facade releases it, a facade created later transparently starts a
//! fresh epoch. Restart is also how crash recovery works: if the handler
//! task is found finished, the next send spawns a new one.
//!
//! ## Orphan detection
//! Dropping the supervisor cancels the epoch's token; the detached handler
//! observes it on its next poll timeout and performs an implicit stop, so a
//! vanished parent never strands a busy-waiting task.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::core::builder::TelemetryBuilder;
use crate::core::handler::Handler;
use crate::envelope::Envelope;
use crate::render::{NullSurface, Sink, StdoutSink, Surface};

/// Produces a fresh sink per handler epoch.
pub(crate) type SinkFactory = Box<dyn Fn() -> Box<dyn Sink> + Send + Sync>;
/// Produces a fresh surface per handler epoch.
pub(crate) type SurfaceFactory = Box<dyn Fn() -> Box<dyn Surface> + Send + Sync>;

/// Lifecycle state of the handler, as seen by the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerState {
    NotStarted,
    Running,
    Stopping,
    Stopped,
}

/// One handler incarnation: its inbox, join handle, and orphan token.
struct Epoch {
    tx: mpsc::Sender<Envelope>,
    join: JoinHandle<()>,
    orphan: CancellationToken,
}

/// State shared across all facades, guarded by one mutex so that
/// decrement-then-check and restart-if-dead are atomic.
struct Shared {
    refs: usize,
    alive: bool,
    state: HandlerState,
    epoch: Option<Epoch>,
}

/// Supervisor owning the reference count and the handler handle.
///
/// Create one per program (or per isolated output), share it by `Arc`, and
/// hand it to every [`Recorder`](crate::Recorder). Construction is cheap;
/// the handler itself starts lazily on the first recorded entry.
pub struct Telemetry {
    cfg: Config,
    sink_factory: SinkFactory,
    surface_factory: SurfaceFactory,
    shared: Mutex<Shared>,
}

impl Telemetry {
    /// Creates a supervisor with the default stdout sink and null surface.
    pub fn new(cfg: Config) -> Arc<Self> {
        Self::from_parts(
            cfg,
            Box::new(|| Box::new(StdoutSink::new())),
            Box::new(|| Box::new(NullSurface)),
        )
    }

    /// Starts building a supervisor with custom sink/surface factories.
    pub fn builder(cfg: Config) -> TelemetryBuilder {
        TelemetryBuilder::new(cfg)
    }

    pub(crate) fn from_parts(
        cfg: Config,
        sink_factory: SinkFactory,
        surface_factory: SurfaceFactory,
    ) -> Arc<Self> {
        Arc::new(Self {
            cfg,
            sink_factory,
            surface_factory,
            shared: Mutex::new(Shared {
                refs: 0,
                alive: false,
                state: HandlerState::NotStarted,
                epoch: None,
            }),
        })
    }

    /// True while a handler epoch is running (or still draining a stop).
    pub fn is_alive(&self) -> bool {
        self.shared().alive
    }

    /// Current lifecycle state.
    pub fn state(&self) -> HandlerState {
        self.shared().state
    }

    /// Number of live facades.
    pub fn references(&self) -> usize {
        self.shared().refs
    }

    /// Registers one more live facade.
    pub(crate) fn register(&self) {
        self.shared().refs += 1;
    }

    /// Returns a sender for the running handler, starting a fresh epoch if
    /// none is running or the previous task has finished. Idempotent.
    ///
    /// Must be called from within a tokio runtime: the handler is spawned on
    /// the ambient runtime.
    pub(crate) fn ensure_running(&self) -> mpsc::Sender<Envelope> {
        let mut shared = self.shared();
        match &shared.epoch {
            Some(epoch) if !epoch.join.is_finished() => epoch.tx.clone(),
            _ => {
                let epoch = self.spawn_epoch();
                let tx = epoch.tx.clone();
                shared.epoch = Some(epoch);
                shared.alive = true;
                shared.state = HandlerState::Running;
                tx
            }
        }
    }

    /// True when the inbox holds no queued envelopes.
    ///
    /// The entry currently being dispatched is not observable; this matches
    /// the original queue-size polling semantics.
    pub(crate) fn inbox_idle(&self) -> bool {
        self.shared()
            .epoch
            .as_ref()
            .map_or(true, |e| e.tx.capacity() == e.tx.max_capacity())
    }

    /// Releases one facade. The caller that brings the count to zero sends
    /// the stop envelope and waits for the handler to exit.
    pub(crate) async fn release(&self) {
        let last = {
            let mut shared = self.shared();
            shared.refs = shared.refs.saturating_sub(1);
            if shared.refs == 0 && shared.alive {
                shared.alive = false;
                shared.state = HandlerState::Stopping;
                shared.epoch.take()
            } else {
                None
            }
        };
        if let Some(epoch) = last {
            Self::shutdown_epoch(epoch).await;
            self.mark_stopped();
        }
    }

    /// Forces shutdown regardless of the reference count. For
    /// abnormal-termination paths.
    pub(crate) async fn force_stop(&self) {
        let taken = {
            let mut shared = self.shared();
            shared.alive = false;
            if shared.epoch.is_some() {
                shared.state = HandlerState::Stopping;
            }
            shared.epoch.take()
        };
        if let Some(epoch) = taken {
            Self::shutdown_epoch(epoch).await;
            self.mark_stopped();
        }
    }

    /// Releases one facade without waiting: at zero the stop is sent
    /// fire-and-forget and the handler task drains on its own. Used from
    /// `Drop`, where joining is impossible.
    pub(crate) fn abandon(&self) {
        let mut shared = self.shared();
        shared.refs = shared.refs.saturating_sub(1);
        if shared.refs == 0 && shared.alive {
            shared.alive = false;
            shared.state = HandlerState::Stopping;
            if let Some(epoch) = shared.epoch.take() {
                let _ = epoch.tx.try_send(Envelope::stop());
            }
        }
    }

    fn spawn_epoch(&self) -> Epoch {
        let (tx, rx) = mpsc::channel(self.cfg.channel_capacity_clamped());
        let orphan = CancellationToken::new();
        let handler = Handler::new(
            &self.cfg,
            (self.sink_factory)(),
            (self.surface_factory)(),
        );
        let join = tokio::spawn(handler.run(rx, orphan.clone()));
        Epoch { tx, join, orphan }
    }

    /// Queues the stop behind everything already sent, then waits for the
    /// dispatch loop to drain and exit.
    async fn shutdown_epoch(epoch: Epoch) {
        let _ = epoch.tx.send(Envelope::stop()).await;
        if let Err(err) = epoch.join.await {
            eprintln!("== ERROR - telemetry handler task failed to join: {err}");
        }
    }

    /// A new epoch may have started while the old one drained; only record
    /// `Stopped` if nothing replaced it.
    fn mark_stopped(&self) {
        let mut shared = self.shared();
        if shared.epoch.is_none() {
            shared.state = HandlerState::Stopped;
        }
    }

    fn shared(&self) -> MutexGuard<'_, Shared> {
        match self.shared.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Drop for Telemetry {
    fn drop(&mut self) {
        let shared = match self.shared.get_mut() {
            Ok(shared) => shared,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(epoch) = &shared.epoch {
            epoch.orphan.cancel();
        }
    }
}
