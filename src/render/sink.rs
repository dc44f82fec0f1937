//! # Console sink seam.
//!
//! [`Sink`] is where the handler writes log lines and progress bars. The
//! default is [`StdoutSink`]; [`MemorySink`] captures output into a shared
//! buffer for tests and embedding.
//!
//! The sink sees raw text including the control characters the progress
//! renderer uses for in-place redraws (`\x08` backspaces). A sink that
//! cannot honor them (a file, a buffer) simply stores them.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::RenderError;

/// Destination for console-style text output.
///
/// Called only from the handler task, so implementations need `Send` but no
/// internal synchronization beyond what sharing a buffer requires.
pub trait Sink: Send {
    /// Writes a chunk of text, control characters included.
    fn write_str(&mut self, s: &str) -> Result<(), RenderError>;

    /// Flushes buffered output to the underlying device.
    fn flush(&mut self) -> Result<(), RenderError>;
}

/// Standard-output sink, the default for interactive use.
pub struct StdoutSink {
    out: io::Stdout,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self { out: io::stdout() }
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for StdoutSink {
    fn write_str(&mut self, s: &str) -> Result<(), RenderError> {
        self.out.write_all(s.as_bytes())?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), RenderError> {
        self.out.flush()?;
        Ok(())
    }
}

/// Shared-buffer sink for tests and embedding.
///
/// Clones share one buffer, so a clone kept outside the handler observes
/// everything the handler wrote.
///
/// # Example
/// ```
/// use curvelog::{MemorySink, Sink};
///
/// let sink = MemorySink::new();
/// let mut handle = sink.clone();
/// handle.write_str("INFO - hello\n").unwrap();
/// assert_eq!(sink.contents(), "INFO - hello\n");
/// ```
#[derive(Clone, Default)]
pub struct MemorySink {
    buf: Arc<Mutex<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything written so far.
    pub fn contents(&self) -> String {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, String> {
        match self.buf.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Sink for MemorySink {
    fn write_str(&mut self, s: &str) -> Result<(), RenderError> {
        self.lock().push_str(s);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), RenderError> {
        Ok(())
    }
}
