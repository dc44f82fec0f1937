//! # Action Envelope: the message unit between producers and the handler.
//!
//! An [`Envelope`] pairs a [`Level`] with an [`Action`]. The action is a
//! tagged sum type with one typed payload per kind, so the handler dispatches
//! by variant instead of poking at a free-form key/value map.
//!
//! ## Action kinds
//! ```text
//! Stop       terminal signal, flushes and ends the dispatch loop
//! Noop       internal filler (poll timeouts), never rendered
//! SetLevel   replaces the handler's severity threshold
//! Log        one formatted console line
//! Progress   one update of a named in-place progress bar
//! Cost       one sample (or end marker) for a (figure, curve) series
//! Object     one arbitrary snapshot, optionally forwarded to a curve
//! Save       persistence extension point (placeholder, no-op)
//! ```
//!
//! Payloads are validated on receipt; a bad payload is a malformed entry that
//! the handler logs and discards without leaving the loop.

use std::any::Any;
use std::sync::Arc;
use std::time::SystemTime;

use crate::envelope::Level;
use crate::error::DispatchError;

/// Axis scale requested for a curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scale {
    /// Log-log axes, the usual choice for cost curves.
    #[default]
    Log,
    /// Plain linear axes.
    Linear,
}

/// Per-curve rendering hints carried alongside cost samples.
///
/// `line_style` of `None` falls back to [`Config::line_style`](crate::Config).
#[derive(Debug, Clone, Default)]
pub struct CurveStyle {
    pub scale: Scale,
    pub line_style: Option<String>,
}

/// Arbitrary snapshot payload accumulated by `Object` entries.
///
/// Held in memory by the handler and discarded at stop; no durability.
pub type Snapshot = Arc<dyn Any + Send + Sync>;

/// Forwards a scalar derived from an object snapshot into the curve board.
#[derive(Debug, Clone)]
pub struct PlotForward {
    pub figure: String,
    pub curve: String,
    /// The derived scalar to plot.
    pub value: f64,
    /// Archives the target curve after appending, same as a `Cost` end.
    pub end: bool,
    pub style: CurveStyle,
}

/// One action kind with its typed payload.
pub enum Action {
    /// Terminal signal; the only way the dispatch loop exits deliberately.
    Stop,
    /// Does nothing; the loop's filler for empty poll rounds.
    Noop,
    /// Replaces the handler's threshold for subsequently dequeued envelopes.
    SetLevel(Level),
    /// One console line, rendered as `<LEVEL> - <message>`.
    Log { message: String },
    /// One update of the named stream's progress bar.
    Progress {
        name: String,
        iteration: u64,
        iteration_max: u64,
    },
    /// One sample for the `(figure, curve)` series, or its end marker.
    Cost {
        figure: String,
        curve: String,
        cost: f64,
        /// `None` auto-assigns one past the last recorded index.
        iteration: Option<u64>,
        /// Final redraw, then archive the live series.
        end: bool,
        style: CurveStyle,
    },
    /// One snapshot under `name`, with optional curve forwarding.
    Object {
        name: String,
        snapshot: Snapshot,
        iteration: Option<u64>,
        at: Option<SystemTime>,
        plot: Option<PlotForward>,
    },
    /// Persistence extension point; currently a logged no-op.
    Save { name: Option<String> },
}

impl Action {
    /// Stable uppercase tag for traces and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Stop => "STOP",
            Action::Noop => "NOOP",
            Action::SetLevel(_) => "SET_LEVEL",
            Action::Log { .. } => "LOG",
            Action::Progress { .. } => "PROGRESS",
            Action::Cost { .. } => "COST",
            Action::Object { .. } => "OBJECT",
            Action::Save { .. } => "SAVE",
        }
    }

    /// Rejects payloads the renderers cannot act on.
    pub(crate) fn validate(&self) -> Result<(), DispatchError> {
        match self {
            Action::Progress { name, .. } if name.is_empty() => Err(DispatchError::Malformed {
                detail: "progress entry with empty stream name".into(),
            }),
            Action::Cost { figure, curve, .. } if figure.is_empty() || curve.is_empty() => {
                Err(DispatchError::Malformed {
                    detail: "cost entry with empty figure or curve name".into(),
                })
            }
            Action::Cost { cost, .. } if !cost.is_finite() => Err(DispatchError::Malformed {
                detail: format!("cost entry with non-finite value {cost}"),
            }),
            Action::Object { name, .. } if name.is_empty() => Err(DispatchError::Malformed {
                detail: "object entry with empty name".into(),
            }),
            Action::Object {
                plot: Some(forward),
                ..
            } if !forward.value.is_finite() => Err(DispatchError::Malformed {
                detail: format!("object entry forwarding non-finite value {}", forward.value),
            }),
            _ => Ok(()),
        }
    }
}

/// The `(level, action)` message unit put on the handler's inbox.
pub struct Envelope {
    pub level: Level,
    pub action: Action,
}

impl Envelope {
    /// Creates an envelope at the given severity.
    pub fn new(level: Level, action: Action) -> Self {
        Self { level, action }
    }

    /// The terminal stop envelope. Level is irrelevant: stop bypasses filtering.
    pub(crate) fn stop() -> Self {
        Self::new(Level::Debug, Action::Stop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags_are_stable() {
        assert_eq!(Action::Stop.kind(), "STOP");
        assert_eq!(
            Action::Log {
                message: "x".into()
            }
            .kind(),
            "LOG"
        );
        assert_eq!(Action::SetLevel(Level::Info).kind(), "SET_LEVEL");
    }

    #[test]
    fn test_validate_rejects_empty_progress_name() {
        let action = Action::Progress {
            name: String::new(),
            iteration: 0,
            iteration_max: 10,
        };
        assert!(action.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_non_finite_cost() {
        let action = Action::Cost {
            figure: "run".into(),
            curve: "loss".into(),
            cost: f64::NAN,
            iteration: None,
            end: false,
            style: CurveStyle::default(),
        };
        assert!(action.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_well_formed_entries() {
        let action = Action::Cost {
            figure: "run".into(),
            curve: "loss".into(),
            cost: 0.5,
            iteration: Some(3),
            end: false,
            style: CurveStyle::default(),
        };
        assert!(action.validate().is_ok());

        let action = Action::Progress {
            name: "Progress".into(),
            iteration: 5,
            iteration_max: 10,
        };
        assert!(action.validate().is_ok());
    }
}
