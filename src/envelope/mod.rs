//! # Envelope protocol shared by producers and the handler.
//!
//! - [`Level`]: ordered severity attached to every entry.
//! - [`Action`]: tagged sum type, one typed payload per action kind.
//! - [`Envelope`]: the `(level, action)` unit placed on the handler inbox.

mod action;
mod level;

pub use action::{Action, CurveStyle, Envelope, PlotForward, Scale, Snapshot};
pub use level::Level;
