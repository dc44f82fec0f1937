//! Runtime core: handler lifecycle and supervision.
//!
//! Internal modules:
//! - [`handler`]: owns all rendering state and runs the dispatch loop;
//! - [`supervisor`]: reference-counted lifecycle of the handler epoch;
//! - [`builder`]: wires custom sinks/surfaces into a supervisor.

mod builder;
mod handler;
mod supervisor;

pub use builder::TelemetryBuilder;
pub use supervisor::{HandlerState, Telemetry};
