//! # Ordered severity levels.
//!
//! [`Level`] is the closed, ordered set of severities carried by every
//! [`Envelope`](crate::envelope::Envelope). Ordering is ascending towards
//! more severe: `Debug < Info < Warning < Error < Critical`.
//!
//! Two thresholds compare against it independently:
//! - the [`Recorder`](crate::Recorder)'s own level, checked before an entry
//!   is even formatted and sent;
//! - the handler's level, checked again on receipt.
//!
//! # Example
//! ```
//! use curvelog::Level;
//!
//! assert!(Level::Debug < Level::Info);
//! assert_eq!(Level::Warning.to_string(), "WARNING");
//! assert_eq!(Level::Error.code(), 40);
//! ```

use std::fmt;

/// Severity of a log entry, ordered ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Level {
    /// Verbose diagnostics, including handler-internal traces.
    Debug,
    /// Normal operational messages.
    #[default]
    Info,
    /// Something unexpected but recoverable.
    Warning,
    /// A failure that lost work or output.
    Error,
    /// A failure the producer cannot continue past.
    Critical,
}

impl Level {
    /// Uppercase name as rendered in console output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
        }
    }

    /// Numeric code, kept compatible with the usual 10/20/30/40/50 scheme.
    pub fn code(&self) -> u8 {
        match self {
            Level::Debug => 10,
            Level::Info => 20,
            Level::Warning => 30,
            Level::Error => 40,
            Level::Critical => 50,
        }
    }

    /// Maps a numeric code back to a level, rounding down to the nearest one.
    ///
    /// Codes below 20 map to `Debug`, codes 50 and above to `Critical`.
    pub fn from_code(code: u8) -> Self {
        match code {
            0..=19 => Level::Debug,
            20..=29 => Level::Info,
            30..=39 => Level::Warning,
            40..=49 => Level::Error,
            _ => Level::Critical,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_ascends_with_severity() {
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warning);
        assert!(Level::Warning < Level::Error);
        assert!(Level::Error < Level::Critical);
    }

    #[test]
    fn test_codes_round_trip() {
        for level in [
            Level::Debug,
            Level::Info,
            Level::Warning,
            Level::Error,
            Level::Critical,
        ] {
            assert_eq!(Level::from_code(level.code()), level);
        }
    }

    #[test]
    fn test_from_code_rounds_down() {
        assert_eq!(Level::from_code(0), Level::Debug);
        assert_eq!(Level::from_code(25), Level::Info);
        assert_eq!(Level::from_code(255), Level::Critical);
    }

    #[test]
    fn test_display_matches_console_format() {
        assert_eq!(format!("{} - message", Level::Info), "INFO - message");
    }
}
