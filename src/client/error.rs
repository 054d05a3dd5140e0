// ABOUTME: Modem driver error types covering transport faults, timeouts, protocol and codec failures
// ABOUTME: Provides severity classification and the per-session last-error holder

use crate::pdu::PduError;
use std::fmt;
use std::io;
use thiserror::Error;
use tracing::{error, warn};

/// Error type for every fallible modem operation
///
/// Expected failures (the modem did not answer in time, replied `ERROR`,
/// returned something unparseable) are reported through this type rather
/// than panics, so any public operation can be retried or abandoned by the
/// caller.
#[derive(Debug, Error)]
pub enum ModemError {
    /// The serial channel raised an I/O condition
    #[error("Transport fault: {0}")]
    Transport(#[from] io::Error),

    /// The deadline elapsed before the protocol condition was met
    #[error("Timed out after {waited_ms} ms waiting for {operation}")]
    Timeout {
        operation: &'static str,
        waited_ms: u64,
    },

    /// The modem replied with something that does not match the expected grammar
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The command completed but with a result code other than the one expected
    #[error("Command '{command}' failed with result '{result}'")]
    CommandRejected { command: String, result: String },

    /// Text cannot be represented in the chosen character set
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// A caller supplied parameter is out of its allowed range
    #[error("Invalid parameter: {0}")]
    Validation(String),

    /// The modem never answered the startup probe
    #[error("Modem did not respond after {attempts} attempts")]
    NotResponding { attempts: u32 },

    /// Every attempt of a retried operation failed
    #[error("{operation} failed after {attempts} attempts")]
    AttemptsExhausted {
        operation: &'static str,
        attempts: u32,
    },

    /// Operation not allowed in the current session state
    #[error("Invalid session state: {0}")]
    InvalidState(String),
}

/// Result type alias for modem operations
pub type ModemResult<T> = Result<T, ModemError>;

/// How serious a recorded failure is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Expected, recoverable condition (timeouts)
    Warning,
    /// Everything else
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

impl ModemError {
    /// Timeouts are warnings, every other failure is an error
    pub fn severity(&self) -> Severity {
        match self {
            ModemError::Timeout { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Returns true if the failure was a deadline expiry
    pub fn is_timeout(&self) -> bool {
        matches!(self, ModemError::Timeout { .. })
    }
}

impl From<PduError> for ModemError {
    fn from(err: PduError) -> Self {
        match err {
            PduError::Encoding(_) => ModemError::Encoding(err.to_string()),
            _ => ModemError::Validation(err.to_string()),
        }
    }
}

/// Last error text recorded by a session
///
/// Every recorded failure replaces the previous one, warnings included.
/// `has_error()` is true exactly when the stored text is non-empty.
#[derive(Debug, Clone, Default)]
pub struct ErrorHolder {
    text: String,
    severity: Option<Severity>,
}

impl ErrorHolder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure and emit it on the current tracing span
    pub fn record(&mut self, err: &ModemError) {
        let severity = err.severity();
        match severity {
            Severity::Warning => warn!("{err}"),
            Severity::Error => error!("{err}"),
        }
        self.set(severity, err.to_string());
    }

    /// Record a free-form message with the given severity
    pub fn set(&mut self, severity: Severity, text: impl Into<String>) {
        self.text = text.into();
        self.severity = if self.text.is_empty() {
            None
        } else {
            Some(severity)
        };
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.severity = None;
    }

    pub fn has_error(&self) -> bool {
        !self.text.is_empty()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn severity(&self) -> Option<Severity> {
        self.severity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_warning() {
        let err = ModemError::Timeout {
            operation: "read_line",
            waited_ms: 500,
        };
        assert_eq!(err.severity(), Severity::Warning);
        assert!(err.is_timeout());

        let err = ModemError::Protocol("garbage".to_string());
        assert_eq!(err.severity(), Severity::Error);
    }

    #[test]
    fn test_holder_flag_tracks_text() {
        let mut holder = ErrorHolder::new();
        assert!(!holder.has_error());

        holder.record(&ModemError::Protocol("bad reply".to_string()));
        assert!(holder.has_error());
        assert_eq!(holder.severity(), Some(Severity::Error));
        assert_eq!(holder.text(), "Protocol error: bad reply");

        holder.set(Severity::Warning, "");
        assert!(!holder.has_error());
        assert_eq!(holder.severity(), None);
    }

    #[test]
    fn test_warning_replaces_error() {
        let mut holder = ErrorHolder::new();
        holder.record(&ModemError::Validation("pin".to_string()));
        holder.record(&ModemError::Timeout {
            operation: "execute",
            waited_ms: 10,
        });
        assert_eq!(holder.severity(), Some(Severity::Warning));
        assert!(holder.text().starts_with("Timed out"));

        holder.clear();
        assert!(!holder.has_error());
        assert!(holder.text().is_empty());
    }

    #[test]
    fn test_pdu_error_conversion() {
        let err: ModemError = PduError::Encoding("surrogate".to_string()).into();
        assert!(matches!(err, ModemError::Encoding(_)));

        let err: ModemError = PduError::InvalidNumber("12a".to_string()).into();
        assert!(matches!(err, ModemError::Validation(_)));
    }
}
