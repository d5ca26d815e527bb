use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable error codes. Callers match on these, never on messages.
pub mod codes {
    /// Period token or range could not be resolved.
    pub const PERIOD_INVALID: &str = "PERIOD_INVALID";
    pub const GROUP_NOT_FOUND: &str = "GROUP_NOT_FOUND";
    /// Engine, fetch or CLI settings out of range or unreadable.
    pub const CONFIG_INVALID: &str = "CONFIG_INVALID";
    /// Transport or HTTP-level failure talking to the backend.
    pub const FETCH_FAILED: &str = "FETCH_FAILED";
    pub const FETCH_DECODE_FAILED: &str = "FETCH_DECODE_FAILED";
    /// The backend answered with a JSON-RPC error object.
    pub const FETCH_RPC_ERROR: &str = "FETCH_RPC_ERROR";
    pub const REPORT_CSV_FAILED: &str = "REPORT_CSV_FAILED";
    pub const REPORT_ENCODE_FAILED: &str = "REPORT_ENCODE_FAILED";
}

/// Failure of a report run: bad request, bad settings, backend trouble or output I/O.
///
/// There is no partial result. Any `AppError` aborts the whole aggregation, so a report is
/// never built from an incomplete incident set. `retryable` is set only by the fetch layer
/// for transient transport failures and is consumed by its retry loop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
    pub retryable: bool,
}

impl AppError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            retryable: false,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Process exit status for the CLI: `2` for a request or settings problem the caller can
    /// fix, `3` when the monitoring backend failed, `1` for anything else.
    pub fn exit_status(&self) -> u8 {
        match self.code.as_str() {
            codes::PERIOD_INVALID | codes::GROUP_NOT_FOUND | codes::CONFIG_INVALID => 2,
            codes::FETCH_FAILED | codes::FETCH_DECODE_FAILED | codes::FETCH_RPC_ERROR => 3,
            _ => 1,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(details) = &self.details {
            write!(f, " ({details})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}
