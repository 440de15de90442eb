//! Fetch failure taxonomy and curl error classification.

use std::fmt;

/// Coarse class of a transport-level failure, for logs and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Connect or transfer exceeded the request timeout.
    Timeout,
    /// DNS, refused/reset connection, send/recv failure.
    Connection,
    Other,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransportKind::Timeout => "timeout",
            TransportKind::Connection => "connection",
            TransportKind::Other => "transport",
        };
        f.write_str(s)
    }
}

/// Why one fetch did not produce a file. Never fatal for the run.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The request never got an HTTP answer.
    #[error("{kind} error: {message}")]
    Transport { kind: TransportKind, message: String },

    /// The service answered with something other than 200.
    #[error("HTTP {status}")]
    Rejected { status: u32 },

    /// The body arrived but could not be written locally.
    #[error("storage: {0}")]
    Storage(#[from] std::io::Error),
}

impl FetchError {
    /// Short label used as a structured log field.
    pub fn category(&self) -> &'static str {
        match self {
            FetchError::Transport { .. } => "transport",
            FetchError::Rejected { .. } => "rejected",
            FetchError::Storage(_) => "storage",
        }
    }
}

/// Classify a curl error.
pub fn classify_curl_error(e: &curl::Error) -> TransportKind {
    if e.is_operation_timedout() {
        return TransportKind::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
    {
        return TransportKind::Connection;
    }
    TransportKind::Other
}

impl From<curl::Error> for FetchError {
    fn from(e: curl::Error) -> Self {
        FetchError::Transport {
            kind: classify_curl_error(&e),
            message: e.to_string(),
        }
    }
}
