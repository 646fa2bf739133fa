//! Structured error model for the extraction source and ingestion sink.
//!
//! The delivery channel's retry decisions key off [`SinkError::is_transient`]:
//! server-side (5xx-equivalent) and throttling failures are retryable with
//! backoff, client-side rejections are not.

use serde::{Deserialize, Serialize};

/// Whole-request failure surface of the ingestion sink.
///
/// Per-item failures travel inside an accepted batch response instead and
/// never appear here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum SinkError {
    /// The sink rejected or failed the entire request with an HTTP-like
    /// status code.
    #[error("sink request failed with status {status}: {message}")]
    Service { status: u16, message: String },

    /// The sink signalled throttling / service-unavailable.
    #[error("sink throttled: {message}")]
    Throttled { message: String },
}

impl SinkError {
    /// Retryable with request-level backoff?
    ///
    /// Mirrors the classic classification: any 5xx-equivalent status or a
    /// throttling signal is transient; 4xx-equivalent statuses are permanent
    /// client errors.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Service { status, .. } => status / 100 == 5,
            Self::Throttled { .. } => true,
        }
    }

    /// Status code when the sink reported one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Service { status, .. } => Some(*status),
            Self::Throttled { .. } => None,
        }
    }
}

/// Failure of the extraction source (query issue or mid-stream fetch).
///
/// Never handled inside the delivery path: it propagates to the iteration
/// boundary where the orchestrator logs it and moves on without advancing
/// the watermark.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The windowed query could not be issued.
    #[error("source query failed: {0}")]
    Query(String),

    /// Fetching the next page of an open cursor failed.
    #[error("source fetch failed: {0}")]
    Fetch(String),

    /// Reading source data from disk failed (file-backed sources).
    #[error("source i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A source record could not be decoded.
    #[error("source record decode failed: {0}")]
    Decode(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_transient() {
        for status in [500, 502, 503, 599] {
            let err = SinkError::Service {
                status,
                message: "boom".into(),
            };
            assert!(err.is_transient(), "status {status} should be transient");
        }
    }

    #[test]
    fn client_errors_are_permanent() {
        for status in [400, 403, 404, 413, 422] {
            let err = SinkError::Service {
                status,
                message: "rejected".into(),
            };
            assert!(!err.is_transient(), "status {status} should be permanent");
        }
    }

    #[test]
    fn throttling_is_transient() {
        let err = SinkError::Throttled {
            message: "slow down".into(),
        };
        assert!(err.is_transient());
        assert!(err.status().is_none());
    }

    #[test]
    fn sink_error_display() {
        let err = SinkError::Service {
            status: 503,
            message: "unavailable".into(),
        };
        assert_eq!(
            err.to_string(),
            "sink request failed with status 503: unavailable"
        );
    }

    #[test]
    fn sink_error_serde_roundtrip() {
        let err = SinkError::Throttled {
            message: "later".into(),
        };
        let json = serde_json::to_string(&err).unwrap();
        let back: SinkError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, back);
    }

    #[test]
    fn source_error_wraps_io() {
        let inner = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = SourceError::from(inner);
        assert!(err.to_string().contains("i/o"));
    }
}
