// ── Core error types ──
//
// User-facing errors from igenix-core. Link errors are wrapped in an
// `Arc` so one failure can be handed to every caller that joined the
// same round trip: they all receive the identical error object.

use std::sync::Arc;

use igenix_api::{DpsKey, PropertyValue};
use thiserror::Error;

/// The device round trip an error or timeout belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum LinkOperation {
    #[strum(serialize = "location resolution")]
    Resolve,
    #[strum(serialize = "snapshot fetch")]
    Fetch,
    #[strum(serialize = "property write")]
    Write,
}

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Device round trips ───────────────────────────────────────────
    #[error("Cannot locate device '{device}' on the network: {source}")]
    ResolutionFailed {
        device: String,
        source: Arc<igenix_api::Error>,
    },

    #[error("Failed to read device state: {source}")]
    SnapshotFailed { source: Arc<igenix_api::Error> },

    #[error("Failed to write data point {key}: {source}")]
    WriteFailed {
        key: DpsKey,
        source: Arc<igenix_api::Error>,
    },

    #[error("Device {operation} timed out after {timeout_ms}ms")]
    Timeout {
        operation: LinkOperation,
        timeout_ms: u64,
    },

    // ── Data errors ──────────────────────────────────────────────────
    /// The snapshot was fetched but lacks the requested key.
    #[error("Data point {key} missing from device state")]
    PropertyMissing { key: DpsKey },

    #[error("Data point {key} holds {value}, expected {expected}")]
    UnexpectedValue {
        key: DpsKey,
        value: PropertyValue,
        expected: &'static str,
    },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── Lifecycle ────────────────────────────────────────────────────
    #[error("Device coordinator has shut down")]
    CoordinatorClosed,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Returns `true` if the error came from a device round trip
    /// (including timeouts) rather than from the data itself.
    pub fn is_link_failure(&self) -> bool {
        matches!(
            self,
            Self::ResolutionFailed { .. }
                | Self::SnapshotFailed { .. }
                | Self::WriteFailed { .. }
                | Self::Timeout { .. }
        )
    }

    /// The underlying link error, if any.
    pub fn link_error(&self) -> Option<&Arc<igenix_api::Error>> {
        match self {
            Self::ResolutionFailed { source, .. }
            | Self::SnapshotFailed { source }
            | Self::WriteFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn timeout_names_the_operation() {
        let err = CoreError::Timeout {
            operation: LinkOperation::Fetch,
            timeout_ms: 5000,
        };
        assert_eq!(err.to_string(), "Device snapshot fetch timed out after 5000ms");
        assert!(err.is_link_failure());
        assert!(err.link_error().is_none());
    }

    #[test]
    fn clones_share_the_link_error() {
        let err = CoreError::SnapshotFailed {
            source: Arc::new(igenix_api::Error::Disconnected),
        };
        let joined = err.clone();

        let (Some(a), Some(b)) = (err.link_error(), joined.link_error()) else {
            panic!("expected link errors");
        };
        assert!(Arc::ptr_eq(a, b));
        assert!(joined.source().is_some());
    }

    #[test]
    fn data_errors_are_not_link_failures() {
        let err = CoreError::PropertyMissing {
            key: DpsKey::new(104),
        };
        assert_eq!(err.to_string(), "Data point 104 missing from device state");
        assert!(!err.is_link_failure());
    }
}
