use thiserror::Error;

/// Top-level error type for the `igenix-api` crate.
///
/// Covers every failure a device link can report: LAN discovery,
/// transport, protocol framing, and command rejection.
/// `igenix-core` maps these into the coordinator's error taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Discovery ───────────────────────────────────────────────────
    /// The device did not announce itself on the local network.
    #[error("Device {device_id} not found on the local network")]
    Discovery { device_id: String },

    // ── Transport ───────────────────────────────────────────────────
    /// Socket-level failure (connection refused, reset, unreachable).
    #[error("Network I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The link gave up waiting for the device.
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The device closed the session mid-request.
    #[error("Device closed the connection")]
    Disconnected,

    // ── Protocol ────────────────────────────────────────────────────
    /// Malformed frame, bad checksum, or failed decryption.
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// The device answered but refused the command.
    #[error("Device rejected command: {message}")]
    Rejected { message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// Payload decoded but did not have the expected shape, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if retrying the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Timeout { .. } | Self::Disconnected | Self::Discovery { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors() {
        assert!(Error::Disconnected.is_transient());
        assert!(Error::Timeout { timeout_ms: 5 }.is_transient());
        assert!(
            !Error::Rejected {
                message: "bad dps".into()
            }
            .is_transient()
        );
    }

    #[test]
    fn display_includes_device_id() {
        let err = Error::Discovery {
            device_id: "bf0123".into(),
        };
        assert_eq!(err.to_string(), "Device bf0123 not found on the local network");
    }
}
