// ── Runtime device configuration ──
//
// Describes *which* device to talk to and how long each round trip may
// take. Carries the identity, but never touches disk: igenix-config
// builds one of these from a TOML profile and hands it in.

use std::time::Duration;

use igenix_api::DeviceIdentity;

/// Default bound on a LAN discovery round trip.
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(10);
/// Default bound on a snapshot fetch or property write.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for coordinating a single device.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub identity: DeviceIdentity,
    /// Bound on location resolution. Zero disables the bound.
    pub resolve_timeout: Duration,
    /// Bound on each snapshot fetch and each write. Zero disables the bound.
    pub request_timeout: Duration,
}

impl DeviceConfig {
    pub fn new(identity: DeviceIdentity) -> Self {
        Self {
            identity,
            resolve_timeout: DEFAULT_RESOLVE_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
