// ── Device identity and resolved location ──
//
// `DeviceIdentity` is what the user configures; `Location` is what a
// link learns at runtime by listening for the device's LAN broadcast.

use std::fmt;
use std::net::IpAddr;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Immutable identity of one physical device.
///
/// The local key is the AES key the device encrypts its LAN traffic
/// with. `Debug` output redacts it.
#[derive(Debug, Clone)]
pub struct DeviceIdentity {
    /// Display name chosen by the user.
    pub name: String,
    /// Cloud device id (`devId`), also used as the serial number.
    pub device_id: String,
    /// Shared secret for the encrypted LAN protocol.
    pub local_key: SecretString,
    /// Account id the device is bound to, when the protocol version needs it.
    pub uid: Option<String>,
}

impl DeviceIdentity {
    pub fn new(
        name: impl Into<String>,
        device_id: impl Into<String>,
        local_key: SecretString,
    ) -> Self {
        Self {
            name: name.into(),
            device_id: device_id.into(),
            local_key,
            uid: None,
        }
    }

    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }
}

/// Where a device currently lives on the network.
///
/// Produced by [`DeviceLink::resolve_location`](crate::DeviceLink::resolve_location)
/// and handed back to every later request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub ip: IpAddr,
    /// Protocol version the device announced (e.g. `"3.3"`).
    pub protocol_version: String,
}

impl Location {
    pub fn new(ip: IpAddr, protocol_version: impl Into<String>) -> Self {
        Self {
            ip,
            protocol_version: protocol_version.into(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (v{})", self.ip, self.protocol_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_local_key() {
        let identity = DeviceIdentity::new(
            "Bedroom AC",
            "bf00aa11",
            SecretString::from("0123456789abcdef".to_string()),
        );
        let debug = format!("{identity:?}");
        assert!(debug.contains("bf00aa11"));
        assert!(!debug.contains("0123456789abcdef"));
    }

    #[test]
    fn location_display() {
        let location = Location::new([192, 168, 1, 40].into(), "3.3");
        assert_eq!(location.to_string(), "192.168.1.40 (v3.3)");
    }
}
