// ── Device link contract ──
//
// The one seam between the coordinator and the wire. Implementations own
// discovery, session encryption, and framing; callers only ever see
// locations, snapshots, and acknowledgements.

use std::future::Future;

use crate::error::Error;
use crate::identity::Location;
use crate::property::{DpsKey, PropertyValue, Snapshot, WriteAck};

/// A network client for one physical device.
///
/// Every method is a full network round trip. Implementations do not need
/// to coordinate concurrent callers: `igenix-core` guarantees at most one
/// resolution and one snapshot fetch in flight, and never overlaps writes.
pub trait DeviceLink: Send + Sync + 'static {
    /// Find the device on the local network. Expensive (waits for a
    /// broadcast), so the coordinator caches the result.
    fn resolve_location(&self) -> impl Future<Output = Result<Location, Error>> + Send;

    /// Read every data point the device exposes.
    fn fetch_snapshot(
        &self,
        location: &Location,
    ) -> impl Future<Output = Result<Snapshot, Error>> + Send;

    /// Set a single data point.
    fn write_value(
        &self,
        location: &Location,
        key: DpsKey,
        value: PropertyValue,
    ) -> impl Future<Output = Result<WriteAck, Error>> + Send;
}
