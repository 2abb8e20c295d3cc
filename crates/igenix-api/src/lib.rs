// igenix-api: Device link contract and wire value types for Igenix air conditioners

pub mod error;
pub mod identity;
pub mod link;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod property;

pub use error::Error;
pub use identity::{DeviceIdentity, Location};
pub use link::DeviceLink;
#[cfg(any(test, feature = "test-support"))]
pub use memory::{LinkOp, MemoryLink};
pub use property::{DpsKey, PropertyValue, Snapshot, WriteAck};
