//! Session coordination between many concurrent callers and one flaky
//! Igenix air conditioner on the local network.
//!
//! - **[`Coordinator`]**: Owns the device link and the cached device
//!   location. Concurrent location lookups share one resolution; concurrent
//!   reads share one snapshot fetch; writes run one at a time, in the order
//!   they were issued. A failed write poisons the cached location so the
//!   next operation rediscovers the device. A failed read does not.
//!
//! - **[`AirConditioner`]**: Semantic facade over the coordinator: power,
//!   heater/cooler state, temperatures, swing, fan speed, and display unit as
//!   typed values instead of raw data points.
//!
//! - **[`CoreError`]**: Cloneable error taxonomy. Every waiter joined on a
//!   shared round trip receives the same error.
//!
//! - **Domain model** ([`model`]): Data point keys and the semantic enums the
//!   accessory speaks.

pub mod accessory;
pub mod command;
pub mod config;
pub mod convert;
pub mod coordinator;
pub mod error;
mod flight;
pub mod model;

// ── Primary re-exports ──────────────────────────────────────────────
pub use accessory::{AccessoryInformation, AirConditioner};
pub use command::WriteRequest;
pub use config::DeviceConfig;
pub use coordinator::{Coordinator, ResolutionState};
pub use error::{CoreError, LinkOperation};

pub use model::{
    Active, CurrentHeaterCoolerState, FanSpeed, OperatingMode, SwingMode, TargetHeaterCoolerState,
    TemperatureUnit,
};

// Link-level types callers need to construct a coordinator.
pub use igenix_api::{DeviceIdentity, DeviceLink, DpsKey, Location, PropertyValue, Snapshot, WriteAck};
