// ── Air conditioner accessory ──
//
// Semantic facade over a `Coordinator`. Each characteristic maps onto one
// or two raw data points; reads always go through a fresh (or joined)
// snapshot, writes through the serialized write queue.

use igenix_api::DeviceLink;
use tracing::debug;

use crate::convert;
use crate::coordinator::Coordinator;
use crate::error::CoreError;
use crate::model::dps;
use crate::model::{
    Active, CurrentHeaterCoolerState, FanSpeed, SwingMode, TargetHeaterCoolerState,
    TemperatureUnit,
};

pub const MANUFACTURER: &str = "Igenix";
pub const MODEL: &str = "IG9901WIFI";

/// Static identification published alongside the accessory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessoryInformation {
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
}

/// An Igenix IG9901WIFI portable air conditioner.
pub struct AirConditioner<L: DeviceLink> {
    coordinator: Coordinator<L>,
}

impl<L: DeviceLink> Clone for AirConditioner<L> {
    fn clone(&self) -> Self {
        Self {
            coordinator: self.coordinator.clone(),
        }
    }
}

impl<L: DeviceLink> AirConditioner<L> {
    pub fn new(coordinator: Coordinator<L>) -> Self {
        Self { coordinator }
    }

    pub fn coordinator(&self) -> &Coordinator<L> {
        &self.coordinator
    }

    /// Manufacturer, model, and the device id as serial number.
    pub fn accessory_information(&self) -> AccessoryInformation {
        let identity = self.coordinator.identity();
        AccessoryInformation {
            name: identity.name.clone(),
            manufacturer: MANUFACTURER.to_owned(),
            model: MODEL.to_owned(),
            serial_number: identity.device_id.clone(),
        }
    }

    // ── Power ────────────────────────────────────────────────────

    pub async fn active(&self) -> Result<Active, CoreError> {
        let raw = self.coordinator.get_property(dps::POWER).await?;
        convert::active_from_raw(&raw)
    }

    pub async fn set_active(&self, active: Active) -> Result<(), CoreError> {
        debug!(%active, "set active");
        self.coordinator
            .set_property(dps::POWER, convert::active_to_raw(active))
            .await
            .map(drop)
    }

    // ── Heater/cooler state ──────────────────────────────────────

    /// Derived from power and mode, both read from the same snapshot.
    pub async fn current_heater_cooler_state(&self) -> Result<CurrentHeaterCoolerState, CoreError> {
        let values = self
            .coordinator
            .get_properties(&[dps::POWER, dps::MODE])
            .await?;
        match values.as_slice() {
            [power, mode] => convert::current_state_from_raw(power, mode),
            _ => Err(CoreError::Internal(format!(
                "expected 2 data points, got {}",
                values.len()
            ))),
        }
    }

    pub async fn target_heater_cooler_state(&self) -> Result<TargetHeaterCoolerState, CoreError> {
        let raw = self.coordinator.get_property(dps::MODE).await?;
        convert::target_state_from_raw(&raw)
    }

    pub async fn set_target_heater_cooler_state(
        &self,
        state: TargetHeaterCoolerState,
    ) -> Result<(), CoreError> {
        debug!(%state, "set target heater/cooler state");
        self.coordinator
            .set_property(dps::MODE, convert::target_state_to_raw(state))
            .await
            .map(drop)
    }

    // ── Temperatures ─────────────────────────────────────────────

    pub async fn current_temperature(&self) -> Result<i64, CoreError> {
        let raw = self
            .coordinator
            .get_property(dps::CURRENT_TEMPERATURE)
            .await?;
        convert::temperature_from_raw(dps::CURRENT_TEMPERATURE, &raw)
    }

    pub async fn cooling_threshold_temperature(&self) -> Result<i64, CoreError> {
        let raw = self
            .coordinator
            .get_property(dps::TARGET_TEMPERATURE)
            .await?;
        convert::temperature_from_raw(dps::TARGET_TEMPERATURE, &raw)
    }

    /// Rejected before queueing when outside 15–31 °C.
    pub async fn set_cooling_threshold_temperature(&self, celsius: i64) -> Result<(), CoreError> {
        let raw = convert::cooling_threshold_to_raw(celsius)?;
        debug!(celsius, "set cooling threshold");
        self.coordinator
            .set_property(dps::TARGET_TEMPERATURE, raw)
            .await
            .map(drop)
    }

    // ── Swing ────────────────────────────────────────────────────

    pub async fn swing_mode(&self) -> Result<SwingMode, CoreError> {
        let raw = self.coordinator.get_property(dps::SWING).await?;
        convert::swing_from_raw(&raw)
    }

    pub async fn set_swing_mode(&self, mode: SwingMode) -> Result<(), CoreError> {
        debug!(%mode, "set swing mode");
        self.coordinator
            .set_property(dps::SWING, convert::swing_to_raw(mode))
            .await
            .map(drop)
    }

    // ── Fan ──────────────────────────────────────────────────────

    pub async fn rotation_speed(&self) -> Result<FanSpeed, CoreError> {
        let raw = self.coordinator.get_property(dps::FAN_SPEED).await?;
        convert::fan_speed_from_raw(&raw)
    }

    /// Rejected before queueing unless `tier` is 1, 2, or 3.
    pub async fn set_rotation_speed(&self, tier: u8) -> Result<(), CoreError> {
        let speed = FanSpeed::new(tier)?;
        debug!(%speed, "set rotation speed");
        self.coordinator
            .set_property(dps::FAN_SPEED, convert::fan_speed_to_raw(speed))
            .await
            .map(drop)
    }

    // ── Display ──────────────────────────────────────────────────

    pub async fn temperature_display_units(&self) -> Result<TemperatureUnit, CoreError> {
        let raw = self.coordinator.get_property(dps::TEMPERATURE_UNIT).await?;
        convert::unit_from_raw(&raw)
    }

    pub async fn set_temperature_display_units(
        &self,
        unit: TemperatureUnit,
    ) -> Result<(), CoreError> {
        debug!(%unit, "set temperature display units");
        self.coordinator
            .set_property(dps::TEMPERATURE_UNIT, convert::unit_to_raw(unit))
            .await
            .map(drop)
    }
}
