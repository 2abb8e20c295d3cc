// ── Raw-to-semantic conversions ──
//
// Bridges raw data point values into the accessory's domain types and
// back. Readers check the value's type and report `UnexpectedValue` when
// the device sends something else; writers validate ranges before
// anything is queued.

use std::str::FromStr;

use igenix_api::{DpsKey, PropertyValue};

use crate::error::CoreError;
use crate::model::dps;
use crate::model::{
    Active, COOLING_THRESHOLD_RANGE, CurrentHeaterCoolerState, FanSpeed, OperatingMode, SwingMode,
    TargetHeaterCoolerState, TemperatureUnit,
};

// ── Helpers ────────────────────────────────────────────────────────

fn unexpected(key: DpsKey, value: &PropertyValue, expected: &'static str) -> CoreError {
    CoreError::UnexpectedValue {
        key,
        value: value.clone(),
        expected,
    }
}

fn expect_bool(key: DpsKey, value: &PropertyValue) -> Result<bool, CoreError> {
    value.as_bool().ok_or_else(|| unexpected(key, value, "a boolean"))
}

fn expect_text(key: DpsKey, value: &PropertyValue) -> Result<&str, CoreError> {
    value.as_str().ok_or_else(|| unexpected(key, value, "a string"))
}

// ── Power ──────────────────────────────────────────────────────────

pub fn active_from_raw(value: &PropertyValue) -> Result<Active, CoreError> {
    Ok(if expect_bool(dps::POWER, value)? {
        Active::Active
    } else {
        Active::Inactive
    })
}

pub fn active_to_raw(active: Active) -> PropertyValue {
    PropertyValue::Bool(active == Active::Active)
}

// ── Mode ───────────────────────────────────────────────────────────

pub fn mode_from_raw(value: &PropertyValue) -> Result<OperatingMode, CoreError> {
    expect_text(dps::MODE, value).map(OperatingMode::from_raw)
}

/// Derive what the unit is doing from its power flag and mode.
pub fn current_state_from_raw(
    power: &PropertyValue,
    mode: &PropertyValue,
) -> Result<CurrentHeaterCoolerState, CoreError> {
    if !expect_bool(dps::POWER, power)? {
        return Ok(CurrentHeaterCoolerState::Inactive);
    }
    Ok(if mode_from_raw(mode)?.is_cooling() {
        CurrentHeaterCoolerState::Cooling
    } else {
        CurrentHeaterCoolerState::Idle
    })
}

pub fn target_state_from_raw(value: &PropertyValue) -> Result<TargetHeaterCoolerState, CoreError> {
    Ok(if mode_from_raw(value)?.is_cooling() {
        TargetHeaterCoolerState::Cool
    } else {
        TargetHeaterCoolerState::Auto
    })
}

pub fn target_state_to_raw(state: TargetHeaterCoolerState) -> PropertyValue {
    let mode = match state {
        TargetHeaterCoolerState::Cool => OperatingMode::Cold,
        TargetHeaterCoolerState::Auto => OperatingMode::Auto,
    };
    PropertyValue::from(mode.as_raw())
}

// ── Temperature ────────────────────────────────────────────────────

pub fn temperature_from_raw(key: DpsKey, value: &PropertyValue) -> Result<i64, CoreError> {
    value
        .as_i64()
        .ok_or_else(|| unexpected(key, value, "an integer temperature"))
}

/// Validate a cooling threshold before it is queued.
pub fn cooling_threshold_to_raw(celsius: i64) -> Result<PropertyValue, CoreError> {
    if COOLING_THRESHOLD_RANGE.contains(&celsius) {
        Ok(PropertyValue::Integer(celsius))
    } else {
        Err(CoreError::ValidationFailed {
            message: format!(
                "cooling threshold must be between {} and {} °C, got {celsius}",
                COOLING_THRESHOLD_RANGE.start(),
                COOLING_THRESHOLD_RANGE.end()
            ),
        })
    }
}

// ── Swing ──────────────────────────────────────────────────────────

pub fn swing_from_raw(value: &PropertyValue) -> Result<SwingMode, CoreError> {
    Ok(if expect_bool(dps::SWING, value)? {
        SwingMode::Enabled
    } else {
        SwingMode::Disabled
    })
}

pub fn swing_to_raw(mode: SwingMode) -> PropertyValue {
    PropertyValue::Bool(mode == SwingMode::Enabled)
}

// ── Fan speed ──────────────────────────────────────────────────────

/// Fan speed arrives string-encoded; older firmware sends a bare integer.
pub fn fan_speed_from_raw(value: &PropertyValue) -> Result<FanSpeed, CoreError> {
    let tier = match value {
        PropertyValue::Text(raw) => raw.trim().parse::<u8>().ok(),
        PropertyValue::Integer(n) => u8::try_from(*n).ok(),
        PropertyValue::Bool(_) => None,
    };
    tier.and_then(|t| FanSpeed::new(t).ok())
        .ok_or_else(|| unexpected(dps::FAN_SPEED, value, "a fan speed tier 1-3"))
}

pub fn fan_speed_to_raw(speed: FanSpeed) -> PropertyValue {
    PropertyValue::Text(speed.to_string())
}

// ── Display unit ───────────────────────────────────────────────────

pub fn unit_from_raw(value: &PropertyValue) -> Result<TemperatureUnit, CoreError> {
    let raw = expect_text(dps::TEMPERATURE_UNIT, value)?;
    TemperatureUnit::from_str(raw)
        .map_err(|_| unexpected(dps::TEMPERATURE_UNIT, value, "\"C\" or \"F\""))
}

pub fn unit_to_raw(unit: TemperatureUnit) -> PropertyValue {
    PropertyValue::Text(unit.to_string())
}
