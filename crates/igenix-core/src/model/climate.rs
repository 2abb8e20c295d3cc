// ── Heater/cooler state ──

use std::fmt;
use std::ops::RangeInclusive;

use crate::error::CoreError;

/// Cooling thresholds the device accepts, in °C.
pub const COOLING_THRESHOLD_RANGE: RangeInclusive<i64> = 15..=31;

/// Whether the unit is switched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Active {
    Inactive,
    Active,
}

/// What the unit is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum CurrentHeaterCoolerState {
    Inactive,
    Idle,
    Cooling,
}

/// What the user asked the unit to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum TargetHeaterCoolerState {
    Auto,
    Cool,
}

/// Louvre oscillation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum SwingMode {
    Disabled,
    Enabled,
}

/// Unit shown on the device's front panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
pub enum TemperatureUnit {
    #[strum(serialize = "C")]
    Celsius,
    #[strum(serialize = "F")]
    Fahrenheit,
}

/// The device's raw operating mode.
///
/// Only `"cold"` is meaningful to the accessory; the firmware reports
/// other modes (fan-only, dry) that all read as automatic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatingMode {
    Cold,
    Auto,
    Other(String),
}

impl OperatingMode {
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "cold" => Self::Cold,
            "auto" => Self::Auto,
            other => Self::Other(other.to_owned()),
        }
    }

    pub fn as_raw(&self) -> &str {
        match self {
            Self::Cold => "cold",
            Self::Auto => "auto",
            Self::Other(raw) => raw,
        }
    }

    pub fn is_cooling(&self) -> bool {
        matches!(self, Self::Cold)
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_raw())
    }
}

/// Fan speed tier, 1 (low) to 3 (high).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FanSpeed(u8);

impl FanSpeed {
    pub const LOW: Self = Self(1);
    pub const MEDIUM: Self = Self(2);
    pub const HIGH: Self = Self(3);

    pub fn new(tier: u8) -> Result<Self, CoreError> {
        if (1..=3).contains(&tier) {
            Ok(Self(tier))
        } else {
            Err(CoreError::ValidationFailed {
                message: format!("fan speed must be between 1 and 3, got {tier}"),
            })
        }
    }

    pub fn tier(self) -> u8 {
        self.0
    }
}

impl fmt::Display for FanSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn operating_mode_round_trips_unknown_values() {
        let mode = OperatingMode::from_raw("wet");
        assert_eq!(mode, OperatingMode::Other("wet".into()));
        assert_eq!(mode.as_raw(), "wet");
        assert!(!mode.is_cooling());
        assert!(OperatingMode::from_raw("cold").is_cooling());
    }

    #[test]
    fn fan_speed_bounds() {
        assert_eq!(FanSpeed::new(2).ok(), Some(FanSpeed::MEDIUM));
        assert!(FanSpeed::new(0).is_err());
        assert!(FanSpeed::new(4).is_err());
    }

    #[test]
    fn temperature_unit_codes() {
        assert_eq!(TemperatureUnit::from_str("F").ok(), Some(TemperatureUnit::Fahrenheit));
        assert_eq!(TemperatureUnit::Celsius.to_string(), "C");
        assert!(TemperatureUnit::from_str("K").is_err());
    }
}
