//! Data point keys of the IG9901WIFI, fixed by the device firmware.

use igenix_api::DpsKey;

/// Power on/off (boolean).
pub const POWER: DpsKey = DpsKey::new(1);
/// Cooling threshold in whole °C (integer, 15–31).
pub const TARGET_TEMPERATURE: DpsKey = DpsKey::new(2);
/// Ambient temperature (integer, read-only).
pub const CURRENT_TEMPERATURE: DpsKey = DpsKey::new(3);
/// Operating mode (`"cold"` or anything else).
pub const MODE: DpsKey = DpsKey::new(4);
/// Fan speed tier, string-encoded `"1"`–`"3"`.
pub const FAN_SPEED: DpsKey = DpsKey::new(5);
/// Display unit, `"C"` or `"F"`.
pub const TEMPERATURE_UNIT: DpsKey = DpsKey::new(19);
/// Louvre oscillation (boolean).
pub const SWING: DpsKey = DpsKey::new(104);
