// ── Semantic domain model ──
//
// Types the accessory layer speaks instead of raw data points. The raw
// key numbering lives in `dps`; everything else is host-facing state.

pub mod climate;
pub mod dps;

// ── Re-exports ──────────────────────────────────────────────────────

pub use climate::{
    Active, COOLING_THRESHOLD_RANGE, CurrentHeaterCoolerState, FanSpeed, OperatingMode, SwingMode,
    TargetHeaterCoolerState, TemperatureUnit,
};
