//! Module: config
//!
//! Purpose: Timing and scheduling configuration for the button driver.
//!
//! Architecture:
//! - build.rs: bakes `BTNDRV_*` tick counts into the build (env overridable)
//! - Build-time constants parsed here at compile time
//! - [`DriverConfig`]: runtime copy handed to the driver, validated once
//!
//! All durations are in RTOS ticks.

use crate::error::ConfigError;
use crate::hal::clock::Tick;

/// Parse a decimal tick count at compile time.
const fn parse_ticks(raw: &str) -> Tick {
    let bytes = raw.as_bytes();
    assert!(!bytes.is_empty(), "empty tick count");

    let mut value: Tick = 0;
    let mut i = 0;
    while i < bytes.len() {
        let digit = bytes[i];
        assert!(digit >= b'0' && digit <= b'9', "tick count must be decimal");
        value = value * 10 + (digit - b'0') as Tick;
        i += 1;
    }
    value
}

/// Minimum ticks between two accepted level changes.
pub const DEBOUNCE_TICKS: Tick = parse_ticks(env!("BTNDRV_DEBOUNCE_TICKS"));

/// Press longer than this is a long click.
pub const LONG_CLICK_TICKS: Tick = parse_ticks(env!("BTNDRV_LONG_CLICK_TICKS"));

/// Press longer than this is a very long click.
pub const VERY_LONG_CLICK_TICKS: Tick = parse_ticks(env!("BTNDRV_VERY_LONG_CLICK_TICKS"));

/// Hold repeat period.
pub const HOLD_TICKS: Tick = parse_ticks(env!("BTNDRV_HOLD_TICKS"));

/// Quiet period that closes a click sequence.
pub const CLICK_TIMEOUT_TICKS: Tick = parse_ticks(env!("BTNDRV_CLICK_TIMEOUT_TICKS"));

/// Version string (set by build.rs, includes git hash)
pub const VERSION: &str = env!("VERSION_STRING");

/// Click, hold and debounce thresholds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timings {
    pub debounce: Tick,
    pub long_click: Tick,
    pub very_long_click: Tick,
    pub hold: Tick,
    pub click_timeout: Tick,
}

impl Timings {
    /// Thresholds baked in at build time.
    pub const BUILD: Self = Self {
        debounce: DEBOUNCE_TICKS,
        long_click: LONG_CLICK_TICKS,
        very_long_click: VERY_LONG_CLICK_TICKS,
        hold: HOLD_TICKS,
        click_timeout: CLICK_TIMEOUT_TICKS,
    };
}

impl Default for Timings {
    fn default() -> Self {
        Self::BUILD
    }
}

/// Runtime driver configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DriverConfig {
    pub timings: Timings,

    /// Publish raw press/release events ahead of classification.
    pub extended_info: bool,

    /// Longest the sampler waits for the registry before skipping a cycle.
    pub sampler_lock_wait: Tick,

    /// Longest register/deregister wait for the registry.
    pub request_lock_wait: Tick,

    /// Sleep between cycles while no button is registered.
    pub idle_backoff: Tick,

    /// Sleep between two sampling cycles.
    pub cycle_yield: Tick,
}

impl DriverConfig {
    pub const DEFAULT: Self = Self {
        timings: Timings::BUILD,
        extended_info: cfg!(feature = "extended-info"),
        sampler_lock_wait: 1,
        request_lock_wait: 2,
        idle_backoff: 2,
        cycle_yield: 1,
    };

    /// Same defaults with different thresholds.
    pub fn with_timings(timings: Timings) -> Self {
        Self {
            timings,
            ..Self::DEFAULT
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.timings;
        if t.debounce == 0 {
            return Err(ConfigError::ZeroDebounce);
        }
        if t.click_timeout == 0 {
            return Err(ConfigError::ZeroClickTimeout);
        }
        if t.long_click >= t.very_long_click {
            return Err(ConfigError::LongNotBelowVeryLong);
        }
        Ok(())
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
