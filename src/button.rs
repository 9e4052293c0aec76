//! Module: button
//!
//! Purpose: Button data model. Configuration fixed at registration time,
//! per-button runtime state owned by the sampler, and the request payloads
//! carried over the event bus.
//!
//! Architecture:
//! - Validated newtypes for pin and id instead of raw bit fields
//! - One packed 32-bit word per payload on the wire (see [`ConfigWord`])
//! - All payload types are `Copy` so events can live in lock-free rings
//!
//! Safety: Safe. No unsafe blocks.

use core::num::NonZeroU16;

use crate::error::DriverError;
use crate::hal::clock::Tick;

/// Number of addressable GPIO pins (reservation mask width).
pub const PIN_COUNT: u8 = 64;

/// Logic level of a GPIO input.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Level {
    #[default]
    Low,
    High,
}

impl Level {
    /// Level from a raw 0/1 reading. Any non-zero value is high.
    #[inline]
    pub fn from_raw(raw: u32) -> Self {
        if raw == 0 {
            Level::Low
        } else {
            Level::High
        }
    }

    #[inline]
    pub fn is_high(self) -> bool {
        self == Level::High
    }

    /// The other level.
    #[inline]
    pub fn inverted(self) -> Self {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

/// Internal pull resistor configuration.
///
/// Numbering follows the ESP-IDF `gpio_pull_mode_t` enumeration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum PullMode {
    PullUp = 0,
    PullDown = 1,
    PullUpDown = 2,
    Floating = 3,
}

impl PullMode {
    /// Convert from raw value, `None` if out of range.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(PullMode::PullUp),
            1 => Some(PullMode::PullDown),
            2 => Some(PullMode::PullUpDown),
            3 => Some(PullMode::Floating),
            _ => None,
        }
    }

    /// A button has a single idle bias: pull-up-and-down collapses to pull-up.
    #[inline]
    pub fn normalized(self) -> Self {
        match self {
            PullMode::PullUpDown => PullMode::PullUp,
            other => other,
        }
    }

    #[inline]
    pub fn pull_up_enabled(self) -> bool {
        self == PullMode::PullUp
    }

    #[inline]
    pub fn pull_down_enabled(self) -> bool {
        self == PullMode::PullDown
    }
}

/// GPIO pin number, validated against [`PIN_COUNT`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PinNumber(u8);

impl PinNumber {
    pub const fn new(pin: u8) -> Option<Self> {
        if pin < PIN_COUNT {
            Some(Self(pin))
        } else {
            None
        }
    }

    #[inline]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl core::fmt::Display for PinNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "GPIO{:02}", self.0)
    }
}

/// Assigned button identifier. Never zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ButtonId(NonZeroU16);

impl ButtonId {
    pub const fn new(id: u16) -> Option<Self> {
        match NonZeroU16::new(id) {
            Some(id) => Some(Self(id)),
            None => None,
        }
    }

    /// `1 + offset`, saturating at `0xFFFF`.
    pub const fn from_offset(offset: u16) -> Self {
        Self(NonZeroU16::MIN.saturating_add(offset))
    }

    #[inline]
    pub const fn get(self) -> u16 {
        self.0.get()
    }
}

impl core::fmt::Display for ButtonId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:04X}", self.get())
    }
}

/// Configuration of a registered button. Immutable after registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ButtonConfig {
    pub pin: PinNumber,
    pub id: ButtonId,
    /// Level read while the button is not actuated.
    pub idle_level: Level,
    pub pull: PullMode,
}

impl ButtonConfig {
    pub fn to_word(&self) -> ConfigWord {
        ConfigWord::pack(self.pin.get(), self.id.get(), self.idle_level, self.pull as u8)
    }

    /// Decode a packed word; fails on a bad pin, pull mode or a zero id.
    pub fn from_word(word: ConfigWord) -> Result<Self, DriverError> {
        let pin = PinNumber::new(word.pin()).ok_or(DriverError::InvalidPayload)?;
        let id = ButtonId::new(word.id()).ok_or(DriverError::InvalidPayload)?;
        let pull = PullMode::from_u8(word.pull()).ok_or(DriverError::InvalidPayload)?;
        Ok(Self {
            pin,
            id,
            idle_level: word.idle_level(),
            pull,
        })
    }
}

/// Registration request as received from the bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegisterRequest {
    pub pin: PinNumber,
    /// Zero asks the driver to pick a random id.
    pub requested_id: u16,
    pub idle_level: Level,
    pub pull: PullMode,
}

impl RegisterRequest {
    /// Request a random id for a button on `pin`.
    pub fn new(pin: PinNumber, idle_level: Level, pull: PullMode) -> Self {
        Self {
            pin,
            requested_id: 0,
            idle_level,
            pull,
        }
    }

    pub fn with_id(mut self, requested_id: u16) -> Self {
        self.requested_id = requested_id;
        self
    }

    /// Finalized config once an id has been assigned.
    pub fn assign(&self, id: ButtonId) -> ButtonConfig {
        ButtonConfig {
            pin: self.pin,
            id,
            idle_level: self.idle_level,
            pull: self.pull.normalized(),
        }
    }

    pub fn to_word(&self) -> ConfigWord {
        ConfigWord::pack(self.pin.get(), self.requested_id, self.idle_level, self.pull as u8)
    }

    pub fn from_word(word: ConfigWord) -> Result<Self, DriverError> {
        let pin = PinNumber::new(word.pin()).ok_or(DriverError::InvalidPayload)?;
        let pull = PullMode::from_u8(word.pull()).ok_or(DriverError::InvalidPayload)?;
        Ok(Self {
            pin,
            requested_id: word.id(),
            idle_level: word.idle_level(),
            pull,
        })
    }
}

/// Deregistration selector. A non-zero id wins over the pin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Selector {
    pub pin: PinNumber,
    pub id: u16,
}

impl Selector {
    pub fn by_id(id: ButtonId) -> Self {
        Self {
            pin: PinNumber(0),
            id: id.get(),
        }
    }

    pub fn by_pin(pin: PinNumber) -> Self {
        Self { pin, id: 0 }
    }

    /// True if `config` is the button this selector names.
    #[inline]
    pub fn matches(&self, config: &ButtonConfig) -> bool {
        if self.id != 0 {
            config.id.get() == self.id
        } else {
            config.pin == self.pin
        }
    }

    pub fn to_word(&self) -> ConfigWord {
        ConfigWord::pack(self.pin.get(), self.id, Level::Low, 0)
    }

    /// Only the pin and id fields are meaningful; the pin must still be valid.
    pub fn from_word(word: ConfigWord) -> Result<Self, DriverError> {
        let pin = PinNumber::new(word.pin()).ok_or(DriverError::InvalidPayload)?;
        Ok(Self { pin, id: word.id() })
    }
}

/// Packed 32-bit payload shared by every bus message.
///
/// Memory layout:
/// ```text
/// [31..29 pull][28 idle][27..24 reserved][23..8 id][7..0 pin]
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConfigWord(pub u32);

impl ConfigWord {
    const PIN_MASK: u32 = 0xFF;
    const ID_SHIFT: u32 = 8;
    const ID_MASK: u32 = 0xFFFF;
    const IDLE_SHIFT: u32 = 28;
    const PULL_SHIFT: u32 = 29;
    const PULL_MASK: u32 = 0x7;

    pub fn pack(pin: u8, id: u16, idle_level: Level, pull: u8) -> Self {
        Self(
            (pin as u32 & Self::PIN_MASK)
                | ((id as u32 & Self::ID_MASK) << Self::ID_SHIFT)
                | ((idle_level.is_high() as u32) << Self::IDLE_SHIFT)
                | ((pull as u32 & Self::PULL_MASK) << Self::PULL_SHIFT),
        )
    }

    #[inline]
    pub fn pin(self) -> u8 {
        (self.0 & Self::PIN_MASK) as u8
    }

    #[inline]
    pub fn id(self) -> u16 {
        ((self.0 >> Self::ID_SHIFT) & Self::ID_MASK) as u16
    }

    #[inline]
    pub fn idle_level(self) -> Level {
        Level::from_raw((self.0 >> Self::IDLE_SHIFT) & 1)
    }

    #[inline]
    pub fn pull(self) -> u8 {
        ((self.0 >> Self::PULL_SHIFT) & Self::PULL_MASK) as u8
    }
}

/// Maximum value of the click counter.
pub const MAX_CLICKS: u8 = 4;

/// Per-button sampler state. Ticks of 0 mean "not set".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ButtonRuntimeState {
    /// Pin observed at idle level at least once.
    pub ready: bool,
    /// Last debounced level (meaningless until bootstrapped).
    pub last_level: Level,
    /// Short presses pending a quiet-timeout flush, saturating at [`MAX_CLICKS`].
    pub click_count: u8,
    pub press_tick: Tick,
    pub release_tick: Tick,
    pub last_change_tick: Tick,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pin(n: u8) -> PinNumber {
        PinNumber::new(n).unwrap()
    }

    #[test]
    fn test_pin_and_id_validation() {
        assert!(PinNumber::new(63).is_some());
        assert!(PinNumber::new(64).is_none());
        assert!(ButtonId::new(0).is_none());
        assert_eq!(ButtonId::new(0xBEEF).unwrap().get(), 0xBEEF);
        assert_eq!(ButtonId::from_offset(0).get(), 1);
        assert_eq!(ButtonId::from_offset(u16::MAX).get(), 0xFFFF);
    }

    #[test]
    fn test_config_word_layout() {
        let config = ButtonConfig {
            pin: pin(13),
            id: ButtonId::new(0x1234).unwrap(),
            idle_level: Level::High,
            pull: PullMode::PullDown,
        };
        let word = config.to_word();

        assert_eq!(word.0 & 0xFF, 13);
        assert_eq!((word.0 >> 8) & 0xFFFF, 0x1234);
        assert_eq!((word.0 >> 28) & 1, 1);
        assert_eq!(word.0 >> 29, 1);
        assert_eq!(ButtonConfig::from_word(word), Ok(config));
    }

    #[test]
    fn test_word_rejects_bad_fields() {
        // pin 200 out of range
        let word = ConfigWord::pack(200, 1, Level::Low, 0);
        assert_eq!(RegisterRequest::from_word(word), Err(DriverError::InvalidPayload));

        // pull mode 5 unknown
        let word = ConfigWord::pack(4, 1, Level::Low, 5);
        assert_eq!(RegisterRequest::from_word(word), Err(DriverError::InvalidPayload));

        // finalized config needs an id
        let word = ConfigWord::pack(4, 0, Level::Low, 0);
        assert_eq!(ButtonConfig::from_word(word), Err(DriverError::InvalidPayload));
        assert!(RegisterRequest::from_word(word).is_ok());
    }

    #[test]
    fn test_assign_normalizes_pull() {
        let request = RegisterRequest::new(pin(5), Level::High, PullMode::PullUpDown);
        let config = request.assign(ButtonId::new(7).unwrap());
        assert_eq!(config.pull, PullMode::PullUp);
        assert_eq!(config.pin, pin(5));
    }

    #[test]
    fn test_selector_prefers_id() {
        let config = ButtonConfig {
            pin: pin(9),
            id: ButtonId::new(42).unwrap(),
            idle_level: Level::High,
            pull: PullMode::PullUp,
        };

        assert!(Selector::by_id(config.id).matches(&config));
        assert!(Selector::by_pin(pin(9)).matches(&config));

        // id set: pin is ignored even when it matches
        let selector = Selector { pin: pin(9), id: 43 };
        assert!(!selector.matches(&config));
    }

    #[test]
    fn test_runtime_state_starts_zeroed() {
        let state = ButtonRuntimeState::default();
        assert!(!state.ready);
        assert_eq!(state.click_count, 0);
        assert_eq!(state.press_tick, 0);
        assert_eq!(state.release_tick, 0);
        assert_eq!(state.last_change_tick, 0);
    }
}
