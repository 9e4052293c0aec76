//! Driver error types

/// Reason a registration, deregistration or bus request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverError {
    /// E01: GPIO already reserved by another button
    PinUnavailable,
    /// E02: Both id allocation attempts collided
    IdExhausted,
    /// E03: Deregistration selector matched nothing
    NoMatchingButton,
    /// E04: Registry lock not acquired in time
    LockTimeout,
    /// E05: Bus payload or event id could not be decoded
    InvalidPayload,
}

impl DriverError {
    /// Get error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::PinUnavailable => "E01",
            Self::IdExhausted => "E02",
            Self::NoMatchingButton => "E03",
            Self::LockTimeout => "E04",
            Self::InvalidPayload => "E05",
        }
    }

    /// Get error message
    pub fn message(&self) -> &'static str {
        match self {
            Self::PinUnavailable => "pin unavailable",
            Self::IdExhausted => "no free button id",
            Self::NoMatchingButton => "no matching button",
            Self::LockTimeout => "registry busy",
            Self::InvalidPayload => "invalid payload",
        }
    }
}

impl core::fmt::Display for DriverError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// Rejected [`DriverConfig`](crate::config::DriverConfig).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// C01: Debounce window of zero ticks
    ZeroDebounce,
    /// C02: Click quiet timeout of zero ticks
    ZeroClickTimeout,
    /// C03: Long click threshold not below very-long threshold
    LongNotBelowVeryLong,
}

impl ConfigError {
    /// Get error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ZeroDebounce => "C01",
            Self::ZeroClickTimeout => "C02",
            Self::LongNotBelowVeryLong => "C03",
        }
    }

    /// Get error message
    pub fn message(&self) -> &'static str {
        match self {
            Self::ZeroDebounce => "debounce must be at least one tick",
            Self::ZeroClickTimeout => "click timeout must be at least one tick",
            Self::LongNotBelowVeryLong => "long click must be shorter than very long click",
        }
    }
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_has_code_and_message() {
        let text = std::format!("{}", DriverError::PinUnavailable);
        assert_eq!(text, "E01: pin unavailable");

        let text = std::format!("{}", ConfigError::LongNotBelowVeryLong);
        assert!(text.starts_with("C03"));
    }

    #[test]
    fn test_error_codes_unique() {
        let all = [
            DriverError::PinUnavailable,
            DriverError::IdExhausted,
            DriverError::NoMatchingButton,
            DriverError::LockTimeout,
            DriverError::InvalidPayload,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a.code(), b.code());
            }
        }
    }
}
