//! GPIO capability port and pin reservation bookkeeping.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::button::{Level, PinNumber, PullMode};

/// GPIO capability the driver consumes.
///
/// Registration and the sampler call in from different threads,
/// so implementations use interior mutability.
pub trait GpioProvider: Sync {
    /// Claim `pin`. Returns `false` if it is already claimed.
    fn reserve(&self, pin: PinNumber) -> bool;

    /// Give `pin` back.
    fn release(&self, pin: PinNumber);

    /// Configure `pin` as a plain input with the given pull.
    fn configure(&self, pin: PinNumber, pull: PullMode);

    fn read_level(&self, pin: PinNumber) -> Level;
}

impl<T: GpioProvider + ?Sized> GpioProvider for &T {
    fn reserve(&self, pin: PinNumber) -> bool {
        (**self).reserve(pin)
    }

    fn release(&self, pin: PinNumber) {
        (**self).release(pin)
    }

    fn configure(&self, pin: PinNumber, pull: PullMode) {
        (**self).configure(pin, pull)
    }

    fn read_level(&self, pin: PinNumber) -> Level {
        (**self).read_level(pin)
    }
}

/// Lock-free claim mask for pins 0..64.
///
/// Two 32-bit words: the Xtensa cores have no 64-bit atomics.
pub struct PinReservations {
    words: [AtomicU32; 2],
}

impl PinReservations {
    pub const fn new() -> Self {
        Self {
            words: [AtomicU32::new(0), AtomicU32::new(0)],
        }
    }

    #[inline]
    fn slot(pin: PinNumber) -> (usize, u32) {
        let n = pin.get() as usize;
        (n / 32, 1u32 << (n % 32))
    }

    /// Claim `pin`; `false` if it was already claimed.
    #[inline]
    pub fn reserve(&self, pin: PinNumber) -> bool {
        let (word, bit) = Self::slot(pin);
        self.words[word].fetch_or(bit, Ordering::AcqRel) & bit == 0
    }

    #[inline]
    pub fn release(&self, pin: PinNumber) {
        let (word, bit) = Self::slot(pin);
        self.words[word].fetch_and(!bit, Ordering::AcqRel);
    }

    #[inline]
    pub fn is_reserved(&self, pin: PinNumber) -> bool {
        let (word, bit) = Self::slot(pin);
        self.words[word].load(Ordering::Acquire) & bit != 0
    }

    /// Number of claimed pins.
    pub fn count(&self) -> u32 {
        self.words
            .iter()
            .map(|w| w.load(Ordering::Acquire).count_ones())
            .sum()
    }
}

impl Default for PinReservations {
    fn default() -> Self {
        Self::new()
    }
}
