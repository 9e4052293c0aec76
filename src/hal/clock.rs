//! Tick time base and entropy ports.

/// Monotonic RTOS tick. Wraps; compare with `wrapping_sub`.
pub type Tick = u32;

/// Tick clock driving every duration comparison.
pub trait Clock: Sync {
    /// Current tick count.
    fn now(&self) -> Tick;

    /// Yield the calling task for `ticks`.
    fn delay(&self, ticks: Tick);
}

/// Random source for button id generation.
pub trait Entropy: Sync {
    fn random_u32(&self) -> u32;
}

impl<T: Clock + ?Sized> Clock for &T {
    #[inline]
    fn now(&self) -> Tick {
        (**self).now()
    }

    #[inline]
    fn delay(&self, ticks: Tick) {
        (**self).delay(ticks)
    }
}

impl<T: Entropy + ?Sized> Entropy for &T {
    #[inline]
    fn random_u32(&self) -> u32 {
        (**self).random_u32()
    }
}

/// Ticks elapsed from `since` to `now`, wrap-safe.
#[inline]
pub fn elapsed(now: Tick, since: Tick) -> Tick {
    now.wrapping_sub(since)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_across_wrap() {
        assert_eq!(elapsed(10, 4), 6);
        assert_eq!(elapsed(3, u32::MAX - 1), 5);
    }
}
