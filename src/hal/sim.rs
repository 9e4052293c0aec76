//! Simulated ports for host runs and tests.
//!
//! No hardware, no OS: levels are set by hand, time advances only when
//! someone asks it to. The ports are `Sync` so a sampler thread and a
//! request thread can share one instance; [`SimBus`] is single-threaded.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::convert::Infallible;
use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use crate::button::{ConfigWord, Level, PinNumber, PullMode, PIN_COUNT};
use crate::event::RequestBus;
use crate::hal::clock::{Clock, Entropy, Tick};
use crate::hal::gpio::{GpioProvider, PinReservations};

/// Marker for a pin that was never configured.
const UNCONFIGURED: u8 = 0xFF;

/// Simulated GPIO bank.
pub struct SimGpio {
    reservations: PinReservations,
    levels: [AtomicU32; 2],
    pulls: [AtomicU8; PIN_COUNT as usize],
    configure_calls: AtomicU32,
}

impl SimGpio {
    pub fn new() -> Self {
        const UNSET: AtomicU8 = AtomicU8::new(UNCONFIGURED);
        Self {
            reservations: PinReservations::new(),
            levels: [AtomicU32::new(0), AtomicU32::new(0)],
            pulls: [UNSET; PIN_COUNT as usize],
            configure_calls: AtomicU32::new(0),
        }
    }

    /// Drive the level the next `read_level` on `pin` returns.
    pub fn set_level(&self, pin: PinNumber, level: Level) {
        let n = pin.get() as usize;
        let bit = 1u32 << (n % 32);
        match level {
            Level::High => self.levels[n / 32].fetch_or(bit, Ordering::AcqRel),
            Level::Low => self.levels[n / 32].fetch_and(!bit, Ordering::AcqRel),
        };
    }

    /// Pull mode from the last `configure` call, `None` if never configured.
    pub fn pull(&self, pin: PinNumber) -> Option<PullMode> {
        PullMode::from_u8(self.pulls[pin.get() as usize].load(Ordering::Acquire))
    }

    pub fn is_reserved(&self, pin: PinNumber) -> bool {
        self.reservations.is_reserved(pin)
    }

    /// Total `configure` calls across all pins.
    pub fn configure_calls(&self) -> u32 {
        self.configure_calls.load(Ordering::Relaxed)
    }
}

impl Default for SimGpio {
    fn default() -> Self {
        Self::new()
    }
}

impl GpioProvider for SimGpio {
    fn reserve(&self, pin: PinNumber) -> bool {
        self.reservations.reserve(pin)
    }

    fn release(&self, pin: PinNumber) {
        self.reservations.release(pin);
        self.pulls[pin.get() as usize].store(UNCONFIGURED, Ordering::Release);
    }

    fn configure(&self, pin: PinNumber, pull: PullMode) {
        self.pulls[pin.get() as usize].store(pull as u8, Ordering::Release);
        self.configure_calls.fetch_add(1, Ordering::Relaxed);
    }

    fn read_level(&self, pin: PinNumber) -> Level {
        let n = pin.get() as usize;
        Level::from_raw(self.levels[n / 32].load(Ordering::Acquire) & (1u32 << (n % 32)))
    }
}

/// Clock that only moves when told to. `delay` advances it.
pub struct ManualClock {
    now: AtomicU32,
}

impl ManualClock {
    pub const fn new(start: Tick) -> Self {
        Self {
            now: AtomicU32::new(start),
        }
    }

    pub fn advance(&self, ticks: Tick) {
        self.now.fetch_add(ticks, Ordering::AcqRel);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Tick {
        self.now.load(Ordering::Acquire)
    }

    fn delay(&self, ticks: Tick) {
        self.advance(ticks);
    }
}

/// Deterministic xorshift32 generator.
pub struct XorShiftEntropy {
    state: AtomicU32,
}

impl XorShiftEntropy {
    /// A zero seed would lock xorshift at zero; it is bumped to 1.
    pub const fn new(seed: u32) -> Self {
        Self {
            state: AtomicU32::new(if seed == 0 { 1 } else { seed }),
        }
    }
}

impl Entropy for XorShiftEntropy {
    fn random_u32(&self) -> u32 {
        let mut next = 0;
        // fetch_update never fails with a closure that always returns Some
        let _ = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |mut x| {
                x ^= x << 13;
                x ^= x >> 17;
                x ^= x << 5;
                next = x;
                Some(x)
            });
        next
    }
}

/// Replays a fixed list of values, cycling at the end.
pub struct ScriptedEntropy<'a> {
    values: &'a [u32],
    cursor: AtomicU32,
}

impl<'a> ScriptedEntropy<'a> {
    pub const fn new(values: &'a [u32]) -> Self {
        Self {
            values,
            cursor: AtomicU32::new(0),
        }
    }

    /// Number of values handed out so far.
    pub fn draws(&self) -> u32 {
        self.cursor.load(Ordering::Relaxed)
    }
}

impl Entropy for ScriptedEntropy<'_> {
    fn random_u32(&self) -> u32 {
        if self.values.is_empty() {
            return 0;
        }
        let i = self.cursor.fetch_add(1, Ordering::Relaxed) as usize;
        self.values[i % self.values.len()]
    }
}

type Handler = Box<dyn FnMut(i32, ConfigWord) + Send>;

/// In-process request bus: `post` runs the matching handlers inline.
#[derive(Default)]
pub struct SimBus {
    handlers: RefCell<Vec<(i32, Handler)>>,
}

impl SimBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a message. Returns how many handlers saw it.
    pub fn post(&self, event_id: i32, word: ConfigWord) -> usize {
        let mut handlers = self.handlers.borrow_mut();
        let mut delivered = 0;
        for (subscribed, handler) in handlers.iter_mut() {
            if *subscribed == event_id {
                handler(event_id, word);
                delivered += 1;
            }
        }
        delivered
    }

    pub fn subscribers(&self) -> usize {
        self.handlers.borrow().len()
    }
}

impl RequestBus for SimBus {
    type Subscription = ();
    type Error = Infallible;

    fn subscribe<F>(&self, event_id: i32, handler: F) -> Result<(), Infallible>
    where
        F: FnMut(i32, ConfigWord) + Send + 'static,
    {
        self.handlers.borrow_mut().push((event_id, Box::new(handler)));
        Ok(())
    }
}
