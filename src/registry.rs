//! Button registry.
//!
//! Ordered collection of registered buttons, shared between the request
//! path (structure) and the sampler (runtime state). One [`TimedLock`]
//! covers both.
//!
//! # Invariants
//!
//! - Pins and ids are unique across the registry
//! - Registration order is preserved; removal splices without reordering
//! - A pin is reserved with the GPIO provider exactly while its node exists

use alloc::vec::Vec;
use core::sync::atomic::{AtomicUsize, Ordering};

use crate::button::{ButtonConfig, RegisterRequest, Selector};
use crate::engine::ButtonNode;
use crate::error::DriverError;
use crate::hal::clock::{Clock, Entropy, Tick};
use crate::hal::gpio::GpioProvider;
use crate::id;
use crate::sync::{TimedLock, TimedLockGuard};

pub struct Registry {
    nodes: TimedLock<Vec<ButtonNode>>,
    /// Node count, readable without the lock.
    len: AtomicUsize,
}

impl Registry {
    pub const fn new() -> Self {
        Self {
            nodes: TimedLock::new(Vec::new()),
            len: AtomicUsize::new(0),
        }
    }

    /// Lock-free emptiness check.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// Add a button.
    ///
    /// Reserves the pin, then allocates an id and appends the node under
    /// the lock. Every failure path leaves the pin released and the
    /// registry untouched.
    pub fn register<G, C, E>(
        &self,
        request: &RegisterRequest,
        gpio: &G,
        clock: &C,
        entropy: &E,
        wait: Tick,
    ) -> Result<ButtonConfig, DriverError>
    where
        G: GpioProvider + ?Sized,
        C: Clock + ?Sized,
        E: Entropy + ?Sized,
    {
        if !gpio.reserve(request.pin) {
            return Err(DriverError::PinUnavailable);
        }

        let result = self.insert(request, clock, entropy, wait);
        if result.is_err() {
            gpio.release(request.pin);
        }
        result
    }

    fn insert<C, E>(
        &self,
        request: &RegisterRequest,
        clock: &C,
        entropy: &E,
        wait: Tick,
    ) -> Result<ButtonConfig, DriverError>
    where
        C: Clock + ?Sized,
        E: Entropy + ?Sized,
    {
        let mut nodes = self
            .nodes
            .lock_within(clock, wait)
            .ok_or(DriverError::LockTimeout)?;

        let existing = nodes.iter().map(|node| node.config().id);
        let id = id::allocate(request.requested_id, existing, entropy)
            .ok_or(DriverError::IdExhausted)?;

        let config = request.assign(id);
        nodes.push(ButtonNode::new(config));
        self.len.store(nodes.len(), Ordering::Release);

        Ok(config)
    }

    /// Remove the first button `selector` matches and release its pin.
    pub fn deregister<G, C>(
        &self,
        selector: &Selector,
        gpio: &G,
        clock: &C,
        wait: Tick,
    ) -> Result<ButtonConfig, DriverError>
    where
        G: GpioProvider + ?Sized,
        C: Clock + ?Sized,
    {
        if self.is_empty() {
            return Err(DriverError::NoMatchingButton);
        }

        let mut nodes = self
            .nodes
            .lock_within(clock, wait)
            .ok_or(DriverError::LockTimeout)?;

        let index = nodes
            .iter()
            .position(|node| selector.matches(node.config()))
            .ok_or(DriverError::NoMatchingButton)?;

        let removed = nodes.remove(index);
        self.len.store(nodes.len(), Ordering::Release);
        drop(nodes);

        gpio.release(removed.config().pin);
        Ok(*removed.config())
    }

    /// Exclusive access for one sampler cycle.
    ///
    /// `None` if the lock could not be taken within `wait` ticks.
    pub fn lock_for_cycle<C: Clock + ?Sized>(
        &self,
        clock: &C,
        wait: Tick,
    ) -> Option<TimedLockGuard<'_, Vec<ButtonNode>>> {
        self.nodes.lock_within(clock, wait)
    }

    /// Configs in registration order.
    pub fn configs<C: Clock + ?Sized>(&self, clock: &C, wait: Tick) -> Option<Vec<ButtonConfig>> {
        let nodes = self.nodes.lock_within(clock, wait)?;
        Some(nodes.iter().map(|node| *node.config()).collect())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
