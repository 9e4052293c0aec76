//! Lock-free event stream: the in-process event bus.
//!
//! # Architecture
//!
//! ```text
//! Sampler ──────┐
//!               ├──▶ EventStream ──────▶ Consumers
//! Requests ─────┘    (lock-free)         (own cursor each)
//! ```
//!
//! # Rules
//!
//! - Publishing never blocks and never allocates
//! - Oldest events are overwritten when a consumer falls a full ring behind
//! - Each slot carries a sequence number; readers never see a half-written event

use core::cell::UnsafeCell;
use core::sync::atomic::{fence, AtomicU32, Ordering};

use crate::event::{ButtonEvent, EventSink};

/// Default stream size: 64 events.
pub const DEFAULT_STREAM_SIZE: usize = 64;

/// Sequence value of a slot being written (or never written).
const SEQ_BUSY: u32 = 0;

struct Slot {
    /// `index + 1` of the event stored here once published.
    seq: AtomicU32,
    event: UnsafeCell<ButtonEvent>,
}

#[allow(clippy::declare_interior_mutable_const)]
const EMPTY_SLOT: Slot = Slot {
    seq: AtomicU32::new(SEQ_BUSY),
    event: UnsafeCell::new(ButtonEvent::EMPTY),
};

/// Multi-producer ring buffer of [`ButtonEvent`]s.
///
/// # Safety
///
/// This type uses `UnsafeCell` internally but is safe to use because:
/// - Producers claim unique indices with `fetch_add`
/// - A slot's sequence is cleared before the write and set after it
/// - Readers copy the slot and re-check the sequence (seqlock), discarding
///   torn copies
///
/// # Memory Ordering
///
/// - Producer publishes the sequence with `Release`
/// - Consumer loads the sequence with `Acquire` before copying
pub struct EventStream<const N: usize = DEFAULT_STREAM_SIZE> {
    slots: [Slot; N],

    /// Next write index (monotonically increasing, wraps via mask).
    write_idx: AtomicU32,
}

// SAFETY: producers coordinate through `write_idx`, readers validate through
// per-slot sequence numbers. `ButtonEvent` is `Copy` with no drop glue.
unsafe impl<const N: usize> Sync for EventStream<N> {}
unsafe impl<const N: usize> Send for EventStream<N> {}

impl<const N: usize> EventStream<N> {
    /// Mask for wrapping index to buffer size.
    /// N must be a power of 2.
    const MASK: usize = N - 1;

    /// Create a new empty stream.
    ///
    /// # Panics
    ///
    /// Panics at compile time if N is not a power of 2.
    pub const fn new() -> Self {
        assert!(N.is_power_of_two(), "Stream size must be power of 2");

        Self {
            slots: [EMPTY_SLOT; N],
            write_idx: AtomicU32::new(0),
        }
    }

    /// Append an event. O(1), never blocks.
    #[inline]
    pub fn push(&self, event: ButtonEvent) {
        let idx = self.write_idx.fetch_add(1, Ordering::AcqRel);
        let slot = &self.slots[(idx as usize) & Self::MASK];

        slot.seq.store(SEQ_BUSY, Ordering::Relaxed);
        fence(Ordering::Release);

        // SAFETY: index claimed by this producer alone; concurrent readers
        // detect the write through the sequence check and drop their copy
        unsafe {
            core::ptr::write_volatile(slot.event.get(), event);
        }

        slot.seq.store(idx.wrapping_add(1), Ordering::Release);
    }

    /// Read the event at `idx`.
    ///
    /// Returns `None` if:
    /// - Index is ahead of write head (not yet written)
    /// - Index is too far behind (overwritten)
    /// - The slot is still being written
    #[inline]
    pub fn read(&self, idx: u32) -> Option<ButtonEvent> {
        let write = self.write_idx.load(Ordering::Acquire);
        let behind = write.wrapping_sub(idx);

        if behind == 0 || behind > N as u32 {
            return None;
        }

        let slot = &self.slots[(idx as usize) & Self::MASK];
        let expected = idx.wrapping_add(1);

        if slot.seq.load(Ordering::Acquire) != expected {
            return None;
        }

        // SAFETY: ButtonEvent is Copy; a concurrent overwrite is caught below
        let event = unsafe { core::ptr::read_volatile(slot.event.get()) };

        fence(Ordering::Acquire);
        if slot.seq.load(Ordering::Relaxed) != expected {
            return None;
        }

        Some(event)
    }

    /// Get the current write head index.
    ///
    /// Consumers use this to initialize their read index.
    #[inline]
    pub fn write_head(&self) -> u32 {
        self.write_idx.load(Ordering::Acquire)
    }

    /// Calculate how many events behind a consumer is.
    #[inline]
    pub fn lag(&self, reader_idx: u32) -> u32 {
        self.write_idx.load(Ordering::Acquire).wrapping_sub(reader_idx)
    }

    /// Check if a consumer has fallen too far behind (overrun).
    #[inline]
    pub fn is_overrun(&self, reader_idx: u32) -> bool {
        self.lag(reader_idx) > N as u32
    }

    /// Get the buffer capacity.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Default for EventStream<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> EventSink for EventStream<N> {
    /// Always accepted; slow consumers lose the oldest events instead.
    fn publish(&self, event: ButtonEvent) -> bool {
        self.push(event);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::button::{ButtonConfig, ButtonId, Level, PinNumber, PullMode};
    use crate::event::EventKind;

    fn click(id: u16) -> ButtonEvent {
        ButtonEvent::button(
            EventKind::Click,
            ButtonConfig {
                pin: PinNumber::new(4).unwrap(),
                id: ButtonId::new(id).unwrap(),
                idle_level: Level::High,
                pull: PullMode::PullUp,
            },
        )
    }

    #[test]
    fn test_stream_basic_write_read() {
        let stream = EventStream::<8>::new();

        assert!(stream.read(0).is_none());
        stream.push(click(1));

        let read = stream.read(0).unwrap();
        assert_eq!(read, click(1));
        assert!(stream.read(1).is_none());
    }

    #[test]
    fn test_stream_overrun_detection() {
        let stream = EventStream::<8>::new();

        for i in 1..=20 {
            stream.push(click(i));
        }

        // Old indices should be overrun
        assert!(stream.is_overrun(0));
        assert!(stream.read(5).is_none());

        // Recent indices should be valid
        assert!(!stream.is_overrun(12));
        assert_eq!(stream.read(19), Some(click(20)));
    }

    #[test]
    fn test_stream_lag_calculation() {
        let stream = EventStream::<16>::new();

        for i in 1..=10 {
            stream.push(click(i));
        }

        assert_eq!(stream.lag(0), 10);
        assert_eq!(stream.lag(5), 5);
        assert_eq!(stream.lag(10), 0);
    }

    #[test]
    fn test_stream_concurrent_producers() {
        use std::thread;

        let stream = EventStream::<256>::new();

        thread::scope(|s| {
            for t in 0..4u16 {
                let stream = &stream;
                s.spawn(move || {
                    for j in 0..50u16 {
                        stream.push(click(t * 100 + j + 1));
                    }
                });
            }
        });

        assert_eq!(stream.write_head(), 200);
        let readable = (0..200).filter(|&i| stream.read(i).is_some()).count();
        assert_eq!(readable, 200);
    }
}
