//! Event stream consumer.
//!
//! Listeners process events when they can. If one falls a full ring
//! behind, it skips forward and counts what it lost; it never stalls
//! the producers.

use crate::event::ButtonEvent;
use crate::stream::EventStream;

/// Best-effort reader of an [`EventStream`].
///
/// # Example
///
/// ```
/// use polled_button_driver::consumer::EventConsumer;
/// use polled_button_driver::event::ButtonEvent;
/// use polled_button_driver::stream::EventStream;
///
/// let stream = EventStream::<16>::new();
/// let mut consumer = EventConsumer::new(&stream);
///
/// stream.push(ButtonEvent::task_started());
/// assert_eq!(consumer.drain().count(), 1);
/// ```
pub struct EventConsumer<'a, const N: usize = { crate::stream::DEFAULT_STREAM_SIZE }> {
    stream: &'a EventStream<N>,
    read_idx: u32,
    dropped: u32,
}

impl<'a, const N: usize> EventConsumer<'a, N> {
    /// Start reading at the current write head; earlier events are not seen.
    pub fn new(stream: &'a EventStream<N>) -> Self {
        Self {
            stream,
            read_idx: stream.write_head(),
            dropped: 0,
        }
    }

    /// Start at the oldest event still in the ring.
    pub fn from_oldest(stream: &'a EventStream<N>) -> Self {
        let head = stream.write_head();
        let span = head.min(N as u32);
        Self {
            stream,
            read_idx: head.wrapping_sub(span),
            dropped: 0,
        }
    }

    /// Read next event if available.
    ///
    /// If the consumer has fallen too far behind, skips forward
    /// (drops events) and continues. Never returns an error.
    #[inline]
    pub fn tick(&mut self) -> Option<ButtonEvent> {
        if self.stream.is_overrun(self.read_idx) {
            // Keep half a ring of margin so a busy producer does not
            // overrun us again immediately.
            let head = self.stream.write_head();
            let resume = head.wrapping_sub((N / 2) as u32);
            self.dropped = self
                .dropped
                .wrapping_add(resume.wrapping_sub(self.read_idx));
            self.read_idx = resume;
        }

        let event = self.stream.read(self.read_idx)?;
        self.read_idx = self.read_idx.wrapping_add(1);
        Some(event)
    }

    /// Iterate over every event currently readable.
    pub fn drain(&mut self) -> Drain<'_, 'a, N> {
        Drain { consumer: self }
    }

    /// Events lost to overruns since creation.
    #[inline]
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    #[inline]
    pub fn lag(&self) -> u32 {
        self.stream.lag(self.read_idx)
    }
}

/// Iterator returned by [`EventConsumer::drain`].
pub struct Drain<'c, 'a, const N: usize> {
    consumer: &'c mut EventConsumer<'a, N>,
}

impl<const N: usize> Iterator for Drain<'_, '_, N> {
    type Item = ButtonEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.consumer.tick()
    }
}
