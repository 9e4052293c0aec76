//! Non-blocking logging for the sampler.
//!
//! # Architecture
//!
//! ```text
//! Sampler                LogStream            Drain task
//! ───────                ─────────            ──────────
//!
//! drv_log!() ─────────▶ [L0][L1][L2] ──────▶ log facade
//! no alloc                lock-free           blocking ok
//! no blocking             ring buffer
//! ```
//!
//! # Rules
//!
//! - The sampler never calls the `log` facade directly while it holds the registry
//! - Messages are dropped, never waited for, when the ring is full
//! - One producer at a time (the sampler, under the registry lock), one consumer

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU32, Ordering};

use crate::hal::clock::Tick;

/// Maximum message length; longer messages are truncated.
pub const MAX_MSG_LEN: usize = 64;

/// Log buffer size (number of entries).
pub const LOG_BUFFER_SIZE: usize = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}

/// A single log entry.
#[derive(Clone, Copy)]
pub struct LogEntry {
    /// Scheduler tick the message was produced at.
    pub tick: Tick,
    pub level: LogLevel,
    pub len: u8,
    /// Message bytes (not null-terminated).
    pub msg: [u8; MAX_MSG_LEN],
}

impl LogEntry {
    const EMPTY: Self = Self {
        tick: 0,
        level: LogLevel::Info,
        len: 0,
        msg: [0; MAX_MSG_LEN],
    };

    /// Message text. Truncation may split a UTF-8 sequence; the valid
    /// prefix is returned in that case.
    pub fn message(&self) -> &str {
        let bytes = &self.msg[..self.len as usize];
        match core::str::from_utf8(bytes) {
            Ok(s) => s,
            Err(e) => core::str::from_utf8(&bytes[..e.valid_up_to()]).unwrap_or(""),
        }
    }
}

impl Default for LogEntry {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Lock-free single-producer single-consumer log ring.
pub struct LogStream<const N: usize = LOG_BUFFER_SIZE> {
    entries: UnsafeCell<[LogEntry; N]>,
    write_idx: AtomicU32,
    read_idx: AtomicU32,
    dropped: AtomicU32,
}

// SAFETY: one producer owns `write_idx`, one consumer owns `read_idx`.
// A slot is written only while it lies outside the readable window.
unsafe impl<const N: usize> Sync for LogStream<N> {}
unsafe impl<const N: usize> Send for LogStream<N> {}

impl<const N: usize> LogStream<N> {
    const MASK: usize = N - 1;

    pub const fn new() -> Self {
        assert!(N.is_power_of_two(), "Log buffer size must be power of 2");

        Self {
            entries: UnsafeCell::new([LogEntry::EMPTY; N]),
            write_idx: AtomicU32::new(0),
            read_idx: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
        }
    }

    /// Queue a message. Never blocks.
    ///
    /// Returns `false` if the ring was full and the message was dropped.
    #[inline]
    pub fn push(&self, tick: Tick, level: LogLevel, msg: &[u8]) -> bool {
        let write = self.write_idx.load(Ordering::Relaxed);
        let read = self.read_idx.load(Ordering::Acquire);

        if write.wrapping_sub(read) >= N as u32 {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        let idx = (write as usize) & Self::MASK;
        let len = msg.len().min(MAX_MSG_LEN);

        // SAFETY: slot `idx` is not readable until write_idx moves past it
        unsafe {
            let entry = &mut (*self.entries.get())[idx];
            entry.tick = tick;
            entry.level = level;
            entry.len = len as u8;
            entry.msg[..len].copy_from_slice(&msg[..len]);
        }

        self.write_idx.store(write.wrapping_add(1), Ordering::Release);
        true
    }

    /// Take the oldest entry, if any.
    #[inline]
    pub fn drain(&self) -> Option<LogEntry> {
        let read = self.read_idx.load(Ordering::Relaxed);
        let write = self.write_idx.load(Ordering::Acquire);

        if read == write {
            return None;
        }

        let idx = (read as usize) & Self::MASK;

        // SAFETY: single consumer, slot published by the Release store above
        let entry = unsafe { (*self.entries.get())[idx] };

        self.read_idx.store(read.wrapping_add(1), Ordering::Release);
        Some(entry)
    }

    #[inline]
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Read and clear the dropped counter.
    #[inline]
    pub fn take_dropped(&self) -> u32 {
        self.dropped.swap(0, Ordering::Relaxed)
    }

    #[inline]
    pub fn pending(&self) -> u32 {
        let read = self.read_idx.load(Ordering::Relaxed);
        let write = self.write_idx.load(Ordering::Acquire);
        write.wrapping_sub(read)
    }
}

impl<const N: usize> Default for LogStream<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a message into a buffer, truncating silently.
///
/// Returns the number of bytes written.
#[inline]
pub fn format_to_buffer(buf: &mut [u8], args: core::fmt::Arguments<'_>) -> usize {
    let mut writer = BufWriter { buf, pos: 0 };
    let _ = core::fmt::write(&mut writer, args);
    writer.pos
}

/// `fmt::Write` over a fixed byte slice.
pub(crate) struct BufWriter<'a> {
    pub(crate) buf: &'a mut [u8],
    pub(crate) pos: usize,
}

impl core::fmt::Write for BufWriter<'_> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        let bytes = s.as_bytes();
        let remaining = self.buf.len() - self.pos;
        let to_write = bytes.len().min(remaining);
        self.buf[self.pos..self.pos + to_write].copy_from_slice(&bytes[..to_write]);
        self.pos += to_write;
        Ok(())
    }
}

/// Queue a formatted message on a [`LogStream`].
///
/// # Example
///
/// ```ignore
/// drv_log!(LogLevel::Info, self.log, now, "{} ready", config.pin);
/// ```
#[macro_export]
macro_rules! drv_log {
    ($level:expr, $stream:expr, $tick:expr, $($arg:tt)*) => {{
        let mut buf = [0u8; $crate::logging::MAX_MSG_LEN];
        let len = $crate::logging::format_to_buffer(&mut buf, format_args!($($arg)*));
        $stream.push($tick, $level, &buf[..len]);
    }};
}

#[macro_export]
macro_rules! drv_info {
    ($stream:expr, $tick:expr, $($arg:tt)*) => {
        $crate::drv_log!($crate::logging::LogLevel::Info, $stream, $tick, $($arg)*)
    };
}

#[macro_export]
macro_rules! drv_warn {
    ($stream:expr, $tick:expr, $($arg:tt)*) => {
        $crate::drv_log!($crate::logging::LogLevel::Warn, $stream, $tick, $($arg)*)
    };
}

#[macro_export]
macro_rules! drv_debug {
    ($stream:expr, $tick:expr, $($arg:tt)*) => {
        $crate::drv_log!($crate::logging::LogLevel::Debug, $stream, $tick, $($arg)*)
    };
}
